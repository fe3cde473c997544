//! Audit trail and security event logging (§4.3).

pub mod log;

pub use log::{AuditLog, SecurityEventKind};
