//! Two independent locking mechanisms (§4.5, §4.10, §4.11, §5):
//! the in-process [`table::LockTable`] serialising UPLOAD/DELETE mutators,
//! and [`advisory::LockedFile`] wrapping OS-level advisory locks taken by
//! DOWNLOAD (shared) and DELETE (exclusive).

pub mod advisory;
pub mod table;

pub use advisory::LockedFile;
pub use table::{AcquireResult, LockTable};
