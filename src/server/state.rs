//! Process-wide shared state (§9: "a typed `ServerState` created once at
//! startup and shared via `Arc` into each per-connection task").

use std::sync::atomic::{AtomicU64, Ordering};

use crate::audit::AuditLog;
use crate::config::ServerConfig;
use crate::locks::LockTable;
use crate::security::SecurityTracker;
use crate::storage::metadata::MetadataStore;

/// Everything a connection task needs, owned once and shared by reference.
#[derive(Debug)]
pub struct ServerState {
    /// Resolved startup configuration.
    pub config: ServerConfig,
    /// Cross-task registry serialising UPLOAD/DELETE mutators.
    pub lock_table: LockTable,
    /// Per-peer authentication failure tracker.
    pub tracker: SecurityTracker,
    /// `.meta` sidecar reader/writer.
    pub metadata: MetadataStore,
    /// Audit/security log writer.
    pub audit: AuditLog,
    next_connection_id: AtomicU64,
}

impl ServerState {
    /// Builds shared state from a resolved configuration.
    pub fn new(config: ServerConfig) -> Self {
        let lock_table = LockTable::new(config.lock_table_capacity);
        let tracker = SecurityTracker::new(
            config.tracker_capacity,
            config.failure_threshold,
            config.block_window,
        );
        let audit = AuditLog::new(config.audit_log_path(), config.security_log_path());

        Self {
            config,
            lock_table,
            tracker,
            metadata: MetadataStore::new(),
            audit,
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Allocates the next monotonically increasing connection id, for the
    /// per-connection tracing span.
    pub fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }
}
