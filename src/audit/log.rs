//! Append-only audit and security log writers (§4.3).
//!
//! Both logs share one mutex: contention is low and there is no ordering
//! requirement across the two files, so a single leaf lock is simpler
//! than two. A write failure is logged at `warn` and otherwise swallowed
//! — the operation whose outcome triggered the log line still completes
//! normally (§4.3, §7).

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Security event kinds (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventKind {
    /// A presented AUTH token was missing, malformed, or wrong.
    AuthFailure,
    /// A connection was rejected outright because the peer is blocked.
    BlockedClient,
    /// A client-supplied name failed path validation, or an unknown
    /// command was sent.
    AccessViolation,
    /// A stored file's live digest disagreed with its recorded digest.
    IntegrityFail,
}

impl SecurityEventKind {
    fn as_str(self) -> &'static str {
        match self {
            SecurityEventKind::AuthFailure => "AUTH_FAILURE",
            SecurityEventKind::BlockedClient => "BLOCKED_CLIENT",
            SecurityEventKind::AccessViolation => "ACCESS_VIOLATION",
            SecurityEventKind::IntegrityFail => "INTEGRITY_FAIL",
        }
    }
}

/// Append-only writer for `audit.log` and `security.log`.
#[derive(Debug, Clone)]
pub struct AuditLog {
    audit_path: PathBuf,
    security_path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl AuditLog {
    /// Creates a writer targeting `audit_path`/`security_path`. Does not
    /// create the containing directory; the caller creates `log_dir` at
    /// startup (§6).
    pub fn new(audit_path: PathBuf, security_path: PathBuf) -> Self {
        Self {
            audit_path,
            security_path,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Appends one operation record. Every dispatched operation other
    /// than `LOGS` produces exactly one of these (§3 invariant 6).
    pub async fn record_operation(&self, operation: &str, file: &str, success: bool, details: &str) {
        let status = if success { "SUCCESS" } else { "FAILED" };
        let line = format!(
            "[{}] OPERATION={} FILE={} STATUS={} DETAILS={}\n",
            timestamp(),
            operation,
            file,
            status,
            details
        );
        self.append(&self.audit_path.clone(), &line).await;
    }

    /// Appends one security event.
    pub async fn record_security_event(
        &self,
        kind: SecurityEventKind,
        ip: &str,
        file: &str,
        details: &str,
    ) {
        let line = format!(
            "[{}] EVENT={} IP={} FILE={} DETAILS={}\n",
            timestamp(),
            kind.as_str(),
            ip,
            file,
            details
        );
        self.append(&self.security_path.clone(), &line).await;
    }

    /// Reads up to the last `max_bytes` of the audit log, for `LOGS`.
    /// Returns `None` if the log does not exist.
    pub async fn read_audit_tail(&self, max_bytes: u64) -> Option<String> {
        read_tail(&self.audit_path, max_bytes).await
    }

    /// Reads the full security log, for `LOGS`. Returns `None` if the log
    /// does not exist.
    pub async fn read_security_full(&self) -> Option<String> {
        read_tail(&self.security_path, u64::MAX).await
    }

    async fn append(&self, path: &PathBuf, line: &str) {
        let _guard = self.lock.lock().await;
        let result = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await;
        match result {
            Ok(mut file) => {
                if let Err(err) = file.write_all(line.as_bytes()).await {
                    warn!(error = %err, path = %path.display(), "failed to append log line");
                }
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to open log for append");
            }
        }
    }
}

async fn read_tail(path: &PathBuf, max_bytes: u64) -> Option<String> {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    let mut file = tokio::fs::File::open(path).await.ok()?;
    let len = file.metadata().await.ok()?.len();
    let start = len.saturating_sub(max_bytes);
    if start > 0 {
        file.seek(std::io::SeekFrom::Start(start)).await.ok()?;
    }
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await.ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_operation_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.log"), dir.path().join("security.log"));
        log.record_operation("UPLOAD", "alice/note", true, "Size: 12 bytes")
            .await;

        let contents = tokio::fs::read_to_string(dir.path().join("audit.log"))
            .await
            .unwrap();
        assert!(contents.contains("OPERATION=UPLOAD"));
        assert!(contents.contains("FILE=alice/note"));
        assert!(contents.contains("STATUS=SUCCESS"));
    }

    #[tokio::test]
    async fn records_security_event() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.log"), dir.path().join("security.log"));
        log.record_security_event(
            SecurityEventKind::AccessViolation,
            "127.0.0.1",
            "../etc/passwd",
            "Path traversal attempt",
        )
        .await;

        let contents = tokio::fs::read_to_string(dir.path().join("security.log"))
            .await
            .unwrap();
        assert!(contents.contains("EVENT=ACCESS_VIOLATION"));
        assert!(contents.contains("IP=127.0.0.1"));
    }

    #[tokio::test]
    async fn missing_audit_log_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.log"), dir.path().join("security.log"));
        assert!(log.read_audit_tail(10_240).await.is_none());
    }

    #[tokio::test]
    async fn tail_truncates_to_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.log"), dir.path().join("security.log"));
        for i in 0..500 {
            log.record_operation("LIST", "all", true, &format!("iteration {i}"))
                .await;
        }
        let tail = log.read_audit_tail(1024).await.unwrap();
        assert!(tail.len() <= 1024 + 256); // allow for the last partial line
    }
}
