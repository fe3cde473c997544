//! `LOCKS` (§4.13).
//!
//! Reports fd-level lock contention across the storage tree, not the
//! in-process [`crate::locks::LockTable`] — a file held open for writing by
//! another process (or a DOWNLOAD in progress) is what this surfaces.

use crate::locks::LockedFile;

use super::{OperationContext, OperationError};

/// Probes every regular file under `storage_root` for exclusive-lock
/// contention. Returns the full multi-line reply body to write verbatim.
pub async fn handle(ctx: &OperationContext) -> String {
    let root = &ctx.state.config.storage_root;
    let pid = std::process::id();

    let mut read_dir = match tokio::fs::read_dir(root).await {
        Ok(rd) => rd,
        Err(_) => {
            ctx.state
                .audit
                .record_operation("LOCKS", "all", false, "Cannot open storage directory")
                .await;
            return OperationError::CannotOpenStorageDirectory.into_response().into_line();
        }
    };

    let mut locked_lines = Vec::new();
    loop {
        let entry = match read_dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(_) => break,
        };

        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let Ok(file_type) = entry.file_type().await else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        match LockedFile::probe_exclusive(&path) {
            Ok(true) => {}
            Ok(false) => locked_lines.push(format!("LOCKED: {name} (PID: {pid})\n")),
            Err(_) => {}
        }
    }

    ctx.state
        .audit
        .record_operation("LOCKS", "all", true, &format!("{} locked files", locked_lines.len()))
        .await;

    if locked_lines.is_empty() {
        return "SUCCESS\nNo locked files\n".to_string();
    }

    let mut body = String::from("SUCCESS\n");
    for line in locked_lines {
        body.push_str(&line);
    }
    body
}
