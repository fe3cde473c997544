//! `DELETE <name>` (§4.11).
//!
//! Relies solely on the fd-level exclusive lock, never consulting the
//! global lock table — preserved from the source, including the resulting
//! race window against a concurrent UPLOAD of the same name.

use crate::audit::SecurityEventKind;
use crate::locks::LockedFile;
use crate::protocol::response::Response;
use crate::storage::validate_name;
use tracing::{info, warn};

use super::{OperationContext, OperationError};

/// Validates, stat-checks, exclusive-locks, and unlinks `name`.
pub async fn handle(ctx: &OperationContext, name: String) -> Response {
    let validated = match validate_name(&name) {
        Ok(v) => v,
        Err(_) => {
            ctx.state
                .audit
                .record_security_event(
                    SecurityEventKind::AccessViolation,
                    &ctx.peer_ip(),
                    &name,
                    "Rejected by path validator",
                )
                .await;
            return reject(ctx, &name, OperationError::InvalidFilename).await;
        }
    };

    let storage_path = validated.resolve(&ctx.state.config.storage_root);

    if tokio::fs::metadata(&storage_path).await.is_err() {
        return reject(ctx, &name, OperationError::FileNotFound).await;
    }

    let locked = match LockedFile::open_exclusive(&storage_path) {
        Ok(Some(locked)) => locked,
        Ok(None) => return reject(ctx, &name, OperationError::FileInUse).await,
        Err(err) => {
            warn!(error = %err, "failed to open file for delete");
            return reject(ctx, &name, OperationError::CannotOpenFile).await;
        }
    };

    drop(locked);
    if tokio::fs::remove_file(&storage_path).await.is_err() {
        return reject(ctx, &name, OperationError::DeleteFailed).await;
    }
    let _ = tokio::fs::remove_file(validated.resolve_meta(&ctx.state.config.metadata_root)).await;

    ctx.state
        .audit
        .record_operation("DELETE", &name, true, "File deleted")
        .await;
    info!(file = %name, "delete complete");
    Response::success("File deleted successfully")
}

async fn reject(ctx: &OperationContext, name: &str, err: OperationError) -> Response {
    ctx.state
        .audit
        .record_operation("DELETE", name, false, &err.to_string())
        .await;
    err.into_response()
}
