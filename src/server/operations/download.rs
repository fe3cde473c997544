//! `DOWNLOAD <name>` (§4.10).

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{info, warn};

use crate::audit::SecurityEventKind;
use crate::locks::LockedFile;
use crate::protocol::response::Response;
use crate::storage::{digest_file, validate_name};

use super::{OperationContext, OperationError};

const CHUNK_SIZE: usize = 4096;

/// Drives the full DOWNLOAD exchange: integrity check, then `SUCCESS <n>`
/// followed immediately by `n` raw payload bytes, or a single `ERROR` line
/// with no payload. Writes every response itself.
pub async fn handle(ctx: &OperationContext, name: String, writer: &mut OwnedWriteHalf) {
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
            reject(ctx, &name, OperationError::InvalidFilename, writer).await;
            return;
        }
    };

    let storage_path = validated.resolve(&ctx.state.config.storage_root);

    let file_len = match tokio::fs::metadata(&storage_path).await {
        Ok(meta) => meta.len(),
        Err(_) => {
            reject(ctx, &name, OperationError::FileNotFound, writer).await;
            return;
        }
    };

    let locked = match LockedFile::open_shared(&storage_path) {
        Ok(Some(locked)) => locked,
        Ok(None) => {
            reject(ctx, &name, OperationError::FileLockedForWriting, writer).await;
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to open file for download");
            reject(ctx, &name, OperationError::CannotOpenFile, writer).await;
            return;
        }
    };

    if let Some(recorded) = ctx
        .state
        .metadata
        .get_digest(&ctx.state.config.metadata_root, &validated)
        .await
    {
        match digest_file(&storage_path).await {
            Ok(live) if live == recorded => {}
            _ => {
                drop(locked);
                ctx.state
                    .audit
                    .record_security_event(
                        SecurityEventKind::IntegrityFail,
                        &ctx.peer_ip(),
                        &name,
                        "Stored digest disagrees with recorded digest",
                    )
                    .await;
                reject(ctx, &name, OperationError::IntegrityCheckFailed, writer).await;
                return;
            }
        }
    }

    send(writer, Response::download_ready(file_len)).await;

    let mut std_file = locked.into_std();
    let result = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
        use std::io::Read;
        let mut buf = Vec::with_capacity(std_file.metadata().map(|m| m.len() as usize).unwrap_or(0));
        std_file.read_to_end(&mut buf)?;
        Ok(buf)
    })
    .await;

    let bytes = match result {
        Ok(Ok(bytes)) => bytes,
        _ => {
            warn!("failed to read file for download streaming");
            ctx.state
                .audit
                .record_operation("DOWNLOAD", &name, false, "Cannot open file")
                .await;
            return;
        }
    };

    for chunk in bytes.chunks(CHUNK_SIZE) {
        if writer.write_all(chunk).await.is_err() {
            warn!("client disconnected mid-download");
            return;
        }
    }

    ctx.state
        .audit
        .record_operation("DOWNLOAD", &name, true, &format!("Bytes sent: {file_len}"))
        .await;
    info!(file = %name, bytes = file_len, "download complete");
}

async fn reject(ctx: &OperationContext, name: &str, err: OperationError, writer: &mut OwnedWriteHalf) {
    ctx.state
        .audit
        .record_operation("DOWNLOAD", name, false, &err.to_string())
        .await;
    send(writer, err.into_response()).await;
}

async fn send(writer: &mut OwnedWriteHalf, response: Response) {
    if let Err(err) = writer.write_all(response.into_line().as_bytes()).await {
        warn!(error = %err, "failed to write response");
    }
}
