//! `UPLOAD <name> <size>` (§4.9).

use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{info, warn};

use crate::audit::SecurityEventKind;
use crate::locks::AcquireResult;
use crate::protocol::response::Response;
use crate::storage::{digest_file, validate_name};

use super::{OperationContext, OperationError};

const CHUNK_SIZE: usize = 4096;

/// Drives the full UPLOAD exchange, including the `READY`/`SUCCESS`/`ERROR`
/// lines and the bounded payload transfer. Writes the final response itself;
/// the caller does not write anything further for this command.
pub async fn handle(
    ctx: &OperationContext,
    name: String,
    size: u64,
    reader: &mut (impl AsyncRead + Unpin),
    writer: &mut OwnedWriteHalf,
) {
    if size == 0 || size > ctx.state.config.max_upload_bytes {
        reject(ctx, &name, OperationError::InvalidFileSize, writer).await;
        return;
    }

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

    if let Some(parent) = storage_path.parent() {
        if validated.user.is_some() && !parent.exists() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                warn!(error = %err, path = %parent.display(), "failed to create user directory");
                reject(ctx, &name, OperationError::CannotCreateUserDirectory, writer).await;
                return;
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = tokio::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
                    .await;
            }
        }
    }

    if ctx.state.lock_table.try_acquire(validated.as_str()) == AcquireResult::Busy {
        reject(ctx, &name, OperationError::FileLocked, writer).await;
        return;
    }

    let result = transfer(ctx, size, &storage_path, reader, writer).await;
    ctx.state.lock_table.release(validated.as_str());

    match result {
        Ok(()) => {
            let digest = match digest_file(&storage_path).await {
                Ok(d) => d,
                Err(err) => {
                    warn!(error = %err, "failed to compute digest of uploaded file");
                    "HASH_ERROR".to_string()
                }
            };
            ctx.state
                .metadata
                .put(&ctx.state.config.metadata_root, &validated, size, &digest)
                .await;

            send(writer, Response::success("File uploaded successfully")).await;
            ctx.state
                .audit
                .record_operation("UPLOAD", &name, true, &format!("Size: {size} bytes"))
                .await;
            info!(file = %name, size, "upload complete");
        }
        Err(err) => {
            let _ = tokio::fs::remove_file(&storage_path).await;
            reject(ctx, &name, err, writer).await;
        }
    }
}

async fn transfer(
    ctx: &OperationContext,
    size: u64,
    storage_path: &std::path::Path,
    reader: &mut (impl AsyncRead + Unpin),
    writer: &mut OwnedWriteHalf,
) -> Result<(), OperationError> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(storage_path)
        .await
        .map_err(|err| {
            warn!(error = %err, "failed to create upload target");
            OperationError::CannotCreateFile
        })?;

    send(writer, Response::ready("Send file data")).await;

    let deadline = Instant::now() + ctx.state.config.upload_timeout;
    let mut remaining = size;
    let mut buf = vec![0u8; CHUNK_SIZE];

    while remaining > 0 {
        let Some(budget) = deadline.checked_duration_since(Instant::now()) else {
            return Err(OperationError::UploadTimeout);
        };

        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = match tokio::time::timeout(budget, reader.read(&mut buf[..want])).await {
            Err(_) => return Err(OperationError::UploadTimeout),
            Ok(Ok(0)) => return Err(OperationError::TransferInterrupted),
            Ok(Ok(n)) => n,
            Ok(Err(err)) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Ok(Err(_)) => return Err(OperationError::TransferInterrupted),
        };

        if file.write_all(&buf[..n]).await.is_err() {
            return Err(OperationError::WriteError);
        }
        remaining -= n as u64;
    }

    file.flush().await.map_err(|_| OperationError::WriteError)?;
    Ok(())
}

async fn reject(ctx: &OperationContext, name: &str, err: OperationError, writer: &mut OwnedWriteHalf) {
    ctx.state
        .audit
        .record_operation("UPLOAD", name, false, &err.to_string())
        .await;
    send(writer, err.into_response()).await;
}

async fn send(writer: &mut OwnedWriteHalf, response: Response) {
    if let Err(err) = writer.write_all(response.into_line().as_bytes()).await {
        warn!(error = %err, "failed to write response");
    }
}
