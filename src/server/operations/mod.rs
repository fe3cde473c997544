//! Operation handlers (§4.9–§4.14) and the client-visible error catalogue
//! (§7) they all map into.

pub mod delete;
pub mod download;
pub mod list;
pub mod locks;
pub mod logs;
pub mod upload;

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::protocol::response::Response;
use crate::server::state::ServerState;

/// The fixed catalogue of client-visible failure messages (§7). No other
/// text is ever sent in an `ERROR` response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("Invalid filename")]
    InvalidFilename,
    #[error("Invalid file size")]
    InvalidFileSize,
    #[error("File is locked by another process")]
    FileLocked,
    #[error("File is locked for writing")]
    FileLockedForWriting,
    #[error("File is currently in use")]
    FileInUse,
    #[error("Cannot create file")]
    CannotCreateFile,
    #[error("Cannot create user directory")]
    CannotCreateUserDirectory,
    #[error("Cannot open file")]
    CannotOpenFile,
    #[error("File not found")]
    FileNotFound,
    #[error("Upload timeout")]
    UploadTimeout,
    #[error("Transfer interrupted")]
    TransferInterrupted,
    #[error("Write error")]
    WriteError,
    #[error("Integrity check failed")]
    IntegrityCheckFailed,
    #[error("Delete failed")]
    DeleteFailed,
    #[error("Cannot open storage directory")]
    CannotOpenStorageDirectory,
}

impl OperationError {
    /// Renders as the `ERROR <message>` response sent to the client.
    pub fn into_response(self) -> Response {
        Response::error(self.to_string())
    }
}

/// Shared context every operation handler dispatches with.
#[derive(Clone)]
pub struct OperationContext {
    /// Process-wide shared state.
    pub state: Arc<ServerState>,
    /// The authenticated peer's address.
    pub peer: SocketAddr,
}

impl OperationContext {
    /// The peer's bare IP, as recorded in audit/security log lines.
    pub fn peer_ip(&self) -> String {
        self.peer.ip().to_string()
    }
}
