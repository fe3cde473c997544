//! Top-level error taxonomy.
//!
//! Startup and configuration failures are fatal and bubble up to `main` as
//! [`ServerError`]. Per-connection failures never reach this type — they are
//! mapped to a client-visible message by [`crate::server::operations::OperationError`]
//! and logged, never propagated out of the connection task.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can prevent the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: SocketAddr,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create one of the server's required directories.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
}
