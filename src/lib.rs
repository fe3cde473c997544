//! Authenticated multi-client file storage server.
//!
//! See [`server`] for the accept loop and per-connection state machine,
//! [`config`] for startup configuration, and [`error`] for the top-level
//! error type surfaced by [`main`](../bin/main.html).

pub mod audit;
pub mod config;
pub mod error;
pub mod locks;
pub mod protocol;
pub mod security;
pub mod server;
pub mod storage;

pub use config::{CliArgs, ServerConfig};
pub use error::ServerError;
pub use server::ServerState;
