//! TCP accept loop (§4.8 C11, §5, §6).
//!
//! One detached `tokio::task` per accepted connection; the acceptor itself
//! never blocks on a handler's work and never retains a join handle
//! (grounded on the spawn-per-connection pattern used for the WebDAV
//! server's accept loop elsewhere in this workspace's dependency stack).

use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::ServerError;
use crate::server::connection;
use crate::server::state::ServerState;

/// Listen backlog depth (§6).
const LISTEN_BACKLOG: i32 = 5;

/// Binds `state.config.bind_addr` and runs the accept loop forever. Returns
/// only if the bind itself fails; individual accept errors are logged and
/// the loop continues.
pub async fn run(state: Arc<ServerState>) -> Result<(), ServerError> {
    let addr = state.config.bind_addr;
    let listener = bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "file vault server listening");
    serve(listener, state).await;
    Ok(())
}

/// Binds `addr` with `SO_REUSEADDR` and the configured listen backlog,
/// without starting the accept loop. Exposed so tests can bind an ephemeral
/// port (`addr` with port 0) and discover the real address before serving.
pub fn bind(addr: std::net::SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    TcpListener::from_std(socket.into())
}

/// Runs the accept loop against an already-bound listener. Never returns
/// under normal operation.
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                error!(error = %err, "failed to accept connection");
                continue;
            }
        };

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            connection::handle(stream, peer, state).await;
        });
    }
}
