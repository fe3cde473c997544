//! Per-connection state machine (§4.8).
//!
//! `NEW → AUTHENTICATING → AWAITING_COMMAND → DISPATCHING → TERMINATED`.
//! Every connection serves exactly one command before closing; at most two
//! line reads are ever performed (the `AUTH` line, then the command line).

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{info, info_span, warn, Instrument};

use crate::audit::SecurityEventKind;
use crate::protocol::request::{parse_auth, parse_command, AuthParseError, Command, CommandParseError};
use crate::protocol::response::Response;
use crate::security::tokens_match;
use crate::server::operations::{self, OperationContext};
use crate::server::state::ServerState;

/// Drives one connection end to end. Never panics; every error path closes
/// the socket cleanly after writing one `ERROR` response.
pub async fn handle(stream: TcpStream, peer: SocketAddr, state: Arc<ServerState>) {
    let connection_id = state.next_connection_id();
    let span = info_span!("connection", peer = %peer, connection_id);

    async {
        if let Err(err) = stream.set_nodelay(true) {
            warn!(error = %err, "failed to set TCP_NODELAY");
        }

        if state.tracker.is_blocked(peer.ip()).await {
            state
                .audit
                .record_security_event(
                    SecurityEventKind::BlockedClient,
                    &peer.ip().to_string(),
                    "N/A",
                    "Connection rejected: peer is blocked",
                )
                .await;
            let (_, mut write_half) = stream.into_split();
            let _ = write_half
                .write_all(Response::error("Client blocked due to repeated failures").into_line().as_bytes())
                .await;
            return;
        }

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut auth_line = String::new();
        if read_line(&mut reader, &mut auth_line).await.is_none() {
            return;
        }

        let token = match parse_auth(auth_line.trim_end()) {
            Ok(auth) => auth.token.to_string(),
            Err(AuthParseError::Missing) => {
                reject_auth(&state, peer, &mut write_half, "Auth required").await;
                return;
            }
            Err(AuthParseError::Malformed) => {
                reject_auth(&state, peer, &mut write_half, "Invalid AUTH format").await;
                return;
            }
        };

        if !tokens_match(&token, &state.config.auth_token) {
            reject_auth(&state, peer, &mut write_half, "Unauthorized client").await;
            return;
        }
        state.tracker.record_success(peer.ip()).await;

        let mut command_line = String::new();
        if read_line(&mut reader, &mut command_line).await.is_none() {
            return;
        }

        let command = match parse_command(command_line.trim_end()) {
            Ok(command) => command,
            Err(CommandParseError::Unknown) => {
                state
                    .audit
                    .record_security_event(
                        SecurityEventKind::AccessViolation,
                        &peer.ip().to_string(),
                        "N/A",
                        "Unknown command",
                    )
                    .await;
                let _ = write_half
                    .write_all(Response::error("Unknown command").into_line().as_bytes())
                    .await;
                return;
            }
            Err(CommandParseError::InvalidFormat { verb }) => {
                let _ = write_half
                    .write_all(
                        Response::error(format!("Invalid {verb} command format"))
                            .into_line()
                            .as_bytes(),
                    )
                    .await;
                return;
            }
        };

        let ctx = OperationContext { state: Arc::clone(&state), peer };
        dispatch(&ctx, command, &mut reader, &mut write_half).await;
    }
    .instrument(span)
    .await;
}

async fn dispatch(
    ctx: &OperationContext,
    command: Command,
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
) {
    let verb = command.verb();
    let op_span = info_span!("operation", verb);

    async move {
        match command {
            Command::Upload { name, size } => {
                operations::upload::handle(ctx, name, size, reader, writer).await;
            }
            Command::Download { name } => {
                operations::download::handle(ctx, name, writer).await;
            }
            Command::List { user } => {
                let body = operations::list::handle(ctx, user).await;
                let _ = writer.write_all(body.as_bytes()).await;
            }
            Command::Delete { name } => {
                let response = operations::delete::handle(ctx, name).await;
                let _ = writer.write_all(response.into_line().as_bytes()).await;
            }
            Command::Locks => {
                let body = operations::locks::handle(ctx).await;
                let _ = writer.write_all(body.as_bytes()).await;
            }
            Command::Logs => {
                let body = operations::logs::handle(ctx).await;
                let _ = writer.write_all(body.as_bytes()).await;
            }
        }
        info!("operation dispatched");
    }
    .instrument(op_span)
    .await;
}

/// Reads one `\n`-terminated line. Returns `None` on EOF or I/O error,
/// which the caller treats as an immediate, silent connection close.
async fn read_line(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    buf: &mut String,
) -> Option<()> {
    match reader.read_line(buf).await {
        Ok(0) => None,
        Ok(_) => Some(()),
        Err(err) => {
            warn!(error = %err, "failed to read from socket");
            None
        }
    }
}

async fn reject_auth(
    state: &Arc<ServerState>,
    peer: SocketAddr,
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    message: &str,
) {
    state.tracker.record_failure(peer.ip()).await;
    state
        .audit
        .record_security_event(
            SecurityEventKind::AuthFailure,
            &peer.ip().to_string(),
            "N/A",
            message,
        )
        .await;
    let _ = writer.write_all(Response::error(message).into_line().as_bytes()).await;
}
