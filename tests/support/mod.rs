//! Shared harness for driving the server end-to-end over real loopback
//! sockets.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use file_vault_server::server::acceptor;
use file_vault_server::{ServerConfig, ServerState};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

pub const TEST_TOKEN: &str = "test-shared-secret";

/// A running server instance bound to an ephemeral port, with its own
/// scratch storage/metadata/log directories.
pub struct TestServer {
    pub addr: SocketAddr,
    _tmp: TempDir,
}

/// Starts a server with default tunables and [`TEST_TOKEN`] as the shared
/// secret.
pub async fn spawn() -> TestServer {
    spawn_with(|_| {}).await
}

/// Starts a server, letting the caller override any [`ServerConfig`] field
/// (e.g. a short `upload_timeout` for the timeout test).
pub async fn spawn_with(configure: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let tmp = TempDir::new().unwrap();
    let storage_root = tmp.path().join("storage");
    let metadata_root = tmp.path().join("metadata");
    let log_dir = tmp.path().join("logs");
    std::fs::create_dir_all(&storage_root).unwrap();
    std::fs::create_dir_all(&metadata_root).unwrap();
    std::fs::create_dir_all(&log_dir).unwrap();

    let mut config = ServerConfig {
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        storage_root,
        metadata_root,
        log_dir,
        auth_token: TEST_TOKEN.to_string(),
        max_upload_bytes: 100 * 1024 * 1024,
        upload_timeout: Duration::from_secs(300),
        failure_threshold: 3,
        block_window: Duration::from_secs(600),
        lock_table_capacity: 100,
        tracker_capacity: 128,
    };
    configure(&mut config);

    let listener = acceptor::bind(config.bind_addr).expect("bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(ServerState::new(config));
    tokio::spawn(acceptor::serve(listener, state));

    TestServer { addr, _tmp: tmp }
}

impl TestServer {
    pub async fn connect(&self) -> BufReader<TcpStream> {
        BufReader::new(TcpStream::connect(self.addr).await.unwrap())
    }
}

/// Writes `line` followed by `\n`.
pub async fn send_line(stream: &mut BufReader<TcpStream>, line: &str) {
    stream.write_all(format!("{line}\n").as_bytes()).await.unwrap();
}

/// Reads one `\n`-terminated line, with the trailing newline stripped.
pub async fn read_line(stream: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    stream.read_line(&mut line).await.unwrap();
    line.trim_end().to_string()
}

/// Reads exactly `n` raw bytes.
pub async fn read_exact_bytes(stream: &mut BufReader<TcpStream>, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    stream.read_exact(&mut buf).await.unwrap();
    buf
}

/// Authenticates with [`TEST_TOKEN`] and asserts the server accepted it.
pub async fn authenticate(stream: &mut BufReader<TcpStream>) {
    send_line(stream, &format!("AUTH {TEST_TOKEN}")).await;
}
