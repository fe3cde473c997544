//! Server configuration.
//!
//! Configuration is resolved once at startup from environment variables,
//! with a small set of CLI flags available for local runs and tests to
//! override the bind address and storage root without touching the
//! environment. Every other tunable is environment-only, mirroring the
//! single `FILE_SERVER_AUTH` variable the protocol has always supported.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Default shared-secret token used when `FILE_SERVER_AUTH` is unset.
pub const DEFAULT_AUTH_TOKEN: &str = "os-core-token";

/// Maximum length, in bytes, of an accepted auth token.
pub const MAX_TOKEN_LEN: usize = 127;

const DEFAULT_PORT: u16 = 8888;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_BLOCK_WINDOW_SECS: u64 = 600;
const DEFAULT_LOCK_TABLE_CAPACITY: usize = 100;
const DEFAULT_TRACKER_CAPACITY: usize = 128;

/// Command-line overrides for local development and integration tests.
///
/// Everything else is environment-only; see [`ServerConfig::from_env`].
#[derive(Debug, Parser)]
#[command(name = "file-vault-server", about = "Authenticated file storage server")]
pub struct CliArgs {
    /// Address and port to bind, e.g. 127.0.0.1:8888. Overrides the default port.
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Root directory for stored files. Overrides `./storage`.
    #[arg(long)]
    pub storage_root: Option<PathBuf>,

    /// Root directory for metadata sidecars. Overrides `./metadata`.
    #[arg(long)]
    pub metadata_root: Option<PathBuf>,

    /// Root directory for audit/security logs. Overrides `./logs`.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

/// Fully resolved server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the acceptor binds to.
    pub bind_addr: SocketAddr,
    /// Root of user-visible stored files.
    pub storage_root: PathBuf,
    /// Root of `.meta` sidecar files.
    pub metadata_root: PathBuf,
    /// Directory holding `audit.log` and `security.log`.
    pub log_dir: PathBuf,
    /// Shared-secret token clients must present via `AUTH`.
    pub auth_token: String,
    /// Hard cap on a single upload's declared size.
    pub max_upload_bytes: u64,
    /// Wall-clock budget for a single upload transfer.
    pub upload_timeout: Duration,
    /// Consecutive auth failures before a peer is blocked.
    pub failure_threshold: u32,
    /// Minimum duration a blocked peer is rejected for.
    pub block_window: Duration,
    /// Maximum number of files that may be locked concurrently.
    pub lock_table_capacity: usize,
    /// Maximum number of distinct peer IPs tracked by the security tracker.
    pub tracker_capacity: usize,
}

impl ServerConfig {
    /// Resolves configuration from the process environment, applying `args`
    /// as overrides for the fields they cover.
    pub fn from_env(args: &CliArgs) -> Self {
        let auth_token = std::env::var("FILE_SERVER_AUTH")
            .ok()
            .filter(|v| v.len() < MAX_TOKEN_LEN)
            .unwrap_or_else(|| DEFAULT_AUTH_TOKEN.to_string());

        let bind_addr = args.bind.unwrap_or_else(|| {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
        });

        Self {
            bind_addr,
            storage_root: args
                .storage_root
                .clone()
                .unwrap_or_else(|| PathBuf::from("./storage")),
            metadata_root: args
                .metadata_root
                .clone()
                .unwrap_or_else(|| PathBuf::from("./metadata")),
            log_dir: args.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs")),
            auth_token,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            block_window: Duration::from_secs(DEFAULT_BLOCK_WINDOW_SECS),
            lock_table_capacity: DEFAULT_LOCK_TABLE_CAPACITY,
            tracker_capacity: DEFAULT_TRACKER_CAPACITY,
        }
    }

    /// Path to the audit log file.
    pub fn audit_log_path(&self) -> PathBuf {
        self.log_dir.join("audit.log")
    }

    /// Path to the security log file.
    pub fn security_log_path(&self) -> PathBuf {
        self.log_dir.join("security.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_env_and_args_absent() {
        // SAFETY: test runs single-threaded within this process's env mutation.
        unsafe { std::env::remove_var("FILE_SERVER_AUTH") };
        let args = CliArgs {
            bind: None,
            storage_root: None,
            metadata_root: None,
            log_dir: None,
        };
        let cfg = ServerConfig::from_env(&args);
        assert_eq!(cfg.auth_token, DEFAULT_AUTH_TOKEN);
        assert_eq!(cfg.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn overlong_env_token_falls_back_to_default() {
        let long = "x".repeat(200);
        unsafe { std::env::set_var("FILE_SERVER_AUTH", &long) };
        let args = CliArgs {
            bind: None,
            storage_root: None,
            metadata_root: None,
            log_dir: None,
        };
        let cfg = ServerConfig::from_env(&args);
        assert_eq!(cfg.auth_token, DEFAULT_AUTH_TOKEN);
        unsafe { std::env::remove_var("FILE_SERVER_AUTH") };
    }
}
