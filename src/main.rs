use std::sync::Arc;

use clap::Parser;
use file_vault_server::{CliArgs, ServerConfig, ServerError, ServerState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();
    let config = ServerConfig::from_env(&args);

    for dir in [&config.storage_root, &config.metadata_root, &config.log_dir] {
        create_dir(dir)?;
    }

    let state = Arc::new(ServerState::new(config));
    file_vault_server::server::run(state).await
}

fn create_dir(path: &std::path::Path) -> Result<(), ServerError> {
    std::fs::create_dir_all(path).map_err(|source| ServerError::DirectoryCreate {
        path: path.to_path_buf(),
        source,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|source| {
            ServerError::DirectoryCreate {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }

    Ok(())
}
