//! `datafoundation` binary: serves the update and query APIs until Ctrl+C
//!
//! Configuration comes from `DF_*` variables; an optional first argument
//! overrides the data directory.

use df_core::Result;
use df_server::{Server, ServerConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::from_env();
    init_logging(config.as_ref().map_or("info", |config| config.log_level.as_str()));

    let outcome = match config {
        Ok(config) => run(with_data_dir_arg(config)).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("DataFoundation exited with an error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` takes precedence over the configured level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn with_data_dir_arg(mut config: ServerConfig) -> ServerConfig {
    if let Some(dir) = std::env::args_os().nth(1) {
        config.data_dir = PathBuf::from(dir);
    }
    config
}

async fn run(config: ServerConfig) -> Result<()> {
    info!(
        "DataFoundation v{} starting with {} storage",
        Server::version(),
        config.storage
    );

    let server = Server::new(config)?;
    server.start().await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot wait for Ctrl+C, shutting down: {}", e);
    }
    info!("Shutting down");
    server.stop().await
}
