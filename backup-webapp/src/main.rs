//! Backup web app - Main entry point
//!
//! Serves the start / cancel / progress endpoints of the backup engine.

mod config;
mod error;
mod routes;
mod state;
mod ws;

use crate::config::AppConfig;
use crate::state::AppState;
use anyhow::Result;
use backup_engine::utils::logger::{self, LogTarget};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Delete destination files missing from the sources when a request does not say
    #[arg(long)]
    mirror: bool,
}

impl Args {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if self.mirror {
            config.backup.default_mirror = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;

    let target = match config.log.output.as_str() {
        "file" => LogTarget::File(&config.log.file),
        _ => LogTarget::Stdout,
    };
    logger::init(&config.log.level, target)?;

    tracing::info!(
        "Starting backup-webapp v{} (default mode: {})",
        env!("CARGO_PKG_VERSION"),
        if config.backup.default_mirror { "mirror" } else { "incremental" }
    );

    let addr = config.listen_addr();
    let state = Arc::new(AppState::new(config));
    let app = routes::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Progress endpoint: http://{}/progress", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let progress = state.engine.progress();
    if progress.status.is_active() {
        tracing::warn!(
            "Waiting for the {:?} backup to finish ({}/{} files copied)",
            progress.status,
            progress.copied_files,
            progress.total_files
        );
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["backup-webapp", "--port", "9000", "--log-level", "debug", "--mirror"]);
        let config = args.load_config().unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.log.level, "debug");
        assert!(config.backup.default_mirror);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::parse_from(["backup-webapp", "--config", "/nonexistent/backup.toml"]);
        assert!(args.load_config().is_err());
    }
}
