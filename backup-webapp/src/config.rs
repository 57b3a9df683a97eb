//! Configuration for the backup web app.
//!
//! Loaded from a TOML file; every field has a default so a missing section
//! or an empty file is valid. Command-line flags override the file.

use backup_engine::{EngineOptions, WalkOptions};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backup: BackupConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: IpAddr,

    /// HTTP port
    pub port: u16,

    /// Directory served for any route the API does not handle
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Mirror mode when a start request does not say
    pub default_mirror: bool,

    /// Log the name of every copied file
    pub log_file_names: bool,

    /// File-name substrings skipped in sources and destinations
    pub exclude_patterns: Vec<String>,

    /// Descend into symlinked directories
    pub follow_links: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log output (stdout, file)
    pub output: String,

    /// Log file used when output is "file"
    pub file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            static_dir: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: "stdout".to_string(),
            file: PathBuf::from("backup-webapp.log"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind, self.server.port)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            walk: WalkOptions {
                follow_links: self.backup.follow_links,
                exclude_patterns: self.backup.exclude_patterns.clone(),
            },
            log_file_names: self.backup.log_file_names,
        }
    }
}
