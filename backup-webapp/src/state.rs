use crate::config::AppConfig;
use backup_engine::BackupEngine;
use std::time::Instant;

pub struct AppState {
    pub engine: BackupEngine,
    pub config: AppConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            engine: BackupEngine::new(config.engine_options()),
            config,
            started_at: Instant::now(),
        }
    }
}
