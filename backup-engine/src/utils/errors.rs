//! Custom error types for the backup engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run in the Error state.
///
/// Per-file copy and delete failures never become an `EngineError`; they are
/// counted in the progress snapshot and logged instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Destination is not a directory: {}", path.display())]
    DestinationNotDirectory { path: PathBuf },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup cancelled by user")]
    Cancelled,

    #[error("Backup worker failed: {0}")]
    Worker(String),
}

/// Reasons a start request is turned down. No state is mutated when these are returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("Missing source or destination")]
    MissingInput,

    #[error("Backup already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, EngineError>;
