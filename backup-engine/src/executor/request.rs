//! Start request for a backup run.

use crate::utils::errors::StartError;
use std::path::PathBuf;

/// What the caller asked for. Consumed by the run it starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupRequest {
    /// Source directories; order only affects display
    pub source_dirs: Vec<String>,

    /// Destination root
    pub destination: String,

    /// Delete destination files that no source has
    pub mirror: bool,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
    pub mirror: bool,
}

impl BackupRequest {
    pub fn new<S: Into<String>>(
        source_dirs: impl IntoIterator<Item = S>,
        destination: impl Into<String>,
        mirror: bool,
    ) -> Self {
        Self {
            source_dirs: source_dirs.into_iter().map(Into::into).collect(),
            destination: destination.into(),
            mirror,
        }
    }

    /// Trim every entry and drop blank sources. Sources that do not exist are
    /// kept; the scan skips them.
    pub fn validate(self) -> Result<ValidatedRequest, StartError> {
        let sources: Vec<PathBuf> = self
            .source_dirs
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        let destination = self.destination.trim();

        if sources.is_empty() || destination.is_empty() {
            return Err(StartError::MissingInput);
        }

        Ok(ValidatedRequest {
            sources,
            destination: PathBuf::from(destination),
            mirror: self.mirror,
        })
    }
}
