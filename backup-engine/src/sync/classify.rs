//! Change detection between a source file and its mirrored counterpart.
//!
//! The default policy compares size and modification time only, the same
//! heuristic rsync uses without `--checksum`. A same-size edit whose mtime is
//! equal to or older than the destination's is not detected; that is an
//! accepted false negative, hashing every file would change the cost of a run.

use serde::Serialize;
use std::io;
use std::path::Path;

/// Result of comparing a source file against its destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileComparisonOutcome {
    MissingAtDestination,
    SizeMismatch,
    SourceNewer,
    UpToDate,
}

impl FileComparisonOutcome {
    /// Only `UpToDate` skips the copy.
    pub fn needs_copy(self) -> bool {
        !matches!(self, FileComparisonOutcome::UpToDate)
    }
}

/// Strategy deciding whether a file must be copied.
pub trait ChangeClassifier: Send + Sync {
    fn classify(&self, source: &Path, destination: &Path) -> io::Result<FileComparisonOutcome>;
}

/// Size + mtime policy: missing, then size, then strictly-newer source mtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeMtimeClassifier;

impl ChangeClassifier for SizeMtimeClassifier {
    fn classify(&self, source: &Path, destination: &Path) -> io::Result<FileComparisonOutcome> {
        let dest_meta = match std::fs::metadata(destination) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(FileComparisonOutcome::MissingAtDestination);
            }
            Err(e) => return Err(e),
        };
        let src_meta = std::fs::metadata(source)?;

        if src_meta.len() != dest_meta.len() {
            return Ok(FileComparisonOutcome::SizeMismatch);
        }

        if src_meta.modified()? > dest_meta.modified()? {
            return Ok(FileComparisonOutcome::SourceNewer);
        }

        Ok(FileComparisonOutcome::UpToDate)
    }
}
