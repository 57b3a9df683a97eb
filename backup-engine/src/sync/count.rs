//! Counting pass run before any file is copied.

use super::classify::ChangeClassifier;
use super::source_pairs;
use crate::fs::walker::{scan_files, WalkOptions};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Totals from the counting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkCount {
    /// Every file found in the sources
    pub total_scanned: usize,

    /// Files the copy phase will transfer; the progress denominator
    pub total_needing_copy: usize,
}

impl WorkCount {
    pub fn unchanged(&self) -> usize {
        self.total_scanned - self.total_needing_copy
    }
}

/// Scan every source and classify each file against the destination.
///
/// A file that cannot be classified is counted as needing copy; the copy
/// phase then records it as failed, so the denominator still covers it.
pub fn count_work(
    sources: &[PathBuf],
    destination: &Path,
    classifier: &dyn ChangeClassifier,
    options: &WalkOptions,
) -> WorkCount {
    let mut count = WorkCount::default();

    for pair in source_pairs(sources, destination) {
        for file in scan_files(&pair.source, options) {
            count.total_scanned += 1;

            let dest_file = pair.destination_root.join(&file.relative_path);
            let needs_copy = match classifier.classify(&file.path, &dest_file) {
                Ok(outcome) => outcome.needs_copy(),
                Err(e) => {
                    warn!("Cannot compare {}: {}", file.path.display(), e);
                    true
                }
            };

            if needs_copy {
                count.total_needing_copy += 1;
            }
        }
    }

    info!(
        "Scan complete: {}/{} files need copy ({} unchanged)",
        count.total_needing_copy,
        count.total_scanned,
        count.unchanged()
    );

    count
}
