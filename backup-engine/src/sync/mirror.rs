//! Mirror-mode cleanup: delete destination files that no source has.

use super::{source_pairs, SourcePair};
use crate::fs::walker::{build_file_index, WalkOptions};
use crate::transfer::progress::RunProgress;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Outcome of the cleanup phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub removed: usize,
    pub failed: usize,
}

/// Group sources by the destination root they mirror into. Two sources with
/// the same basename share a root, and its source set is their union.
fn group_by_destination(pairs: Vec<SourcePair>) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut groups: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for pair in pairs {
        groups.entry(pair.destination_root).or_default().push(pair.source);
    }
    groups
}

/// Delete every file under a destination root whose relative path is not
/// present in any source mirrored into that root.
///
/// Roots that do not exist yet are skipped. Failed deletions are logged and
/// do not stop the phase. Directories left empty are kept.
pub fn mirror_cleanup(
    sources: &[PathBuf],
    destination: &Path,
    options: &WalkOptions,
    progress: &RunProgress,
    cancel: &CancellationToken,
) -> MirrorReport {
    let mut report = MirrorReport::default();

    for (destination_root, group) in group_by_destination(source_pairs(sources, destination)) {
        if !destination_root.is_dir() {
            continue;
        }

        let mut source_set = HashSet::new();
        for source in &group {
            source_set.extend(build_file_index(source, options));
        }
        let destination_set = build_file_index(&destination_root, options);

        let mut extras: Vec<_> = destination_set.difference(&source_set).collect();
        extras.sort();

        for relative in extras {
            if cancel.is_cancelled() {
                return report;
            }

            let path = destination_root.join(relative);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    report.removed += 1;
                    progress.record_removed();
                    info!("Removed (mirror): {}", path.display());
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed removing {}: {}", path.display(), e);
                }
            }
        }
    }

    report
}
