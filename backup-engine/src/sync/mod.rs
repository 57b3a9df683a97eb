//! Change detection, work counting and mirror cleanup.
//!
//! Every source directory `S` is mirrored under `<destination>/<basename(S)>`.

pub mod classify;
pub mod count;
pub mod mirror;

use std::path::{Path, PathBuf};
use tracing::warn;

/// A usable source directory and the destination root it mirrors into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePair {
    pub source: PathBuf,
    pub destination_root: PathBuf,
}

/// `<destination>/<basename(source)>`. Paths such as `.` are resolved first;
/// a source with no name at all (a filesystem root) has no destination root.
pub fn destination_root_for(source: &Path, destination: &Path) -> Option<PathBuf> {
    let name = match source.file_name() {
        Some(name) => name.to_os_string(),
        None => std::fs::canonicalize(source).ok()?.file_name()?.to_os_string(),
    };
    Some(destination.join(name))
}

/// Pair every source that currently names a directory with its destination
/// root. Anything else is skipped silently, matching the scanner's contract.
pub fn source_pairs(sources: &[PathBuf], destination: &Path) -> Vec<SourcePair> {
    sources
        .iter()
        .filter(|source| source.is_dir())
        .filter_map(|source| match destination_root_for(source, destination) {
            Some(destination_root) => Some(SourcePair {
                source: source.clone(),
                destination_root,
            }),
            None => {
                warn!("Skipping source without a directory name: {}", source.display());
                None
            }
        })
        .collect()
}
