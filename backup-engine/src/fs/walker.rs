//! Directory traversal for the scan, count and mirror phases.
//!
//! The counting and copy phases walk trees through [`scan_files`], so both see
//! the same set of files. Mirror cleanup uses [`build_file_index`], which also
//! lists broken symlinks so stale links can be removed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Descend into symlinked directories. Off by default, which also
    /// keeps link cycles out of the walk.
    pub follow_links: bool,

    /// File-name substrings to skip. An excluded directory is skipped with
    /// its whole subtree.
    pub exclude_patterns: Vec<String>,
}

/// A regular file found under a scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Full path to the file
    pub path: PathBuf,

    /// Path relative to the scan root; the key shared with the mirrored copy
    pub relative_path: PathBuf,
}

impl ScannedFile {
    /// Build from a walk entry. Symlinks to regular files count as files and
    /// symlinks to directories are dropped. Broken links are kept only when
    /// `keep_dangling` is set.
    fn from_entry(entry: &DirEntry, root: &Path, keep_dangling: bool) -> Option<Self> {
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(resolved) if resolved.is_file() => {}
                Ok(_) => return None,
                Err(_) if keep_dangling => {}
                Err(e) => {
                    debug!("Skipping broken symlink {}: {}", entry.path().display(), e);
                    return None;
                }
            }
        } else if !file_type.is_file() {
            return None;
        }

        let relative_path = entry.path().strip_prefix(root).ok()?.to_path_buf();

        Some(Self {
            path: entry.path().to_path_buf(),
            relative_path,
        })
    }
}

/// Lazily enumerate every regular file under `root`.
///
/// A root that is missing or is not a directory yields nothing. Entries are
/// visited in file-name order so repeated scans of an unchanged tree agree.
/// Unreadable entries are logged and skipped.
pub fn scan_files<'a>(
    root: &'a Path,
    options: &'a WalkOptions,
) -> impl Iterator<Item = ScannedFile> + 'a {
    walk(root, options, false)
}

fn walk<'a>(
    root: &'a Path,
    options: &'a WalkOptions,
    keep_dangling: bool,
) -> impl Iterator<Item = ScannedFile> + 'a {
    let walker = root.is_dir().then(|| {
        WalkDir::new(root)
            .follow_links(options.follow_links)
            .sort_by_file_name()
    });

    walker
        .into_iter()
        .flat_map(move |walker| {
            walker
                .into_iter()
                .filter_entry(move |entry| !should_exclude(entry, &options.exclude_patterns))
        })
        .filter_map(move |entry| match entry {
            Ok(entry) => ScannedFile::from_entry(&entry, root, keep_dangling),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
}

/// Collect the relative paths of every file under `root`, broken symlinks
/// included.
pub fn build_file_index(root: &Path, options: &WalkOptions) -> HashSet<PathBuf> {
    walk(root, options, true)
        .map(|file| file.relative_path)
        .collect()
}

/// Check if a directory entry should be excluded based on patterns.
/// The root itself is never excluded.
fn should_exclude(entry: &DirEntry, patterns: &[String]) -> bool {
    if entry.depth() == 0 || patterns.is_empty() {
        return false;
    }

    let file_name = entry.file_name().to_string_lossy();
    patterns.iter().any(|pattern| file_name.contains(pattern.as_str()))
}
