//! Backup run executor - drives one run from counting to its terminal state.
//!
//! A run is: counting pass → copy phase → optional mirror cleanup. Per-file
//! failures are counted and logged; only directory-level failures and
//! cancellation end the run in the Error state.

pub mod request;

use crate::fs::copy::{copy_file_atomic, ensure_dir};
use crate::fs::walker::{scan_files, WalkOptions};
use crate::sync::classify::ChangeClassifier;
use crate::sync::count::{count_work, WorkCount};
use crate::sync::mirror::{mirror_cleanup, MirrorReport};
use crate::sync::source_pairs;
use crate::transfer::progress::{format_duration, ProgressTracker, RunProgress};
use crate::utils::errors::{EngineError, Result};
use request::ValidatedRequest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Engine-wide settings shared by every run.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub walk: WalkOptions,

    /// Log every copied file at info level
    pub log_file_names: bool,
}

/// Per-file tallies of the copy phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyResult {
    pub copied: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Backup execution result
#[derive(Debug, Clone)]
pub struct RunReport {
    pub count: WorkCount,
    pub copy: CopyResult,

    /// `None` when mirror mode was off
    pub mirror: Option<MirrorReport>,

    pub duration: Duration,
}

fn directory_error(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::DirectoryCreation {
        path: path.to_path_buf(),
        source,
    }
}

/// Copies every file the classifier flags into its mirrored location.
pub struct CopyExecutor<'a> {
    classifier: &'a dyn ChangeClassifier,
    options: &'a EngineOptions,
    cancel: &'a CancellationToken,
}

impl<'a> CopyExecutor<'a> {
    pub fn new(
        classifier: &'a dyn ChangeClassifier,
        options: &'a EngineOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            classifier,
            options,
            cancel,
        }
    }

    /// Copy new and changed files of every valid source, publishing progress
    /// after each file.
    pub fn run(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        progress: &RunProgress,
    ) -> Result<CopyResult> {
        let mut result = CopyResult::default();

        for pair in source_pairs(sources, destination) {
            ensure_dir(&pair.destination_root)
                .map_err(|e| directory_error(&pair.destination_root, e))?;

            for file in scan_files(&pair.source, &self.options.walk) {
                if self.cancel.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }

                let dest_file = pair.destination_root.join(&file.relative_path);

                match self.classifier.classify(&file.path, &dest_file) {
                    Ok(outcome) if !outcome.needs_copy() => {
                        result.skipped += 1;
                        progress.record_skipped();
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        result.failed += 1;
                        progress.record_failed();
                        error!("Copy failed: {} | {}", file.path.display(), e);
                        continue;
                    }
                }

                if let Some(parent) = dest_file.parent() {
                    ensure_dir(parent).map_err(|e| directory_error(parent, e))?;
                }

                match copy_file_atomic(&file.path, &dest_file) {
                    Ok(bytes) => {
                        result.copied += 1;
                        progress.record_copied();
                        if self.options.log_file_names {
                            info!("Copied: {} ({} bytes)", file.path.display(), bytes);
                        }
                    }
                    Err(e) => {
                        result.failed += 1;
                        progress.record_failed();
                        error!("Copy failed: {} | {}", file.path.display(), e);
                    }
                }
            }
        }

        Ok(result)
    }
}

/// One accepted run, executed on a blocking worker.
pub struct BackupPipeline {
    request: ValidatedRequest,
    classifier: Arc<dyn ChangeClassifier>,
    options: Arc<EngineOptions>,
    tracker: ProgressTracker,
    cancel: CancellationToken,
}

impl BackupPipeline {
    /// The tracker must already be in the Starting state for this run.
    pub fn new(
        request: ValidatedRequest,
        classifier: Arc<dyn ChangeClassifier>,
        options: Arc<EngineOptions>,
        tracker: ProgressTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            request,
            classifier,
            options,
            tracker,
            cancel,
        }
    }

    /// Run to completion and leave the tracker in Done or Error.
    pub fn run(self) -> Result<RunReport> {
        let progress = RunProgress::new(self.tracker.clone());

        info!(
            "Backup started: {} source(s) -> {} (mode: {})",
            self.request.sources.len(),
            self.request.destination.display(),
            if self.request.mirror { "mirror" } else { "incremental" }
        );

        match self.execute(&progress) {
            Ok(report) => {
                self.tracker.finish_done();
                info!(
                    "Backup completed: {} copied, {} failed, {} unchanged, {} removed in {}",
                    report.copy.copied,
                    report.copy.failed,
                    report.count.unchanged(),
                    report.mirror.map(|m| m.removed).unwrap_or(0),
                    format_duration(report.duration.as_secs())
                );
                Ok(report)
            }
            Err(e) => {
                self.tracker.finish_error(e.to_string());
                error!("Backup failed: {}", e);
                Err(e)
            }
        }
    }

    fn execute(&self, progress: &RunProgress) -> Result<RunReport> {
        let destination = &self.request.destination;
        if destination.exists() && !destination.is_dir() {
            return Err(EngineError::DestinationNotDirectory {
                path: destination.clone(),
            });
        }

        let count = count_work(
            &self.request.sources,
            destination,
            self.classifier.as_ref(),
            &self.options.walk,
        );
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        self.tracker
            .set_running(count.total_needing_copy, count.total_scanned);

        let copy = CopyExecutor::new(self.classifier.as_ref(), &self.options, &self.cancel).run(
            &self.request.sources,
            destination,
            progress,
        )?;

        let mirror = if self.request.mirror {
            let report = mirror_cleanup(
                &self.request.sources,
                destination,
                &self.options.walk,
                progress,
                &self.cancel,
            );
            info!("Mirror cleanup removed {} files ({} failed)", report.removed, report.failed);
            Some(report)
        } else {
            None
        };

        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        Ok(RunReport {
            count,
            copy,
            mirror,
            duration: progress.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::classify::SizeMtimeClassifier;
    use crate::transfer::progress::RunStatus;
    use std::fs;
    use tempfile::TempDir;

    fn pipeline(
        sources: Vec<PathBuf>,
        destination: PathBuf,
        mirror: bool,
        tracker: &ProgressTracker,
        cancel: CancellationToken,
    ) -> BackupPipeline {
        assert!(tracker.try_begin(mirror));
        BackupPipeline::new(
            ValidatedRequest {
                sources,
                destination,
                mirror,
            },
            Arc::new(SizeMtimeClassifier),
            Arc::new(EngineOptions::default()),
            tracker.clone(),
            cancel,
        )
    }

    #[test]
    fn test_copy_executor_tallies() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let a = src_dir.path().join("A");
        fs::create_dir_all(a.join("deep/er")).unwrap();
        fs::write(a.join("one.txt"), b"1").unwrap();
        fs::write(a.join("deep/er/two.txt"), b"22").unwrap();

        let tracker = ProgressTracker::new();
        tracker.try_begin(false);
        tracker.set_running(2, 2);
        let progress = RunProgress::new(tracker.clone());
        let options = EngineOptions::default();
        let cancel = CancellationToken::new();

        let result = CopyExecutor::new(&SizeMtimeClassifier, &options, &cancel)
            .run(&[a.clone()], dst_dir.path(), &progress)
            .unwrap();
        assert_eq!(result, CopyResult { copied: 2, failed: 0, skipped: 0 });
        assert_eq!(fs::read(dst_dir.path().join("A/deep/er/two.txt")).unwrap(), b"22");

        let again = CopyExecutor::new(&SizeMtimeClassifier, &options, &cancel)
            .run(&[a], dst_dir.path(), &progress)
            .unwrap();
        assert_eq!(again, CopyResult { copied: 0, failed: 0, skipped: 2 });
    }

    #[test]
    fn test_destination_that_is_a_file_is_fatal() {
        let src_dir = TempDir::new().unwrap();
        let a = src_dir.path().join("A");
        fs::create_dir(&a).unwrap();
        fs::write(a.join("x.txt"), b"x").unwrap();
        let not_a_dir = src_dir.path().join("dest.txt");
        fs::write(&not_a_dir, b"file").unwrap();

        let tracker = ProgressTracker::new();
        let err = pipeline(vec![a], not_a_dir, false, &tracker, CancellationToken::new())
            .run()
            .unwrap_err();
        assert!(matches!(err, EngineError::DestinationNotDirectory { .. }));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RunStatus::Error);
        assert!(snapshot.error.unwrap().contains("not a directory"));
    }

    #[test]
    fn test_blocked_destination_root_is_fatal() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let a = src_dir.path().join("A");
        fs::create_dir(&a).unwrap();
        fs::write(a.join("x.txt"), b"x").unwrap();
        // A file where the mirrored directory should go.
        fs::write(dst_dir.path().join("A"), b"in the way").unwrap();

        let tracker = ProgressTracker::new();
        let err = pipeline(vec![a], dst_dir.path().to_path_buf(), false, &tracker, CancellationToken::new())
            .run()
            .unwrap_err();
        assert!(matches!(err, EngineError::DirectoryCreation { .. }));
        assert_eq!(tracker.snapshot().status, RunStatus::Error);
    }

    #[test]
    fn test_cancelled_run_ends_in_error() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let a = src_dir.path().join("A");
        fs::create_dir(&a).unwrap();
        fs::write(a.join("x.txt"), b"x").unwrap();

        let tracker = ProgressTracker::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline(vec![a], dst_dir.path().to_path_buf(), false, &tracker, cancel)
            .run()
            .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RunStatus::Error);
        assert_eq!(snapshot.error.as_deref(), Some("Backup cancelled by user"));
        assert!(!dst_dir.path().join("A/x.txt").exists());
    }

    #[test]
    fn test_per_file_copy_failure_is_not_fatal() {
        use filetime::{set_file_mtime, FileTime};
        use std::time::{Duration, SystemTime};

        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let a = src_dir.path().join("A");
        fs::create_dir(&a).unwrap();
        fs::write(a.join("ok.txt"), b"ok").unwrap();
        let blocked = a.join("blocked.txt");
        fs::write(&blocked, b"payload").unwrap();
        let newer = SystemTime::now() + Duration::from_secs(60);
        set_file_mtime(&blocked, FileTime::from_system_time(newer)).unwrap();

        // A non-empty directory sits where the copy must land; the rename
        // onto it fails for every user.
        let occupied = dst_dir.path().join("A/blocked.txt");
        fs::create_dir_all(&occupied).unwrap();
        fs::write(occupied.join("inside"), b"i").unwrap();

        let tracker = ProgressTracker::new();
        let report = pipeline(vec![a], dst_dir.path().to_path_buf(), false, &tracker, CancellationToken::new())
            .run()
            .unwrap();
        assert_eq!(report.copy.copied, 1);
        assert_eq!(report.copy.failed, 1);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RunStatus::Done);
        assert_eq!(snapshot.total_files, 2);
        assert_eq!(snapshot.copied_files, 1);
        assert_eq!(snapshot.failed_files, 1);
        assert_eq!(snapshot.percent, 50);
        assert!(snapshot.error.is_none());
        assert!(occupied.is_dir());
        assert_eq!(fs::read(dst_dir.path().join("A/ok.txt")).unwrap(), b"ok");

        let leftovers: Vec<_> = fs::read_dir(dst_dir.path().join("A"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
