//! Run status and file-count progress for backup runs.
//!
//! One [`ProgressTracker`] exists per engine. It wraps a `watch` channel so the
//! writer replaces the whole [`ProgressSnapshot`] in a single step and any
//! number of readers can take a consistent copy at any time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Lifecycle of a run: Idle → Starting → Running → {Done, Error}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Starting,
    Running,
    Done,
    Error,
}

impl RunStatus {
    /// A run holds the engine while Starting or Running.
    pub fn is_active(self) -> bool {
        matches!(self, RunStatus::Starting | RunStatus::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Error)
    }
}

/// Progress information for the current (or last) backup run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Files needing copy, fixed by the counting pass
    pub total_files: usize,

    /// Files scanned by the counting pass, including unchanged ones
    pub scanned_files: usize,

    pub copied_files: usize,
    pub failed_files: usize,

    /// Successful mirror deletions; always 0 outside mirror mode
    pub removed_files: usize,

    /// floor(copied / total * 100), 0 while total is 0
    pub percent: u8,

    /// Seconds remaining, absent until the first file is copied
    pub eta_seconds: Option<u64>,

    pub status: RunStatus,

    /// Cause of the failure, present only in the Error state
    pub error: Option<String>,

    pub mirror: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
    /// Zeroed counters in the Starting state.
    fn starting(mirror: bool) -> Self {
        Self {
            status: RunStatus::Starting,
            mirror,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Recompute the derived fields from the counters. `elapsed` is the time
    /// since the run started.
    fn refresh(&mut self, elapsed: Duration) {
        if self.copied_files > self.total_files {
            // A file appeared after counting; keep percent within 0-100.
            self.total_files = self.copied_files;
        }
        self.percent = percent_of(self.copied_files, self.total_files);
        self.eta_seconds = linear_eta(elapsed, self.copied_files, self.total_files);
    }
}

/// Integer percentage of `done` over `total`, rounded down. 0 when `total` is 0.
pub fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done.min(total) as u128 * 100) / total as u128) as u8
}

/// Linear-rate estimate: `elapsed * (total - done) / done`, in whole seconds.
///
/// Every file so far weighs the same, so a slow first file inflates early
/// estimates. `None` until at least one file is done.
pub fn linear_eta(elapsed: Duration, done: usize, total: usize) -> Option<u64> {
    if done == 0 {
        return None;
    }
    let remaining = total.saturating_sub(done) as f64;
    Some((elapsed.as_secs_f64() * remaining / done as f64) as u64)
}

/// Shared handle to the engine's single progress snapshot.
#[derive(Clone)]
pub struct ProgressTracker {
    tx: Arc<watch::Sender<ProgressSnapshot>>,
}

impl ProgressTracker {
    /// Create a tracker in the Idle state with zeroed counters
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the latest published snapshot
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    /// Claim the engine for a new run.
    ///
    /// The check and the reset to Starting happen under the channel's write
    /// lock, so of several concurrent callers exactly one gets `true`.
    pub fn try_begin(&self, mirror: bool) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.status.is_active() {
                return false;
            }
            *snapshot = ProgressSnapshot::starting(mirror);
            true
        })
    }

    /// The counting pass is done; `total` is now the fixed denominator.
    pub fn set_running(&self, total: usize, scanned: usize) {
        self.tx.send_modify(|snapshot| {
            snapshot.status = RunStatus::Running;
            snapshot.total_files = total;
            snapshot.scanned_files = scanned;
        });
    }

    pub fn finish_done(&self) {
        self.tx.send_modify(|snapshot| {
            snapshot.status = RunStatus::Done;
            snapshot.finished_at = Some(Utc::now());
        });
    }

    /// Move to Error. Ignored once the run already reached a terminal state.
    pub fn finish_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_if_modified(|snapshot| {
            if snapshot.status.is_terminal() || snapshot.status == RunStatus::Idle {
                return false;
            }
            snapshot.status = RunStatus::Error;
            snapshot.error = Some(message);
            snapshot.finished_at = Some(Utc::now());
            true
        });
    }

    fn publish(&self, update: impl FnOnce(&mut ProgressSnapshot)) {
        self.tx.send_modify(update);
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer side of one run. Every `record_*` publishes one complete snapshot.
pub struct RunProgress {
    tracker: ProgressTracker,
    start_time: Instant,
}

impl RunProgress {
    pub fn new(tracker: ProgressTracker) -> Self {
        Self {
            tracker,
            start_time: Instant::now(),
        }
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn record_copied(&self) {
        let elapsed = self.elapsed();
        self.tracker.publish(|snapshot| {
            snapshot.copied_files += 1;
            snapshot.refresh(elapsed);
        });
    }

    pub fn record_failed(&self) {
        let elapsed = self.elapsed();
        self.tracker.publish(|snapshot| {
            snapshot.failed_files += 1;
            snapshot.refresh(elapsed);
        });
    }

    /// An up-to-date file seen during the copy walk. Only the ETA moves.
    pub fn record_skipped(&self) {
        let elapsed = self.elapsed();
        self.tracker.publish(|snapshot| snapshot.refresh(elapsed));
    }

    pub fn record_removed(&self) {
        self.tracker.publish(|snapshot| snapshot.removed_files += 1);
    }
}

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new_tracker_is_idle() {
        let tracker = ProgressTracker::new();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RunStatus::Idle);
        assert_eq!(snapshot.total_files, 0);
        assert_eq!(snapshot.copied_files, 0);
        assert_eq!(snapshot.percent, 0);
        assert!(snapshot.eta_seconds.is_none());
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 0), 0);
        assert_eq!(percent_of(0, 3), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 66);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(199, 200), 99);
    }

    #[test]
    fn test_linear_eta() {
        assert_eq!(linear_eta(Duration::from_secs(10), 0, 4), None);
        assert_eq!(linear_eta(Duration::from_secs(10), 1, 4), Some(30));
        assert_eq!(linear_eta(Duration::from_secs(10), 2, 4), Some(10));
        assert_eq!(linear_eta(Duration::from_secs(10), 4, 4), Some(0));
    }

    #[test]
    fn test_try_begin_is_single_flight() {
        let tracker = ProgressTracker::new();
        assert!(tracker.try_begin(false));
        assert_eq!(tracker.snapshot().status, RunStatus::Starting);
        assert!(!tracker.try_begin(false));

        tracker.set_running(3, 5);
        assert!(!tracker.try_begin(true));

        tracker.finish_done();
        assert!(tracker.try_begin(true));
        assert!(tracker.snapshot().mirror);
    }

    #[test]
    fn test_concurrent_begin_has_one_winner() {
        let tracker = ProgressTracker::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tracker = tracker.clone();
                thread::spawn(move || tracker.try_begin(false))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_begin_resets_previous_run() {
        let tracker = ProgressTracker::new();
        assert!(tracker.try_begin(true));
        tracker.set_running(2, 2);
        let run = RunProgress::new(tracker.clone());
        run.record_copied();
        run.record_failed();
        run.record_removed();
        tracker.finish_error("disk full");

        assert!(tracker.try_begin(false));
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RunStatus::Starting);
        assert_eq!(snapshot.total_files, 0);
        assert_eq!(snapshot.copied_files, 0);
        assert_eq!(snapshot.failed_files, 0);
        assert_eq!(snapshot.removed_files, 0);
        assert!(snapshot.error.is_none());
        assert!(!snapshot.mirror);
    }

    #[test]
    fn test_record_updates_derived_fields_together() {
        let tracker = ProgressTracker::new();
        tracker.try_begin(false);
        tracker.set_running(4, 10);
        let run = RunProgress::new(tracker.clone());

        run.record_skipped();
        assert!(tracker.snapshot().eta_seconds.is_none());

        run.record_copied();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RunStatus::Running);
        assert_eq!(snapshot.copied_files, 1);
        assert_eq!(snapshot.percent, 25);
        assert!(snapshot.eta_seconds.is_some());

        run.record_failed();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.failed_files, 1);
        assert_eq!(snapshot.copied_files, 1);
        assert_eq!(snapshot.percent, 25);
    }

    #[test]
    fn test_copied_never_exceeds_total() {
        let tracker = ProgressTracker::new();
        tracker.try_begin(false);
        tracker.set_running(1, 1);
        let run = RunProgress::new(tracker.clone());

        run.record_copied();
        run.record_copied();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.copied_files, 2);
        assert_eq!(snapshot.total_files, 2);
        assert_eq!(snapshot.percent, 100);
    }

    #[test]
    fn test_finish_error_keeps_first_terminal_state() {
        let tracker = ProgressTracker::new();
        tracker.try_begin(false);
        tracker.finish_done();
        tracker.finish_error("late failure");

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RunStatus::Done);
        assert!(snapshot.error.is_none());
        assert!(snapshot.finished_at.is_some());
    }

    #[test]
    fn test_snapshot_serializes_flat() {
        let tracker = ProgressTracker::new();
        let json = serde_json::to_value(tracker.snapshot()).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["total_files"], 0);
        assert_eq!(json["percent"], 0);
        assert!(json["eta_seconds"].is_null());
        assert!(json["error"].is_null());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let tracker = ProgressTracker::new();
        let mut rx = tracker.subscribe();
        tracker.try_begin(false);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().status, RunStatus::Starting);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3665), "1h 1m");
    }
}
