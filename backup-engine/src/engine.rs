//! The backup engine: accepts start requests and owns the progress tracker.

use crate::executor::request::BackupRequest;
use crate::executor::{BackupPipeline, EngineOptions, RunReport};
use crate::sync::classify::{ChangeClassifier, SizeMtimeClassifier};
use crate::transfer::progress::{ProgressSnapshot, ProgressTracker};
use crate::utils::errors::{EngineError, StartError};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Handle to an accepted run. Dropping it detaches the run.
pub struct RunHandle {
    handle: JoinHandle<Result<RunReport, EngineError>>,
}

impl RunHandle {
    /// Wait for the run to reach Done or Error.
    pub async fn wait(self) -> Result<RunReport, EngineError> {
        self.handle
            .await
            .map_err(|e| EngineError::Worker(e.to_string()))?
    }
}

/// Single-instance engine. Cheap to clone; clones share the same tracker.
#[derive(Clone)]
pub struct BackupEngine {
    tracker: ProgressTracker,
    classifier: Arc<dyn ChangeClassifier>,
    options: Arc<EngineOptions>,
    current_cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl BackupEngine {
    /// Engine using the size + mtime change policy
    pub fn new(options: EngineOptions) -> Self {
        Self::with_classifier(options, Arc::new(SizeMtimeClassifier))
    }

    pub fn with_classifier(options: EngineOptions, classifier: Arc<dyn ChangeClassifier>) -> Self {
        Self {
            tracker: ProgressTracker::new(),
            classifier,
            options: Arc::new(options),
            current_cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Accept or reject a run. On acceptance the tracker is already in the
    /// Starting state when this returns, and the run proceeds on the blocking
    /// pool. Must be called from within a tokio runtime.
    pub fn start(&self, request: BackupRequest) -> Result<RunHandle, StartError> {
        let request = request.validate()?;

        let cancel = CancellationToken::new();
        {
            // Claim and token swap happen under the lock `cancel` takes, so a
            // cancel that sees the new run always reaches the new token.
            let mut slot = self
                .current_cancel
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.tracker.try_begin(request.mirror) {
                warn!("Rejected backup start: a run is already in progress");
                return Err(StartError::AlreadyRunning);
            }
            *slot = Some(cancel.clone());
        }

        info!(
            "Accepted backup of {:?} into {}",
            request.sources,
            request.destination.display()
        );

        let pipeline = BackupPipeline::new(
            request,
            Arc::clone(&self.classifier),
            Arc::clone(&self.options),
            self.tracker.clone(),
            cancel,
        );
        let tracker = self.tracker.clone();

        let handle = tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || pipeline.run()).await {
                Ok(result) => result,
                Err(e) => {
                    // A panic inside the pipeline skipped its own bookkeeping.
                    let err = EngineError::Worker(e.to_string());
                    error!("{}", err);
                    tracker.finish_error(err.to_string());
                    Err(err)
                }
            }
        });

        Ok(RunHandle { handle })
    }

    /// Latest progress snapshot; Idle with zeroed counters before the first run.
    pub fn progress(&self) -> ProgressSnapshot {
        self.tracker.snapshot()
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Ask the active run to stop after the file it is working on. Returns
    /// `false` when no run is active.
    pub fn cancel(&self) -> bool {
        let slot = self
            .current_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.tracker.snapshot().status.is_active() {
            return false;
        }
        match slot.as_ref() {
            Some(token) => {
                info!("Cancellation requested for the running backup");
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl Default for BackupEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}
