//! Backup Engine Library
//!
//! Synchronizes source directory trees into a destination tree, copying only
//! new and changed files, optionally deleting destination files no source has
//! (mirror mode), and publishing live progress to any number of observers.
//!
//! ```no_run
//! use backup_engine::{BackupEngine, BackupRequest, EngineOptions};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = BackupEngine::new(EngineOptions::default());
//! let run = engine.start(BackupRequest::new(["/home/me/Documents"], "/mnt/backup", false))?;
//! println!("{:?}", engine.progress().status);
//! let report = run.wait().await?;
//! println!("copied {} files", report.copy.copied);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod executor;
pub mod fs;
pub mod sync;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use engine::{BackupEngine, RunHandle};
pub use executor::request::BackupRequest;
pub use executor::{EngineOptions, RunReport};
pub use fs::walker::WalkOptions;
pub use sync::classify::{ChangeClassifier, FileComparisonOutcome, SizeMtimeClassifier};
pub use transfer::progress::{ProgressSnapshot, ProgressTracker, RunStatus};
pub use utils::errors::{EngineError, StartError};
pub type Result<T> = std::result::Result<T, EngineError>;
