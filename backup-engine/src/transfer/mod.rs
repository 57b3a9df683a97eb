//! Progress reporting for backup runs.

pub mod progress;
