//! WebSocket push of progress snapshots.

pub mod progress;
