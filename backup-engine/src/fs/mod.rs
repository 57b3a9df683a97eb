//! Filesystem access: tree walking and file copying.

pub mod copy;
pub mod walker;
