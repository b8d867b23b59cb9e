//! Infrastructure layer
//!
//! Handles all I/O operations: filesystem, binary metadata, and external processes.

pub mod dirs;
pub mod filesystem;
pub mod metadata;
pub mod process;
