//! Core types for blockcp
//!
//! This crate provides the shared vocabulary of the blockcp workspace: the
//! error type, the copy configuration, statistics and progress snapshots, and
//! the disk-info adapter trait the engine consumes from the host platform.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod stats;
pub mod traits;

pub use config::{CopyConfig, DEFAULT_BLOCK_SIZE, DEFAULT_WORKERS, MAX_WORKERS};
pub use error::{Error, Result};
pub use stats::{CopyProgress, CopyStats};
pub use traits::DiskInfo;
