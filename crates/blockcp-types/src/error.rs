//! Error types for blockcp operations
//!
//! All runtime failures of the copy pipeline surface through a single [`Error`]
//! enum, one variant per failure kind. I/O variants carry the byte offset the
//! operation targeted and the underlying OS error so a single log line can
//! identify what failed and where.

use std::io;
use std::path::PathBuf;

/// Main error type for blockcp operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration detected before any I/O was issued
    #[error("configuration error: {message}")]
    Config {
        /// Description of the rejected configuration
        message: String,
    },

    /// Opening a source or destination device failed
    #[error("failed to open '{path}'")]
    Open {
        /// Path that could not be opened
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Querying device geometry or size failed
    #[error("device probe failed for '{path}'")]
    Probe {
        /// Path of the device that could not be probed
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A read from the source failed (end of input is not an error)
    #[error("read failed at source offset {offset}")]
    Read {
        /// Source byte offset of the failed read
        offset: u64,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A write to the destination failed
    #[error("write failed at destination offset {offset}")]
    Write {
        /// Destination byte offset of the failed write
        offset: u64,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// The per-worker submission ring rejected or lost an operation
    #[error("submission ring failure")]
    Ring {
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Flushing the destination at shutdown failed
    #[error("failed to flush destination")]
    Flush {
        /// Underlying OS error
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create a configuration error from a message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for errors raised during preflight, before any I/O was issued
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// Result type alias for blockcp operations
pub type Result<T> = std::result::Result<T, Error>;
