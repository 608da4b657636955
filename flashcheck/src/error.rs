//! Error types for flashcheck.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for flashcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for flashcheck operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (child process pipes, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port enumeration error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The external flashing tool could not be launched.
    #[error("Failed to launch flashing tool '{program}': {source}")]
    FlashTool {
        /// Program that was invoked.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// Firmware image does not exist.
    #[error("Firmware image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    /// Operation interrupted by the embedding application (e.g. Ctrl-C).
    #[error("Interrupted")]
    Interrupted,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
