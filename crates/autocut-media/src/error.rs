//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors from the external media toolchain.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("decoder binary not found: {0}")]
    DecoderNotFound(String),

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("unreadable container: {0}")]
    UnreadableContainer(String),

    #[error("decoder exited with status {exit_code:?}: {stderr_tail}")]
    ToolchainFailed {
        stderr_tail: String,
        exit_code: Option<i32>,
    },

    #[error("invalid media: {0}")]
    InvalidMedia(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a toolchain failure carrying the stderr tail.
    pub fn toolchain_failed(stderr_tail: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ToolchainFailed {
            stderr_tail: stderr_tail.into(),
            exit_code,
        }
    }
}
