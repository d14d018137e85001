//! Error types for analysis operations.

use thiserror::Error;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors from the analysis stages.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    #[error("analysis invariant violated: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Create an internal invariant-violation error. This is a bug.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a transcription-unavailable error.
    pub fn transcription_unavailable(msg: impl Into<String>) -> Self {
        Self::TranscriptionUnavailable(msg.into())
    }
}
