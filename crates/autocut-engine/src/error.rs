//! Engine error kinds.
//!
//! Stages never catch foreign kinds; everything bubbles here and the
//! engine is the single catch point. `reason()` is the coarse phrase
//! surfaced to users — detailed tool output stays in the logs.

use thiserror::Error;

use autocut_analysis::AnalysisError;
use autocut_export::ExportError;
use autocut_media::MediaError;
use autocut_models::JobId;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors owned by the orchestrator.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad option value, unsupported extension, file too large. Surfaced
    /// synchronously to the uploader; never creates a job.
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("probe failed: {0}")]
    ProbeFailed(String),

    #[error("decode failed: {stderr_tail}")]
    DecodeFailed { stderr_tail: String },

    /// Logic invariant violation. This is a bug.
    #[error("analysis internal error: {0}")]
    AnalysisInternal(String),

    #[error("transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    #[error("export failed: {0}")]
    ExportFailed(String),

    #[error("cancelled")]
    Cancelled,

    /// Process restarted while the job was in flight.
    #[error("interrupted")]
    Interrupted,

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// Illegal state transition. This is a bug.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn input_invalid(msg: impl Into<String>) -> Self {
        Self::InputInvalid(msg.into())
    }

    /// Coarse reason phrase for the job record and the status endpoint.
    pub fn reason(&self) -> String {
        match self {
            EngineError::InputInvalid(_) => "invalid input".to_string(),
            EngineError::ProbeFailed(_) => "probe failed".to_string(),
            EngineError::DecodeFailed { .. } => "decode failed".to_string(),
            EngineError::AnalysisInternal(_) => "internal analysis error".to_string(),
            EngineError::TranscriptionUnavailable(_) => "transcription unavailable".to_string(),
            EngineError::ExportFailed(_) => "export failed".to_string(),
            EngineError::Cancelled => "cancelled".to_string(),
            EngineError::Interrupted => "interrupted".to_string(),
            EngineError::JobNotFound(id) => format!("job not found: {}", id),
            EngineError::IllegalTransition { .. } => "internal state error".to_string(),
            EngineError::Io(_) | EngineError::Json(_) => "storage error".to_string(),
        }
    }
}

impl From<MediaError> for EngineError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnreadableContainer(msg) => EngineError::ProbeFailed(msg),
            MediaError::ToolchainFailed { stderr_tail, .. } => {
                EngineError::DecodeFailed { stderr_tail }
            }
            MediaError::Cancelled => EngineError::Cancelled,
            MediaError::FileNotFound(path) => {
                EngineError::InputInvalid(format!("missing file: {}", path.display()))
            }
            other => EngineError::DecodeFailed {
                stderr_tail: other.to_string(),
            },
        }
    }
}

impl From<AnalysisError> for EngineError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::TranscriptionUnavailable(msg) => {
                EngineError::TranscriptionUnavailable(msg)
            }
            AnalysisError::Cancelled => EngineError::Cancelled,
            other => EngineError::AnalysisInternal(other.to_string()),
        }
    }
}

impl From<ExportError> for EngineError {
    fn from(err: ExportError) -> Self {
        EngineError::ExportFailed(err.to_string())
    }
}
