//! Progress push message types.
//!
//! One envelope is shared by the WebSocket surface and the in-process
//! progress hub, so subscribers see exactly what the orchestrator emits.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::report::AnalysisReport;

/// Server-push message for one job's progress stream.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressMessage {
    /// Progress update in [0, 1] with a human-readable message.
    Progress { progress: f64, message: String },

    /// Terminal: analysis finished, report attached.
    Result { report: AnalysisReport },

    /// Terminal: analysis failed or was cancelled.
    Error { reason: String },

    /// Keepalive; clients echo back.
    Ping,
}

impl ProgressMessage {
    /// Create a progress message, clamping into [0, 1].
    pub fn progress(progress: f64, message: impl Into<String>) -> Self {
        ProgressMessage::Progress {
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Create a result message.
    pub fn result(report: AnalysisReport) -> Self {
        ProgressMessage::Result { report }
    }

    /// Create an error message.
    pub fn error(reason: impl Into<String>) -> Self {
        ProgressMessage::Error {
            reason: reason.into(),
        }
    }

    /// Whether this message ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressMessage::Result { .. } | ProgressMessage::Error { .. }
        )
    }
}
