//! Job records and the job status state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::report::AnalysisReport;
use crate::settings::AnalysisSettings;

/// Unique identifier for a job (128-bit random).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage reported while a job is analyzing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    /// Reading container headers.
    Probing,
    /// Streaming PCM and detecting silence.
    Decoding,
    /// Running the speech-to-text collaborator.
    Transcribing,
    /// Fusing removals and planning keep-cuts.
    Planning,
}

impl AnalysisPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPhase::Probing => "probing",
            AnalysisPhase::Decoding => "decoding",
            AnalysisPhase::Transcribing => "transcribing",
            AnalysisPhase::Planning => "planning",
        }
    }
}

/// Job status. Transitions form a DAG:
/// `Uploading → Uploaded → Analyzing → Exporting → Completed`,
/// with `Failed` and `Cancelled` reachable from every non-terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// Upload bytes are still streaming in.
    Uploading,
    /// Source file on disk, waiting for a worker permit.
    Uploaded,
    /// Analysis in flight on the worker pool.
    Analyzing {
        /// Monotonically non-decreasing progress in [0, 1].
        progress: f64,
        phase: AnalysisPhase,
    },
    /// Writing EDL and transcript files.
    Exporting,
    /// Terminal: all outputs written.
    Completed,
    /// Terminal: analysis failed.
    Failed { reason: String },
    /// Terminal: cancelled by the user.
    Cancelled,
}

impl JobStatus {
    /// Whether this is a terminal state (no more transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed { .. } | JobStatus::Cancelled
        )
    }

    /// Short label for logs and the status endpoint.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Uploading => "uploading",
            JobStatus::Uploaded => "uploaded",
            JobStatus::Analyzing { .. } => "analyzing",
            JobStatus::Exporting => "exporting",
            JobStatus::Completed => "completed",
            JobStatus::Failed { .. } => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Progress value implied by this status.
    pub fn progress(&self) -> f64 {
        match self {
            JobStatus::Uploading => 0.0,
            JobStatus::Uploaded => 0.0,
            JobStatus::Analyzing { progress, .. } => *progress,
            JobStatus::Exporting => 0.95,
            JobStatus::Completed => 1.0,
            JobStatus::Failed { .. } | JobStatus::Cancelled => 0.0,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Illegal transitions indicate an orchestrator bug; the store rejects
    /// them rather than corrupting the record.
    pub fn can_transition_to(&self, next: &JobStatus) -> bool {
        use JobStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Uploading, Uploaded) => true,
            (Uploaded, Analyzing { .. }) => true,
            (Analyzing { .. }, Analyzing { .. }) => true,
            (Analyzing { .. }, Exporting) => true,
            (Exporting, Completed) => true,
            // Failure and cancellation are reachable from any live state.
            (_, Failed { .. }) | (_, Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Paths to the files a completed job produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ResultPaths {
    pub legacy_xml: Option<PathBuf>,
    pub structural_xml: Option<PathBuf>,
    pub srt: Option<PathBuf>,
    pub vtt: Option<PathBuf>,
    pub txt: Option<PathBuf>,
}

/// Wall-clock timings recorded across the job lifecycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JobTimings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// The durable per-job record. Mutated only through the orchestrator's
/// job store; one JSON document per job on disk.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    pub id: JobId,
    pub created_at: DateTime<Utc>,
    /// Original filename as uploaded.
    pub source_filename: String,
    /// Validated path inside the upload root.
    pub source_path: PathBuf,
    pub settings: AnalysisSettings,
    pub status: JobStatus,
    /// Last progress message shown to subscribers.
    pub message: String,
    #[serde(default)]
    pub timings: JobTimings,
    /// Present once the job completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AnalysisReport>,
    #[serde(default)]
    pub result_paths: ResultPaths,
}

impl JobRecord {
    /// Open a new record in the `Uploading` state.
    pub fn new(
        source_filename: impl Into<String>,
        source_path: PathBuf,
        settings: AnalysisSettings,
    ) -> Self {
        Self::with_id(JobId::new(), source_filename, source_path, settings)
    }

    /// Open a record with a pre-assigned id. Upload admission names the
    /// job's directories after the id before the record exists.
    pub fn with_id(
        id: JobId,
        source_filename: impl Into<String>,
        source_path: PathBuf,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            source_filename: source_filename.into(),
            source_path,
            settings,
            status: JobStatus::Uploading,
            message: String::new(),
            timings: JobTimings::default(),
            report: None,
            result_paths: ResultPaths::default(),
        }
    }

    /// Filename stem used for output artifact names.
    pub fn source_stem(&self) -> String {
        std::path::Path::new(&self.source_filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzing(progress: f64) -> JobStatus {
        JobStatus::Analyzing {
            progress,
            phase: AnalysisPhase::Decoding,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let chain = [
            JobStatus::Uploading,
            JobStatus::Uploaded,
            analyzing(0.1),
            analyzing(0.7),
            JobStatus::Exporting,
            JobStatus::Completed,
        ];
        for pair in chain.windows(2) {
            assert!(
                pair[0].can_transition_to(&pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let terminals = [
            JobStatus::Completed,
            JobStatus::Failed {
                reason: "boom".into(),
            },
            JobStatus::Cancelled,
        ];
        for terminal in &terminals {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(&JobStatus::Uploaded));
            assert!(!terminal.can_transition_to(&JobStatus::Cancelled));
        }
    }

    #[test]
    fn test_cancel_from_any_live_state() {
        assert!(JobStatus::Uploading.can_transition_to(&JobStatus::Cancelled));
        assert!(analyzing(0.5).can_transition_to(&JobStatus::Cancelled));
        assert!(JobStatus::Exporting.can_transition_to(&JobStatus::Failed {
            reason: "disk full".into()
        }));
    }

    #[test]
    fn test_skipping_states_is_illegal() {
        assert!(!JobStatus::Uploading.can_transition_to(&JobStatus::Exporting));
        assert!(!JobStatus::Uploaded.can_transition_to(&JobStatus::Completed));
        assert!(!JobStatus::Exporting.can_transition_to(&analyzing(0.2)));
    }

    #[test]
    fn test_status_serde_tagged() {
        let status = analyzing(0.25);
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"state\":\"analyzing\""));
        assert!(json.contains("\"phase\":\"decoding\""));
        let back: JobStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn test_record_stem() {
        let record = JobRecord::new(
            "My Talk.mp4",
            PathBuf::from("/uploads/x/My Talk.mp4"),
            AnalysisSettings::default(),
        );
        assert_eq!(record.source_stem(), "My Talk");
        assert_eq!(record.status, JobStatus::Uploading);
    }
}
