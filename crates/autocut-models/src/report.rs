//! Analysis artifacts carried between pipeline stages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fps::FrameRate;
use crate::interval::TimeInterval;

/// A keep-segment: a source interval plus the frame indices derived at
/// export time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cut {
    /// Source interval that survives editing.
    pub interval: TimeInterval,
    /// Source in-point, `⌊start_s · fps + 0.5⌋`.
    pub in_frame: u64,
    /// Source out-point, `⌊end_s · fps + 0.5⌋`. Always `> in_frame`.
    pub out_frame: u64,
}

impl Cut {
    /// Kept length in frames.
    pub fn frames(&self) -> u64 {
        self.out_frame - self.in_frame
    }
}

/// A disfluency detected in the transcript.
///
/// Produced by the filler detector, consumed once by the cut planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FillerHit {
    /// The normalized filler word or phrase.
    pub word: String,
    /// Start time in seconds.
    pub start_s: f64,
    /// End time in seconds.
    pub end_s: f64,
    /// Detector confidence in [0, 1].
    pub confidence: f64,
}

impl FillerHit {
    /// The interval covered by this hit.
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_s, self.end_s)
    }
}

/// Word-level timing inside a transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WordTiming {
    pub text: String,
    pub start_s: f64,
    pub end_s: f64,
    /// Recognition confidence in [0, 1].
    pub confidence: f64,
}

/// One transcribed segment. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
    /// Word-level timings when the model provides them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordTiming>>,
}

/// Bundle carried from analysis to export and into the final job record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    /// Source duration in seconds.
    pub duration_s: f64,
    /// Sample rate the analysis ran at.
    pub sample_rate_hz: u32,
    /// Detected silence intervals, sorted and disjoint.
    pub silences: Vec<TimeInterval>,
    /// Detected filler hits, sorted and de-duplicated.
    pub fillers: Vec<FillerHit>,
    /// The planned keep-cuts, sorted.
    pub cuts: Vec<Cut>,
    /// Padding applied by the planner, in milliseconds.
    pub padding_ms: u32,
    /// Frame grid the cuts were rounded to.
    pub fps: FrameRate,
}

impl AnalysisReport {
    /// Total kept seconds over all cuts.
    pub fn total_kept_s(&self) -> f64 {
        self.cuts.iter().map(|c| c.interval.duration_s()).sum()
    }

    /// Total removed seconds (complement of the cuts over the source).
    pub fn total_removed_s(&self) -> f64 {
        (self.duration_s - self.total_kept_s()).max(0.0)
    }

    /// Total kept frames, used as the exported sequence duration.
    pub fn total_frames(&self) -> u64 {
        self.cuts.iter().map(Cut::frames).sum()
    }
}
