//! Per-job analysis settings parsed from the upload configuration block.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fps::FrameRate;

/// Validation failure for an upload option.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("silence_threshold_db must be between -60 and -20, got {0}")]
    ThresholdOutOfRange(i32),

    #[error("min_silence_ms must be between 100 and 5000, got {0}")]
    MinSilenceOutOfRange(u32),

    #[error("padding_ms must be between 0 and 1000, got {0}")]
    PaddingOutOfRange(u32),

    #[error("filler_sensitivity must be between 0.0 and 1.0, got {0}")]
    SensitivityOutOfRange(f64),
}

/// Transcription model size for the external speech-to-text collaborator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Effective settings for one job.
///
/// Deserialized from the upload's `options` part with unknown fields
/// rejected, then range-checked with [`AnalysisSettings::validate`] before a
/// job is created.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSettings {
    /// Silence threshold in dBFS.
    #[serde(default = "default_threshold_db")]
    pub silence_threshold_db: i32,

    /// Minimum silence duration in milliseconds.
    #[serde(default = "default_min_silence_ms")]
    pub min_silence_ms: u32,

    /// Symmetric padding applied by the cut planner, in milliseconds.
    #[serde(default = "default_padding_ms")]
    pub padding_ms: u32,

    /// Frame grid for EDL export.
    #[serde(default)]
    pub fps: FrameRate,

    /// Enable filler-word detection (requires transcription).
    #[serde(default)]
    pub detect_fillers: bool,

    /// Filler detection sensitivity gate in [0, 1].
    #[serde(default = "default_filler_sensitivity")]
    pub filler_sensitivity: f64,

    /// Speech-to-text model size.
    #[serde(default)]
    pub transcription_model_size: ModelSize,
}

fn default_threshold_db() -> i32 {
    -45
}

fn default_min_silence_ms() -> u32 {
    800
}

fn default_padding_ms() -> u32 {
    250
}

fn default_filler_sensitivity() -> f64 {
    0.7
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            silence_threshold_db: default_threshold_db(),
            min_silence_ms: default_min_silence_ms(),
            padding_ms: default_padding_ms(),
            fps: FrameRate::default(),
            detect_fillers: false,
            filler_sensitivity: default_filler_sensitivity(),
            transcription_model_size: ModelSize::default(),
        }
    }
}

impl AnalysisSettings {
    /// Range-check every option. Runs before job admission.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(-60..=-20).contains(&self.silence_threshold_db) {
            return Err(SettingsError::ThresholdOutOfRange(self.silence_threshold_db));
        }
        if !(100..=5000).contains(&self.min_silence_ms) {
            return Err(SettingsError::MinSilenceOutOfRange(self.min_silence_ms));
        }
        if self.padding_ms > 1000 {
            return Err(SettingsError::PaddingOutOfRange(self.padding_ms));
        }
        if !(0.0..=1.0).contains(&self.filler_sensitivity) {
            return Err(SettingsError::SensitivityOutOfRange(self.filler_sensitivity));
        }
        Ok(())
    }
}
