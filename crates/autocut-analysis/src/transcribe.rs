//! The speech-to-text collaborator seam.
//!
//! The transcription model is external: the contract is "reads a WAV file,
//! writes one JSON document on stdout, exits with a status". Any binary
//! honoring that shape can stand in (`TRANSCRIBER_BINARY`):
//!
//! ```text
//! <bin> --model <size> --language <lang> <audio.wav>
//! stdout: { "segments": [ { "start": f64, "end": f64, "text": str,
//!                           "words": [ { "text", "start", "end",
//!                                        "confidence" } ]? } ] }
//! ```

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use autocut_models::{ModelSize, TranscriptSegment, WordTiming};

use crate::error::{AnalysisError, AnalysisResult};

/// Transcribes an audio file into timed segments.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio_path: &Path,
        model: ModelSize,
    ) -> AnalysisResult<Vec<TranscriptSegment>>;
}

/// Subprocess-backed transcriber.
pub struct SubprocessTranscriber {
    binary: PathBuf,
    language: String,
    timeout: Duration,
}

/// JSON document produced by the transcriber binary.
#[derive(Debug, Deserialize)]
struct TranscriberOutput {
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    words: Option<Vec<RawWord>>,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    text: String,
    start: f64,
    end: f64,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl SubprocessTranscriber {
    /// Create with an explicit binary.
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            timeout: Duration::from_secs(600),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        let binary = std::env::var("TRANSCRIBER_BINARY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("whisper-json"));
        let language =
            std::env::var("TRANSCRIBER_LANGUAGE").unwrap_or_else(|_| "fr".to_string());
        let timeout = Duration::from_secs(
            std::env::var("TRANSCRIBER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
        );
        Self {
            binary,
            language,
            timeout,
        }
    }

    fn parse_output(&self, stdout: &[u8]) -> AnalysisResult<Vec<TranscriptSegment>> {
        let parsed: TranscriberOutput = serde_json::from_slice(stdout).map_err(|e| {
            AnalysisError::transcription_unavailable(format!("bad transcriber output: {}", e))
        })?;

        let segments = parsed
            .segments
            .into_iter()
            .filter(|s| s.end > s.start)
            .map(|s| TranscriptSegment {
                start_s: s.start,
                end_s: s.end,
                text: s.text.trim().to_string(),
                words: s.words.map(|words| {
                    words
                        .into_iter()
                        .filter(|w| w.end > w.start)
                        .map(|w| WordTiming {
                            text: w.text,
                            start_s: w.start,
                            end_s: w.end,
                            confidence: w.confidence.clamp(0.0, 1.0),
                        })
                        .collect()
                }),
            })
            .collect();

        Ok(segments)
    }
}

#[async_trait]
impl Transcriber for SubprocessTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        model: ModelSize,
    ) -> AnalysisResult<Vec<TranscriptSegment>> {
        which::which(&self.binary).map_err(|_| {
            AnalysisError::transcription_unavailable(format!(
                "transcriber binary not found: {}",
                self.binary.display()
            ))
        })?;

        info!(
            audio = %audio_path.display(),
            model = %model,
            language = %self.language,
            "Starting transcription"
        );

        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.binary)
                .arg("--model")
                .arg(model.as_str())
                .arg("--language")
                .arg(&self.language)
                .arg(audio_path)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| {
            AnalysisError::transcription_unavailable(format!(
                "transcriber timed out after {}s",
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| {
            AnalysisError::transcription_unavailable(format!("failed to run transcriber: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                exit_code = ?output.status.code(),
                stderr = %stderr.trim(),
                "Transcriber failed"
            );
            return Err(AnalysisError::transcription_unavailable(format!(
                "transcriber exited with {:?}",
                output.status.code()
            )));
        }

        let segments = self.parse_output(&output.stdout)?;
        debug!(segments = segments.len(), "Transcription complete");
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_with_words() {
        let transcriber = SubprocessTranscriber::new("whisper-json", "fr");
        let json = br#"{
            "segments": [
                {
                    "start": 0.0, "end": 2.5, "text": " alors euh bonjour ",
                    "words": [
                        {"text": "alors", "start": 0.0, "end": 0.5, "confidence": 0.98},
                        {"text": "euh", "start": 0.6, "end": 0.9, "confidence": 0.72},
                        {"text": "bonjour", "start": 1.0, "end": 2.5, "confidence": 0.99}
                    ]
                }
            ]
        }"#;
        let segments = transcriber.parse_output(json).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "alors euh bonjour");
        let words = segments[0].words.as_ref().unwrap();
        assert_eq!(words.len(), 3);
        assert!((words[1].confidence - 0.72).abs() < 1e-9);
    }

    #[test]
    fn test_parse_output_without_words() {
        let transcriber = SubprocessTranscriber::new("whisper-json", "fr");
        let json = br#"{"segments": [{"start": 1.0, "end": 3.0, "text": "euh"}]}"#;
        let segments = transcriber.parse_output(json).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].words.is_none());
    }

    #[test]
    fn test_parse_output_drops_degenerate_segments() {
        let transcriber = SubprocessTranscriber::new("whisper-json", "fr");
        let json = br#"{"segments": [{"start": 3.0, "end": 3.0, "text": "x"}]}"#;
        let segments = transcriber.parse_output(json).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_parse_garbage_is_unavailable() {
        let transcriber = SubprocessTranscriber::new("whisper-json", "fr");
        let err = transcriber.parse_output(b"not json").unwrap_err();
        assert!(matches!(err, AnalysisError::TranscriptionUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let transcriber = SubprocessTranscriber::new("no-such-transcriber-anywhere", "fr");
        let err = transcriber
            .transcribe(Path::new("/tmp/audio.wav"), ModelSize::Base)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::TranscriptionUnavailable(_)));
    }
}
