//! Audio analysis for automatic cutting.
//!
//! This crate implements the algorithmic heart of the pipeline:
//! 1. Energy-based silence detection over a streaming PCM feed
//! 2. Filler-word detection over transcript word timings
//! 3. The cut planner that fuses removals and inverts them into keep-cuts
//!
//! All three stages are pure and deterministic; the orchestrator owns the
//! processes and channels around them.

pub mod error;
pub mod fillers;
pub mod planner;
pub mod silence;
pub mod transcribe;

pub use error::{AnalysisError, AnalysisResult};
pub use fillers::{detect_fillers, FillerLexicon};
pub use planner::plan_cuts;
pub use silence::{ProgressSink, SilenceAnalyzer};
pub use transcribe::{SubprocessTranscriber, Transcriber};
