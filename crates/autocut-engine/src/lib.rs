//! Job orchestration for the AutoCut pipeline.
//!
//! This crate drives the per-job state machine
//! (`Uploading → Uploaded → Analyzing → Exporting → Completed | Failed |
//! Cancelled`), dispatches analysis work onto a bounded worker pool,
//! persists every transition, and fans progress events out to subscribers.
//!
//! The job store is the only shared-mutable structure: all writes flow
//! through it, readers observe a snapshot plus a stream of deltas.

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod store;

pub use config::EngineConfig;
pub use engine::AnalysisEngine;
pub use error::{EngineError, EngineResult};
pub use progress::ProgressHub;
pub use store::JobStore;
