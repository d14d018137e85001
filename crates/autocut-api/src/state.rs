//! Application state.

use std::sync::Arc;

use autocut_analysis::SubprocessTranscriber;
use autocut_engine::{AnalysisEngine, EngineConfig, JobStore, ProgressHub};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub engine_config: EngineConfig,
    pub store: Arc<JobStore>,
    pub hub: Arc<ProgressHub>,
    pub engine: Arc<AnalysisEngine>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(
        config: ApiConfig,
        engine_config: EngineConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        tokio::fs::create_dir_all(&engine_config.upload_root).await?;
        tokio::fs::create_dir_all(&engine_config.output_root).await?;

        let store = Arc::new(JobStore::open(engine_config.jobs_dir()).await?);
        let hub = Arc::new(ProgressHub::new());
        let transcriber = Arc::new(SubprocessTranscriber::from_env());
        let engine = AnalysisEngine::new(
            engine_config.clone(),
            Arc::clone(&store),
            Arc::clone(&hub),
            transcriber,
        );

        Ok(Self {
            config,
            engine_config,
            store,
            hub,
            engine,
        })
    }
}
