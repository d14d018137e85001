//! The typed job store.
//!
//! One `JobRecord` per job, held in memory and mirrored to
//! `<output_root>/jobs/<id>.json` on every transition. Writes happen only
//! from the orchestrator task for a given job; readers get snapshots.
//!
//! On startup the store reloads existing records and marks any job that was
//! still in flight as `Failed { interrupted }` — there is no resume.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use autocut_models::{AnalysisReport, JobId, JobRecord, JobStatus, ResultPaths};

use crate::error::{EngineError, EngineResult};

/// Durable store of job records.
pub struct JobStore {
    dir: PathBuf,
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobStore {
    /// Open the store, reloading persisted records.
    pub async fn open(dir: PathBuf) -> EngineResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;

        let mut jobs = HashMap::new();
        let mut interrupted = 0usize;

        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = match tokio::fs::read(&path).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable job record");
                    continue;
                }
            };
            let mut record: JobRecord = match serde_json::from_slice(&bytes) {
                Ok(r) => r,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping corrupt job record");
                    continue;
                }
            };

            if !record.status.is_terminal() {
                record.status = JobStatus::Failed {
                    reason: EngineError::Interrupted.reason(),
                };
                record.message = "process restarted during analysis".to_string();
                record.timings.finished_at = Some(chrono::Utc::now());
                Self::persist_record(&dir, &record).await?;
                interrupted += 1;
            }

            jobs.insert(record.id.clone(), record);
        }

        if !jobs.is_empty() {
            info!(
                jobs = jobs.len(),
                interrupted, "Reloaded job records from disk"
            );
        }

        Ok(Self {
            dir,
            jobs: RwLock::new(jobs),
        })
    }

    /// Insert a freshly admitted job.
    pub async fn insert(&self, record: JobRecord) -> EngineResult<()> {
        Self::persist_record(&self.dir, &record).await?;
        self.jobs.write().await.insert(record.id.clone(), record);
        Ok(())
    }

    /// Snapshot of one record.
    pub async fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Apply a status transition, persist it, and return the new snapshot.
    ///
    /// Progress inside `Analyzing` is forced monotone. Illegal transitions
    /// are rejected as internal errors.
    pub async fn transition(
        &self,
        id: &JobId,
        mut next: JobStatus,
        message: impl Into<String>,
    ) -> EngineResult<JobRecord> {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| EngineError::JobNotFound(id.clone()))?;

        // Clamp progress so subscribers never see it go backwards.
        if let (
            JobStatus::Analyzing {
                progress: current, ..
            },
            JobStatus::Analyzing { progress, .. },
        ) = (&record.status, &mut next)
        {
            if *progress < *current {
                *progress = *current;
            }
        }

        if !record.status.can_transition_to(&next) {
            let err = EngineError::IllegalTransition {
                from: record.status.label().to_string(),
                to: next.label().to_string(),
            };
            error!(job_id = %id, %err, "Rejected job state transition");
            return Err(err);
        }

        record.status = next;
        record.message = message.into();
        match &record.status {
            JobStatus::Analyzing { .. } if record.timings.analysis_started_at.is_none() => {
                record.timings.analysis_started_at = Some(chrono::Utc::now());
            }
            s if s.is_terminal() => {
                record.timings.finished_at = Some(chrono::Utc::now());
            }
            _ => {}
        }

        let snapshot = record.clone();
        Self::persist_record(&self.dir, &snapshot).await?;
        Ok(snapshot)
    }

    /// Attach the final report and result paths to a job.
    pub async fn set_result(
        &self,
        id: &JobId,
        report: AnalysisReport,
        result_paths: ResultPaths,
    ) -> EngineResult<JobRecord> {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| EngineError::JobNotFound(id.clone()))?;
        record.report = Some(report);
        record.result_paths = result_paths;
        let snapshot = record.clone();
        Self::persist_record(&self.dir, &snapshot).await?;
        Ok(snapshot)
    }

    /// Persist a record atomically (write-then-rename).
    async fn persist_record(dir: &std::path::Path, record: &JobRecord) -> EngineResult<()> {
        let path = dir.join(format!("{}.json", record.id));
        let tmp = dir.join(format!("{}.json.tmp", record.id));
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
