//! The analysis engine: bounded worker pool with per-job cancellation.
//!
//! At most one analysis runs per job; concurrency across jobs is bounded by
//! a FIFO semaphore (default 2 permits). Cancellation flips a per-job watch
//! flag; the pipeline observes it at its next checkpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};

use autocut_analysis::Transcriber;
use autocut_models::{JobId, JobStatus, ProgressMessage};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::pipeline::{cleanup_outputs, run_pipeline, PipelineContext};
use crate::progress::ProgressHub;
use crate::store::JobStore;

/// Orchestrates analysis jobs on a dedicated worker pool.
///
/// The pool is its own tokio runtime on separate threads, so long-running
/// decode and analysis work never blocks the request-handling scheduler.
pub struct AnalysisEngine {
    ctx: PipelineContext,
    worker: tokio::runtime::Handle,
    semaphore: Arc<Semaphore>,
    cancels: Mutex<HashMap<JobId, watch::Sender<bool>>>,
}

impl AnalysisEngine {
    /// Create the engine with its collaborators.
    pub fn new(
        config: EngineConfig,
        store: Arc<JobStore>,
        hub: Arc<ProgressHub>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Arc<Self> {
        let permits = config.max_concurrent_analyses.max(1);
        Arc::new(Self {
            ctx: PipelineContext {
                config,
                store,
                hub,
                transcriber,
            },
            worker: spawn_worker_runtime(permits.max(2)),
            semaphore: Arc::new(Semaphore::new(permits)),
            cancels: Mutex::new(HashMap::new()),
        })
    }

    /// Queue a job for analysis. Returns immediately; the analysis runs on
    /// the worker pool as soon as a permit frees up (FIFO).
    pub fn submit(self: Arc<Self>, job_id: JobId) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancels
            .lock()
            .expect("cancel map lock")
            .insert(job_id.clone(), cancel_tx);

        self.worker.clone().spawn(async move {
            self.run_job(job_id, cancel_rx).await;
        });
    }

    /// Cancel a job. Idempotent; cancelling a terminal job is a no-op.
    pub async fn cancel(&self, job_id: &JobId) -> EngineResult<()> {
        let record = self
            .ctx
            .store
            .get(job_id)
            .await
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        if record.status.is_terminal() {
            return Ok(());
        }

        let flagged = {
            let cancels = self.cancels.lock().expect("cancel map lock");
            match cancels.get(job_id) {
                Some(tx) => tx.send(true).is_ok(),
                None => false,
            }
        };

        if flagged {
            // The running task observes the flag at its next checkpoint and
            // performs the terminal transition itself.
            info!(job_id = %job_id, "Cancellation requested");
            return Ok(());
        }

        // No task owns this job (still uploading / never submitted): the
        // transition happens here.
        self.finish_cancelled(job_id).await;
        Ok(())
    }

    async fn run_job(self: Arc<Self>, job_id: JobId, mut cancel_rx: watch::Receiver<bool>) {
        // FIFO queueing; cancellation interrupts the wait for a permit.
        let permit = tokio::select! {
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                match permit {
                    Ok(p) => p,
                    Err(_) => return,
                }
            }
            _ = cancel_rx.changed() => {
                self.finish_cancelled(&job_id).await;
                self.cancels.lock().expect("cancel map lock").remove(&job_id);
                return;
            }
        };

        if *cancel_rx.borrow() {
            self.finish_cancelled(&job_id).await;
        } else {
            let result = run_pipeline(&self.ctx, &job_id, cancel_rx).await;
            match result {
                Ok((report, paths)) => {
                    let stored = async {
                        self.ctx
                            .store
                            .set_result(&job_id, report.clone(), paths)
                            .await?;
                        self.ctx
                            .store
                            .transition(&job_id, JobStatus::Completed, "analysis complete")
                            .await
                    }
                    .await;
                    match stored {
                        Ok(_) => {
                            info!(job_id = %job_id, cuts = report.cuts.len(), "Job completed");
                            self.ctx
                                .hub
                                .publish(&job_id, ProgressMessage::result(report));
                        }
                        Err(e) => {
                            error!(job_id = %job_id, error = %e, "Failed to record completion");
                            self.finish_failed(&job_id, &e).await;
                        }
                    }
                }
                Err(EngineError::Cancelled) => {
                    self.finish_cancelled(&job_id).await;
                }
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "Job failed");
                    self.finish_failed(&job_id, &e).await;
                }
            }
        }

        drop(permit);
        self.cancels.lock().expect("cancel map lock").remove(&job_id);
    }

    /// Terminal bookkeeping for a cancelled job: record, subscribers,
    /// partial outputs.
    async fn finish_cancelled(&self, job_id: &JobId) {
        cleanup_outputs(&self.ctx.config, job_id).await;
        match self
            .ctx
            .store
            .transition(job_id, JobStatus::Cancelled, "cancelled by user")
            .await
        {
            Ok(_) => {
                self.ctx
                    .hub
                    .publish(job_id, ProgressMessage::error("cancelled"));
                info!(job_id = %job_id, "Job cancelled");
            }
            Err(e) => warn!(job_id = %job_id, error = %e, "Cancel transition failed"),
        }
    }

    async fn finish_failed(&self, job_id: &JobId, err: &EngineError) {
        let reason = err.reason();
        match self
            .ctx
            .store
            .transition(
                job_id,
                JobStatus::Failed {
                    reason: reason.clone(),
                },
                err.to_string(),
            )
            .await
        {
            Ok(_) => {
                self.ctx.hub.publish(job_id, ProgressMessage::error(reason));
            }
            Err(e) => warn!(job_id = %job_id, error = %e, "Failure transition failed"),
        }
    }
}

/// Start the worker-pool runtime on its own threads and hand back a
/// spawn handle. The owning thread parks on a pending future for the
/// process lifetime.
fn spawn_worker_runtime(threads: usize) -> tokio::runtime::Handle {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::Builder::new()
        .name("autocut-worker-pool".to_string())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads)
                .thread_name("autocut-worker")
                .enable_all()
                .build()
                .expect("failed to build worker runtime");
            tx.send(runtime.handle().clone())
                .expect("worker runtime handoff");
            runtime.block_on(std::future::pending::<()>());
        })
        .expect("failed to spawn worker pool thread");
    rx.recv().expect("worker runtime handle")
}
