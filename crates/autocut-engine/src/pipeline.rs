//! The per-job analysis pipeline: probe → decode+silence → (transcribe →
//! fillers) → plan → export.
//!
//! Worker tasks suspend only at explicit checkpoints: before each PCM
//! batch (~1 s of audio), after the transcription stage, and before each
//! output file is written. Cancellation is polled at those checkpoints;
//! the decoder child is killed, never orphaned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{info, warn};

use autocut_analysis::{detect_fillers, plan_cuts, SilenceAnalyzer, Transcriber};
use autocut_export::{write_legacy_xml, write_srt, write_structural_xml, write_txt, write_vtt};
use autocut_media::{extract_wav, probe_media, PcmDecoder};
use autocut_models::{
    AnalysisPhase, AnalysisReport, JobId, JobStatus, ProgressMessage, ResultPaths,
    TranscriptSegment,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::progress::ProgressHub;
use crate::store::JobStore;

/// Progress bands per phase, as (start, end) fractions.
const PROBE_AT: f64 = 0.02;
const DECODE_BAND: (f64, f64) = (0.05, 0.60);
const DECODE_BAND_NO_STT: (f64, f64) = (0.05, 0.90);
const TRANSCRIBE_DONE: f64 = 0.85;
const PLANNING_AT: f64 = 0.92;

/// Minimum wall time between persisted progress updates.
const PERSIST_INTERVAL: Duration = Duration::from_millis(200);

/// Shared collaborators for pipeline runs.
pub struct PipelineContext {
    pub config: EngineConfig,
    pub store: Arc<JobStore>,
    pub hub: Arc<ProgressHub>,
    pub transcriber: Arc<dyn Transcriber>,
}

/// Run the full analysis for one job. Returns the report and the paths of
/// everything written.
pub async fn run_pipeline(
    ctx: &PipelineContext,
    job_id: &JobId,
    cancel: watch::Receiver<bool>,
) -> EngineResult<(AnalysisReport, ResultPaths)> {
    let record = ctx
        .store
        .get(job_id)
        .await
        .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;
    let settings = record.settings.clone();

    // Probing
    check_cancel(&cancel)?;
    update_progress(ctx, job_id, PROBE_AT, AnalysisPhase::Probing, "probing container").await?;
    ctx.config.validate_source_path(&record.source_path)?;
    let media = probe_media(&record.source_path).await?;
    if media.duration_s <= 0.0 {
        return Err(EngineError::input_invalid("zero-duration source"));
    }

    // Decoding + silence analysis
    let band = if settings.detect_fillers {
        DECODE_BAND
    } else {
        DECODE_BAND_NO_STT
    };
    update_progress(ctx, job_id, band.0, AnalysisPhase::Decoding, "analyzing audio").await?;

    let sample_rate = media.sample_rate_hz;
    let channels = media.channels.clamp(1, 2);
    let expected_frames = (media.duration_s * sample_rate as f64).ceil() as u64;

    let mut decoder =
        PcmDecoder::spawn(&ctx.config.decoder, &record.source_path, sample_rate, channels).await?;
    let mut analyzer = SilenceAnalyzer::new(
        sample_rate,
        channels,
        settings.silence_threshold_db as f64,
        settings.min_silence_ms,
        expected_frames,
    );

    // The analyzer's sink pushes to live subscribers; the store is updated
    // at batch checkpoints below, on its own rate limit.
    let sink = {
        let hub = Arc::clone(&ctx.hub);
        let job_id = job_id.clone();
        move |fraction: f64| {
            let overall = band.0 + fraction * (band.1 - band.0);
            hub.publish(&job_id, ProgressMessage::progress(overall, "analyzing audio"));
        }
    };

    let batch_frames = sample_rate as usize;
    let mut frames_seen: u64 = 0;
    let mut last_persist = Instant::now();
    loop {
        // Checkpoint before each PCM batch.
        if *cancel.borrow() {
            decoder.kill().await;
            return Err(EngineError::Cancelled);
        }
        match decoder.next_batch(batch_frames).await {
            Ok(Some(samples)) => {
                frames_seen += (samples.len() / channels as usize) as u64;
                analyzer.push_samples(&samples, &sink);

                if last_persist.elapsed() >= PERSIST_INTERVAL {
                    let fraction =
                        (frames_seen as f64 / expected_frames.max(1) as f64).min(1.0);
                    let overall = band.0 + fraction * (band.1 - band.0);
                    ctx.store
                        .transition(
                            job_id,
                            JobStatus::Analyzing {
                                progress: overall,
                                phase: AnalysisPhase::Decoding,
                            },
                            "analyzing audio",
                        )
                        .await?;
                    last_persist = Instant::now();
                }
            }
            Ok(None) => break,
            Err(e) => {
                decoder.kill().await;
                return Err(e.into());
            }
        }
    }
    decoder.finish().await?;
    let silences = analyzer.finish(&sink);
    info!(
        job_id = %job_id,
        silences = silences.len(),
        frames = frames_seen,
        "Silence analysis finished"
    );

    // Transcription and filler detection (optional)
    let mut fillers = Vec::new();
    let mut segments: Vec<TranscriptSegment> = Vec::new();
    if settings.detect_fillers {
        check_cancel(&cancel)?;
        update_progress(
            ctx,
            job_id,
            band.1,
            AnalysisPhase::Transcribing,
            "transcribing audio",
        )
        .await?;

        // Scratch audio lives in the job's upload directory; nothing is
        // deleted during analysis.
        let wav_path = ctx
            .config
            .job_upload_dir(job_id.as_str())
            .join(format!("{}_16k.wav", record.source_stem()));

        match extract_wav(&ctx.config.decoder, &record.source_path, &wav_path).await {
            Ok(()) => {
                match ctx
                    .transcriber
                    .transcribe(&wav_path, settings.transcription_model_size)
                    .await
                {
                    Ok(result) => {
                        segments = result;
                        fillers = detect_fillers(&segments, settings.filler_sensitivity);
                        info!(
                            job_id = %job_id,
                            segments = segments.len(),
                            fillers = fillers.len(),
                            "Transcription finished"
                        );
                        update_progress(
                            ctx,
                            job_id,
                            TRANSCRIBE_DONE,
                            AnalysisPhase::Transcribing,
                            "transcription complete",
                        )
                        .await?;
                    }
                    Err(autocut_analysis::AnalysisError::TranscriptionUnavailable(msg)) => {
                        // Transcription was requested but is optional: the
                        // stage is skipped with a warning.
                        warn!(job_id = %job_id, reason = %msg, "Transcription unavailable, skipping filler detection");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Audio extraction for transcription failed, skipping filler detection");
            }
        }
    }

    // Planning
    check_cancel(&cancel)?;
    update_progress(ctx, job_id, PLANNING_AT, AnalysisPhase::Planning, "planning cuts").await?;
    let cuts = plan_cuts(
        media.duration_s,
        &silences,
        &fillers,
        settings.padding_ms,
        settings.fps,
    )?;
    let report = AnalysisReport {
        duration_s: media.duration_s,
        sample_rate_hz: sample_rate,
        silences,
        fillers,
        cuts,
        padding_ms: settings.padding_ms,
        fps: settings.fps,
    };

    // Exporting
    ctx.store
        .transition(job_id, JobStatus::Exporting, "writing exports")
        .await?;
    ctx.hub
        .publish(job_id, ProgressMessage::progress(0.95, "writing exports"));

    let out_dir = ctx.config.job_output_dir(job_id.as_str());
    tokio::fs::create_dir_all(&out_dir).await?;
    let stem = record.source_stem();
    let mut paths = ResultPaths::default();

    // Checkpoint before each file write.
    check_cancel(&cancel)?;
    let legacy_path = out_dir.join(format!("{}_legacy.xml", stem));
    write_legacy_xml(&report, &record.source_path, &stem, &legacy_path).await?;
    paths.legacy_xml = Some(legacy_path);

    check_cancel(&cancel)?;
    let structural_path = out_dir.join(format!("{}_structural.xml", stem));
    write_structural_xml(&report, &record.source_path, &stem, &structural_path).await?;
    paths.structural_xml = Some(structural_path);

    if !segments.is_empty() {
        check_cancel(&cancel)?;
        let srt_path = out_dir.join(format!("{}.srt", stem));
        write_srt(&segments, &srt_path).await?;
        paths.srt = Some(srt_path);

        let vtt_path = out_dir.join(format!("{}.vtt", stem));
        write_vtt(&segments, &vtt_path).await?;
        paths.vtt = Some(vtt_path);

        let txt_path = out_dir.join(format!("{}.txt", stem));
        write_txt(&segments, &txt_path).await?;
        paths.txt = Some(txt_path);
    }

    Ok((report, paths))
}

/// Remove a cancelled job's partial exports so no half-written EDL remains.
pub async fn cleanup_outputs(config: &EngineConfig, job_id: &JobId) {
    let out_dir = config.job_output_dir(job_id.as_str());
    if out_dir.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(&out_dir).await {
            warn!(job_id = %job_id, error = %e, "Failed to clean up cancelled job outputs");
        }
    }
}

fn check_cancel(cancel: &watch::Receiver<bool>) -> EngineResult<()> {
    if *cancel.borrow() {
        Err(EngineError::Cancelled)
    } else {
        Ok(())
    }
}

async fn update_progress(
    ctx: &PipelineContext,
    job_id: &JobId,
    progress: f64,
    phase: AnalysisPhase,
    message: &str,
) -> EngineResult<()> {
    ctx.store
        .transition(
            job_id,
            JobStatus::Analyzing { progress, phase },
            message,
        )
        .await?;
    ctx.hub
        .publish(job_id, ProgressMessage::progress(progress, message));
    Ok(())
}
