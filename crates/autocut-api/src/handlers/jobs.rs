//! Job status, cancellation and export download.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use autocut_models::{JobId, JobRecord, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Status payload returned by `GET /api/jobs/{id}`.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub status: String,
    pub progress: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/jobs/{id}` — read one job's status.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job_id = JobId::from_string(job_id);
    let record = state
        .store
        .get(&job_id)
        .await
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    let error = match &record.status {
        JobStatus::Failed { reason } => Some(reason.clone()),
        _ => None,
    };

    Ok(Json(JobStatusResponse {
        status: record.status.label().to_string(),
        progress: record.status.progress(),
        message: record.message.clone(),
        result: result_summary(&record),
        error,
    }))
}

/// `POST /api/jobs/{id}/cancel` — idempotent cancellation.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let job_id = JobId::from_string(job_id);
    state.engine.cancel(&job_id).await?;
    metrics::record_job_cancelled();
    Ok(Json(json!({ "job_id": job_id, "status": "cancel_requested" })))
}

/// `GET /api/jobs/{id}/exports/{kind}` — download a produced file.
pub async fn download_export(
    State(state): State<AppState>,
    Path((job_id, kind)): Path<(String, String)>,
) -> ApiResult<Response> {
    let job_id = JobId::from_string(job_id);
    let record = state
        .store
        .get(&job_id)
        .await
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    if record.status != JobStatus::Completed {
        return Err(ApiError::Conflict("job not completed yet".to_string()));
    }

    let (path, content_type) = match kind.as_str() {
        "legacy" => (record.result_paths.legacy_xml.clone(), "application/xml"),
        "structural" => (record.result_paths.structural_xml.clone(), "application/xml"),
        "srt" => (record.result_paths.srt.clone(), "application/x-subrip"),
        "vtt" => (record.result_paths.vtt.clone(), "text/vtt"),
        "txt" => (record.result_paths.txt.clone(), "text/plain; charset=utf-8"),
        other => {
            return Err(ApiError::bad_request(format!(
                "unknown export kind: {}",
                other
            )))
        }
    };

    let path = path.ok_or_else(|| ApiError::not_found("export not produced for this job"))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found("export file missing on disk"))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.{}", job_id, kind));

    info!(job_id = %job_id, kind = %kind, "Export downloaded");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Result summary with download URLs, present once the job completed.
fn result_summary(record: &JobRecord) -> Option<Value> {
    let report = record.report.as_ref()?;
    let base = format!("/api/jobs/{}/exports", record.id);

    let mut exports = json!({
        "legacy": format!("{}/legacy", base),
        "structural": format!("{}/structural", base),
    });
    if record.result_paths.srt.is_some() {
        exports["srt"] = json!(format!("{}/srt", base));
        exports["vtt"] = json!(format!("{}/vtt", base));
        exports["txt"] = json!(format!("{}/txt", base));
    }

    Some(json!({
        "duration_s": report.duration_s,
        "total_kept_s": report.total_kept_s(),
        "total_removed_s": report.total_removed_s(),
        "cuts": report.cuts.len(),
        "silences": report.silences.len(),
        "fillers": report.fillers.len(),
        "fps": report.fps.display_value(),
        "exports": exports,
    }))
}
