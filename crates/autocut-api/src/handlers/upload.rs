//! Upload admission.
//!
//! A multipart request with one `file` part and an optional `options` part
//! (JSON configuration block, unknown options rejected). Option values are
//! validated before any job record is created; the media bytes stream to
//! the job's upload directory with the size cap enforced mid-stream.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use autocut_engine::EngineConfig;
use autocut_models::{AnalysisSettings, JobId, JobRecord, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Response for a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: JobId,
    pub filename: String,
    pub status: String,
    pub message: String,
}

/// `POST /api/jobs` — admit a new job.
pub async fn upload_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let job_id = JobId::new();

    let outcome: ApiResult<(StagedFile, AnalysisSettings)> = async {
        let mut settings: Option<AnalysisSettings> = None;
        let mut staged: Option<StagedFile> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
        {
            match field.name() {
                Some("options") => {
                    let text = field.text().await.map_err(|e| {
                        ApiError::bad_request(format!("unreadable options part: {}", e))
                    })?;
                    let parsed: AnalysisSettings = serde_json::from_str(&text)
                        .map_err(|e| ApiError::bad_request(format!("invalid options: {}", e)))?;
                    parsed
                        .validate()
                        .map_err(|e| ApiError::bad_request(e.to_string()))?;
                    settings = Some(parsed);
                }
                Some("file") => {
                    if staged.is_some() {
                        return Err(ApiError::bad_request("more than one file part"));
                    }
                    staged = Some(stream_file(&state.engine_config, &job_id, field).await?);
                }
                other => {
                    return Err(ApiError::bad_request(format!(
                        "unknown multipart field: {}",
                        other.unwrap_or("<unnamed>")
                    )));
                }
            }
        }

        let staged = staged.ok_or_else(|| ApiError::bad_request("missing file part"))?;
        Ok((staged, settings.unwrap_or_default()))
    }
    .await;

    let (staged, settings) = match outcome {
        Ok(v) => v,
        Err(e) => {
            // Nothing was admitted; remove any partially staged bytes.
            remove_job_upload(&state.engine_config, &job_id).await;
            return Err(e);
        }
    };

    let record = JobRecord::with_id(
        job_id.clone(),
        staged.filename.clone(),
        staged.path.clone(),
        settings,
    );
    state.store.insert(record).await?;
    state
        .store
        .transition(&job_id, JobStatus::Uploaded, "upload complete")
        .await?;

    info!(
        job_id = %job_id,
        filename = %staged.filename,
        bytes = staged.bytes,
        "Upload admitted"
    );
    metrics::record_job_admitted();

    state.engine.clone().submit(job_id.clone());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            job_id,
            filename: staged.filename,
            status: "uploaded".to_string(),
            message: "Upload complete, analysis queued.".to_string(),
        }),
    ))
}

struct StagedFile {
    filename: String,
    path: std::path::PathBuf,
    bytes: u64,
}

/// Stream one multipart file field to the job's upload directory.
async fn stream_file(
    config: &EngineConfig,
    job_id: &JobId,
    mut field: axum::extract::multipart::Field<'_>,
) -> ApiResult<StagedFile> {
    let filename = sanitize_filename(
        field
            .file_name()
            .ok_or_else(|| ApiError::bad_request("file part has no filename"))?,
    );
    if filename.is_empty() {
        return Err(ApiError::bad_request("empty filename"));
    }
    if !EngineConfig::extension_allowed(&filename) {
        return Err(ApiError::bad_request(format!(
            "unsupported file format: {}",
            filename
        )));
    }

    let dir = config.job_upload_dir(job_id.as_str());
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ApiError::internal(format!("cannot create upload directory: {}", e)))?;
    let path = dir.join(&filename);

    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| ApiError::internal(format!("cannot create upload file: {}", e)))?;

    let mut bytes: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_request(format!("upload stream aborted: {}", e)))?
    {
        bytes += chunk.len() as u64;
        if bytes > config.max_upload_bytes {
            warn!(job_id = %job_id, bytes, "Upload exceeds size cap");
            return Err(ApiError::PayloadTooLarge);
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("cannot write upload: {}", e)))?;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("cannot flush upload: {}", e)))?;

    if bytes == 0 {
        return Err(ApiError::bad_request("empty upload"));
    }

    Ok(StagedFile {
        filename,
        path,
        bytes,
    })
}

/// Keep only the base name, with characters safe for a path segment.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect::<String>()
        .trim()
        .to_string()
}

async fn remove_job_upload(config: &EngineConfig, job_id: &JobId) {
    let dir = config.job_upload_dir(job_id.as_str());
    if dir.exists() {
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
