//! Engine configuration.

use std::path::{Path, PathBuf};

use autocut_media::DecoderConfig;

use crate::error::{EngineError, EngineResult};

/// File extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "mov"];

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root for exported files and job records.
    pub output_root: PathBuf,
    /// Root for uploaded source media.
    pub upload_root: PathBuf,
    /// Uploads above this size are refused.
    pub max_upload_bytes: u64,
    /// Upper bound on concurrent analyses (semaphore permits).
    pub max_concurrent_analyses: usize,
    /// External decoder binary.
    pub decoder: DecoderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            upload_root: PathBuf::from("uploads"),
            max_upload_bytes: 10 * 1024 * 1024 * 1024, // 10 GB
            max_concurrent_analyses: 2,
            decoder: DecoderConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            output_root: std::env::var("OUTPUT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output")),
            upload_root: std::env::var("UPLOAD_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024 * 1024),
            max_concurrent_analyses: std::env::var("MAX_CONCURRENT_ANALYSES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            decoder: DecoderConfig::from_env(),
        }
    }

    /// Directory holding one JSON record per job.
    pub fn jobs_dir(&self) -> PathBuf {
        self.output_root.join("jobs")
    }

    /// Job-scoped output directory.
    pub fn job_output_dir(&self, job_id: &str) -> PathBuf {
        self.output_root.join(job_id)
    }

    /// Job-scoped upload directory.
    pub fn job_upload_dir(&self, job_id: &str) -> PathBuf {
        self.upload_root.join(job_id)
    }

    /// Whether a filename carries an allowed media extension.
    pub fn extension_allowed(filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Validate that a source path resolves inside the upload root with an
    /// allowed extension. Runs before the decoder is ever invoked.
    pub fn validate_source_path(&self, path: &Path) -> EngineResult<()> {
        let canonical = path
            .canonicalize()
            .map_err(|e| EngineError::input_invalid(format!("unreadable source path: {}", e)))?;
        let root = self.upload_root.canonicalize().map_err(|e| {
            EngineError::input_invalid(format!("upload root unavailable: {}", e))
        })?;
        if !canonical.starts_with(&root) {
            return Err(EngineError::input_invalid(
                "source path escapes the upload directory",
            ));
        }
        let name = canonical
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if !Self::extension_allowed(name) {
            return Err(EngineError::input_invalid(format!(
                "unsupported extension for {}; allowed: {}",
                name,
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_allowed() {
        assert!(EngineConfig::extension_allowed("talk.mp4"));
        assert!(EngineConfig::extension_allowed("Talk.MOV"));
        assert!(!EngineConfig::extension_allowed("talk.avi"));
        assert!(!EngineConfig::extension_allowed("talk"));
    }

    #[test]
    fn test_source_path_must_stay_inside_upload_root() {
        let upload_root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();

        let config = EngineConfig {
            upload_root: upload_root.path().to_path_buf(),
            ..EngineConfig::default()
        };

        let inside_path = upload_root.path().join("job1").join("talk.mp4");
        std::fs::create_dir_all(inside_path.parent().unwrap()).unwrap();
        std::fs::write(&inside_path, b"x").unwrap();
        assert!(config.validate_source_path(&inside_path).is_ok());

        let outside_path = outside.path().join("talk.mp4");
        std::fs::write(&outside_path, b"x").unwrap();
        assert!(matches!(
            config.validate_source_path(&outside_path),
            Err(EngineError::InputInvalid(_))
        ));

        let bad_ext = upload_root.path().join("talk.avi");
        std::fs::write(&bad_ext, b"x").unwrap();
        assert!(config.validate_source_path(&bad_ext).is_err());
    }
}
