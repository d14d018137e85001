//! Streaming PCM decode through an external decoder process.
//!
//! The decoder child writes interleaved s16le frames on stdout and
//! line-delimited `key=value` progress reports on stderr. The caller pulls
//! sample batches, and on cancellation the child is killed and reaped.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// How much trailing stderr to keep for error reports (~4 KB).
const STDERR_TAIL_BYTES: usize = 4096;

/// Decoder process configuration.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Path or name of the decoder binary.
    pub binary: PathBuf,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl DecoderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            binary: std::env::var("DECODER_BINARY")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("ffmpeg")),
        }
    }

    /// Verify the binary is resolvable.
    pub fn check(&self) -> MediaResult<()> {
        which::which(&self.binary)
            .map(|_| ())
            .map_err(|_| MediaError::DecoderNotFound(self.binary.display().to_string()))
    }
}

/// A running decode: owns the child process and its stdout pipe.
pub struct PcmDecoder {
    child: Child,
    stdout: ChildStdout,
    stderr_task: JoinHandle<()>,
    stderr_tail: Arc<Mutex<String>>,
    channels: u16,
    /// Carry-over byte when a read ends mid-sample.
    pending_byte: Option<u8>,
    eof: bool,
}

impl PcmDecoder {
    /// Spawn the decoder for `path`, resampling to `sample_rate` Hz with
    /// `channels` interleaved channels of s16le on stdout.
    ///
    /// The input path is passed as a distinct argv element; nothing is
    /// shell-composed.
    pub async fn spawn(
        config: &DecoderConfig,
        path: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> MediaResult<Self> {
        config.check()?;

        let mut child = Command::new(&config.binary)
            .arg("-v")
            .arg("error")
            .arg("-progress")
            .arg("pipe:2")
            .arg("-i")
            .arg(path)
            .arg("-vn")
            .arg("-ar")
            .arg(sample_rate.to_string())
            .arg("-ac")
            .arg(channels.to_string())
            .arg("-f")
            .arg("s16le")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");

        let stderr_tail = Arc::new(Mutex::new(String::new()));
        let tail = Arc::clone(&stderr_tail);
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                // Progress lines (out_time_ms=..., speed=...) are noise at
                // this level; the analyzer derives its own progress.
                if let Some((key, value)) = line.split_once('=') {
                    if key == "out_time_ms" {
                        debug!(out_time_ms = value, "decoder progress");
                        continue;
                    }
                    if matches!(key, "frame" | "fps" | "speed" | "progress" | "bitrate" | "total_size" | "out_time" | "out_time_us" | "dup_frames" | "drop_frames" | "stream_0_0_q") {
                        continue;
                    }
                }
                let mut tail = tail.lock().expect("stderr tail lock");
                tail.push_str(&line);
                tail.push('\n');
                if tail.len() > STDERR_TAIL_BYTES {
                    let cut = tail.len() - STDERR_TAIL_BYTES;
                    tail.drain(..cut);
                }
            }
        });

        debug!(
            path = %path.display(),
            sample_rate,
            channels,
            "Spawned PCM decoder"
        );

        Ok(Self {
            child,
            stdout,
            stderr_task,
            stderr_tail,
            channels,
            pending_byte: None,
            eof: false,
        })
    }

    /// Channel count of the emitted stream.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Read the next batch of interleaved samples, up to `max_frames`
    /// frames. Returns `None` at end of stream. A short stream still
    /// delivers everything received.
    pub async fn next_batch(&mut self, max_frames: usize) -> MediaResult<Option<Vec<i16>>> {
        if self.eof {
            return Ok(None);
        }

        let want_bytes = max_frames * self.channels as usize * 2;
        let mut buf = Vec::with_capacity(want_bytes + 1);
        if let Some(byte) = self.pending_byte.take() {
            buf.push(byte);
        }

        while buf.len() < want_bytes {
            let mut chunk = vec![0u8; want_bytes - buf.len()];
            let n = self.stdout.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        if buf.is_empty() {
            return Ok(None);
        }

        // Keep a trailing odd byte for the next batch.
        if buf.len() % 2 != 0 {
            self.pending_byte = buf.pop();
        }

        let samples: Vec<i16> = buf
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();

        if samples.is_empty() {
            return Ok(None);
        }
        Ok(Some(samples))
    }

    /// Wait for the child to exit and check its status.
    ///
    /// A non-zero exit surfaces the stderr tail per the toolchain contract.
    pub async fn finish(mut self) -> MediaResult<()> {
        // Drain any remaining stdout so the child is not blocked on a full pipe.
        let mut sink = Vec::new();
        let _ = self.stdout.read_to_end(&mut sink).await;

        let status = self.child.wait().await?;
        let _ = self.stderr_task.await;

        if status.success() {
            Ok(())
        } else {
            let tail = self
                .stderr_tail
                .lock()
                .expect("stderr tail lock")
                .clone();
            Err(MediaError::toolchain_failed(tail, status.code()))
        }
    }

    /// Kill the child and reap it. Used on cancellation; never orphans.
    pub async fn kill(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill decoder child: {}", e);
        }
        let _ = self.child.wait().await;
        self.stderr_task.abort();
    }
}

/// Extract audio to a mono 16 kHz WAV for the transcription collaborator.
pub async fn extract_wav(config: &DecoderConfig, input: &Path, output: &Path) -> MediaResult<()> {
    config.check()?;

    let status = Command::new(&config.binary)
        .arg("-v")
        .arg("error")
        .arg("-i")
        .arg(input)
        .arg("-vn")
        .arg("-ar")
        .arg("16000")
        .arg("-ac")
        .arg("1")
        .arg("-f")
        .arg("wav")
        .arg("-y")
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !status.success() {
        return Err(MediaError::toolchain_failed(
            "audio extraction failed",
            status.code(),
        ));
    }

    let metadata = tokio::fs::metadata(output).await?;
    if metadata.len() == 0 {
        return Err(MediaError::InvalidMedia("no audio data extracted".into()));
    }

    Ok(())
}
