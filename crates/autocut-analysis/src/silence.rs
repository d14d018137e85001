//! Energy-based silence detection over a streaming PCM feed.
//!
//! The analyzer consumes interleaved s16le samples in 10 ms windows and
//! drives a two-state machine:
//!
//! ```text
//!               level_db <= threshold
//!     ┌─────────────────────────────────────┐
//!     ▼                                     │
//! ┌─────────┐                         ┌──────────┐
//! │InSilence│─────────────────────────│ InSpeech │
//! └─────────┘   level_db > threshold  └──────────┘
//!     │
//!     │  run >= min_silence  →  emit interval
//!     ▼
//! ```
//!
//! Output intervals are sorted, non-overlapping and each at least
//! `min_silence_ms` long. The analysis is deterministic for identical input.

use std::time::{Duration, Instant};

use tracing::debug;

use autocut_models::TimeInterval;

/// Full scale of an s16 sample.
const FULL_SCALE: f64 = 32768.0;

/// Minimum wall time between two progress reports.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Receiver for fractional progress updates in [0, 1].
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f64);
}

/// A sink that discards all updates.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn report(&self, _fraction: f64) {}
}

impl<F: Fn(f64) + Send + Sync> ProgressSink for F {
    fn report(&self, fraction: f64) {
        self(fraction)
    }
}

/// Internal state for the silence state machine.
enum State {
    InSpeech,
    InSilence { start_window: u64 },
}

/// Streaming silence analyzer.
pub struct SilenceAnalyzer {
    sample_rate: u32,
    channels: usize,
    threshold_db: f64,
    min_silence_ms: u64,
    /// Expected total windows, for progress fractions.
    expected_windows: u64,
    /// Window size in frames (10 ms).
    window_frames: usize,
    /// Partial window carry-over, interleaved samples.
    buffer: Vec<i16>,
    windows_processed: u64,
    state: State,
    silences: Vec<TimeInterval>,
    last_report: Option<Instant>,
}

impl SilenceAnalyzer {
    /// Create an analyzer for a stream of `expected_frames` frames.
    ///
    /// `expected_frames` only scales progress reporting; a shorter or longer
    /// stream is tolerated.
    pub fn new(
        sample_rate: u32,
        channels: u16,
        threshold_db: f64,
        min_silence_ms: u32,
        expected_frames: u64,
    ) -> Self {
        let window_frames = (sample_rate / 100).max(1) as usize;
        let expected_windows = expected_frames.div_ceil(window_frames as u64).max(1);
        Self {
            sample_rate,
            channels: channels.max(1) as usize,
            threshold_db,
            min_silence_ms: min_silence_ms as u64,
            expected_windows,
            window_frames,
            buffer: Vec::with_capacity(window_frames * channels.max(1) as usize),
            windows_processed: 0,
            // Silence until the first speech window, so leading dead air is caught.
            state: State::InSilence { start_window: 0 },
            silences: Vec::new(),
            last_report: None,
        }
    }

    /// Feed a batch of interleaved samples.
    pub fn push_samples(&mut self, samples: &[i16], sink: &dyn ProgressSink) {
        self.buffer.extend_from_slice(samples);

        let window_samples = self.window_frames * self.channels;
        let mut offset = 0;
        while self.buffer.len() - offset >= window_samples {
            let window = self.buffer[offset..offset + window_samples].to_vec();
            self.ingest_window(&window);
            offset += window_samples;
        }
        self.buffer.drain(..offset);

        self.maybe_report(sink);
    }

    /// Finish the stream and return the detected silence intervals.
    ///
    /// A trailing partial window is evaluated like a full one; an open
    /// silence run is closed at the end of the stream.
    pub fn finish(mut self, sink: &dyn ProgressSink) -> Vec<TimeInterval> {
        if !self.buffer.is_empty() {
            let tail = std::mem::take(&mut self.buffer);
            self.ingest_window(&tail);
        }

        let total_windows = self.windows_processed;
        if let State::InSilence { start_window } = &self.state {
            let start = *start_window;
            self.close_run(start, total_windows);
        }

        sink.report(1.0);
        debug!(
            windows = total_windows,
            silences = self.silences.len(),
            "Silence analysis complete"
        );
        self.silences
    }

    /// Time of a window boundary in seconds.
    fn window_time(&self, window: u64) -> f64 {
        (window * self.window_frames as u64) as f64 / self.sample_rate as f64
    }

    fn ingest_window(&mut self, window: &[i16]) {
        let index = self.windows_processed;
        self.windows_processed += 1;

        let silent = self.is_silent(window);
        match (&self.state, silent) {
            (State::InSpeech, true) => {
                self.state = State::InSilence {
                    start_window: index,
                };
            }
            (State::InSilence { start_window }, false) => {
                let start = *start_window;
                self.close_run(start, index);
                self.state = State::InSpeech;
            }
            _ => {}
        }
    }

    /// Close a silence run `[start_window, end_window)`, emitting it when it
    /// meets the minimum duration. Sub-threshold runs are discarded.
    fn close_run(&mut self, start_window: u64, end_window: u64) {
        let run_ms = (end_window - start_window) * 10;
        if run_ms >= self.min_silence_ms {
            self.silences.push(TimeInterval::new(
                self.window_time(start_window),
                self.window_time(end_window),
            ));
        }
    }

    /// RMS level of a window against the dBFS threshold. Channels are
    /// averaged per frame; an all-zero window counts as -inf.
    fn is_silent(&self, window: &[i16]) -> bool {
        let frames = window.len() / self.channels;
        if frames == 0 {
            return true;
        }
        let mut sum_sq = 0.0f64;
        for frame in window.chunks_exact(self.channels) {
            let mean: f64 =
                frame.iter().map(|&s| s as f64).sum::<f64>() / self.channels as f64;
            sum_sq += mean * mean;
        }
        let rms = (sum_sq / frames as f64).sqrt();
        if rms == 0.0 {
            return true;
        }
        let level_db = 20.0 * (rms / FULL_SCALE).log10();
        level_db <= self.threshold_db
    }

    /// Rate-limited progress: at most one update per ~200 ms of wall time.
    fn maybe_report(&mut self, sink: &dyn ProgressSink) {
        let due = self
            .last_report
            .map(|t| t.elapsed() >= PROGRESS_INTERVAL)
            .unwrap_or(true);
        if due {
            let fraction =
                (self.windows_processed as f64 / self.expected_windows as f64).min(1.0);
            sink.report(fraction);
            self.last_report = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocut_models::interval::is_sorted_disjoint;

    /// A -20 dBFS square-ish tone: constant amplitude 3277 (~ -20 dB).
    fn tone(frames: usize) -> Vec<i16> {
        (0..frames).map(|i| if i % 2 == 0 { 3277 } else { -3277 }).collect()
    }

    fn silence(frames: usize) -> Vec<i16> {
        vec![0i16; frames]
    }

    fn analyze(samples: &[i16], sample_rate: u32, threshold_db: f64, min_ms: u32) -> Vec<TimeInterval> {
        let mut analyzer = SilenceAnalyzer::new(
            sample_rate,
            1,
            threshold_db,
            min_ms,
            samples.len() as u64,
        );
        analyzer.push_samples(samples, &NoopSink);
        analyzer.finish(&NoopSink)
    }

    #[test]
    fn test_tone_silence_tone() {
        // 10 s at 44100 Hz: tone 0-4 s, silence 4-6 s, tone 6-10 s.
        let sr = 44_100;
        let mut samples = tone(4 * sr);
        samples.extend(silence(2 * sr));
        samples.extend(tone(4 * sr));

        let silences = analyze(&samples, sr as u32, -45.0, 800);
        assert_eq!(silences.len(), 1);
        assert!((silences[0].start_s - 4.0).abs() < 0.02);
        assert!((silences[0].end_s - 6.0).abs() < 0.02);
    }

    #[test]
    fn test_empty_stream() {
        let silences = analyze(&[], 44_100, -45.0, 800);
        assert!(silences.is_empty());
    }

    #[test]
    fn test_all_silent_stream() {
        let sr = 44_100;
        let silences = analyze(&silence(2 * sr), sr as u32, -45.0, 800);
        assert_eq!(silences.len(), 1);
        assert!(silences[0].start_s.abs() < 1e-9);
        assert!((silences[0].end_s - 2.0).abs() < 0.02);
    }

    #[test]
    fn test_no_silence_in_continuous_tone() {
        let sr = 44_100;
        let silences = analyze(&tone(3 * sr), sr as u32, -45.0, 800);
        assert!(silences.is_empty());
    }

    #[test]
    fn test_short_silence_discarded() {
        // A 700 ms run is below the 800 ms minimum and is discarded.
        let sr = 44_100;
        let mut samples = tone(2 * sr);
        samples.extend(silence(sr * 7 / 10));
        samples.extend(tone(2 * sr));

        let silences = analyze(&samples, sr as u32, -45.0, 800);
        assert!(silences.is_empty());
    }

    #[test]
    fn test_min_silence_longer_than_stream() {
        let sr = 44_100;
        let silences = analyze(&silence(sr), sr as u32, -45.0, 5000);
        assert!(silences.is_empty());
    }

    #[test]
    fn test_stereo_averages_channels() {
        // Opposite-phase full-scale channels average to zero: silent.
        let sr = 8_000usize;
        let mut samples = Vec::with_capacity(sr * 2 * 2);
        for _ in 0..sr * 2 {
            samples.push(20_000i16);
            samples.push(-20_000i16);
        }
        let mut analyzer = SilenceAnalyzer::new(sr as u32, 2, -45.0, 800, (sr * 2) as u64);
        analyzer.push_samples(&samples, &NoopSink);
        let silences = analyzer.finish(&NoopSink);
        assert_eq!(silences.len(), 1);
    }

    #[test]
    fn test_determinism_and_invariants() {
        let sr = 22_050;
        let mut samples = tone(sr);
        samples.extend(silence(sr));
        samples.extend(tone(sr / 2));
        samples.extend(silence(2 * sr));
        samples.extend(tone(sr));

        let a = analyze(&samples, sr as u32, -45.0, 800);
        let b = analyze(&samples, sr as u32, -45.0, 800);
        assert_eq!(a, b);
        assert!(is_sorted_disjoint(&a));
        for iv in &a {
            assert!(iv.duration_s() * 1000.0 >= 800.0 - 1e-6);
        }
    }

    #[test]
    fn test_split_feeding_matches_single_feed() {
        // Feeding in odd-sized batches must not change the result.
        let sr = 22_050;
        let mut samples = tone(sr);
        samples.extend(silence(sr));
        samples.extend(tone(sr));

        let whole = analyze(&samples, sr as u32, -45.0, 800);

        let mut analyzer = SilenceAnalyzer::new(sr as u32, 1, -45.0, 800, samples.len() as u64);
        for chunk in samples.chunks(997) {
            analyzer.push_samples(chunk, &NoopSink);
        }
        let split = analyzer.finish(&NoopSink);

        assert_eq!(whole, split);
    }
}
