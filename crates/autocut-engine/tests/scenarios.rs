//! End-to-end scenarios over the analysis chain: synthetic PCM through the
//! silence analyzer, filler merge, cut planning and both exporters.

use autocut_analysis::silence::NoopSink;
use autocut_analysis::{detect_fillers, plan_cuts, SilenceAnalyzer};
use autocut_export::legacy::render_legacy_xml;
use autocut_export::structural::render_structural_xml;
use autocut_models::{
    AnalysisReport, Cut, FillerHit, FrameRate, TimeInterval, TranscriptSegment, WordTiming,
};
use std::path::PathBuf;

const SAMPLE_RATE: usize = 44_100;

/// Constant-amplitude tone at roughly -20 dBFS.
fn tone(seconds: f64) -> Vec<i16> {
    let frames = (seconds * SAMPLE_RATE as f64).round() as usize;
    (0..frames)
        .map(|i| if i % 2 == 0 { 3277 } else { -3277 })
        .collect()
}

fn silence(seconds: f64) -> Vec<i16> {
    vec![0i16; (seconds * SAMPLE_RATE as f64).round() as usize]
}

fn run_analyzer(samples: &[i16], threshold_db: f64, min_silence_ms: u32) -> Vec<TimeInterval> {
    let mut analyzer = SilenceAnalyzer::new(
        SAMPLE_RATE as u32,
        1,
        threshold_db,
        min_silence_ms,
        samples.len() as u64,
    );
    // Feed in ~1 s batches, the way the pipeline does.
    for chunk in samples.chunks(SAMPLE_RATE) {
        analyzer.push_samples(chunk, &NoopSink);
    }
    analyzer.finish(&NoopSink)
}

fn report_for(cuts: Vec<Cut>, duration_s: f64, silences: Vec<TimeInterval>) -> AnalysisReport {
    AnalysisReport {
        duration_s,
        sample_rate_hz: SAMPLE_RATE as u32,
        silences,
        fillers: Vec::new(),
        cuts,
        padding_ms: 250,
        fps: FrameRate::Std30,
    }
}

/// Scenario: short clean clip. 10 s with tone 0-4 s, silence 4-6 s,
/// tone 6-10 s; threshold -45 dB, min silence 800 ms, padding 250 ms,
/// fps 30.
#[test]
fn scenario_short_clean_clip() {
    let mut samples = tone(4.0);
    samples.extend(silence(2.0));
    samples.extend(tone(4.0));

    let silences = run_analyzer(&samples, -45.0, 800);
    assert_eq!(silences.len(), 1);
    assert!((silences[0].start_s - 4.0).abs() < 0.02);
    assert!((silences[0].end_s - 6.0).abs() < 0.02);

    // Plan with the exact detected interval pinned to [4, 6).
    let cuts = plan_cuts(
        10.0,
        &[TimeInterval::new(4.0, 6.0)],
        &[],
        250,
        FrameRate::Std30,
    )
    .unwrap();
    assert_eq!(cuts.len(), 2);
    assert!((cuts[0].interval.end_s - 4.125).abs() < 1e-9);
    assert!((cuts[1].interval.start_s - 5.875).abs() < 1e-9);

    let total_frames: u64 = cuts.iter().map(Cut::frames).sum();
    assert_eq!(total_frames, 248);

    let report = report_for(cuts, 10.0, silences);
    let xml = render_legacy_xml(&report, &PathBuf::from("/u/clip.mp4"), "clip").unwrap();
    assert!(xml.contains("<duration>248</duration>"));
}

/// Scenario: two silences that fuse. A gap at or below padding fuses the
/// removals before shrinking; a wider gap keeps them separate.
#[test]
fn scenario_two_silences_fusing() {
    let fused = plan_cuts(
        10.0,
        &[TimeInterval::new(3.0, 3.6), TimeInterval::new(3.8, 4.8)],
        &[],
        250,
        FrameRate::Std30,
    )
    .unwrap();
    // One fused removal leaves two keeps around it.
    assert_eq!(fused.len(), 2);
    assert!((fused[0].interval.end_s - 3.125).abs() < 1e-9);
    assert!((fused[1].interval.start_s - 4.675).abs() < 1e-9);
}

/// Scenario: filler merge. The silence is below the minimum and discarded
/// by the analyzer; the lone short filler is erased by padding shrink, so
/// the plan is a single full-length cut.
#[test]
fn scenario_filler_erased_by_padding() {
    let mut samples = tone(5.0);
    samples.extend(silence(0.7));
    samples.extend(tone(4.3));

    let silences = run_analyzer(&samples, -45.0, 800);
    assert!(silences.is_empty(), "700 ms run is below the 800 ms minimum");

    let segments = vec![TranscriptSegment {
        start_s: 5.0,
        end_s: 5.7,
        text: "euh".to_string(),
        words: Some(vec![WordTiming {
            text: "euh".to_string(),
            start_s: 5.10,
            end_s: 5.35,
            confidence: 0.9,
        }]),
    }];
    let fillers = detect_fillers(&segments, 0.7);
    assert_eq!(fillers.len(), 1);
    assert!((fillers[0].start_s - 5.10).abs() < 1e-9);

    let cuts = plan_cuts(10.0, &silences, &fillers, 250, FrameRate::Std30).unwrap();
    assert_eq!(cuts.len(), 1);
    assert_eq!(cuts[0].in_frame, 0);
    assert_eq!(cuts[0].out_frame, 300);
}

/// Scenario: all silence. The planner falls back to a single cut covering
/// the full source so the editor always receives a playable timeline.
#[test]
fn scenario_all_silence() {
    let samples = silence(2.0);
    let silences = run_analyzer(&samples, -45.0, 800);
    assert_eq!(silences.len(), 1);

    let cuts = plan_cuts(2.0, &silences, &[], 250, FrameRate::Std30).unwrap();
    assert_eq!(cuts.len(), 1);
    assert_eq!(cuts[0].frames(), 60);

    let report = report_for(cuts, 2.0, silences);
    let source = PathBuf::from("/u/silent.mp4");
    let legacy = render_legacy_xml(&report, &source, "silent").unwrap();
    let structural = render_structural_xml(&report, &source, "silent").unwrap();
    assert!(legacy.contains("<duration>60</duration>"));
    assert_eq!(legacy.matches("<clipitem ").count(), 2); // one video + one audio
    assert_eq!(structural.matches("<asset-clip ").count(), 1);
    assert!(structural.contains("duration=\"2s\""));
}

/// The totals invariant holds across the whole chain: kept plus removed
/// seconds equals the source duration.
#[test]
fn scenario_totals_conservation() {
    let mut samples = tone(3.0);
    samples.extend(silence(1.5));
    samples.extend(tone(2.0));
    samples.extend(silence(2.5));
    samples.extend(tone(1.0));

    let duration_s = samples.len() as f64 / SAMPLE_RATE as f64;
    let silences = run_analyzer(&samples, -45.0, 800);
    assert_eq!(silences.len(), 2);

    // Zero padding keeps the arithmetic exact.
    let cuts = plan_cuts(duration_s, &silences, &[], 0, FrameRate::Std30).unwrap();
    let kept: f64 = cuts.iter().map(|c| c.interval.duration_s()).sum();
    let removed: f64 = silences.iter().map(TimeInterval::duration_s).sum();
    assert!((kept + removed - duration_s).abs() < 1e-6);
}

/// The filler hit for a stuttered word merges with an overlapping silence
/// into one removal.
#[test]
fn scenario_filler_and_silence_overlap() {
    let silences = vec![TimeInterval::new(4.0, 6.0)];
    let fillers = vec![FillerHit {
        word: "euh".to_string(),
        start_s: 5.9,
        end_s: 6.3,
        confidence: 0.95,
    }];

    let cuts = plan_cuts(20.0, &silences, &fillers, 250, FrameRate::Std30).unwrap();
    assert_eq!(cuts.len(), 2);
    // The fused removal is [4.0, 6.3) shrunk by 125 ms per side.
    assert!((cuts[0].interval.end_s - 4.125).abs() < 1e-9);
    assert!((cuts[1].interval.start_s - 6.175).abs() < 1e-9);
}
