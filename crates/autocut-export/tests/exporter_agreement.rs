//! Cross-exporter agreement: both XML documents must imply the same
//! timeline. The comparator parses the emitted files back and checks that
//! total durations match to within one frame and per-clip source in-points
//! differ by at most one frame.

use quick_xml::events::Event;
use quick_xml::Reader;

use autocut_export::legacy::render_legacy_xml;
use autocut_export::structural::render_structural_xml;
use autocut_models::{AnalysisReport, Cut, FrameRate, TimeInterval};

fn cut(start: f64, end: f64, fps: f64) -> Cut {
    Cut {
        interval: TimeInterval::new(start, end),
        in_frame: (start * fps + 0.5).floor() as u64,
        out_frame: (end * fps + 0.5).floor() as u64,
    }
}

fn report(cuts: Vec<Cut>, duration_s: f64, fps: FrameRate) -> AnalysisReport {
    AnalysisReport {
        duration_s,
        sample_rate_hz: 44_100,
        silences: Vec::new(),
        fillers: Vec::new(),
        cuts,
        padding_ms: 250,
        fps,
    }
}

/// Timeline implied by a legacy document: sequence frames and the video
/// clipitems' source in-points in frames.
fn parse_legacy(xml: &str) -> (u64, Vec<u64>) {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut sequence_frames = None;
    let mut in_points = Vec::new();
    let mut element = String::new();
    // The shared file element nests its own <video>/<media> blocks, so
    // plain booleans would flip off too early; count depth instead.
    let mut video_depth = 0;
    let mut clipitem_depth = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "video" {
                    video_depth += 1;
                }
                if name == "clipitem" {
                    clipitem_depth += 1;
                }
                element = name;
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "video" {
                    video_depth -= 1;
                }
                if name == "clipitem" {
                    clipitem_depth -= 1;
                }
                element.clear();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match element.as_str() {
                    "duration" if sequence_frames.is_none() && clipitem_depth == 0 => {
                        sequence_frames = text.parse().ok();
                    }
                    "in" if video_depth >= 1 && clipitem_depth == 1 => {
                        in_points.push(text.parse().expect("integer in-point"));
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("legacy XML parse error: {}", e),
        }
    }

    (sequence_frames.expect("sequence duration"), in_points)
}

/// Parse an fcpxml rational time ("62/15s" or "2s") into seconds.
fn parse_rational_secs(value: &str) -> f64 {
    let value = value.strip_suffix('s').expect("rational ends with s");
    match value.split_once('/') {
        Some((num, den)) => num.parse::<f64>().unwrap() / den.parse::<f64>().unwrap(),
        None => value.parse().unwrap(),
    }
}

/// Timeline implied by a structural document: total clip seconds and the
/// per-clip source start offsets in seconds.
fn parse_structural(xml: &str) -> (f64, Vec<f64>) {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut total_secs = 0.0;
    let mut starts = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "asset-clip" {
                    for attr in e.attributes().flatten() {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        match key.as_str() {
                            "duration" => total_secs += parse_rational_secs(&value),
                            "start" => starts.push(parse_rational_secs(&value)),
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("structural XML parse error: {}", e),
        }
    }

    (total_secs, starts)
}

fn assert_agreement(report: &AnalysisReport) {
    let source = std::path::PathBuf::from("/uploads/job/talk.mp4");
    let legacy = render_legacy_xml(report, &source, "talk").unwrap();
    let structural = render_structural_xml(report, &source, "talk").unwrap();

    let (legacy_frames, legacy_ins) = parse_legacy(&legacy);
    let (structural_secs, structural_starts) = parse_structural(&structural);

    let fps = report.fps.as_f64();
    let frame_s = 1.0 / fps;

    // Total durations agree to within one frame.
    let legacy_secs = legacy_frames as f64 / fps;
    assert!(
        (legacy_secs - structural_secs).abs() <= frame_s + 1e-9,
        "totals diverge: legacy {}s vs structural {}s",
        legacy_secs,
        structural_secs
    );

    // Source in-points agree to within one frame.
    assert_eq!(legacy_ins.len(), structural_starts.len());
    for (in_frame, start_s) in legacy_ins.iter().zip(structural_starts.iter()) {
        let legacy_s = *in_frame as f64 / fps;
        assert!(
            (legacy_s - start_s).abs() <= frame_s + 1e-9,
            "in-point diverges: {} frames vs {}s",
            in_frame,
            start_s
        );
    }
}

#[test]
fn agreement_simple_two_cut_plan() {
    let r = report(
        vec![cut(0.0, 4.125, 30.0), cut(5.875, 10.0, 30.0)],
        10.0,
        FrameRate::Std30,
    );
    assert_agreement(&r);
}

#[test]
fn agreement_single_full_source_cut() {
    let r = report(vec![cut(0.0, 2.0, 30.0)], 2.0, FrameRate::Std30);
    assert_agreement(&r);

    let (frames, _) = parse_legacy(
        &render_legacy_xml(&r, &std::path::PathBuf::from("/u/t.mp4"), "t").unwrap(),
    );
    assert_eq!(frames, 60);
}

#[test]
fn agreement_ntsc_rates() {
    for fps in [FrameRate::Film23_976, FrameRate::Ntsc29_97, FrameRate::Ntsc59_94] {
        let f = fps.as_f64();
        let r = report(
            vec![cut(0.0, 3.2, f), cut(7.5, 12.25, f), cut(20.0, 21.0, f)],
            30.0,
            fps,
        );
        assert_agreement(&r);
    }
}

#[test]
fn agreement_many_cuts() {
    let fps = FrameRate::Pal25;
    let f = fps.as_f64();
    let cuts: Vec<Cut> = (0..40)
        .map(|i| {
            let start = i as f64 * 3.0;
            cut(start, start + 1.76, f)
        })
        .collect();
    let r = report(cuts, 121.0, fps);
    assert_agreement(&r);
}
