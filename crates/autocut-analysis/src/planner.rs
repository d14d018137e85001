//! The cut planner: fuse removals, apply padding, invert into keep-cuts.
//!
//! Order is fixed: fuse → shrink → invert. Padding protects the speech
//! adjacent to a removal, so a removal touching the stream boundary is not
//! shrunk on that edge (there is nothing to protect beyond it).

use tracing::debug;

use autocut_models::{Cut, FillerHit, FrameRate, TimeInterval};

use crate::error::{AnalysisError, AnalysisResult};

/// Plan the keep-cuts for a source of `duration_s` seconds.
///
/// `silences` and `fillers` are removal candidates; `padding_ms` is the
/// total symmetric padding (half per side); `fps` is the frame grid the
/// cuts are rounded to.
pub fn plan_cuts(
    duration_s: f64,
    silences: &[TimeInterval],
    fillers: &[FillerHit],
    padding_ms: u32,
    fps: FrameRate,
) -> AnalysisResult<Vec<Cut>> {
    if duration_s <= 0.0 {
        return Err(AnalysisError::internal("non-positive source duration"));
    }
    let mut removals: Vec<TimeInterval> = silences
        .iter()
        .copied()
        .chain(fillers.iter().map(FillerHit::interval))
        .collect();
    if let Some(bad) = removals.iter().find(|iv| !iv.is_valid()) {
        return Err(AnalysisError::internal(format!(
            "non-monotone removal interval [{}, {})",
            bad.start_s, bad.end_s
        )));
    }

    let padding_s = padding_ms as f64 / 1000.0;
    let half_pad = padding_s / 2.0;

    // 1. Merge into one sorted removal list, fusing overlaps and gaps
    //    within the padding.
    removals.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));

    let mut fused: Vec<TimeInterval> = Vec::with_capacity(removals.len());
    for removal in removals {
        match fused.last_mut() {
            Some(last) if removal.start_s - last.end_s <= padding_s => {
                last.end_s = last.end_s.max(removal.end_s);
            }
            _ => fused.push(removal),
        }
    }

    // 2. Shrink inward by half the padding per side, skipping stream
    //    boundaries; discard removals that collapse.
    let shrunk: Vec<TimeInterval> = fused
        .into_iter()
        .filter_map(|iv| {
            let start = if iv.start_s > 0.0 {
                iv.start_s + half_pad
            } else {
                iv.start_s
            };
            let end = if iv.end_s < duration_s {
                iv.end_s - half_pad
            } else {
                iv.end_s
            };
            let start = start.max(0.0);
            let end = end.min(duration_s);
            (end > start).then(|| TimeInterval::new(start, end))
        })
        .collect();

    // 3. Invert against [0, duration).
    let mut keeps: Vec<TimeInterval> = Vec::with_capacity(shrunk.len() + 1);
    let mut cursor = 0.0;
    for removal in &shrunk {
        if removal.start_s > cursor {
            keeps.push(TimeInterval::new(cursor, removal.start_s));
        }
        cursor = removal.end_s;
    }
    if cursor < duration_s {
        keeps.push(TimeInterval::new(cursor, duration_s));
    }

    // 4. Frame rounding; keeps below one frame are dropped, keeps meeting
    //    at the same frame are fused.
    let fps_value = fps.as_f64();
    let mut cuts: Vec<Cut> = Vec::with_capacity(keeps.len());
    for keep in keeps {
        let in_frame = (keep.start_s * fps_value + 0.5).floor() as u64;
        let out_frame = (keep.end_s * fps_value + 0.5).floor() as u64;
        if out_frame <= in_frame {
            continue;
        }
        match cuts.last_mut() {
            Some(prev) if in_frame <= prev.out_frame => {
                prev.interval.end_s = keep.end_s;
                prev.out_frame = out_frame.max(prev.out_frame);
            }
            _ => cuts.push(Cut {
                interval: keep,
                in_frame,
                out_frame,
            }),
        }
    }

    // 5. The editor always receives a playable timeline: an empty keep list
    //    falls back to the full source.
    if cuts.is_empty() {
        let out_frame = (duration_s * fps_value + 0.5).floor() as u64;
        cuts.push(Cut {
            interval: TimeInterval::new(0.0, duration_s),
            in_frame: 0,
            out_frame: out_frame.max(1),
        });
    }

    debug!(
        removals = shrunk.len(),
        cuts = cuts.len(),
        kept_s = cuts.iter().map(|c| c.interval.duration_s()).sum::<f64>(),
        "Cut plan complete"
    );

    Ok(cuts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocut_models::interval::is_sorted_disjoint;

    fn iv(start: f64, end: f64) -> TimeInterval {
        TimeInterval::new(start, end)
    }

    fn filler(start: f64, end: f64) -> FillerHit {
        FillerHit {
            word: "euh".into(),
            start_s: start,
            end_s: end,
            confidence: 0.9,
        }
    }

    fn keep_intervals(cuts: &[Cut]) -> Vec<TimeInterval> {
        cuts.iter().map(|c| c.interval).collect()
    }

    #[test]
    fn test_single_interior_silence() {
        // 10 s source, silence [4, 6), padding 250 ms, fps 30.
        let cuts = plan_cuts(10.0, &[iv(4.0, 6.0)], &[], 250, FrameRate::Std30).unwrap();
        assert_eq!(cuts.len(), 2);
        assert!((cuts[0].interval.start_s).abs() < 1e-9);
        assert!((cuts[0].interval.end_s - 4.125).abs() < 1e-9);
        assert!((cuts[1].interval.start_s - 5.875).abs() < 1e-9);
        assert!((cuts[1].interval.end_s - 10.0).abs() < 1e-9);
        assert_eq!(cuts[0].in_frame, 0);
        assert_eq!(cuts[0].out_frame, 124);
        assert_eq!(cuts[1].in_frame, 176);
        assert_eq!(cuts[1].out_frame, 300);
        let total: u64 = cuts.iter().map(Cut::frames).sum();
        assert_eq!(total, 248);
    }

    #[test]
    fn test_close_silences_fuse() {
        // Gap of 200 ms <= padding 250 ms fuses before shrinking.
        let cuts = plan_cuts(
            10.0,
            &[iv(3.0, 3.6), iv(3.8, 4.8)],
            &[],
            250,
            FrameRate::Std30,
        )
        .unwrap();
        assert_eq!(cuts.len(), 2);
        // Fused removal [3.0, 4.8) shrinks to [3.125, 4.675).
        assert!((cuts[0].interval.end_s - 3.125).abs() < 1e-9);
        assert!((cuts[1].interval.start_s - 4.675).abs() < 1e-9);
    }

    #[test]
    fn test_wide_gap_does_not_fuse() {
        // Gap of 300 ms > padding 250 ms leaves two removals.
        let cuts = plan_cuts(
            10.0,
            &[iv(3.0, 3.6), iv(3.9, 4.8)],
            &[],
            250,
            FrameRate::Std30,
        )
        .unwrap();
        assert_eq!(cuts.len(), 3);
    }

    #[test]
    fn test_padding_erases_short_filler() {
        // 250 ms filler with 250 ms padding collapses to nothing; the cut
        // list is the whole source from inversion, not the fallback.
        let cuts = plan_cuts(10.0, &[], &[filler(5.10, 5.35)], 250, FrameRate::Std30).unwrap();
        assert_eq!(cuts.len(), 1);
        assert!((cuts[0].interval.start_s).abs() < 1e-9);
        assert!((cuts[0].interval.end_s - 10.0).abs() < 1e-9);
        assert_eq!(cuts[0].in_frame, 0);
        assert_eq!(cuts[0].out_frame, 300);
    }

    #[test]
    fn test_all_silence_full_source_fallback() {
        // The removal spans the whole source; boundary edges are not
        // padded, so the keep list empties and the fallback kicks in.
        let cuts = plan_cuts(2.0, &[iv(0.0, 2.0)], &[], 250, FrameRate::Std30).unwrap();
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].in_frame, 0);
        assert_eq!(cuts[0].out_frame, 60);
        assert!((cuts[0].interval.duration_s() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_leading_removal_shifts_first_cut() {
        let cuts = plan_cuts(10.0, &[iv(0.0, 1.0)], &[], 250, FrameRate::Std30).unwrap();
        assert_eq!(cuts.len(), 1);
        // Only the speech-facing edge of the removal is padded.
        assert!((cuts[0].interval.start_s - 0.875).abs() < 1e-9);
        assert!((cuts[0].interval.end_s - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_silence_and_filler_merge() {
        let cuts = plan_cuts(
            20.0,
            &[iv(4.0, 6.0)],
            &[filler(5.9, 6.4)],
            250,
            FrameRate::Std30,
        )
        .unwrap();
        // The filler overlaps the silence, so one fused removal remains.
        assert_eq!(cuts.len(), 2);
        assert!((cuts[1].interval.start_s - 6.275).abs() < 1e-9);
    }

    #[test]
    fn test_keep_plus_remove_equals_duration() {
        let duration = 30.0;
        let silences = [iv(2.0, 4.0), iv(10.0, 11.5), iv(20.0, 23.0)];
        let cuts = plan_cuts(duration, &silences, &[], 0, FrameRate::Pal25).unwrap();

        let kept: f64 = cuts.iter().map(|c| c.interval.duration_s()).sum();
        // With zero padding the removals survive untouched.
        let removed: f64 = silences.iter().map(TimeInterval::duration_s).sum();
        assert!((kept + removed - duration).abs() < 1e-9);
        assert!(is_sorted_disjoint(&keep_intervals(&cuts)));
        for cut in &cuts {
            assert!(cut.out_frame > cut.in_frame);
        }
    }

    #[test]
    fn test_padding_monotonicity() {
        let duration = 60.0;
        let silences = [
            iv(5.0, 7.0),
            iv(12.0, 13.0),
            iv(20.0, 24.0),
            iv(30.0, 32.0),
            iv(45.0, 50.0),
        ];
        let baseline = plan_cuts(duration, &silences, &[], 0, FrameRate::Std30)
            .unwrap()
            .len();
        for padding_ms in [100u32, 250, 500, 1000] {
            let n = plan_cuts(duration, &silences, &[], padding_ms, FrameRate::Std30)
                .unwrap()
                .len();
            assert!(
                n + 1 >= baseline,
                "padding {} collapsed {} keeps to {}",
                padding_ms,
                baseline,
                n
            );
        }
    }

    #[test]
    fn test_plan_idempotence() {
        let duration = 30.0;
        let silences = [iv(3.0, 5.0), iv(11.0, 14.0), iv(22.0, 25.0)];
        let first = plan_cuts(duration, &silences, &[], 250, FrameRate::Std30).unwrap();

        // Re-plan with the first plan's complement as removals and no
        // padding: the keep set must survive (up to frame rounding).
        let mut removals = Vec::new();
        let mut cursor = 0.0;
        for cut in &first {
            if cut.interval.start_s > cursor {
                removals.push(iv(cursor, cut.interval.start_s));
            }
            cursor = cut.interval.end_s;
        }
        if cursor < duration {
            removals.push(iv(cursor, duration));
        }

        let second = plan_cuts(duration, &removals, &[], 0, FrameRate::Std30).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.in_frame, b.in_frame);
            assert_eq!(a.out_frame, b.out_frame);
        }
    }

    #[test]
    fn test_subframe_keep_dropped() {
        // A keep of ~8 ms between two removals is below one frame at 30 fps
        // and merges away.
        let cuts = plan_cuts(
            10.0,
            &[iv(2.0, 4.0), iv(4.008, 6.0)],
            &[],
            0,
            FrameRate::Std30,
        )
        .unwrap();
        let keeps = keep_intervals(&cuts);
        assert!(is_sorted_disjoint(&keeps));
        for cut in &cuts {
            assert!(cut.out_frame > cut.in_frame);
        }
        // No cut may occupy zero frames on the grid.
        assert_eq!(cuts.len(), 2);
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(plan_cuts(0.0, &[], &[], 250, FrameRate::Std30).is_err());
        assert!(plan_cuts(10.0, &[iv(5.0, 5.0)], &[], 250, FrameRate::Std30).is_err());
    }

    #[test]
    fn test_ntsc_frame_math() {
        let cuts = plan_cuts(10.0, &[iv(4.0, 6.0)], &[], 0, FrameRate::Ntsc29_97).unwrap();
        assert_eq!(cuts.len(), 2);
        // 4.0 * 29.97 = 119.88 -> 120; 6.0 * 29.97 = 179.82 -> 180.
        assert_eq!(cuts[0].out_frame, 120);
        assert_eq!(cuts[1].in_frame, 180);
    }
}
