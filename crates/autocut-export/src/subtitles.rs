//! Subtitle and plain-text renditions of the transcript.

use std::path::Path;

use tracing::info;

use autocut_models::TranscriptSegment;

use crate::error::ExportResult;

/// Render segments as SRT (sequence-numbered blocks, comma millis).
pub fn render_srt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(segment.start_s, ','),
            format_timestamp(segment.end_s, ',')
        ));
        out.push_str(segment.text.trim());
        out.push_str("\n\n");
    }
    out
}

/// Render segments as WebVTT cue blocks.
pub fn render_vtt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in segments {
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(segment.start_s, '.'),
            format_timestamp(segment.end_s, '.')
        ));
        out.push_str(segment.text.trim());
        out.push_str("\n\n");
    }
    out
}

/// Render plain text, one segment per line, no timecodes.
pub fn render_txt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        let text = segment.text.trim();
        if !text.is_empty() {
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}

/// Write the SRT file.
pub async fn write_srt(segments: &[TranscriptSegment], path: &Path) -> ExportResult<()> {
    tokio::fs::write(path, render_srt(segments)).await?;
    info!(path = %path.display(), cues = segments.len(), "SRT written");
    Ok(())
}

/// Write the WebVTT file.
pub async fn write_vtt(segments: &[TranscriptSegment], path: &Path) -> ExportResult<()> {
    tokio::fs::write(path, render_vtt(segments)).await?;
    info!(path = %path.display(), cues = segments.len(), "VTT written");
    Ok(())
}

/// Write the plain-text transcript.
pub async fn write_txt(segments: &[TranscriptSegment], path: &Path) -> ExportResult<()> {
    tokio::fs::write(path, render_txt(segments)).await?;
    info!(path = %path.display(), "TXT written");
    Ok(())
}

/// `HH:MM:SS<sep>mmm` (SRT uses a comma, VTT a dot).
fn format_timestamp(seconds: f64, sep: char) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, sep, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start_s: start,
            end_s: end,
            text: text.to_string(),
            words: None,
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0, ','), "00:00:00,000");
        assert_eq!(format_timestamp(90.5, ','), "00:01:30,500");
        assert_eq!(format_timestamp(3661.042, '.'), "01:01:01.042");
    }

    #[test]
    fn test_srt_blocks() {
        let srt = render_srt(&[
            segment(0.0, 2.5, "Bonjour à tous"),
            segment(3.0, 5.0, "on commence"),
        ]);
        let expected = "1\n00:00:00,000 --> 00:00:02,500\nBonjour à tous\n\n2\n00:00:03,000 --> 00:00:05,000\non commence\n\n";
        assert_eq!(srt, expected);
    }

    #[test]
    fn test_vtt_header_and_cues() {
        let vtt = render_vtt(&[segment(0.0, 1.0, "Salut")]);
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:01.000\nSalut\n"));
    }

    #[test]
    fn test_txt_one_line_per_segment() {
        let txt = render_txt(&[
            segment(0.0, 1.0, " Première phrase. "),
            segment(1.0, 2.0, ""),
            segment(2.0, 3.0, "Deuxième phrase."),
        ]);
        assert_eq!(txt, "Première phrase.\nDeuxième phrase.\n");
    }
}
