//! Legacy editor XML (xmeml) export.
//!
//! One sequence, one video track and one stereo audio track, one clipitem
//! per kept cut. All clipitems reference the same source file: the first
//! occurrence defines the `file` element, every later occurrence is an id
//! reference — the target application requires this sharing.

use std::path::Path;

use tracing::info;

use autocut_models::{AnalysisReport, Cut};

use crate::error::{ExportError, ExportResult};
use crate::xml::{escape_xml, file_uri};

/// Serialize the report's cut list to a legacy editor XML document.
pub fn render_legacy_xml(
    report: &AnalysisReport,
    source_path: &Path,
    stem: &str,
) -> ExportResult<String> {
    if report.cuts.is_empty() {
        return Err(ExportError::invalid_plan("empty cut list"));
    }
    for cut in &report.cuts {
        if cut.out_frame <= cut.in_frame {
            return Err(ExportError::invalid_plan(format!(
                "cut with non-positive frame span at {}",
                cut.interval.start_s
            )));
        }
    }

    let timebase = report.fps.timebase();
    let ntsc = if report.fps.is_ntsc() { "TRUE" } else { "FALSE" };
    let sequence_frames: u64 = report.cuts.iter().map(Cut::frames).sum();
    let file_frames = (report.duration_s * report.fps.as_f64()).round() as u64;
    let name = escape_xml(stem);

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<!DOCTYPE xmeml>\n");
    xml.push_str("<xmeml version=\"5\">\n");
    xml.push_str(&format!("  <sequence id=\"sequence-{}\">\n", name));
    xml.push_str(&format!("    <name>AutoCut_{}</name>\n", name));
    xml.push_str(&format!("    <duration>{}</duration>\n", sequence_frames));
    push_rate(&mut xml, "    ", timebase, ntsc);
    xml.push_str("    <media>\n");

    // Video track
    xml.push_str("      <video>\n");
    xml.push_str("        <track>\n");
    let mut timeline = 0u64;
    for (i, cut) in report.cuts.iter().enumerate() {
        push_clipitem(
            &mut xml,
            ClipItemParams {
                id: format!("clip-v1-{}", i + 1),
                name: &name,
                timebase,
                ntsc,
                timeline_start: timeline,
                cut,
                media: MediaKind::Video,
                // The very first clipitem carries the full file element.
                define_file: i == 0,
                source_path,
                file_frames,
            },
        );
        timeline += cut.frames();
    }
    xml.push_str("        </track>\n");
    xml.push_str("      </video>\n");

    // Audio track (stereo source, two channels)
    xml.push_str("      <audio>\n");
    xml.push_str("        <track>\n");
    let mut timeline = 0u64;
    for (i, cut) in report.cuts.iter().enumerate() {
        push_clipitem(
            &mut xml,
            ClipItemParams {
                id: format!("clip-a1-{}", i + 1),
                name: &name,
                timebase,
                ntsc,
                timeline_start: timeline,
                cut,
                media: MediaKind::Audio,
                define_file: false,
                source_path,
                file_frames,
            },
        );
        timeline += cut.frames();
    }
    xml.push_str("        </track>\n");
    xml.push_str("      </audio>\n");

    xml.push_str("    </media>\n");
    xml.push_str("  </sequence>\n");
    xml.push_str("</xmeml>\n");

    Ok(xml)
}

/// Render and write the legacy XML next to the job's other outputs.
pub async fn write_legacy_xml(
    report: &AnalysisReport,
    source_path: &Path,
    stem: &str,
    output_path: &Path,
) -> ExportResult<()> {
    let xml = render_legacy_xml(report, source_path, stem)?;
    tokio::fs::write(output_path, xml).await?;
    info!(
        path = %output_path.display(),
        cuts = report.cuts.len(),
        "Legacy editor XML written"
    );
    Ok(())
}

enum MediaKind {
    Video,
    Audio,
}

struct ClipItemParams<'a> {
    id: String,
    name: &'a str,
    timebase: u32,
    ntsc: &'a str,
    timeline_start: u64,
    cut: &'a Cut,
    media: MediaKind,
    define_file: bool,
    source_path: &'a Path,
    file_frames: u64,
}

fn push_rate(xml: &mut String, indent: &str, timebase: u32, ntsc: &str) {
    xml.push_str(&format!("{}<rate>\n", indent));
    xml.push_str(&format!("{}  <timebase>{}</timebase>\n", indent, timebase));
    xml.push_str(&format!("{}  <ntsc>{}</ntsc>\n", indent, ntsc));
    xml.push_str(&format!("{}</rate>\n", indent));
}

fn push_clipitem(xml: &mut String, item: ClipItemParams<'_>) {
    let frames = item.cut.frames();
    let end = item.timeline_start + frames;

    xml.push_str(&format!("          <clipitem id=\"{}\">\n", item.id));
    xml.push_str(&format!("            <name>{}</name>\n", item.name));
    xml.push_str("            <enabled>TRUE</enabled>\n");
    xml.push_str(&format!("            <duration>{}</duration>\n", frames));
    push_rate(xml, "            ", item.timebase, item.ntsc);
    xml.push_str(&format!("            <start>{}</start>\n", item.timeline_start));
    xml.push_str(&format!("            <end>{}</end>\n", end));
    xml.push_str(&format!("            <in>{}</in>\n", item.cut.in_frame));
    xml.push_str(&format!("            <out>{}</out>\n", item.cut.out_frame));

    if item.define_file {
        xml.push_str("            <file id=\"file-1\">\n");
        xml.push_str(&format!("              <name>{}</name>\n", item.name));
        xml.push_str(&format!(
            "              <pathurl>{}</pathurl>\n",
            escape_xml(&file_uri(item.source_path))
        ));
        xml.push_str(&format!(
            "              <duration>{}</duration>\n",
            item.file_frames
        ));
        push_rate(xml, "              ", item.timebase, item.ntsc);
        xml.push_str("              <media>\n");
        xml.push_str("                <video>\n");
        xml.push_str("                  <samplecharacteristics>\n");
        xml.push_str("                    <width>1920</width>\n");
        xml.push_str("                    <height>1080</height>\n");
        xml.push_str("                  </samplecharacteristics>\n");
        xml.push_str("                </video>\n");
        xml.push_str("                <audio>\n");
        xml.push_str("                  <samplecharacteristics>\n");
        xml.push_str("                    <depth>16</depth>\n");
        xml.push_str("                    <samplerate>48000</samplerate>\n");
        xml.push_str("                  </samplecharacteristics>\n");
        xml.push_str("                  <channelcount>2</channelcount>\n");
        xml.push_str("                </audio>\n");
        xml.push_str("              </media>\n");
        xml.push_str("            </file>\n");
    } else {
        // Subsequent occurrences reference the defining element by id.
        xml.push_str("            <file id=\"file-1\"/>\n");
    }

    match item.media {
        MediaKind::Video => {
            xml.push_str("            <sourcetrack>\n");
            xml.push_str("              <mediatype>video</mediatype>\n");
            xml.push_str("              <trackindex>1</trackindex>\n");
            xml.push_str("            </sourcetrack>\n");
        }
        MediaKind::Audio => {
            xml.push_str("            <sourcetrack>\n");
            xml.push_str("              <mediatype>audio</mediatype>\n");
            xml.push_str("              <trackindex>1</trackindex>\n");
            xml.push_str("            </sourcetrack>\n");
            xml.push_str("            <channelcount>2</channelcount>\n");
        }
    }

    xml.push_str("          </clipitem>\n");
}
