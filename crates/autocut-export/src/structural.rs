//! Structural editor XML (fcpxml) export.
//!
//! A resources block declares the frame grid and the source asset; the
//! sequence spine holds one asset-clip per kept cut. Every time value is a
//! reduced rational built from an integer frame count, so the document
//! never contains floating-point seconds.

use std::path::Path;

use tracing::info;

use autocut_models::{AnalysisReport, Cut};

use crate::error::{ExportError, ExportResult};
use crate::rational::Rational;
use crate::xml::{escape_xml, file_uri};

/// Serialize the report's cut list to a structural editor XML document.
pub fn render_structural_xml(
    report: &AnalysisReport,
    source_path: &Path,
    stem: &str,
) -> ExportResult<String> {
    if report.cuts.is_empty() {
        return Err(ExportError::invalid_plan("empty cut list"));
    }

    let frame_duration = report.fps.frame_duration();
    let timebase = report.fps.timebase();
    let total_frames: u64 = report.cuts.iter().map(Cut::frames).sum();
    let file_frames = (report.duration_s * report.fps.as_f64()).round() as u64;
    let name = escape_xml(stem);

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<!DOCTYPE fcpxml>\n");
    xml.push_str("<fcpxml version=\"1.9\">\n");

    xml.push_str("  <resources>\n");
    xml.push_str(&format!(
        "    <format id=\"r1\" name=\"FFVideoFormat1080p{}\" frameDuration=\"{}/{}s\" width=\"1920\" height=\"1080\"/>\n",
        timebase, frame_duration.0, frame_duration.1
    ));
    xml.push_str(&format!(
        "    <asset id=\"r2\" name=\"{}\" start=\"0s\" duration=\"{}\" hasVideo=\"1\" hasAudio=\"1\">\n",
        name,
        Rational::from_frames(file_frames, frame_duration)
    ));
    xml.push_str(&format!(
        "      <media-rep kind=\"original-media\" src=\"{}\"/>\n",
        escape_xml(&file_uri(source_path))
    ));
    xml.push_str("    </asset>\n");
    xml.push_str("  </resources>\n");

    xml.push_str("  <library>\n");
    xml.push_str("    <event name=\"AutoCut\">\n");
    xml.push_str(&format!("      <project name=\"AutoCut_{}\">\n", name));
    xml.push_str(&format!(
        "        <sequence format=\"r1\" duration=\"{}\">\n",
        Rational::from_frames(total_frames, frame_duration)
    ));
    xml.push_str("          <spine>\n");

    let mut timeline_frames = 0u64;
    for (i, cut) in report.cuts.iter().enumerate() {
        let offset = Rational::from_frames(timeline_frames, frame_duration);
        let duration = Rational::from_frames(cut.frames(), frame_duration);
        let start = Rational::from_frames(cut.in_frame, frame_duration);
        xml.push_str(&format!(
            "            <asset-clip name=\"Segment {}\" ref=\"r2\" offset=\"{}\" duration=\"{}\" start=\"{}\" format=\"r1\"/>\n",
            i + 1,
            offset,
            duration,
            start
        ));
        timeline_frames += cut.frames();
    }

    xml.push_str("          </spine>\n");
    xml.push_str("        </sequence>\n");
    xml.push_str("      </project>\n");
    xml.push_str("    </event>\n");
    xml.push_str("  </library>\n");
    xml.push_str("</fcpxml>\n");

    Ok(xml)
}

/// Render and write the structural XML next to the job's other outputs.
pub async fn write_structural_xml(
    report: &AnalysisReport,
    source_path: &Path,
    stem: &str,
    output_path: &Path,
) -> ExportResult<()> {
    let xml = render_structural_xml(report, source_path, stem)?;
    tokio::fs::write(output_path, xml).await?;
    info!(
        path = %output_path.display(),
        cuts = report.cuts.len(),
        "Structural editor XML written"
    );
    Ok(())
}
