//! Output formatting for CLI results

use colorful::{Color, Colorful};
use serde::Serialize;

use super::commands::{ConsensusResult, FileResult};
use crate::classify::ClassificationOutcome;
use crate::config::Catalogue;
use crate::consensus::{TriangulationOutcome, TriangulationStatus, ValidationOutcome, ValidationStatus};
use crate::detection::{ClassifierTier, Detection, Report, Severity};

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Low => Color::Blue,
        Severity::Medium => Color::Yellow,
        Severity::High => Color::LightRed,
        Severity::Critical => Color::Red,
    }
}

fn tier_name(tier: ClassifierTier) -> &'static str {
    match tier {
        ClassifierTier::Preferred => "fused",
        ClassifierTier::Degraded => "fused, no external scores",
        ClassifierTier::Heuristic => "heuristic",
    }
}

/// Format one file's classification for the terminal
pub fn format_file_result(result: &FileResult, verbose: bool) -> String {
    let mut output = format!("Analyzing: {}\n", result.path.clone().cyan());

    if let Some(error) = &result.error {
        output.push_str(&format!("  {} {}\n", "✗".red(), error.clone().red()));
        return output;
    }

    output.push_str(&format!(
        "  Duration: {:.2}s @ {} Hz, {} window(s)",
        result.duration_secs,
        result.sample_rate,
        result.summary.windows.len()
    ));
    if result.summary.windows_dropped > 0 {
        output.push_str(&format!(", {} dropped", result.summary.windows_dropped));
    }
    output.push('\n');

    if result.detections.is_empty() {
        output.push_str(&format!("  Status: {}\n", "✓ NO HAZARD".green()));
    } else {
        output.push_str(&format!("  Status: {}\n", "✗ HAZARD DETECTED".red()));
        for detection in &result.detections {
            output.push_str(&format_detection(detection, verbose));
        }
    }

    if verbose {
        output.push_str("\n  Windows:\n");
        for window in &result.summary.windows {
            let what = match &window.outcome {
                ClassificationOutcome::Fused(d) | ClassificationOutcome::Heuristic(d) => {
                    format!("{} ({:.0}%)", d.hazard, d.confidence * 100.0)
                }
                ClassificationOutcome::NoHazard => "no hazard".to_string(),
                ClassificationOutcome::InsufficientData { confidence } => {
                    format!("insufficient data ({:.0}%)", confidence * 100.0)
                }
            };
            output.push_str(&format!(
                "    {} - {}  {}\n",
                window.window_start.format("%H:%M:%S%.3f"),
                window.window_end.format("%H:%M:%S%.3f"),
                what
            ));
        }
    }

    output
}

fn format_detection(detection: &Detection, verbose: bool) -> String {
    let severity = Severity::from_confidence(detection.confidence);
    let mut output = format!(
        "    {} {} {}\n",
        severity.symbol().color(severity_color(severity)),
        detection.hazard.label().bold(),
        format!(
            "({:.0}%, {})",
            detection.confidence * 100.0,
            tier_name(detection.diagnostics.tier)
        )
        .dim()
    );

    if verbose {
        let d = &detection.diagnostics;
        output.push_str(&format!(
            "      {}\n",
            format!(
                "class score: {} | timbral distance: {:.2} | spectral gate: {} | rms: {:.4}",
                d.class_score
                    .map(|s| format!("{s:.3}"))
                    .unwrap_or_else(|| "n/a".to_string()),
                d.timbral_distance,
                if d.spectral_gate_passed { "pass" } else { "fail" },
                detection.rms_level
            )
            .dim()
        ));
        if let Some(location) = detection.location {
            output.push_str(&format!("      {}\n", format!("at {location}").dim()));
        }
    }
    output
}

pub fn format_report(report: &Report) -> String {
    let mut output = format!(
        "  {} {} [{}] {} {}\n",
        report.severity.symbol().color(severity_color(report.severity)),
        report.label.clone().bold(),
        report.modality.name(),
        report.id,
        format!("({:.0}%, {:?})", report.confidence * 100.0, report.status).dim()
    );
    if let Some(cluster) = report.cluster_id {
        output.push_str(&format!("    cluster {cluster}\n"));
    }
    output
}

pub fn format_triangulation(outcome: &TriangulationOutcome) -> String {
    match outcome.status {
        TriangulationStatus::Triangulated => {
            let mut output = format!(
                "  {} cluster of {} report(s)",
                "✓ TRIANGULATED".green(),
                outcome.member_count
            );
            if let Some(location) = outcome.refined_location {
                output.push_str(&format!(" at {location}"));
            }
            output.push('\n');
            output
        }
        TriangulationStatus::InsufficientData => format!(
            "  {} {} matching report(s) nearby\n",
            "… INSUFFICIENT DATA".yellow(),
            outcome.member_count
        ),
        TriangulationStatus::Skipped => format!(
            "  {} {}\n",
            "- SKIPPED".dim(),
            outcome.skip_reason.map(|r| r.description()).unwrap_or("")
        ),
    }
}

pub fn format_validation(outcome: &ValidationOutcome) -> String {
    match (outcome.status, &outcome.best_match) {
        (ValidationStatus::Validated, Some(best)) => format!(
            "  {} by {} report {} ({:.1} m, {:+} s), confidence {:+.3}\n",
            "✓ VERIFIED".green(),
            best.modality.name(),
            best.report_id,
            best.distance_m,
            best.time_offset_secs,
            outcome.confidence_delta
        ),
        (ValidationStatus::Skipped, _) => format!(
            "  {} {}\n",
            "- SKIPPED".dim(),
            outcome.skip_reason.map(|r| r.description()).unwrap_or("")
        ),
        _ => format!("  {}\n", "… NO CORRELATION".yellow()),
    }
}

pub fn format_consensus(result: &ConsensusResult) -> String {
    let mut output = format_report(&result.report);
    if let Some(triangulation) = &result.triangulation {
        output.push_str(&format_triangulation(triangulation));
    }
    output.push_str(&format_validation(&result.validation));
    output
}

pub fn format_profiles(catalogue: &Catalogue) -> String {
    let mut output = String::from("Hazard catalogue:\n\n");
    for profile in catalogue.profiles() {
        output.push_str(&format!(
            "  {} ({}) - default severity {}\n",
            profile.kind.label().bold(),
            profile.kind.name(),
            profile.default_severity
        ));
        let classes: Vec<String> = profile
            .classes
            .iter()
            .map(|c| format!("{}:{:.1}", c.class, c.weight))
            .collect();
        output.push_str(&format!("    Classes: {}\n", classes.join(", ")));
        output.push_str(&format!(
            "    Flatness: {:.2}-{:.2} | Sharpness: {:.2}-{:.2} acum | Max timbral distance: {:.0}\n\n",
            profile.flatness.low,
            profile.flatness.high,
            profile.sharpness.low,
            profile.sharpness.high,
            profile.max_timbral_distance
        ));
    }
    output
}

/// Format a summary for multiple files
pub fn format_summary(results: &[FileResult]) -> String {
    let hazardous = results.iter().filter(|r| !r.detections.is_empty()).count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    let clean = results.len() - hazardous - failed;

    let mut output = format!("\n{}\n", "Summary:".bold());
    output.push_str(&format!("  {} files analyzed\n", results.len()));
    if hazardous > 0 {
        output.push_str(&format!("  {}\n", format!("✗ {hazardous} with hazards").red()));
    }
    if clean > 0 {
        output.push_str(&format!("  {}\n", format!("✓ {clean} clean").green()));
    }
    if failed > 0 {
        output.push_str(&format!("  {}\n", format!("- {failed} failed to decode").dim()));
    }
    output
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SessionSummary;
    use crate::config::HazardKind;
    use crate::consensus::SkipReason;
    use crate::detection::Diagnostics;
    use chrono::Utc;

    fn file_result(detections: Vec<Detection>) -> FileResult {
        FileResult {
            path: "leak.wav".to_string(),
            duration_secs: 3.0,
            sample_rate: 16000,
            summary: SessionSummary::default(),
            detections,
            error: None,
        }
    }

    #[test]
    fn test_format_file_result() {
        let detection = Detection::new(
            HazardKind::WaterLeak,
            0.72,
            [0.0; 13],
            0.03,
            Utc::now(),
            Diagnostics {
                class_score: Some(0.4),
                timbral_distance: 12.0,
                spectral_gate_passed: true,
                tier: ClassifierTier::Preferred,
            },
        );
        let output = format_file_result(&file_result(vec![detection]), true);
        assert!(output.contains("leak.wav"));
        assert!(output.contains("Dripping/Leaking Water"));
        assert!(output.contains("72%"));
        assert!(output.contains("timbral distance: 12.00"));
    }

    #[test]
    fn test_format_clean_and_summary() {
        let output = format_file_result(&file_result(Vec::new()), false);
        assert!(output.contains("NO HAZARD"));

        let summary = format_summary(&[file_result(Vec::new())]);
        assert!(summary.contains("1 files analyzed"));
        assert!(summary.contains("1 clean"));
    }

    #[test]
    fn test_format_skipped_triangulation() {
        let outcome = TriangulationOutcome {
            status: TriangulationStatus::Skipped,
            cluster_id: None,
            refined_location: None,
            member_count: 0,
            members: Vec::new(),
            source_record: None,
            skip_reason: Some(SkipReason::MissingLocation),
        };
        assert!(format_triangulation(&outcome).contains("no location"));
    }

    #[test]
    fn test_format_profiles_lists_every_hazard() {
        let output = format_profiles(&Catalogue::standard());
        for kind in HazardKind::all() {
            assert!(output.contains(kind.label()));
        }
    }
}
