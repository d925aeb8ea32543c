//! Result rendering for the terminal

use crate::commands::OutputFormat;
use crate::error::CliResult;
use console::style;
use visreg::{ComparisonResult, ReportPaths};

/// Render a comparison result in the requested format.
pub fn render_result(
    result: &ComparisonResult,
    format: OutputFormat,
    use_color: bool,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => Ok(render_text(result, use_color)),
    }
}

fn render_text(result: &ComparisonResult, use_color: bool) -> String {
    let verdict = if result.matched { "MATCH" } else { "MISMATCH" };
    let verdict = match (use_color, result.matched) {
        (false, _) => verdict.to_string(),
        (true, true) => style(verdict).green().bold().to_string(),
        (true, false) => style(verdict).red().bold().to_string(),
    };

    let mut out = format!(
        "{verdict} {}\n  similarity: {:.4} (threshold {:.4})\n",
        result.baseline_name, result.similarity, result.threshold
    );
    if result.is_size_mismatch() {
        let (bw, bh) = result.baseline_size;
        let (cw, ch) = result.current_size;
        out.push_str(&format!("  size mismatch: baseline {bw}x{bh}, current {cw}x{ch}\n"));
    }
    if let Some(distance) = result.hash_distance {
        out.push_str(&format!("  hash distance: {distance}\n"));
    }
    out.push_str(&format!("  differences: {}\n", result.differences.len()));
    for region in &result.differences {
        out.push_str(&format!(
            "    - {:?} at ({}, {}) {}x{} magnitude {:.3}\n",
            region.kind, region.x, region.y, region.width, region.height, region.magnitude
        ));
    }
    out
}

/// One line per written report file
#[must_use]
pub fn render_report_paths(paths: &ReportPaths) -> String {
    [&paths.baseline, &paths.current, &paths.diff, &paths.result]
        .iter()
        .map(|p| format!("  wrote {}\n", p.display()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use visreg::{DifferenceKind, DifferenceRegion};

    fn result(matched: bool) -> ComparisonResult {
        ComparisonResult {
            baseline_name: "login_button".to_string(),
            matched,
            similarity: if matched { 1.0 } else { 0.85 },
            differences: if matched {
                Vec::new()
            } else {
                vec![DifferenceRegion {
                    x: 10,
                    y: 10,
                    width: 20,
                    height: 20,
                    magnitude: 0.667,
                    kind: DifferenceKind::Changed,
                }]
            },
            baseline_size: (200, 60),
            current_size: (200, 60),
            hash_distance: None,
            threshold: 0.95,
        }
    }

    #[test]
    fn test_render_text_match() {
        let text = render_result(&result(true), OutputFormat::Text, false).unwrap();
        assert!(text.starts_with("MATCH login_button"));
        assert!(text.contains("similarity: 1.0000"));
        assert!(text.contains("differences: 0"));
    }

    #[test]
    fn test_render_text_mismatch() {
        let text = render_result(&result(false), OutputFormat::Text, false).unwrap();
        assert!(text.starts_with("MISMATCH"));
        assert!(text.contains("Changed at (10, 10) 20x20"));
    }

    #[test]
    fn test_render_text_size_mismatch() {
        let mut r = result(false);
        r.current_size = (50, 50);
        r.hash_distance = Some(12);
        let text = render_result(&r, OutputFormat::Text, false).unwrap();
        assert!(text.contains("baseline 200x60, current 50x50"));
        assert!(text.contains("hash distance: 12"));
    }

    #[test]
    fn test_render_json() {
        let json = render_result(&result(false), OutputFormat::Json, true).unwrap();
        let parsed: ComparisonResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result(false));
    }

    #[test]
    fn test_render_report_paths() {
        let paths = ReportPaths {
            baseline: PathBuf::from("r/a_baseline.png"),
            current: PathBuf::from("r/a_current.png"),
            diff: PathBuf::from("r/a_diff.png"),
            result: PathBuf::from("r/a_result.json"),
        };
        let text = render_report_paths(&paths);
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("a_diff.png"));
    }
}
