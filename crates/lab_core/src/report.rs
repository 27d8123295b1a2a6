//! Human-readable text reports.
//!
//! Each report is a plain-text file under `reports/`, named
//! `..._draw_{N}_{YYYYmmdd_HHMMSS}.txt` so repeated runs never clobber
//! earlier output.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::draws::DRAW_SIZE;
use crate::error::Result;
use crate::reverse::AnalysisResult;
use crate::scorer::ScoreOutcome;

pub const AKK_REPORTS_DIR: &str = "reports/akk";
pub const REVERSE_REPORTS_DIR: &str = "reports/reverse_analysis";
pub const COMPARISON_REPORTS_DIR: &str = "reports/comparison";

/// Filesystem-safe timestamp used in report and artifact filenames.
pub fn timestamp_slug() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Format a `[0, 1]` rate as `"12.34%"`.
pub fn format_percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn write_report(root: &Path, dir: &str, filename: &str, lines: &[String]) -> Result<PathBuf> {
    let dir_path = root.join(dir);
    std::fs::create_dir_all(&dir_path)?;
    let path = dir_path.join(filename);
    std::fs::write(&path, lines.join("\n"))?;
    log::info!("Report saved to {}", path.display());
    Ok(path)
}

/// Write the controller's per-evaluation report. The caller supplies
/// the already-assembled lines.
pub fn write_akk_report(root: &Path, draw_number: u64, lines: &[String]) -> Result<PathBuf> {
    let filename = format!("AKK_report_draw_{}_{}.txt", draw_number, timestamp_slug());
    write_report(root, AKK_REPORTS_DIR, &filename, lines)
}

/// Write a reverse-analysis report from the analyzer's result.
pub fn write_reverse_report(root: &Path, result: &AnalysisResult) -> Result<PathBuf> {
    let mut lines = Vec::new();
    lines.push(format!("Reverse analysis report for draw {}", result.draw_number));
    lines.push(format!("Analysis date: {}", result.analysis_timestamp));
    lines.push(format!(
        "Winning numbers: {}",
        result
            .winning_numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    lines.push(format!(
        "Combinations analyzed: {}",
        result.total_failed_combinations
    ));
    lines.push(String::new());
    lines.push("Match distribution:".to_string());
    for matches in (0..=DRAW_SIZE).rev() {
        lines.push(format!(
            "  {} matches: {} combinations",
            matches, result.match_counts[matches]
        ));
    }
    lines.push(String::new());
    lines.push("Winning numbers most often absent from failed combinations:".to_string());
    for (number, count) in &result.common_missing_numbers {
        lines.push(format!("  Number {}: absent {} times", number, count));
    }
    lines.push(String::new());
    lines.push("Most frequently generated non-winning numbers:".to_string());
    for (number, count) in &result.common_extra_numbers {
        lines.push(format!("  Number {}: extra {} times", number, count));
    }
    lines.push(String::new());
    lines.push("Top generated numbers that never matched:".to_string());
    for (number, count) in &result.top_generated_unmatched {
        lines.push(format!("  Number {}: generated {} times", number, count));
    }

    let filename = format!(
        "Reverse_Analysis_draw_{}_{}.txt",
        result.draw_number,
        timestamp_slug()
    );
    write_report(root, REVERSE_REPORTS_DIR, &filename, &lines)
}

/// Write the per-cycle comparison summary. `recommendation` is the
/// controller's verdict when it ran; `post_adjustment` marks summaries
/// written after a model adjustment was applied.
pub fn write_comparison_report(
    root: &Path,
    draw_number: u64,
    winning: Option<&[u8; DRAW_SIZE]>,
    outcome: Option<&ScoreOutcome>,
    recommendation: Option<&str>,
    post_adjustment: bool,
) -> Result<PathBuf> {
    let mut lines = Vec::new();
    lines.push(format!("Comparison summary for draw {}", draw_number));
    lines.push(format!(
        "Report date: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    if post_adjustment {
        lines.push("Model adjustment was applied this cycle.".to_string());
    }
    match winning {
        Some(numbers) => lines.push(format!(
            "Winning numbers: {}",
            numbers
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )),
        None => lines.push("Winning numbers: unavailable".to_string()),
    }
    match outcome {
        Some(outcome) => {
            let metrics = &outcome.metrics;
            lines.push(format!(
                "Total combinations scored: {}",
                metrics.total_combinations
            ));
            lines.push(format!(
                "5+ matches: {} ({})",
                metrics.match_5_plus_count,
                format_percent(metrics.five_plus_rate())
            ));
            lines.push(format!(
                "6 matches: {} ({})",
                metrics.match_6_count,
                format_percent(metrics.six_rate())
            ));
            lines.push("Match distribution:".to_string());
            for matches in (0..=DRAW_SIZE).rev() {
                lines.push(format!(
                    "  {} matches: {} combinations",
                    matches, outcome.histogram[matches]
                ));
            }
        }
        None => lines.push("Comparison metrics: unavailable".to_string()),
    }
    match recommendation {
        Some(text) => lines.push(format!("Controller verdict: {}", text)),
        None => lines.push("Controller verdict: skipped".to_string()),
    }

    let filename = format!(
        "Comparison_draw_{}_{}.txt",
        draw_number,
        timestamp_slug()
    );
    write_report(root, COMPARISON_REPORTS_DIR, &filename, &lines)
}
