//! Reverse analysis of underperforming batches.
//!
//! After a batch has been scored against the drawn numbers, the
//! reverse analyzer turns the failures into diagnostic counters: which
//! winning numbers the batch kept missing, which non-winning numbers
//! it kept producing, and which generated numbers never matched at
//! all. The result feeds the model-adjustment report.

use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::artifacts;
use crate::config::ReverseConfig;
use crate::draws::{Combination, DRAW_SIZE, POOL_SIZE};
use crate::error::Result;

/// Diagnostic counters for one analyzed batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub draw_number: u64,
    /// RFC 3339 timestamp of the analysis run.
    pub analysis_timestamp: String,
    pub winning_numbers: [u8; DRAW_SIZE],
    pub total_failed_combinations: u64,
    /// `match_counts[k]` counts combinations with exactly `k` matches.
    pub match_counts: [u64; DRAW_SIZE + 1],
    /// Per winning number: in how many combinations it was absent.
    pub common_missing_numbers: Vec<(u8, u32)>,
    /// Per non-winning number: in how many combinations it appeared.
    pub common_extra_numbers: Vec<(u8, u32)>,
    /// Generated-but-never-drawn numbers by total generation count.
    pub top_generated_unmatched: Vec<(u8, u32)>,
}

/// Turns failed batches into the counters above, truncating the top
/// lists to the configured limits.
#[derive(Debug, Clone, Default)]
pub struct ReverseAnalyzer {
    config: ReverseConfig,
}

impl ReverseAnalyzer {
    pub fn new(config: ReverseConfig) -> Self {
        Self { config }
    }

    /// Analyze an in-memory batch against the winning numbers.
    pub fn analyze(
        &self,
        draw_number: u64,
        combinations: &[Combination],
        winning: &[u8; DRAW_SIZE],
    ) -> AnalysisResult {
        let mut match_counts = [0u64; DRAW_SIZE + 1];
        let mut missing = [0u32; POOL_SIZE as usize + 1];
        let mut extra = [0u32; POOL_SIZE as usize + 1];
        let mut generated = [0u32; POOL_SIZE as usize + 1];

        for combo in combinations {
            match_counts[combo.matches(winning)] += 1;
            for &w in winning {
                if !combo.contains(w) {
                    missing[w as usize] += 1;
                }
            }
            for &n in combo.numbers() {
                generated[n as usize] += 1;
                if !winning.contains(&n) {
                    extra[n as usize] += 1;
                }
            }
        }

        let unmatched: Vec<(u8, u32)> = (1..=POOL_SIZE)
            .filter(|n| !winning.contains(n))
            .filter(|&n| generated[n as usize] > 0)
            .map(|n| (n, generated[n as usize]))
            .collect();

        let result = AnalysisResult {
            draw_number,
            analysis_timestamp: Local::now().to_rfc3339(),
            winning_numbers: *winning,
            total_failed_combinations: combinations.len() as u64,
            match_counts,
            common_missing_numbers: top_counts(&missing, self.config.top_missing_limit),
            common_extra_numbers: top_counts(&extra, self.config.top_extra_limit),
            top_generated_unmatched: truncate_top(unmatched, self.config.top_missing_limit),
        };
        log::info!(
            "Reverse analysis for draw {}: {} combinations, {} distinct unmatched numbers",
            draw_number,
            result.total_failed_combinations,
            result.top_generated_unmatched.len()
        );
        result
    }

    /// Analyze a batch artifact on disk. A missing file surfaces as
    /// `SourceNotFound` from the reader.
    pub fn analyze_file(
        &self,
        draw_number: u64,
        path: &Path,
        winning: &[u8; DRAW_SIZE],
    ) -> Result<AnalysisResult> {
        let combinations = artifacts::read_batch(path)?;
        Ok(self.analyze(draw_number, &combinations, winning))
    }
}

/// Non-zero counters sorted by count descending (number ascending on
/// ties), truncated to `limit`.
fn top_counts(counts: &[u32; POOL_SIZE as usize + 1], limit: usize) -> Vec<(u8, u32)> {
    let entries: Vec<(u8, u32)> = (1..=POOL_SIZE)
        .filter(|&n| counts[n as usize] > 0)
        .map(|n| (n, counts[n as usize]))
        .collect();
    truncate_top(entries, limit)
}

fn truncate_top(mut entries: Vec<(u8, u32)>, limit: usize) -> Vec<(u8, u32)> {
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    entries.truncate(limit);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Contour;

    fn combo(numbers: [u8; DRAW_SIZE]) -> Combination {
        Combination::new(numbers).unwrap()
    }

    const WINNING: [u8; DRAW_SIZE] = [1, 2, 3, 4, 5, 6];

    #[test]
    fn test_counters_for_small_batch() {
        let combos = vec![
            combo([1, 2, 3, 10, 11, 12]), // 3 matches, misses 4,5,6
            combo([1, 10, 20, 30, 40, 50]), // 1 match, misses 2..=6
        ];
        let analyzer = ReverseAnalyzer::default();
        let result = analyzer.analyze(100, &combos, &WINNING);

        assert_eq!(result.total_failed_combinations, 2);
        assert_eq!(result.match_counts, [0, 1, 0, 1, 0, 0, 0]);

        // 4, 5 and 6 were missing from both, 2 and 3 only from the second
        assert!(result.common_missing_numbers.contains(&(4, 2)));
        assert!(result.common_missing_numbers.contains(&(2, 1)));
        // 10 appeared in both combinations without ever being drawn
        assert!(result.common_extra_numbers.contains(&(10, 2)));
        assert!(result.top_generated_unmatched.contains(&(10, 2)));
        // Winning numbers never enter the unmatched list
        assert!(result.top_generated_unmatched.iter().all(|(n, _)| !WINNING.contains(n)));
    }

    #[test]
    fn test_top_lists_ordered_and_truncated() {
        // Every combination shares number 50; the rest are spread out.
        let combos = vec![
            combo([7, 8, 9, 10, 11, 50]),
            combo([12, 13, 14, 15, 16, 50]),
            combo([17, 18, 19, 20, 21, 50]),
        ];
        let analyzer = ReverseAnalyzer::new(ReverseConfig {
            top_missing_limit: 3,
            top_extra_limit: 2,
        });
        let result = analyzer.analyze(7, &combos, &WINNING);

        assert_eq!(result.common_extra_numbers.len(), 2);
        assert_eq!(result.common_extra_numbers[0], (50, 3));
        // Ties break toward the smaller number
        assert_eq!(result.common_extra_numbers[1], (7, 1));

        assert_eq!(result.common_missing_numbers.len(), 3);
        assert_eq!(result.common_missing_numbers[0], (1, 3));

        assert_eq!(result.top_generated_unmatched.len(), 3);
        assert_eq!(result.top_generated_unmatched[0], (50, 3));
    }

    #[test]
    fn test_empty_batch() {
        let analyzer = ReverseAnalyzer::default();
        let result = analyzer.analyze(1, &[], &WINNING);
        assert_eq!(result.total_failed_combinations, 0);
        assert_eq!(result.match_counts.iter().sum::<u64>(), 0);
        assert!(result.common_missing_numbers.is_empty());
        assert!(result.common_extra_numbers.is_empty());
        assert!(result.top_generated_unmatched.is_empty());
    }

    #[test]
    fn test_analyze_file_reads_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let path = artifacts::write_batch(
            tmp.path(),
            42,
            Contour::A,
            &[combo([1, 2, 3, 4, 5, 52])],
        )
        .unwrap();

        let analyzer = ReverseAnalyzer::default();
        let result = analyzer.analyze_file(42, &path, &WINNING).unwrap();
        assert_eq!(result.match_counts[5], 1);
        assert_eq!(result.common_extra_numbers, vec![(52, 1)]);
        assert_eq!(result.common_missing_numbers, vec![(6, 1)]);
    }

    #[test]
    fn test_analyze_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let analyzer = ReverseAnalyzer::default();
        let err = analyzer
            .analyze_file(1, &tmp.path().join("gone.csv"), &WINNING)
            .unwrap_err();
        assert!(matches!(err, crate::error::CoreError::SourceNotFound { .. }));
    }
}
