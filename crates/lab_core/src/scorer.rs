//! Performance scoring of generated batches against a drawn result.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifacts;
use crate::draws::{Combination, DRAW_SIZE};
use crate::error::{CoreError, Result};

/// Aggregate performance counters for one scored batch set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    pub total_combinations: u64,
    pub match_5_plus_count: u64,
    pub match_6_count: u64,
}

impl PerformanceMetrics {
    /// Share of combinations with five or more matches (0.0 when the
    /// batch is empty).
    pub fn five_plus_rate(&self) -> f64 {
        if self.total_combinations == 0 {
            0.0
        } else {
            self.match_5_plus_count as f64 / self.total_combinations as f64
        }
    }

    /// Share of combinations with all six matches (0.0 when empty).
    pub fn six_rate(&self) -> f64 {
        if self.total_combinations == 0 {
            0.0
        } else {
            self.match_6_count as f64 / self.total_combinations as f64
        }
    }
}

/// Scoring result: the full match-count histogram plus the aggregate
/// counters the controller consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreOutcome {
    /// `histogram[k]` counts combinations with exactly `k` matches.
    pub histogram: [u64; DRAW_SIZE + 1],
    pub metrics: PerformanceMetrics,
}

impl ScoreOutcome {
    fn record(&mut self, matches: usize) {
        self.histogram[matches] += 1;
        self.metrics.total_combinations += 1;
        if matches >= 5 {
            self.metrics.match_5_plus_count += 1;
        }
        if matches == DRAW_SIZE {
            self.metrics.match_6_count += 1;
        }
    }

    fn merge(&mut self, other: &ScoreOutcome) {
        for (a, b) in self.histogram.iter_mut().zip(other.histogram.iter()) {
            *a += b;
        }
        self.metrics.total_combinations += other.metrics.total_combinations;
        self.metrics.match_5_plus_count += other.metrics.match_5_plus_count;
        self.metrics.match_6_count += other.metrics.match_6_count;
    }
}

/// Score a batch of combinations against the winning numbers. Pure
/// aggregation; the histogram is independent of input order.
pub fn score(combinations: &[Combination], winning: &[u8; DRAW_SIZE]) -> ScoreOutcome {
    let mut outcome = ScoreOutcome::default();
    for combo in combinations {
        outcome.record(combo.matches(winning));
    }
    outcome
}

/// Score one batch artifact against the winning numbers.
pub fn score_file(path: &Path, winning: &[u8; DRAW_SIZE]) -> Result<ScoreOutcome> {
    let combinations = artifacts::read_batch(path)?;
    Ok(score(&combinations, winning))
}

/// Score every batch artifact targeting `draw_number` under the
/// generated directory. Unreadable files are skipped with a warning.
/// No discoverable batch at all, or nothing readable among the
/// discovered ones, is a missing source.
pub fn score_draw(
    generated_dir: &Path,
    draw_number: u64,
    winning: &[u8; DRAW_SIZE],
) -> Result<ScoreOutcome> {
    let paths = artifacts::discover_batches(generated_dir, draw_number)?;
    if paths.is_empty() {
        return Err(CoreError::SourceNotFound {
            path: format!(
                "{} (no batches for draw {})",
                generated_dir.display(),
                draw_number
            ),
        });
    }

    let mut outcome = ScoreOutcome::default();
    let mut readable = 0usize;
    for path in &paths {
        match artifacts::read_batch(path) {
            Ok(combinations) => {
                readable += 1;
                outcome.merge(&score(&combinations, winning));
            }
            Err(e) => log::warn!("Error processing batch {}: {}", path.display(), e),
        }
    }
    if readable == 0 {
        return Err(CoreError::SourceNotFound {
            path: format!(
                "{} (none of the {} batches for draw {} readable)",
                generated_dir.display(),
                paths.len(),
                draw_number
            ),
        });
    }

    log::info!(
        "Scored {} combinations across {} batches for draw {}: 5+ = {}, 6 = {}",
        outcome.metrics.total_combinations,
        readable,
        draw_number,
        outcome.metrics.match_5_plus_count,
        outcome.metrics.match_6_count
    );
    Ok(outcome)
}
