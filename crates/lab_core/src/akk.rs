//! Auto-correction controller.
//!
//! Evaluates scored performance against the configured targets and
//! nudges the tuning documents when a threshold is missed. Two
//! branches run per evaluation:
//!
//! - Stable (Contour A): judged on the mean 5+ rate over a rolling
//!   window of up to 30 past evaluations; raises Contour A temperature
//!   when below the minimum, otherwise raises the core boost when
//!   below target.
//! - Experimental (Contour B): judged on the current 6-match rate;
//!   raises aggressiveness when below the minimum, otherwise raises
//!   the exploratory factor (capped at 0.5) when below target while
//!   the 5+ rate holds its minimum.
//!
//! Every adjustment appends one audit record and persists the touched
//! documents immediately. A text report is written for every
//! evaluation, adjusting or not.

use chrono::Local;

use crate::config::{
    AdjustmentRecord, AkkThresholds, ConfigStore, ContourAProfile, ContourBProfile, CoreTuning,
    AKK_CONFIG_FILE, CONTOUR_A_FILE, CONTOUR_B_FILE, CORE_SETTINGS_FILE,
};
use crate::error::Result;
use crate::report::{self, format_percent};
use crate::scorer::PerformanceMetrics;

/// Window of past evaluations feeding the Stable branch.
pub const STABLE_WINDOW: usize = 30;

/// Outcome of one controller evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub recommendation: String,
    pub adjusted: bool,
}

pub struct AutoCorrectionController {
    store: ConfigStore,
}

impl AutoCorrectionController {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    /// Evaluate the scored metrics for a draw, adjusting the tuning
    /// documents where thresholds are missed. `history` carries past
    /// per-draw metrics for the Stable branch; only its trailing
    /// window is considered.
    pub fn evaluate(
        &self,
        draw_number: u64,
        metrics: &PerformanceMetrics,
        history: Option<&[PerformanceMetrics]>,
    ) -> Result<Decision> {
        let thresholds: AkkThresholds = self.store.load(AKK_CONFIG_FILE);
        let mut core: CoreTuning = self.store.load(CORE_SETTINGS_FILE);
        let mut profile_a: ContourAProfile = self.store.load(CONTOUR_A_FILE);
        let mut profile_b: ContourBProfile = self.store.load(CONTOUR_B_FILE);

        let p5 = metrics.five_plus_rate();
        let p6 = metrics.six_rate();
        let old_boost = core.boost;

        log::info!(
            "Controller evaluating draw {}: 5+ = {}, 6 = {}",
            draw_number,
            format_percent(p5),
            format_percent(p6)
        );

        let mut lines = vec![
            format!("Controller report for draw {}", draw_number),
            format!("Analysis date: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
            format!("Total combinations scored: {}", metrics.total_combinations),
            format!(
                "5+ matches: {} ({})",
                metrics.match_5_plus_count,
                format_percent(p5)
            ),
            format!(
                "6 matches: {} ({})",
                metrics.match_6_count,
                format_percent(p6)
            ),
            "-".repeat(30),
            format!(
                "Target 5+ rate: {}",
                format_percent(thresholds.target_5_match_percentage)
            ),
            format!(
                "Minimum 5+ rate: {}",
                format_percent(thresholds.min_5_match_percentage)
            ),
            format!(
                "Target 6 rate: {}",
                format_percent(thresholds.target_6_match_percentage)
            ),
            format!(
                "Minimum 6 rate: {}",
                format_percent(thresholds.min_6_match_percentage)
            ),
            "-".repeat(30),
            format!("Current core boost: {}", core.boost),
        ];

        let mut fired: Vec<String> = Vec::new();

        // Stable branch: rolling mean of the history window.
        let window = history.map(trailing_window).unwrap_or(&[]);
        if !window.is_empty() {
            let rates: Vec<f64> = window
                .iter()
                .filter(|m| m.total_combinations > 0)
                .map(|m| m.five_plus_rate())
                .collect();
            let avg = if rates.is_empty() {
                0.0
            } else {
                rates.iter().sum::<f64>() / rates.len() as f64
            };
            lines.push(format!(
                "Mean 5+ rate over last {} draws: {}",
                window.len(),
                format_percent(avg)
            ));

            if avg < thresholds.min_5_match_percentage {
                profile_a.temperature = round2((profile_a.temperature + 0.1).min(1.0));
                self.store.save(CONTOUR_A_FILE, &profile_a)?;
                let text = format!(
                    "Stable (Contour A): mean 5+ rate ({}) below minimum ({}). \
                     Contour A temperature raised to {}.",
                    format_percent(avg),
                    format_percent(thresholds.min_5_match_percentage),
                    profile_a.temperature
                );
                lines.push(format!("Controller (Stable): {}", text));
                fired.push(text);
            } else if avg < thresholds.target_5_match_percentage {
                core.boost = round2(core.boost + thresholds.adjustment_strength / 4.0);
                self.store.save(CORE_SETTINGS_FILE, &core)?;
                let text = format!(
                    "Stable (Contour A): mean 5+ rate ({}) below target ({}). \
                     Core boost adjusted to {:.2}.",
                    format_percent(avg),
                    format_percent(thresholds.target_5_match_percentage),
                    core.boost
                );
                lines.push(format!("Controller (Stable): {}", text));
                fired.push(text);
            }
        }

        // Experimental branch: current 6-match rate.
        if p6 < thresholds.min_6_match_percentage {
            profile_b.aggressiveness = round2(profile_b.aggressiveness + 0.2);
            self.store.save(CONTOUR_B_FILE, &profile_b)?;
            let text = format!(
                "Experimental (Contour B): 6-match rate ({}) below minimum ({}). \
                 Contour B aggressiveness raised to {}.",
                format_percent(p6),
                format_percent(thresholds.min_6_match_percentage),
                profile_b.aggressiveness
            );
            lines.push(format!("Controller (Experimental): {}", text));
            fired.push(text);
        } else if p6 < thresholds.target_6_match_percentage
            && p5 >= thresholds.min_5_match_percentage
        {
            profile_b.exploratory_factor = round2((profile_b.exploratory_factor + 0.05).min(0.5));
            self.store.save(CONTOUR_B_FILE, &profile_b)?;
            let text = format!(
                "Experimental (Contour B): 6-match rate ({}) below target ({}). \
                 Contour B exploratory factor raised to {}.",
                format_percent(p6),
                format_percent(thresholds.target_6_match_percentage),
                profile_b.exploratory_factor
            );
            lines.push(format!("Controller (Experimental): {}", text));
            fired.push(text);
        }

        let adjusted = !fired.is_empty();
        let recommendation = if adjusted {
            fired.join(" ")
        } else if p5 >= thresholds.target_5_match_percentage
            && p6 >= thresholds.target_6_match_percentage
        {
            "All performance targets met. No adjustment required.".to_string()
        } else {
            "No adjustment required.".to_string()
        };
        lines.push(format!("Controller verdict: {}", recommendation));

        if adjusted {
            let mut thresholds = thresholds;
            thresholds.adjustment_history.push(AdjustmentRecord {
                draw_number,
                timestamp: Local::now().to_rfc3339(),
                old_boost: round2(old_boost),
                new_boost: core.boost,
                reason: recommendation.clone(),
                performance_5_plus_percent: format_percent(p5),
                performance_6_percent: format_percent(p6),
            });
            self.store.save(AKK_CONFIG_FILE, &thresholds)?;
        }

        report::write_akk_report(self.store.root(), draw_number, &lines)?;
        log::info!(
            "Controller decision for draw {}: adjusted = {}, {}",
            draw_number,
            adjusted,
            recommendation
        );
        Ok(Decision { recommendation, adjusted })
    }
}

fn trailing_window(history: &[PerformanceMetrics]) -> &[PerformanceMetrics] {
    &history[history.len().saturating_sub(STABLE_WINDOW)..]
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
