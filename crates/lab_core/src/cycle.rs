//! Cycle orchestration.
//!
//! One cycle walks a fixed phase sequence: refresh statistics, score
//! the batches generated for the just-arrived draw, let the
//! controller react, optionally run reverse analysis after an
//! adjustment, generate the next batches for both contours, write the
//! summary report, advance the cursors. The current phase name is
//! persisted before each phase executes so an interrupted run shows
//! where it stopped.
//!
//! Historical replay drives the same analysis sequence over a range of
//! past draws with a rolling metrics window feeding the Stable branch.
//! It adjusts the tuning documents like a live cycle would, but never
//! touches the live cursors and never writes batch artifacts.

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::akk::AutoCorrectionController;
use crate::artifacts;
use crate::config::{
    ConfigStore, Contour, CoreTuning, CycleState, OrchestratorConfig, QuotaConfig, ReverseConfig,
    SoftPoolConfig, CORE_SETTINGS_FILE, CYCLE_STATE_FILE, ORCHESTRATOR_FILE, POOL_STATS_FILE,
    QUOTAS_FILE, REVERSE_CONFIG_FILE, SOFTPOOL_FILE,
};
use crate::draws::{DrawHistory, DRAW_SIZE};
use crate::error::Result;
use crate::generator::CombinationGenerator;
use crate::report;
use crate::reverse::ReverseAnalyzer;
use crate::scorer::{self, PerformanceMetrics, ScoreOutcome};
use crate::stats::PoolStatistics;

/// Draw-history table, relative to the project root.
pub const DRAWS_FILE: &str = "draws.csv";
/// Batch artifact directory, relative to the project root.
pub const GENERATED_DIR: &str = "generated";

/// Rolling metrics window length for historical replay.
const REPLAY_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CyclePhase {
    Idle,
    CheckingNewDraw,
    PerformingComparison,
    AkkAnalysis,
    ModelAdjustment,
    GeneratingCombinations,
    Reporting,
}

impl CyclePhase {
    pub const ALL: [CyclePhase; 7] = [
        CyclePhase::Idle,
        CyclePhase::CheckingNewDraw,
        CyclePhase::PerformingComparison,
        CyclePhase::AkkAnalysis,
        CyclePhase::ModelAdjustment,
        CyclePhase::GeneratingCombinations,
        CyclePhase::Reporting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Idle => "Idle",
            CyclePhase::CheckingNewDraw => "CheckingNewDraw",
            CyclePhase::PerformingComparison => "PerformingComparison",
            CyclePhase::AkkAnalysis => "AkkAnalysis",
            CyclePhase::ModelAdjustment => "ModelAdjustment",
            CyclePhase::GeneratingCombinations => "GeneratingCombinations",
            CyclePhase::Reporting => "Reporting",
        }
    }
}

/// What one cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Draw the cycle analyzed.
    pub draw_number: u64,
    /// Scored metrics, `None` when comparison degraded.
    pub metrics: Option<PerformanceMetrics>,
    /// Controller verdict, `None` when the controller was skipped.
    pub recommendation: Option<String>,
    pub adjusted: bool,
    /// Draw the new batches target.
    pub generated_for: u64,
    /// Combinations generated per contour.
    pub batch_size: usize,
}

/// What a historical replay produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub draws_processed: usize,
    pub draws_skipped: usize,
    pub adjustments: usize,
}

pub struct CycleOrchestrator {
    store: ConfigStore,
    config: OrchestratorConfig,
    state: CycleState,
}

impl CycleOrchestrator {
    pub fn new(root: &Path) -> Self {
        let store = ConfigStore::new(root);
        let config: OrchestratorConfig = store.load(ORCHESTRATOR_FILE);
        let state: CycleState = store.load(CYCLE_STATE_FILE);
        Self { store, config, state }
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn cycle_count(&self) -> u64 {
        self.config.cycle_count
    }

    fn generated_dir(&self) -> PathBuf {
        self.store.root().join(GENERATED_DIR)
    }

    /// Persist the phase transition before the phase runs.
    fn enter_phase(&mut self, phase: CyclePhase) -> Result<()> {
        log::info!("Phase: {} -> {}", self.config.current_phase, phase.as_str());
        self.config.current_phase = phase.as_str().to_string();
        self.store.save(ORCHESTRATOR_FILE, &self.config)
    }

    fn load_history(&self) -> Result<DrawHistory> {
        match DrawHistory::load(&self.store.root().join(DRAWS_FILE)) {
            Ok(history) => Ok(history),
            Err(e) if e.is_degradable() => {
                log::warn!("Draw history unavailable: {}. Continuing with an empty history.", e);
                Ok(DrawHistory::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Score the batches generated for `draw_number`, degrading to
    /// `None` when the winning numbers or the batches are unavailable.
    fn compare(
        &self,
        history: &DrawHistory,
        draw_number: u64,
    ) -> Result<(Option<[u8; DRAW_SIZE]>, Option<ScoreOutcome>)> {
        let Some(winning) = history.winning_numbers(draw_number) else {
            log::warn!(
                "Winning numbers for draw {} unavailable. Comparison skipped.",
                draw_number
            );
            return Ok((None, None));
        };
        match scorer::score_draw(&self.generated_dir(), draw_number, &winning) {
            Ok(outcome) => Ok((Some(winning), Some(outcome))),
            // Missing or unreadable sources degrade; anything else
            // aborts the cycle.
            Err(e) if e.is_degradable() => {
                log::warn!("No batches to score for draw {} ({}).", draw_number, e);
                Ok((Some(winning), None))
            }
            Err(e) => Err(e),
        }
    }

    fn generate_batches<R: Rng>(
        &self,
        stats: &PoolStatistics,
        target_draw: u64,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<()> {
        let quotas: QuotaConfig = self.store.load(QUOTAS_FILE);
        let softpool: SoftPoolConfig = self.store.load(SOFTPOOL_FILE);
        let generator = CombinationGenerator::new(&quotas, &softpool, stats);
        for contour in Contour::ALL {
            let combinations = generator.generate(batch_size, rng)?;
            artifacts::write_batch(&self.generated_dir(), target_draw, contour, &combinations)?;
        }
        Ok(())
    }

    /// Run one full cycle. `draw_number` overrides the draw to analyze;
    /// by default the latest draw in the history is taken.
    pub fn run_cycle<R: Rng>(
        &mut self,
        draw_number: Option<u64>,
        rng: &mut R,
    ) -> Result<CycleOutcome> {
        self.config.cycle_count += 1;
        self.store.save(ORCHESTRATOR_FILE, &self.config)?;
        log::info!("Starting cycle {}", self.config.cycle_count);

        self.enter_phase(CyclePhase::CheckingNewDraw)?;
        let history = self.load_history()?;
        let draw = draw_number.unwrap_or_else(|| history.last_draw_number());
        log::info!("Processing draw {}", draw);

        let stats = PoolStatistics::compute(&history);
        self.store.save(POOL_STATS_FILE, &stats)?;

        self.enter_phase(CyclePhase::PerformingComparison)?;
        let (winning, outcome) = self.compare(&history, draw)?;
        let metrics = outcome.as_ref().map(|o| o.metrics);

        self.enter_phase(CyclePhase::AkkAnalysis)?;
        let decision = match &metrics {
            Some(metrics) => {
                let controller = AutoCorrectionController::new(self.store.clone());
                Some(controller.evaluate(draw, metrics, None)?)
            }
            None => {
                log::warn!("No metrics for draw {}. Controller skipped.", draw);
                None
            }
        };
        let adjusted = decision.as_ref().map(|d| d.adjusted).unwrap_or(false);
        let recommendation = decision.map(|d| d.recommendation);

        if adjusted {
            self.enter_phase(CyclePhase::ModelAdjustment)?;
            self.run_reverse_analysis(draw, winning.as_ref())?;
            report::write_comparison_report(
                self.store.root(),
                draw,
                winning.as_ref(),
                outcome.as_ref(),
                recommendation.as_deref(),
                true,
            )?;
        }

        self.enter_phase(CyclePhase::GeneratingCombinations)?;
        let tuning: CoreTuning = self.store.load(CORE_SETTINGS_FILE);
        let target_draw = draw + 1;
        self.generate_batches(&stats, target_draw, tuning.batch_size, rng)?;
        self.state.last_generated_draw = target_draw;
        self.store.save(CYCLE_STATE_FILE, &self.state)?;

        self.enter_phase(CyclePhase::Reporting)?;
        report::write_comparison_report(
            self.store.root(),
            draw,
            winning.as_ref(),
            outcome.as_ref(),
            recommendation.as_deref(),
            false,
        )?;

        self.state.last_successful_draw = draw;
        self.state.last_analysis_draw = draw;
        self.store.save(CYCLE_STATE_FILE, &self.state)?;
        self.enter_phase(CyclePhase::Idle)?;

        log::info!("Cycle {} finished", self.config.cycle_count);
        Ok(CycleOutcome {
            draw_number: draw,
            metrics,
            recommendation,
            adjusted,
            generated_for: target_draw,
            batch_size: tuning.batch_size,
        })
    }

    /// Reverse analysis over the scored Contour A batch, skipped with a
    /// warning when the batch or the winning numbers are unavailable.
    fn run_reverse_analysis(
        &self,
        draw_number: u64,
        winning: Option<&[u8; DRAW_SIZE]>,
    ) -> Result<()> {
        let Some(winning) = winning else {
            log::warn!(
                "Reverse analysis skipped for draw {}: winning numbers unavailable.",
                draw_number
            );
            return Ok(());
        };
        let Some(batch) = artifacts::find_batch(&self.generated_dir(), draw_number, Contour::A)
        else {
            log::warn!(
                "Reverse analysis skipped for draw {}: no Contour A batch.",
                draw_number
            );
            return Ok(());
        };

        let config: ReverseConfig = self.store.load(REVERSE_CONFIG_FILE);
        let analyzer = ReverseAnalyzer::new(config);
        let result = analyzer.analyze_file(draw_number, &batch, winning)?;
        report::write_reverse_report(self.store.root(), &result)?;
        Ok(())
    }

    /// Replay the analysis sequence over `num_draws` historical draws
    /// starting at `start_draw`. Draws absent from the history are
    /// skipped. Tuning documents are adjusted as in a live cycle; the
    /// live cursors stay untouched and no batches are written.
    pub fn run_replay(&mut self, start_draw: u64, num_draws: u64) -> Result<ReplayOutcome> {
        log::info!(
            "Historical replay: {} draws starting at {}",
            num_draws,
            start_draw
        );
        let history = self.load_history()?;
        let controller = AutoCorrectionController::new(self.store.clone());

        let mut outcome = ReplayOutcome::default();
        let mut window: Vec<PerformanceMetrics> = Vec::new();
        for draw in start_draw..start_draw + num_draws {
            if !history.contains(draw) {
                log::warn!("Draw {} not in history. Skipping.", draw);
                outcome.draws_skipped += 1;
                continue;
            }

            let (_, scored) = self.compare(&history, draw)?;
            let Some(scored) = scored else {
                log::warn!("No metrics for draw {} in replay. Controller skipped.", draw);
                outcome.draws_skipped += 1;
                continue;
            };

            window.push(scored.metrics);
            if window.len() > REPLAY_WINDOW {
                window.remove(0);
            }

            let decision = controller.evaluate(draw, &scored.metrics, Some(&window))?;
            if decision.adjusted {
                outcome.adjustments += 1;
            }
            outcome.draws_processed += 1;
        }

        log::info!(
            "Replay finished: {} processed, {} skipped, {} adjustments",
            outcome.draws_processed,
            outcome.draws_skipped,
            outcome.adjustments
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AkkThresholds, ContourBProfile, AKK_CONFIG_FILE, CONTOUR_B_FILE};
    use crate::draws::Combination;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn write_history(root: &Path, draws: &[(u64, [u8; DRAW_SIZE])]) {
        let mut lines = vec!["draw,date,n1,n2,n3,n4,n5,n6".to_string()];
        for (number, numbers) in draws {
            lines.push(format!(
                "{},2026-01-01,{}",
                number,
                numbers
                    .iter()
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            ));
        }
        std::fs::write(root.join(DRAWS_FILE), lines.join("\n")).unwrap();
    }

    fn shrink_batch_size(root: &Path, batch_size: usize) {
        let store = ConfigStore::new(root);
        let mut tuning: CoreTuning = store.load(CORE_SETTINGS_FILE);
        tuning.batch_size = batch_size;
        store.save(CORE_SETTINGS_FILE, &tuning).unwrap();
    }

    #[test]
    fn test_phase_names_round_trip() {
        for phase in CyclePhase::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            let back: CyclePhase = serde_json::from_str(&json).unwrap();
            assert_eq!(back, phase);
            assert!(!phase.as_str().is_empty());
        }
    }

    #[test]
    fn test_full_cycle_updates_cursors_and_generates() {
        let tmp = tempfile::tempdir().unwrap();
        write_history(
            tmp.path(),
            &[
                (1, [1, 2, 3, 4, 5, 6]),
                (2, [7, 8, 9, 10, 11, 12]),
                (3, [13, 14, 15, 16, 17, 18]),
            ],
        );
        shrink_batch_size(tmp.path(), 10);
        // A pre-existing batch for draw 3 so comparison has input.
        let generated = tmp.path().join(GENERATED_DIR);
        artifacts::write_batch(
            &generated,
            3,
            Contour::A,
            &[
                Combination::new([13, 14, 15, 16, 17, 18]).unwrap(),
                Combination::new([20, 21, 22, 23, 24, 25]).unwrap(),
            ],
        )
        .unwrap();

        let mut orchestrator = CycleOrchestrator::new(tmp.path());
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let outcome = orchestrator.run_cycle(None, &mut rng).unwrap();

        assert_eq!(outcome.draw_number, 3);
        assert_eq!(outcome.generated_for, 4);
        assert_eq!(outcome.batch_size, 10);
        let metrics = outcome.metrics.unwrap();
        assert_eq!(metrics.total_combinations, 2);
        assert_eq!(metrics.match_6_count, 1);
        assert!(outcome.recommendation.is_some());

        // Batches for draw 4 exist for both contours.
        for contour in Contour::ALL {
            let path = artifacts::find_batch(&generated, 4, contour).unwrap();
            assert_eq!(artifacts::read_batch(&path).unwrap().len(), 10);
        }

        let store = ConfigStore::new(tmp.path());
        let state: CycleState = store.load(CYCLE_STATE_FILE);
        assert_eq!(state.last_successful_draw, 3);
        assert_eq!(state.last_analysis_draw, 3);
        assert_eq!(state.last_generated_draw, 4);

        let config: OrchestratorConfig = store.load(ORCHESTRATOR_FILE);
        assert_eq!(config.current_phase, "Idle");
        assert_eq!(config.cycle_count, 1);

        // Statistics snapshot persisted for the cycle.
        assert!(tmp.path().join(POOL_STATS_FILE).exists());
        // Summary report written.
        assert!(std::fs::read_dir(tmp.path().join(report::COMPARISON_REPORTS_DIR))
            .unwrap()
            .count()
            >= 1);
    }

    #[test]
    fn test_degraded_cycle_without_history_still_generates() {
        let tmp = tempfile::tempdir().unwrap();
        shrink_batch_size(tmp.path(), 5);

        let mut orchestrator = CycleOrchestrator::new(tmp.path());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = orchestrator.run_cycle(None, &mut rng).unwrap();

        assert_eq!(outcome.draw_number, 0);
        assert!(outcome.metrics.is_none());
        assert!(outcome.recommendation.is_none());
        assert!(!outcome.adjusted);

        let generated = tmp.path().join(GENERATED_DIR);
        assert!(artifacts::find_batch(&generated, 1, Contour::A).is_some());
        assert!(artifacts::find_batch(&generated, 1, Contour::B).is_some());

        // Controller untouched, no audit records.
        let store = ConfigStore::new(tmp.path());
        let thresholds: AkkThresholds = store.load(AKK_CONFIG_FILE);
        assert!(thresholds.adjustment_history.is_empty());
    }

    #[test]
    fn test_unreadable_batches_degrade_comparison() {
        let tmp = tempfile::tempdir().unwrap();
        write_history(tmp.path(), &[(4, [1, 2, 3, 4, 5, 6])]);
        shrink_batch_size(tmp.path(), 5);
        // A directory wearing a batch filename: discoverable, unreadable.
        let generated = tmp.path().join(GENERATED_DIR);
        std::fs::create_dir_all(generated.join("combinations_for_draw_4_contour_A.csv"))
            .unwrap();

        let mut orchestrator = CycleOrchestrator::new(tmp.path());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let outcome = orchestrator.run_cycle(None, &mut rng).unwrap();

        assert_eq!(outcome.draw_number, 4);
        assert!(outcome.metrics.is_none());
        assert!(!outcome.adjusted);
        // The cycle still generated for the next draw.
        assert!(artifacts::find_batch(&generated, 5, Contour::A).is_some());
    }

    #[test]
    fn test_adjustment_triggers_reverse_analysis() {
        let tmp = tempfile::tempdir().unwrap();
        write_history(tmp.path(), &[(7, [1, 2, 3, 4, 5, 6])]);
        shrink_batch_size(tmp.path(), 5);
        // A batch with no 6-hit: the experimental branch must fire.
        artifacts::write_batch(
            &tmp.path().join(GENERATED_DIR),
            7,
            Contour::A,
            &[Combination::new([40, 41, 42, 43, 44, 45]).unwrap()],
        )
        .unwrap();

        let mut orchestrator = CycleOrchestrator::new(tmp.path());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let outcome = orchestrator.run_cycle(None, &mut rng).unwrap();

        assert!(outcome.adjusted);
        let store = ConfigStore::new(tmp.path());
        let b: ContourBProfile = store.load(CONTOUR_B_FILE);
        assert_eq!(b.aggressiveness, 1.7);

        // Reverse analysis report written during ModelAdjustment.
        let reverse_dir = tmp.path().join(report::REVERSE_REPORTS_DIR);
        assert_eq!(std::fs::read_dir(reverse_dir).unwrap().count(), 1);
        // Both post-adjustment and standard summaries written.
        let comparison_dir = tmp.path().join(report::COMPARISON_REPORTS_DIR);
        assert_eq!(std::fs::read_dir(comparison_dir).unwrap().count(), 2);
    }

    #[test]
    fn test_replay_never_touches_cursors_or_batches() {
        let tmp = tempfile::tempdir().unwrap();
        write_history(
            tmp.path(),
            &[(10, [1, 2, 3, 4, 5, 6]), (11, [7, 8, 9, 10, 11, 12])],
        );
        let generated = tmp.path().join(GENERATED_DIR);
        for draw in [10u64, 11] {
            artifacts::write_batch(
                &generated,
                draw,
                Contour::A,
                &[Combination::new([40, 41, 42, 43, 44, 45]).unwrap()],
            )
            .unwrap();
        }
        let batches_before = std::fs::read_dir(&generated).unwrap().count();

        let mut orchestrator = CycleOrchestrator::new(tmp.path());
        // Draw 12 is absent and must be skipped, not fail.
        let outcome = orchestrator.run_replay(10, 3).unwrap();
        assert_eq!(outcome.draws_processed, 2);
        assert_eq!(outcome.draws_skipped, 1);
        assert!(outcome.adjustments >= 1);

        let store = ConfigStore::new(tmp.path());
        let state: CycleState = store.load(CYCLE_STATE_FILE);
        assert_eq!(state, CycleState::default());
        assert_eq!(std::fs::read_dir(&generated).unwrap().count(), batches_before);

        // The replay fed the rolling window, so adjustments were
        // recorded by the controller.
        let thresholds: AkkThresholds = store.load(AKK_CONFIG_FILE);
        assert_eq!(thresholds.adjustment_history.len(), outcome.adjustments);
    }
}
