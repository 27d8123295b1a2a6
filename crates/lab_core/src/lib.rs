//! # lab_core - Adaptive Draw-Tracking Core
//!
//! This library tracks a 6-of-52 number draw, generates candidate
//! combinations under Hot/Mid/Cold quota constraints, scores them
//! against the drawn results, and feeds the outcomes back into its own
//! tuning through an auto-correction controller.
//!
//! ## Features
//! - Deterministic generation (same seed = same batch)
//! - Quota-constrained sampling over recency zones
//! - Self-adjusting tuning with an append-only audit log
//! - Crash-safe persisted configuration (atomic writes)

pub mod akk;
pub mod artifacts;
pub mod config;
pub mod cycle;
pub mod draws;
pub mod error;
pub mod generator;
pub mod report;
pub mod reverse;
pub mod scorer;
pub mod stats;

pub use akk::{AutoCorrectionController, Decision};
pub use config::{ConfigStore, Contour, CoreTuning, CycleState, QuotaConfig, SoftPoolConfig};
pub use cycle::{CycleOrchestrator, CycleOutcome, CyclePhase, ReplayOutcome};
pub use draws::{Combination, Draw, DrawHistory, DRAW_SIZE, POOL_SIZE};
pub use error::{CoreError, Result};
pub use generator::CombinationGenerator;
pub use reverse::{AnalysisResult, ReverseAnalyzer};
pub use scorer::{PerformanceMetrics, ScoreOutcome};
pub use stats::{PoolStat, PoolStatistics, Zone};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
