//! Persisted tuning and configuration documents.
//!
//! Every document is an independently loadable/saveable JSON file
//! under the project root. Loading is forgiving: a missing, empty, or
//! malformed document degrades to its defaults and never raises past
//! the loader. Saving is atomic (temp file + rename) so a crash never
//! leaves a partially written document behind.

use std::collections::BTreeSet;
use std::fs::{rename, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// Document locations relative to the project root.
pub const CORE_SETTINGS_FILE: &str = "config/core_settings.json";
pub const CONTOUR_A_FILE: &str = "config/contour_a_settings.json";
pub const CONTOUR_B_FILE: &str = "config/contour_b_settings.json";
pub const AKK_CONFIG_FILE: &str = "config/akk_config.json";
pub const QUOTAS_FILE: &str = "config/quotas.json";
pub const SOFTPOOL_FILE: &str = "config/softpool.json";
pub const REVERSE_CONFIG_FILE: &str = "config/reverse_analysis_config.json";
pub const ORCHESTRATOR_FILE: &str = "config/orchestrator.json";
pub const POOL_STATS_FILE: &str = "config/pool_stats.json";
pub const CYCLE_STATE_FILE: &str = "state/cycle_state.json";

/// Label of one of the two parallel generation profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Contour {
    A,
    B,
}

impl Contour {
    pub const ALL: [Contour; 2] = [Contour::A, Contour::B];

    /// Short label used in artifact filenames.
    pub fn label(&self) -> &'static str {
        match self {
            Contour::A => "A",
            Contour::B => "B",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Contour::A => "Contour A (Stable)",
            Contour::B => "Contour B (Experimental)",
        }
    }

    pub fn from_label(label: &str) -> Option<Contour> {
        match label {
            "A" => Some(Contour::A),
            "B" => Some(Contour::B),
            _ => None,
        }
    }
}

/// Core generation tuning shared by both contours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreTuning {
    pub version: String,
    pub mode: String,
    pub autonomous: bool,
    pub boost: f64,
    pub psw_weight: f64,
    pub glue_anchor: bool,
    pub stabilization_method: String,
    /// Combinations generated per contour per cycle.
    pub batch_size: usize,
}

impl Default for CoreTuning {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            mode: "hybrid".to_string(),
            autonomous: false,
            boost: 2.6,
            psw_weight: 1.5,
            glue_anchor: true,
            stabilization_method: "average_last_30_draws".to_string(),
            batch_size: 200,
        }
    }
}

/// Stable profile tuning (Contour A).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourAProfile {
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f64,
    pub diversity_factor: f64,
    pub consistency_threshold: f64,
    pub history_window: u32,
    pub prediction_boost: f64,
}

impl Default for ContourAProfile {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            diversity_factor: 1.2,
            consistency_threshold: 0.95,
            history_window: 50,
            prediction_boost: 1.05,
        }
    }
}

/// Experimental profile tuning (Contour B).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourBProfile {
    pub aggressiveness: f64,
    /// Capped at 0.5.
    pub exploratory_factor: f64,
    pub novelty_weight: f64,
    pub re_evaluation_interval: u32,
    pub dynamic_threshold_adjustment: bool,
}

impl Default for ContourBProfile {
    fn default() -> Self {
        Self {
            aggressiveness: 1.5,
            exploratory_factor: 0.2,
            novelty_weight: 0.8,
            re_evaluation_interval: 3,
            dynamic_threshold_adjustment: true,
        }
    }
}

/// Tagged union over the two tuning profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TuningProfile {
    Stable(ContourAProfile),
    Experimental(ContourBProfile),
}

impl TuningProfile {
    pub fn contour(&self) -> Contour {
        match self {
            TuningProfile::Stable(_) => Contour::A,
            TuningProfile::Experimental(_) => Contour::B,
        }
    }
}

/// Target/minimum thresholds driving the auto-correction controller,
/// plus its append-only adjustment audit log. One persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AkkThresholds {
    pub min_5_plus_threshold: u32,
    pub adjustment_strength: f64,
    pub target_5_match_percentage: f64,
    pub min_5_match_percentage: f64,
    pub target_6_match_percentage: f64,
    pub min_6_match_percentage: f64,
    pub adjustment_history: Vec<AdjustmentRecord>,
}

impl Default for AkkThresholds {
    fn default() -> Self {
        Self {
            min_5_plus_threshold: 1,
            adjustment_strength: 0.05,
            target_5_match_percentage: 0.80,
            min_5_match_percentage: 0.15,
            target_6_match_percentage: 0.40,
            min_6_match_percentage: 0.02,
            adjustment_history: Vec::new(),
        }
    }
}

/// One entry of the append-only adjustment audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRecord {
    pub draw_number: u64,
    /// RFC 3339 timestamp of the adjusting call.
    pub timestamp: String,
    pub old_boost: f64,
    pub new_boost: f64,
    pub reason: String,
    /// Formatted like `"12.34%"`.
    pub performance_5_plus_percent: String,
    pub performance_6_percent: String,
}

/// Hot/Mid/Cold quota percentages. Must sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    #[serde(rename = "H")]
    pub h: u8,
    #[serde(rename = "M")]
    pub m: u8,
    #[serde(rename = "C")]
    pub c: u8,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { h: 40, m: 35, c: 25 }
    }
}

impl QuotaConfig {
    /// Reject quota splits that do not sum to exactly 100.
    pub fn validate(&self) -> Result<()> {
        let sum = self.h as u32 + self.m as u32 + self.c as u32;
        if sum != 100 {
            return Err(crate::error::CoreError::Config(format!(
                "quota percentages must sum to 100, got H={} M={} C={} (sum {})",
                self.h, self.m, self.c, sum
            )));
        }
        Ok(())
    }
}

/// Manual soft-pool overrides: fixed zone memberships, hard
/// exclusions, and a boost weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftPoolConfig {
    #[serde(rename = "H_zone")]
    pub h_zone: BTreeSet<u8>,
    #[serde(rename = "M_zone")]
    pub m_zone: BTreeSet<u8>,
    #[serde(rename = "L_zone")]
    pub l_zone: BTreeSet<u8>,
    /// Numbers never to generate.
    pub exclude: BTreeSet<u8>,
    pub boost: f64,
}

impl Default for SoftPoolConfig {
    fn default() -> Self {
        Self {
            h_zone: BTreeSet::new(),
            m_zone: BTreeSet::new(),
            l_zone: BTreeSet::new(),
            exclude: BTreeSet::new(),
            boost: 1.0,
        }
    }
}

/// Reverse-analysis reporting limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseConfig {
    pub top_missing_limit: usize,
    pub top_extra_limit: usize,
}

impl Default for ReverseConfig {
    fn default() -> Self {
        Self { top_missing_limit: 10, top_extra_limit: 10 }
    }
}

/// Orchestrator bookkeeping: persisted phase name (observability hook)
/// and cycle counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub current_phase: String,
    pub cycle_count: u64,
    pub cycles_to_run: u32,
    pub log_level: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            current_phase: "Idle".to_string(),
            cycle_count: 0,
            cycles_to_run: 1,
            log_level: "INFO".to_string(),
        }
    }
}

/// Live cycle cursors. Never mutated by historical replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleState {
    pub last_successful_draw: u64,
    pub last_generated_draw: u64,
    pub last_analysis_draw: u64,
}

/// Loads and saves configuration documents relative to a project root.
///
/// Single-writer discipline: documents are read at the start of a
/// decision and written back immediately after mutation within the
/// same call.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a document, degrading to defaults when the file is
    /// missing, empty, or malformed.
    pub fn load<T: DeserializeOwned + Default>(&self, relative: &str) -> T {
        let path = self.root.join(relative);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return T::default(),
        };
        if content.trim().is_empty() {
            return T::default();
        }
        match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                log::warn!(
                    "Invalid JSON in {}: {}. Rebuilding with defaults.",
                    path.display(),
                    e
                );
                T::default()
            }
        }
    }

    /// Save a document atomically (temp file + rename).
    pub fn save<T: Serialize>(&self, relative: &str, value: &T) -> Result<()> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(value)?;
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(data.as_bytes())?;
            file.flush()?;
            file.sync_all()?;
        }
        rename(&temp_path, &path)?;

        log::debug!("Saved {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    /// Load the tuning profile for a contour as the tagged union.
    pub fn load_profile(&self, contour: Contour) -> TuningProfile {
        match contour {
            Contour::A => TuningProfile::Stable(self.load(CONTOUR_A_FILE)),
            Contour::B => TuningProfile::Experimental(self.load(CONTOUR_B_FILE)),
        }
    }

    /// Persist a tuning profile to its contour's document.
    pub fn save_profile(&self, profile: &TuningProfile) -> Result<()> {
        match profile {
            TuningProfile::Stable(a) => self.save(CONTOUR_A_FILE, a),
            TuningProfile::Experimental(b) => self.save(CONTOUR_B_FILE, b),
        }
    }
}
