//! Per-number pool statistics.
//!
//! The statistics snapshot classifies every number in the pool into a
//! recency zone (Hot / Warm / Cold / Sleepy) and carries the raw
//! frequency and interval figures behind the classification. It is
//! recomputed wholesale from the full draw history at the start of
//! each cycle and fully replaces the previous snapshot; the generator
//! only reads it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::draws::{DrawHistory, POOL_SIZE};

/// `last_seen` value for numbers that never appeared in the history.
pub const NEVER_SEEN: u32 = 999;

/// Recency classification of a single number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Hot,
    Warm,
    Cold,
    Sleepy,
}

impl Zone {
    /// All zones in classification order.
    pub const ALL: [Zone; 4] = [Zone::Hot, Zone::Warm, Zone::Cold, Zone::Sleepy];

    pub fn index(&self) -> usize {
        match self {
            Zone::Hot => 0,
            Zone::Warm => 1,
            Zone::Cold => 2,
            Zone::Sleepy => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Hot => "Hot",
            Zone::Warm => "Warm",
            Zone::Cold => "Cold",
            Zone::Sleepy => "Sleepy",
        }
    }

    /// Classify by draws since last appearance.
    fn from_last_seen(last_seen: u32) -> Zone {
        match last_seen {
            0..=3 => Zone::Hot,
            4..=8 => Zone::Warm,
            9..=20 => Zone::Cold,
            _ => Zone::Sleepy,
        }
    }
}

/// Statistics for one number in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStat {
    /// Appearance rate over the complete history (0.0 when empty).
    pub frequency: f64,
    /// Draws since the number last appeared (0 = in the latest draw).
    pub last_seen: u32,
    /// Mean gap in draws between consecutive appearances.
    pub avg_interval: f64,
    /// Population standard deviation of the appearance gaps.
    pub std_interval: f64,
    /// Performance score weight derived from frequency and recency.
    pub psw: f64,
    pub zone: Zone,
}

impl Default for PoolStat {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            last_seen: NEVER_SEEN,
            avg_interval: 0.0,
            std_interval: 0.0,
            psw: 0.0,
            zone: Zone::Sleepy,
        }
    }
}

/// Full statistics snapshot for numbers `1..=POOL_SIZE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolStatistics {
    stats: BTreeMap<u8, PoolStat>,
}

impl PoolStatistics {
    /// Recompute the full snapshot from the draw history. Every number
    /// gets an entry; numbers that never appeared default to Sleepy.
    pub fn compute(history: &DrawHistory) -> Self {
        let total = history.len();
        // Appearance positions per number, in ascending draw order.
        let mut appearances: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        for (pos, draw) in history.draws().enumerate() {
            for &n in draw.numbers.numbers() {
                appearances.entry(n).or_default().push(pos);
            }
        }

        let mut stats = BTreeMap::new();
        for n in 1..=POOL_SIZE {
            let stat = match appearances.get(&n) {
                Some(positions) if total > 0 => {
                    let frequency = positions.len() as f64 / total as f64;
                    let last_seen = (total - 1 - positions[positions.len() - 1]) as u32;
                    let gaps: Vec<f64> = positions
                        .windows(2)
                        .map(|w| (w[1] - w[0]) as f64)
                        .collect();
                    let (avg_interval, std_interval) = mean_and_std(&gaps);
                    let psw = round4(frequency / (1.0 + last_seen as f64));
                    PoolStat {
                        frequency,
                        last_seen,
                        avg_interval,
                        std_interval,
                        psw,
                        zone: Zone::from_last_seen(last_seen),
                    }
                }
                _ => PoolStat::default(),
            };
            stats.insert(n, stat);
        }

        log::debug!(
            "Pool statistics recomputed over {} draws ({} numbers tracked)",
            total,
            stats.len()
        );
        Self { stats }
    }

    pub fn get(&self, number: u8) -> Option<&PoolStat> {
        self.stats.get(&number)
    }

    /// Current zone of a number (Sleepy when untracked).
    pub fn zone(&self, number: u8) -> Zone {
        self.stats.get(&number).map(|s| s.zone).unwrap_or(Zone::Sleepy)
    }

    /// Numbers currently classified into the given zone, ascending.
    pub fn numbers_in_zone(&self, zone: Zone) -> Vec<u8> {
        self.stats
            .iter()
            .filter(|(_, s)| s.zone == zone)
            .map(|(&n, _)| n)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
