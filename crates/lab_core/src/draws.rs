//! Draw history and combination types.
//!
//! A draw is one historical result of six distinct numbers tied to a
//! sequential draw number. History is append-only and keyed by that
//! number; rows with fewer than six parseable numbers are kept for
//! key tracking but report their winning numbers as unavailable.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Size of the number pool (numbers are `1..=POOL_SIZE`).
pub const POOL_SIZE: u8 = 52;

/// Numbers per draw and per generated combination.
pub const DRAW_SIZE: usize = 6;

/// One candidate guess of six distinct numbers, stored sorted ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
    numbers: [u8; DRAW_SIZE],
}

impl Combination {
    /// Build a combination from six numbers. Sorts ascending and
    /// rejects duplicates or out-of-range values.
    pub fn new(mut numbers: [u8; DRAW_SIZE]) -> Result<Self> {
        numbers.sort_unstable();
        for (i, &n) in numbers.iter().enumerate() {
            if n < 1 || n > POOL_SIZE {
                return Err(CoreError::Computation(format!(
                    "number {} out of range 1..={}",
                    n, POOL_SIZE
                )));
            }
            if i > 0 && numbers[i - 1] == n {
                return Err(CoreError::Computation(format!("duplicate number {}", n)));
            }
        }
        Ok(Self { numbers })
    }

    pub fn numbers(&self) -> &[u8; DRAW_SIZE] {
        &self.numbers
    }

    pub fn contains(&self, n: u8) -> bool {
        self.numbers.binary_search(&n).is_ok()
    }

    /// Count of numbers shared with a winning set.
    pub fn matches(&self, winning: &[u8; DRAW_SIZE]) -> usize {
        self.numbers.iter().filter(|n| winning.contains(n)).count()
    }
}

/// One recorded historical result. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub draw_number: u64,
    pub date: String,
    pub numbers: Combination,
}

/// Append-only draw history loaded from the collaborator-supplied CSV
/// table.
#[derive(Debug, Clone, Default)]
pub struct DrawHistory {
    draws: BTreeMap<u64, Draw>,
    /// Highest draw number seen in the key column, complete or not.
    max_draw_number: u64,
}

impl DrawHistory {
    /// Load history from a CSV file with a header row. The key column
    /// is `draw` (or `draw_number`), number columns are `n1..n6`, and
    /// an optional `date` column is carried through. Header matching
    /// is case-insensitive; unknown columns are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::SourceNotFound {
                path: path.display().to_string(),
            });
        }

        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let find = |names: &[&str]| -> Option<usize> {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        let draw_idx = find(&["draw", "draw_number"]).ok_or_else(|| {
            CoreError::Config(format!(
                "draw history {} has no draw number column",
                path.display()
            ))
        })?;
        let date_idx = find(&["date"]);
        let number_idx: Vec<Option<usize>> =
            (1..=DRAW_SIZE).map(|i| find(&[&format!("n{}", i)])).collect();
        if number_idx.iter().any(|i| i.is_none()) {
            return Err(CoreError::Config(format!(
                "draw history {} is missing number columns n1..n{}",
                path.display(),
                DRAW_SIZE
            )));
        }

        let mut history = DrawHistory::default();
        for record in reader.records() {
            let record = record?;
            let draw_number: u64 = match record.get(draw_idx).and_then(|s| s.trim().parse().ok()) {
                Some(n) => n,
                None => continue, // non-numeric key row, skip
            };
            history.max_draw_number = history.max_draw_number.max(draw_number);

            let mut numbers = [0u8; DRAW_SIZE];
            let mut complete = true;
            for (slot, idx) in numbers.iter_mut().zip(&number_idx) {
                match record
                    .get(idx.unwrap())
                    .and_then(|s| s.trim().parse::<u8>().ok())
                {
                    Some(n) => *slot = n,
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if !complete {
                log::warn!(
                    "Draw {} has fewer than {} numbers, treating as unavailable",
                    draw_number,
                    DRAW_SIZE
                );
                continue;
            }

            match Combination::new(numbers) {
                Ok(combination) => {
                    let date = date_idx
                        .and_then(|i| record.get(i))
                        .unwrap_or_default()
                        .to_string();
                    history.draws.insert(
                        draw_number,
                        Draw { draw_number, date, numbers: combination },
                    );
                }
                Err(e) => {
                    log::warn!("Draw {} has invalid numbers ({}), skipping", draw_number, e);
                }
            }
        }

        Ok(history)
    }

    /// Build a history directly from draws (test and replay helper).
    pub fn from_draws(draws: Vec<Draw>) -> Self {
        let mut history = DrawHistory::default();
        for draw in draws {
            history.max_draw_number = history.max_draw_number.max(draw.draw_number);
            history.draws.insert(draw.draw_number, draw);
        }
        history
    }

    /// Highest draw number present in the key column (0 when empty).
    pub fn last_draw_number(&self) -> u64 {
        self.max_draw_number
    }

    /// Winning numbers for a draw, `None` when the draw is absent or
    /// incomplete.
    pub fn winning_numbers(&self, draw_number: u64) -> Option<[u8; DRAW_SIZE]> {
        self.draws.get(&draw_number).map(|d| *d.numbers.numbers())
    }

    pub fn contains(&self, draw_number: u64) -> bool {
        self.draws.contains_key(&draw_number)
    }

    /// Complete draws in ascending draw-number order.
    pub fn draws(&self) -> impl Iterator<Item = &Draw> {
        self.draws.values()
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}
