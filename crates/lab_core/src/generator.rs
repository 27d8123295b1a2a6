//! Quota-constrained combination generator.
//!
//! Produces combinations of six distinct numbers honoring the
//! Hot/Mid/Cold quota percentages and the soft-pool exclusions. Pure
//! function of the config and statistics snapshot plus the injected
//! randomness source; reproducible runs seed a `ChaCha8Rng`.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{QuotaConfig, SoftPoolConfig};
use crate::draws::{Combination, DRAW_SIZE, POOL_SIZE};
use crate::error::{CoreError, Result};
use crate::stats::{PoolStatistics, Zone};

/// Convert quota percentages to integer per-zone target counts summing
/// to exactly `DRAW_SIZE`.
///
/// Rounded targets are rebalanced largest-remainder style: while the
/// sum is too high the largest target is decremented, while too low
/// the smallest is incremented, ties broken in fixed zone order
/// H, M, C. Negative intermediate values (possible when rounding
/// pushes H+M past six) are clamped to zero before rebalancing.
pub fn zone_targets(quotas: &QuotaConfig) -> (usize, usize, usize) {
    let share = |pct: u8| (DRAW_SIZE as f64 * pct as f64 / 100.0).round() as i64;
    let mut targets = [
        share(quotas.h),
        share(quotas.m),
        DRAW_SIZE as i64 - share(quotas.h) - share(quotas.m),
    ];
    for t in targets.iter_mut() {
        if *t < 0 {
            *t = 0;
        }
    }

    loop {
        let total: i64 = targets.iter().sum();
        if total == DRAW_SIZE as i64 {
            break;
        }
        if total > DRAW_SIZE as i64 {
            // Decrement the largest positive target, ties favor H, M, C.
            let max = *targets.iter().max().unwrap();
            let idx = targets.iter().position(|&t| t == max && t > 0).unwrap();
            targets[idx] -= 1;
        } else {
            // Increment the smallest target below DRAW_SIZE, ties favor H, M, C.
            let min = *targets
                .iter()
                .filter(|&&t| t < DRAW_SIZE as i64)
                .min()
                .unwrap();
            let idx = targets
                .iter()
                .position(|&t| t == min && t < DRAW_SIZE as i64)
                .unwrap();
            targets[idx] += 1;
        }
    }

    (targets[0] as usize, targets[1] as usize, targets[2] as usize)
}

/// Generates combinations from a statistics snapshot under quota
/// constraints. Holds only borrowed views; no side effects.
pub struct CombinationGenerator<'a> {
    quotas: &'a QuotaConfig,
    softpool: &'a SoftPoolConfig,
    stats: &'a PoolStatistics,
}

impl<'a> CombinationGenerator<'a> {
    pub fn new(
        quotas: &'a QuotaConfig,
        softpool: &'a SoftPoolConfig,
        stats: &'a PoolStatistics,
    ) -> Self {
        Self { quotas, softpool, stats }
    }

    /// Generate `n` combinations.
    ///
    /// Fails with `Config` when the quota percentages do not sum to
    /// 100 and with `InsufficientPool` when fewer than six usable
    /// numbers remain after exclusions. Either failure produces no
    /// output at all.
    pub fn generate<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Vec<Combination>> {
        self.quotas.validate()?;

        let usable: Vec<u8> = (1..=POOL_SIZE)
            .filter(|n| !self.softpool.exclude.contains(n))
            .collect();
        if usable.len() < DRAW_SIZE {
            return Err(CoreError::InsufficientPool {
                available: usable.len(),
                needed: DRAW_SIZE,
            });
        }

        let (h_target, m_target, c_target) = zone_targets(self.quotas);
        let hot: Vec<u8> = usable
            .iter()
            .copied()
            .filter(|&n| self.stats.zone(n) == Zone::Hot)
            .collect();
        let warm: Vec<u8> = usable
            .iter()
            .copied()
            .filter(|&n| self.stats.zone(n) == Zone::Warm)
            .collect();
        let cold_sleepy: Vec<u8> = usable
            .iter()
            .copied()
            .filter(|&n| matches!(self.stats.zone(n), Zone::Cold | Zone::Sleepy))
            .collect();

        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.generate_one(
                &usable,
                [(&hot, h_target), (&warm, m_target), (&cold_sleepy, c_target)],
                rng,
            )?);
        }
        Ok(out)
    }

    fn generate_one<R: Rng>(
        &self,
        usable: &[u8],
        zone_pools: [(&Vec<u8>, usize); 3],
        rng: &mut R,
    ) -> Result<Combination> {
        let mut chosen: BTreeSet<u8> = BTreeSet::new();

        // Per-zone quota sampling; a pool smaller than its target is a
        // tolerated shortfall, not an error.
        for (pool, target) in zone_pools {
            for n in sample_unused(pool, target, &chosen, rng) {
                chosen.insert(n);
            }
        }

        // Top up uniformly from the unused remainder of the usable pool.
        if chosen.len() < DRAW_SIZE {
            let shortfall = DRAW_SIZE - chosen.len();
            for n in sample_unused(usable, shortfall, &chosen, rng) {
                chosen.insert(n);
            }
        }

        // Degenerate top-up: draw one at a time until full. The usable
        // pool is known to hold at least DRAW_SIZE numbers.
        while chosen.len() < DRAW_SIZE {
            let candidates: Vec<u8> = usable
                .iter()
                .copied()
                .filter(|n| !chosen.contains(n))
                .collect();
            match candidates.choose(rng) {
                Some(&n) => {
                    chosen.insert(n);
                }
                None => {
                    return Err(CoreError::InsufficientPool {
                        available: chosen.len(),
                        needed: DRAW_SIZE,
                    })
                }
            }
        }

        let mut numbers = [0u8; DRAW_SIZE];
        for (slot, n) in numbers.iter_mut().zip(chosen.iter()) {
            *slot = *n;
        }
        Combination::new(numbers)
    }
}

/// Sample up to `k` numbers without replacement from `pool`, skipping
/// anything already chosen. Returns all remaining candidates when the
/// pool cannot cover `k`.
fn sample_unused<R: Rng>(
    pool: &[u8],
    k: usize,
    chosen: &BTreeSet<u8>,
    rng: &mut R,
) -> Vec<u8> {
    let available: Vec<u8> = pool.iter().copied().filter(|n| !chosen.contains(n)).collect();
    if available.len() <= k {
        return available;
    }
    available.choose_multiple(rng, k).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draws::{Combination as Combo, Draw, DrawHistory};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn stats_with_zones() -> PoolStatistics {
        // 1..=6 appear in the latest draw (Hot), 7..=12 five draws back
        // (Warm), 13..=18 ten draws back (Cold), the rest never (Sleepy).
        let mut draws = Vec::new();
        for i in 0..11u64 {
            let numbers = match i {
                0 => [13, 14, 15, 16, 17, 18],
                5 => [7, 8, 9, 10, 11, 12],
                10 => [1, 2, 3, 4, 5, 6],
                _ => [19, 20, 21, 22, 23, 24],
            };
            draws.push(Draw {
                draw_number: 100 + i,
                date: String::new(),
                numbers: Combo::new(numbers).unwrap(),
            });
        }
        PoolStatistics::compute(&DrawHistory::from_draws(draws))
    }

    #[test]
    fn test_zone_targets_even_split() {
        let q = QuotaConfig { h: 33, m: 33, c: 34 };
        assert_eq!(zone_targets(&q), (2, 2, 2));
    }

    #[test]
    fn test_zone_targets_rebalance_tie_break_order() {
        // 50/50/0 rounds to 3+3+0 = 6, no rebalancing needed.
        assert_eq!(zone_targets(&QuotaConfig { h: 50, m: 50, c: 0 }), (3, 3, 0));
        // 75/25/0 rounds to 5+2-1; the negative C clamps to 0 and the
        // overshoot comes off H first (tie-break order H, M, C).
        assert_eq!(zone_targets(&QuotaConfig { h: 75, m: 25, c: 0 }), (4, 2, 0));
        // All-in-one-zone splits stay put.
        assert_eq!(zone_targets(&QuotaConfig { h: 100, m: 0, c: 0 }), (6, 0, 0));
        assert_eq!(zone_targets(&QuotaConfig { h: 0, m: 0, c: 100 }), (0, 0, 6));
    }

    #[test]
    fn test_zone_targets_always_sum_to_six() {
        for h in (0..=100).step_by(5) {
            for m in (0..=(100 - h)).step_by(5) {
                let q = QuotaConfig { h: h as u8, m: m as u8, c: (100 - h - m) as u8 };
                let (a, b, c) = zone_targets(&q);
                assert_eq!(a + b + c, DRAW_SIZE, "quota {:?}", q);
            }
        }
    }

    #[test]
    fn test_generate_shape_invariants() {
        let stats = stats_with_zones();
        let quotas = QuotaConfig::default();
        let softpool = SoftPoolConfig::default();
        let gen = CombinationGenerator::new(&quotas, &softpool, &stats);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let combos = gen.generate(50, &mut rng).unwrap();
        assert_eq!(combos.len(), 50);
        for c in &combos {
            let ns = c.numbers();
            assert!(ns.windows(2).all(|w| w[0] < w[1]), "sorted + distinct");
            assert!(ns.iter().all(|&n| (1..=POOL_SIZE).contains(&n)));
        }
    }

    #[test]
    fn test_generate_honors_exclusions() {
        let stats = stats_with_zones();
        let quotas = QuotaConfig::default();
        let mut softpool = SoftPoolConfig::default();
        for n in 1..=10u8 {
            softpool.exclude.insert(n);
        }
        let gen = CombinationGenerator::new(&quotas, &softpool, &stats);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for c in gen.generate(100, &mut rng).unwrap() {
            assert!(c.numbers().iter().all(|n| !softpool.exclude.contains(n)));
        }
    }

    #[test]
    fn test_generate_rejects_invalid_quota() {
        let stats = stats_with_zones();
        let quotas = QuotaConfig { h: 50, m: 50, c: 50 };
        let softpool = SoftPoolConfig::default();
        let gen = CombinationGenerator::new(&quotas, &softpool, &stats);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            gen.generate(1, &mut rng),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_generate_empty_pool_fails() {
        let stats = stats_with_zones();
        let quotas = QuotaConfig::default();
        let mut softpool = SoftPoolConfig::default();
        for n in 1..=POOL_SIZE {
            softpool.exclude.insert(n);
        }
        let gen = CombinationGenerator::new(&quotas, &softpool, &stats);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            gen.generate(10, &mut rng),
            Err(CoreError::InsufficientPool { available: 0, needed: 6 })
        ));
    }

    #[test]
    fn test_generate_tolerates_small_zone_pools() {
        // Only one Hot number survives exclusion; the H quota shortfall
        // must be topped up, not fail.
        let stats = stats_with_zones();
        let quotas = QuotaConfig { h: 100, m: 0, c: 0 };
        let mut softpool = SoftPoolConfig::default();
        for n in 2..=6u8 {
            softpool.exclude.insert(n);
        }
        let gen = CombinationGenerator::new(&quotas, &softpool, &stats);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for c in gen.generate(20, &mut rng).unwrap() {
            assert!(c.contains(1), "sole Hot number must always be taken");
        }
    }

    #[test]
    fn test_zone_distribution_converges() {
        // With abundant zone pools the sampled share per zone should
        // converge toward target/6.
        let stats = stats_with_zones();
        let quotas = QuotaConfig { h: 50, m: 33, c: 17 };
        let softpool = SoftPoolConfig::default();
        let gen = CombinationGenerator::new(&quotas, &softpool, &stats);
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let (h_t, m_t, _) = zone_targets(&quotas);
        let combos = gen.generate(2_000, &mut rng).unwrap();
        let mut hot_count = 0usize;
        let mut warm_count = 0usize;
        for c in &combos {
            for &n in c.numbers() {
                match stats.zone(n) {
                    Zone::Hot => hot_count += 1,
                    Zone::Warm => warm_count += 1,
                    _ => {}
                }
            }
        }
        let total = combos.len() * DRAW_SIZE;
        let hot_share = hot_count as f64 / total as f64;
        let warm_share = warm_count as f64 / total as f64;
        // Hot pool has exactly 6 members for a target of 3, so the hot
        // share sits at the quota; tolerance covers sampling noise.
        assert!(
            (hot_share - h_t as f64 / 6.0).abs() < 0.05,
            "hot share {} vs target {}",
            hot_share,
            h_t as f64 / 6.0
        );
        assert!(
            (warm_share - m_t as f64 / 6.0).abs() < 0.05,
            "warm share {} vs target {}",
            warm_share,
            m_t as f64 / 6.0
        );
    }

    #[test]
    fn test_same_seed_same_output() {
        let stats = stats_with_zones();
        let quotas = QuotaConfig::default();
        let softpool = SoftPoolConfig::default();
        let gen = CombinationGenerator::new(&quotas, &softpool, &stats);

        let a = gen
            .generate(25, &mut ChaCha8Rng::seed_from_u64(1234))
            .unwrap();
        let b = gen
            .generate(25, &mut ChaCha8Rng::seed_from_u64(1234))
            .unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_generated_combinations_are_well_formed(
            seed in any::<u64>(),
            h in 0u8..=100,
        ) {
            let m = (100 - h) / 2;
            let c = 100 - h - m;
            let quotas = QuotaConfig { h, m, c };
            let stats = stats_with_zones();
            let softpool = SoftPoolConfig::default();
            let gen = CombinationGenerator::new(&quotas, &softpool, &stats);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let combos = gen.generate(5, &mut rng).unwrap();
            prop_assert_eq!(combos.len(), 5);
            for combo in combos {
                let ns = combo.numbers();
                prop_assert!(ns.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(ns.iter().all(|&n| (1..=POOL_SIZE).contains(&n)));
            }
        }
    }
}
