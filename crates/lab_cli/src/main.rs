//! Draw Lab CLI
//!
//! Thin driver over `lab_core`: run cycles, replay history, generate
//! and score batches, inspect pool statistics.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use lab_core::config::{
    ConfigStore, Contour, CoreTuning, QuotaConfig, SoftPoolConfig, CORE_SETTINGS_FILE,
    POOL_STATS_FILE, QUOTAS_FILE, SOFTPOOL_FILE,
};
use lab_core::cycle::{CycleOrchestrator, DRAWS_FILE, GENERATED_DIR};
use lab_core::draws::DrawHistory;
use lab_core::generator::CombinationGenerator;
use lab_core::stats::{PoolStatistics, Zone};
use lab_core::{artifacts, scorer};

#[derive(Parser)]
#[command(name = "lab")]
#[command(about = "Adaptive draw-tracking laboratory", long_about = None)]
#[command(version = lab_core::VERSION)]
struct Cli {
    /// Project root holding config/, state/, generated/ and draws.csv
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full cycle (compare, adjust, generate, report)
    Cycle {
        /// Draw to analyze (default: latest in history)
        #[arg(long)]
        draw: Option<u64>,
        /// RNG seed for reproducible generation
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Replay the analysis sequence over past draws
    Replay {
        /// First draw of the range
        #[arg(long)]
        start: u64,
        /// Number of draws to replay
        #[arg(long)]
        count: u64,
    },
    /// Generate a batch for one contour without running a cycle
    Generate {
        /// Target draw number for the batch
        #[arg(long)]
        draw: u64,
        /// Contour label, A or B
        #[arg(long, default_value = "A")]
        contour: String,
        /// Batch size (default: core settings batch_size)
        #[arg(long)]
        count: Option<usize>,
        /// RNG seed for reproducible generation
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Score the generated batches for a drawn result
    Score {
        /// Draw number to score against
        #[arg(long)]
        draw: u64,
        /// Score one selected batch artifact instead of every
        /// discovered batch for the draw
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Recompute and print pool statistics
    Stats,
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Cycle { draw, seed } => {
            let mut orchestrator = CycleOrchestrator::new(&cli.root);
            let mut rng = seeded_rng(seed);
            let outcome = orchestrator.run_cycle(draw, &mut rng)?;

            println!("Cycle finished for draw {}", outcome.draw_number);
            match &outcome.metrics {
                Some(m) => println!(
                    "Scored {} combinations: {} with 5+ matches, {} with 6",
                    m.total_combinations, m.match_5_plus_count, m.match_6_count
                ),
                None => println!("Comparison unavailable for this draw"),
            }
            if let Some(recommendation) = &outcome.recommendation {
                println!("Controller: {}", recommendation);
            }
            println!(
                "Generated {} combinations per contour for draw {}",
                outcome.batch_size, outcome.generated_for
            );
        }
        Commands::Replay { start, count } => {
            let mut orchestrator = CycleOrchestrator::new(&cli.root);
            let outcome = orchestrator.run_replay(start, count)?;
            println!(
                "Replay finished: {} draws processed, {} skipped, {} adjustments",
                outcome.draws_processed, outcome.draws_skipped, outcome.adjustments
            );
        }
        Commands::Generate { draw, contour, count, seed } => {
            let Some(contour) = Contour::from_label(&contour) else {
                bail!("unknown contour {:?}, expected A or B", contour);
            };
            let store = ConfigStore::new(&cli.root);
            // Prefer the snapshot persisted by the last cycle; compute
            // and persist one when no cycle has run yet.
            let mut stats: PoolStatistics = store.load(POOL_STATS_FILE);
            if stats.is_empty() {
                let history = DrawHistory::load(&cli.root.join(DRAWS_FILE))?;
                stats = PoolStatistics::compute(&history);
                store.save(POOL_STATS_FILE, &stats)?;
            }
            let quotas: QuotaConfig = store.load(QUOTAS_FILE);
            let softpool: SoftPoolConfig = store.load(SOFTPOOL_FILE);
            let tuning: CoreTuning = store.load(CORE_SETTINGS_FILE);

            let generator = CombinationGenerator::new(&quotas, &softpool, &stats);
            let mut rng = seeded_rng(seed);
            let batch = generator.generate(count.unwrap_or(tuning.batch_size), &mut rng)?;
            let path = artifacts::write_batch(
                &cli.root.join(GENERATED_DIR),
                draw,
                contour,
                &batch,
            )?;
            println!("Wrote {} combinations to {}", batch.len(), path.display());
        }
        Commands::Score { draw, file } => {
            let history = DrawHistory::load(&cli.root.join(DRAWS_FILE))?;
            let Some(winning) = history.winning_numbers(draw) else {
                bail!("winning numbers for draw {} not found in history", draw);
            };
            let outcome = match &file {
                Some(path) => scorer::score_file(path, &winning)?,
                None => scorer::score_draw(&cli.root.join(GENERATED_DIR), draw, &winning)?,
            };
            match &file {
                Some(path) => println!(
                    "Draw {} scored over {} combinations from {}",
                    draw,
                    outcome.metrics.total_combinations,
                    path.display()
                ),
                None => println!(
                    "Draw {} scored over {} combinations",
                    draw, outcome.metrics.total_combinations
                ),
            }
            for matches in (0..=lab_core::DRAW_SIZE).rev() {
                println!("  {} matches: {}", matches, outcome.histogram[matches]);
            }
        }
        Commands::Stats => {
            let store = ConfigStore::new(&cli.root);
            let history = DrawHistory::load(&cli.root.join(DRAWS_FILE))?;
            let stats = PoolStatistics::compute(&history);
            store.save(POOL_STATS_FILE, &stats)?;

            println!("Statistics over {} draws:", history.len());
            for zone in Zone::ALL {
                let numbers = stats.numbers_in_zone(zone);
                println!(
                    "  {:<6} ({:>2}): {}",
                    zone.as_str(),
                    numbers.len(),
                    numbers
                        .iter()
                        .map(|n| n.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                );
            }
        }
    }
    Ok(())
}
