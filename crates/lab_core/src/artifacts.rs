//! Generated-combination batch artifacts.
//!
//! One CSV file per (target draw number, contour label) pair under the
//! `generated/` directory. The filename encodes both so the scorer can
//! discover every batch for a given draw:
//! `combinations_for_draw_{N}_contour_{A|B}[_{YYYYmmdd_HHMMSS}].csv`.
//! The timestamp suffix is only appended when the base name already
//! exists.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::config::Contour;
use crate::draws::{Combination, DRAW_SIZE};
use crate::error::{CoreError, Result};

const PREFIX: &str = "combinations_for_draw_";
const CONTOUR_TAG: &str = "_contour_";

/// Base filename (no timestamp suffix) for a batch.
pub fn batch_filename(draw_number: u64, contour: Contour) -> String {
    format!("{}{}{}{}.csv", PREFIX, draw_number, CONTOUR_TAG, contour.label())
}

/// Recover (target draw number, contour) from a batch filename.
/// Returns `None` for anything that does not match the naming scheme.
pub fn parse_batch_filename(name: &str) -> Option<(u64, Contour)> {
    let rest = name.strip_prefix(PREFIX)?.strip_suffix(".csv")?;
    let (draw_part, contour_part) = rest.split_once(CONTOUR_TAG)?;
    let draw_number: u64 = draw_part.parse().ok()?;

    let mut chars = contour_part.chars();
    let contour = Contour::from_label(&chars.next()?.to_string())?;
    let suffix: String = chars.collect();
    if suffix.is_empty() || is_timestamp_suffix(&suffix) {
        Some((draw_number, contour))
    } else {
        None
    }
}

/// `_YYYYmmdd_HHMMSS`
fn is_timestamp_suffix(s: &str) -> bool {
    let Some(body) = s.strip_prefix('_') else {
        return false;
    };
    body.len() == 15
        && body
            .chars()
            .enumerate()
            .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() })
}

/// Write a batch to the generated directory, deferring to a
/// timestamped name when the base name is taken. Returns the written
/// path.
pub fn write_batch(
    dir: &Path,
    draw_number: u64,
    contour: Contour,
    combinations: &[Combination],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let mut path = dir.join(batch_filename(draw_number, contour));
    if path.exists() {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        path = dir.join(format!(
            "{}{}{}{}_{}.csv",
            PREFIX,
            draw_number,
            CONTOUR_TAG,
            contour.label(),
            stamp
        ));
    }

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["n1", "n2", "n3", "n4", "n5", "n6"])?;
    for combo in combinations {
        let row: Vec<String> = combo.numbers().iter().map(|n| n.to_string()).collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;

    log::info!(
        "Wrote {} combinations for draw {} ({}) to {}",
        combinations.len(),
        draw_number,
        contour.display_name(),
        path.display()
    );
    Ok(path)
}

/// Read a batch artifact. Rows without six parseable numbers are
/// skipped with a warning.
pub fn read_batch(path: &Path) -> Result<Vec<Combination>> {
    if !path.exists() {
        return Err(CoreError::SourceNotFound {
            path: path.display().to_string(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut combinations = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let mut numbers = [0u8; DRAW_SIZE];
        let mut complete = record.len() >= DRAW_SIZE;
        if complete {
            for (slot, field) in numbers.iter_mut().zip(record.iter()) {
                match field.trim().parse::<u8>() {
                    Ok(n) => *slot = n,
                    Err(_) => {
                        complete = false;
                        break;
                    }
                }
            }
        }
        if !complete {
            log::warn!("Skipping malformed row {} in {}", row + 1, path.display());
            continue;
        }
        match Combination::new(numbers) {
            Ok(c) => combinations.push(c),
            Err(e) => log::warn!(
                "Skipping invalid row {} in {}: {}",
                row + 1,
                path.display(),
                e
            ),
        }
    }
    Ok(combinations)
}

/// All batch artifacts targeting the given draw, sorted by filename
/// for deterministic processing order. An absent directory is a
/// missing source.
pub fn discover_batches(dir: &Path, draw_number: u64) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(CoreError::SourceNotFound {
            path: dir.display().to_string(),
        });
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_batch_filename)
                .map(|(draw, _)| draw == draw_number)
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// First batch for (draw, contour), if any.
pub fn find_batch(dir: &Path, draw_number: u64, contour: Contour) -> Option<PathBuf> {
    discover_batches(dir, draw_number)
        .ok()?
        .into_iter()
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_batch_filename)
                .map(|(_, c)| c == contour)
                .unwrap_or(false)
        })
}
