//! Headless batch runs: step, stream events, checkpoint.

use bioevolve_core::{FitnessEvaluator, PopulationManager, RunStatus};
use bioevolve_data::{Conditions, EnvironmentSnapshot};
use bioevolve_io::{save_checkpoint, EventLog};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub generations: u64,
    /// Where checkpoints go. `.rkyv` selects the binary format.
    pub checkpoint: Option<PathBuf>,
    /// Checkpoint every N generations; the final generation is always saved.
    pub checkpoint_every: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub generation: u64,
    pub population: usize,
    pub species_alive: usize,
    pub species_total: usize,
    pub events: usize,
    pub extinct: bool,
    pub elapsed_ms: u128,
}

/// Per-deme conditions with temperature rising linearly from `low` in deme 0
/// to `high` in the last deme.
#[must_use]
pub fn temperature_gradient(
    demes: u16,
    base: Conditions,
    low: f64,
    high: f64,
) -> EnvironmentSnapshot {
    let span = f64::from(demes.saturating_sub(1).max(1));
    let demes = (0..demes)
        .map(|d| Conditions {
            temperature: low + (high - low) * f64::from(d) / span,
            ..base
        })
        .collect();
    EnvironmentSnapshot {
        global: base,
        demes,
    }
}

/// Steps `manager` under a fixed environment until `options.generations`
/// generations have run or the population dies out.
pub fn run_batch(
    manager: &mut PopulationManager,
    environment: &EnvironmentSnapshot,
    evaluator: &dyn FitnessEvaluator,
    log: &mut EventLog,
    options: &RunOptions,
) -> anyhow::Result<RunSummary> {
    let started = Instant::now();
    let mut emitted = 0;

    for _ in 0..options.generations {
        let report = manager.step(environment, evaluator)?;
        log.append(&report.events)?;
        emitted += report.events.len();

        if let Some(path) = &options.checkpoint {
            if options.checkpoint_every > 0 && report.generation % options.checkpoint_every == 0 {
                save_checkpoint(&manager.checkpoint(), path)?;
            }
        }
        if report.status == RunStatus::Extinct {
            tracing::warn!(generation = report.generation, "Stopping: population extinct");
            break;
        }
    }

    if let Some(path) = &options.checkpoint {
        save_checkpoint(&manager.checkpoint(), path)?;
    }

    Ok(RunSummary {
        generation: manager.generation(),
        population: manager.population().len(),
        species_alive: manager.registry().extant_count(),
        species_total: manager.registry().len(),
        events: emitted,
        extinct: manager.is_extinct(),
        elapsed_ms: started.elapsed().as_millis(),
    })
}
