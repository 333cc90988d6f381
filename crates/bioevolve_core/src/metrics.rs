//! Run metrics and structured logging.
//!
//! Counters are observational only. They never feed back into the simulation
//! and are not part of checkpoints.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Reasons a mating attempt produced no offspring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatingFailureKind {
    /// Ploidy or layout mismatch.
    Incompatible,
    /// Cross-species pair failed the hybrid viability trial.
    Isolation,
    /// Offspring genome had a cyclic regulatory graph.
    RegulatoryCycle,
    /// Offspring genome failed structural validation.
    Malformed,
}

/// Reasons an organism left the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Senescence,
    LowFitness,
    Culled,
}

/// Atomic counters for one engine instance.
pub struct EngineMetrics {
    generations: AtomicU64,
    births: AtomicU64,
    deaths_senescence: AtomicU64,
    deaths_low_fitness: AtomicU64,
    culls: AtomicU64,
    failed_incompatible: AtomicU64,
    failed_isolation: AtomicU64,
    failed_cycle: AtomicU64,
    failed_malformed: AtomicU64,
    migrations: AtomicU64,
    speciations: AtomicU64,
    extinctions: AtomicU64,
    start_time: Instant,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generations: AtomicU64::new(0),
            births: AtomicU64::new(0),
            deaths_senescence: AtomicU64::new(0),
            deaths_low_fitness: AtomicU64::new(0),
            culls: AtomicU64::new(0),
            failed_incompatible: AtomicU64::new(0),
            failed_isolation: AtomicU64::new(0),
            failed_cycle: AtomicU64::new(0),
            failed_malformed: AtomicU64::new(0),
            migrations: AtomicU64::new(0),
            speciations: AtomicU64::new(0),
            extinctions: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_births(&self, count: usize) {
        self.births.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_death(&self, cause: DeathCause) {
        let counter = match cause {
            DeathCause::Senescence => &self.deaths_senescence,
            DeathCause::LowFitness => &self.deaths_low_fitness,
            DeathCause::Culled => &self.culls,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_mating(&self, kind: MatingFailureKind) {
        let counter = match kind {
            MatingFailureKind::Incompatible => &self.failed_incompatible,
            MatingFailureKind::Isolation => &self.failed_isolation,
            MatingFailureKind::RegulatoryCycle => &self.failed_cycle,
            MatingFailureKind::Malformed => &self.failed_malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_migration(&self) {
        self.migrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_speciation(&self) {
        self.speciations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extinction(&self) {
        self.extinctions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed generation and logs a summary every `interval` generations.
    pub fn record_generation(
        &self,
        generation: u64,
        duration: Duration,
        population: usize,
        species: usize,
        interval: u64,
    ) {
        self.generations.fetch_add(1, Ordering::Relaxed);
        if interval > 0 && generation % interval == 0 {
            tracing::info!(
                generation = generation,
                population = population,
                species = species,
                births = self.births(),
                deaths = self.deaths(),
                failed_matings = self.failed_matings(),
                migrations = self.migrations(),
                duration_ms = duration.as_millis() as u64,
                "Generation summary"
            );
        }
    }

    #[must_use]
    pub fn generations(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn births(&self) -> u64 {
        self.births.load(Ordering::Relaxed)
    }

    /// Deaths from every cause, culling included.
    #[must_use]
    pub fn deaths(&self) -> u64 {
        self.deaths_senescence.load(Ordering::Relaxed)
            + self.deaths_low_fitness.load(Ordering::Relaxed)
            + self.culls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn deaths_by(&self, cause: DeathCause) -> u64 {
        match cause {
            DeathCause::Senescence => self.deaths_senescence.load(Ordering::Relaxed),
            DeathCause::LowFitness => self.deaths_low_fitness.load(Ordering::Relaxed),
            DeathCause::Culled => self.culls.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn failed_matings(&self) -> u64 {
        self.failed_incompatible.load(Ordering::Relaxed)
            + self.failed_isolation.load(Ordering::Relaxed)
            + self.failed_cycle.load(Ordering::Relaxed)
            + self.failed_malformed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed_matings_by(&self, kind: MatingFailureKind) -> u64 {
        match kind {
            MatingFailureKind::Incompatible => self.failed_incompatible.load(Ordering::Relaxed),
            MatingFailureKind::Isolation => self.failed_isolation.load(Ordering::Relaxed),
            MatingFailureKind::RegulatoryCycle => self.failed_cycle.load(Ordering::Relaxed),
            MatingFailureKind::Malformed => self.failed_malformed.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn migrations(&self) -> u64 {
        self.migrations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn speciations(&self) -> u64 {
        self.speciations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn extinctions(&self) -> u64 {
        self.extinctions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Initialize tracing subscriber for logging. Honours `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}
