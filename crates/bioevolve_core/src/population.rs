//! Top-level driver: one `step` per generation.
//!
//! The manager owns the live population and the run state. A step works on
//! the state's generator and counters and writes them back only once the
//! generation has completed, so a failed step leaves the previous generation
//! intact and resumable.

use crate::checkpoint::{EngineState, RngState};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::fitness::FitnessEvaluator;
use crate::genome::{founder_genome, GenomeLogic, GenomeTemplate};
use crate::metrics::EngineMetrics;
use crate::reproduction::mating::MatingFailure;
use crate::reproduction::{Death, ReproductionEngine};
use crate::speciation::ancestry::AncestryLedger;
use crate::speciation::registry::SpeciesRegistry;
use crate::speciation::{lineage_event, Observation, SpeciationTracker, TrackerState};
use crate::stats::PopulationStats;
use bioevolve_data::{
    EnvironmentSnapshot, LineageEvent, LineageEventKind, Organism, OrganismId, Population,
    SpeciesId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    /// Every organism died. Terminal.
    Extinct,
}

/// What one generation produced.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub generation: u64,
    pub events: Vec<LineageEvent>,
    pub births: Vec<OrganismId>,
    pub deaths: Vec<Death>,
    pub failures: Vec<MatingFailure>,
    pub stats: PopulationStats,
    pub status: RunStatus,
}

pub struct PopulationManager {
    config: EngineConfig,
    state: EngineState,
    metrics: EngineMetrics,
}

impl PopulationManager {
    /// Seeds a run: one founder template, then `initial_size` founders dealt
    /// round-robin across the subpopulations.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.population.seed);
        let template =
            GenomeTemplate::generate(&config.genome, config.population.ploidy, &mut rng);
        let founders: Vec<Organism> = (0..config.population.initial_size)
            .map(|i| {
                let genome = founder_genome(&template, config.genome.founder_variation, &mut rng);
                let deme = (i % usize::from(config.population.subpopulations)) as u16;
                Organism::founder(OrganismId(i as u64), genome, deme, SpeciesId::ROOT)
            })
            .collect();

        tracing::info!(
            seed = config.population.seed,
            founders = founders.len(),
            genes = config.genome.gene_count(),
            subpopulations = config.population.subpopulations,
            "Founding population"
        );
        Ok(Self::found(config, Population::new(founders), rng))
    }

    /// Starts a run from caller-supplied founders. They all join the root species.
    pub fn from_population(config: EngineConfig, mut population: Population) -> Result<Self> {
        config.validate()?;
        if population.is_empty() {
            return Err(EngineError::EmptyPopulation { generation: 0 });
        }
        if population
            .organisms
            .windows(2)
            .any(|pair| pair[0].id == pair[1].id)
        {
            return Err(EngineError::InvalidConfig(
                "founder ids must be unique".to_string(),
            ));
        }
        for organism in population.organisms.iter_mut() {
            if organism.genome.ploidy != config.population.ploidy {
                return Err(EngineError::InvalidConfig(format!(
                    "founder {} is {:?} but the run is {:?}",
                    organism.id, organism.genome.ploidy, config.population.ploidy
                )));
            }
            organism
                .genome
                .validate()
                .map_err(|defect| defect.at(Some(organism.id), 0))?;
            organism.species = SpeciesId::ROOT;
            organism.parents = None;
        }
        let rng = ChaCha8Rng::seed_from_u64(config.population.seed);
        Ok(Self::found(config, population, rng))
    }

    fn found(config: EngineConfig, population: Population, rng: ChaCha8Rng) -> Self {
        let metrics = EngineMetrics::new();
        let mut registry = SpeciesRegistry::with_root(0);
        let mut ancestry = AncestryLedger::default();
        for organism in population.iter() {
            ancestry.record_birth(organism);
        }
        SpeciationTracker::new(&config, &metrics).initialize(&mut registry, &population);

        let state = EngineState {
            generation: 0,
            next_organism_id: population.iter().map(|o| o.id.0 + 1).max().unwrap_or(0),
            next_event_sequence: 0,
            rng: RngState::capture(&rng),
            population,
            registry,
            ancestry,
            tracker: TrackerState::default(),
            events: Vec::new(),
            extinct: false,
            config_fingerprint: config.fingerprint(),
        };
        Self {
            config,
            state,
            metrics,
        }
    }

    /// Resumes from a checkpoint taken under the same configuration.
    pub fn restore(config: EngineConfig, state: EngineState) -> Result<Self> {
        config.validate()?;
        state.verify(&config)?;
        tracing::info!(
            generation = state.generation,
            population = state.population.len(),
            species = state.registry.extant_count(),
            "Resuming from checkpoint"
        );
        Ok(Self {
            config,
            state,
            metrics: EngineMetrics::new(),
        })
    }

    /// Snapshot of the run between generations.
    #[must_use]
    pub fn checkpoint(&self) -> EngineState {
        self.state.clone()
    }

    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.state.population
    }

    #[must_use]
    pub fn registry(&self) -> &SpeciesRegistry {
        &self.state.registry
    }

    #[must_use]
    pub fn ancestry(&self) -> &AncestryLedger {
        &self.state.ancestry
    }

    #[must_use]
    pub fn events(&self) -> &[LineageEvent] {
        &self.state.events
    }

    #[must_use]
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn is_extinct(&self) -> bool {
        self.state.extinct
    }

    /// Advances one generation under a frozen environment snapshot.
    ///
    /// Total extinction is reported once through [`RunStatus::Extinct`];
    /// stepping an extinct run fails with [`EngineError::EmptyPopulation`].
    pub fn step<E: FitnessEvaluator + ?Sized>(
        &mut self,
        environment: &EnvironmentSnapshot,
        evaluator: &E,
    ) -> Result<StepReport> {
        if self.state.extinct {
            return Err(EngineError::EmptyPopulation {
                generation: self.state.generation,
            });
        }
        let started = Instant::now();
        let generation = self.state.generation + 1;
        let mut rng = self.state.rng.restore();
        let mut next_id = self.state.next_organism_id;
        let mut sequence = self.state.next_event_sequence;

        let engine = ReproductionEngine::new(&self.config, evaluator, &self.metrics);
        let outcome = match engine.advance(
            &self.state.population,
            environment,
            generation,
            &mut next_id,
            &mut rng,
        ) {
            Ok(outcome) => outcome,
            Err(EngineError::EmptyPopulation { .. }) => {
                return Ok(self.collapse(generation, next_id, rng, sequence));
            }
            Err(err) => {
                tracing::warn!(generation = generation, error = %err, "Generation aborted");
                return Err(err);
            }
        };

        let mut population = outcome.population;
        // Culled newborns keep their identity too; the ledger takes ids in order.
        let mut newborns: Vec<&Organism> = outcome
            .births
            .iter()
            .filter_map(|id| population.get(*id))
            .chain(outcome.culled_newborns.iter())
            .collect();
        newborns.sort_by_key(|o| o.id);
        for organism in newborns {
            self.state.ancestry.record_birth(organism);
        }
        for death in &outcome.deaths {
            self.state.ancestry.record_death(death.id, generation);
        }

        let tracker = SpeciationTracker::new(&self.config, &self.metrics);
        let events = tracker.observe(
            &mut self.state.tracker,
            &mut self.state.registry,
            &mut population,
            Observation {
                generation,
                migrations: &outcome.migrations,
                colonies: &outcome.colonies,
                hybrid_births: &outcome.hybrid_births,
            },
            &mut rng,
            &mut sequence,
        );

        let stats = PopulationStats::from_population(generation, &population);
        self.state.generation = generation;
        self.state.next_organism_id = next_id;
        self.state.next_event_sequence = sequence;
        self.state.rng = RngState::capture(&rng);
        self.state.population = population;
        self.state.events.extend(events.iter().cloned());

        self.metrics.record_generation(
            generation,
            started.elapsed(),
            stats.population,
            self.state.registry.extant_count(),
            self.config.log_interval,
        );

        Ok(StepReport {
            generation,
            events,
            births: outcome.births,
            deaths: outcome.deaths,
            failures: outcome.failures,
            stats,
            status: RunStatus::Running,
        })
    }

    /// Commits total extinction: every extant species ends at `generation`.
    fn collapse(
        &mut self,
        generation: u64,
        next_id: u64,
        mut rng: ChaCha8Rng,
        mut sequence: u64,
    ) -> StepReport {
        tracing::warn!(generation = generation, "Run ended in total extinction");
        let extant: Vec<SpeciesId> = self.state.registry.extant().map(|s| s.id).collect();
        let mut events = Vec::with_capacity(extant.len());
        for species in extant {
            self.state.registry.mark_extinct(species, generation);
            self.metrics.record_extinction();
            events.push(lineage_event(
                &mut rng,
                &mut sequence,
                generation,
                LineageEventKind::Extinction,
                vec![species],
                "entire population died out".to_string(),
            ));
        }
        for organism in self.state.population.iter() {
            self.state.ancestry.record_death(organism.id, generation);
        }

        self.state.generation = generation;
        self.state.next_organism_id = next_id;
        self.state.next_event_sequence = sequence;
        self.state.rng = RngState::capture(&rng);
        self.state.population = Population::default();
        self.state.extinct = true;
        self.state.events.extend(events.iter().cloned());

        StepReport {
            generation,
            events,
            births: Vec::new(),
            deaths: Vec::new(),
            failures: Vec::new(),
            stats: PopulationStats::from_population(generation, &self.state.population),
            status: RunStatus::Extinct,
        }
    }

    /// Runs up to `generations` steps, stopping early on extinction.
    pub fn run<E, F>(
        &mut self,
        generations: u64,
        mut environment: F,
        evaluator: &E,
    ) -> Result<Vec<StepReport>>
    where
        E: FitnessEvaluator + ?Sized,
        F: FnMut(u64) -> EnvironmentSnapshot,
    {
        let mut reports = Vec::new();
        for _ in 0..generations {
            let snapshot = environment(self.state.generation + 1);
            let report = self.step(&snapshot, evaluator)?;
            let extinct = report.status == RunStatus::Extinct;
            reports.push(report);
            if extinct {
                break;
            }
        }
        Ok(reports)
    }
}
