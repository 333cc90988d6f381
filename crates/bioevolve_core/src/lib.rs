//! # BioEvolve Core
//!
//! The evolutionary engine: genomes become phenotypes through a gene
//! regulatory network, phenotypes meet an external fitness evaluator, and the
//! fittest reproduce with recombination, mutation and migration. A speciation
//! tracker watches the population diverge and records the resulting tree of
//! species as lineage events.
//!
//! ## Architecture
//!
//! - **Logic traits over plain data**: [`GenomeLogic`] and [`ExpressionLogic`]
//!   extend the types in `bioevolve_data`
//! - **Explicit state threading**: the [`PopulationManager`] owns the run state
//!   and commits it only after a generation completes
//! - **Parallel, deterministic**: Rayon parallelizes expression, fitness,
//!   offspring development and species assessment; every random draw comes
//!   from one seeded `ChaCha8Rng` per run
//!
//! ## Example
//!
//! ```
//! use bioevolve_core::config::EngineConfig;
//! use bioevolve_core::fitness::TraitOptimumEvaluator;
//! use bioevolve_core::PopulationManager;
//! use bioevolve_data::{Conditions, EnvironmentSnapshot};
//!
//! let mut config = EngineConfig::default();
//! config.population.initial_size = 30;
//! let mut manager = PopulationManager::new(config).unwrap();
//! let environment = EnvironmentSnapshot::uniform(Conditions::default());
//! let report = manager
//!     .step(&environment, &TraitOptimumEvaluator::default())
//!     .unwrap();
//! assert_eq!(report.generation, 1);
//! ```

/// Run snapshots and generator state
pub mod checkpoint;
/// Configuration management for engine parameters
pub mod config;
/// Engine error taxonomy
pub mod error;
/// Fitness evaluator interface and reference evaluators
pub mod fitness;
/// Genome operators: founders, mutation, recombination
pub mod genome;
/// Gene regulatory network and development
pub mod grn;
/// Counters and structured logging
pub mod metrics;
/// Species tree queries and adaptive radiation detection
pub mod phylogeny;
/// Generation driver
pub mod population;
/// Selection, mating, migration and death
pub mod reproduction;
/// Species registry, ancestry and split detection
pub mod speciation;
/// Per-generation population summaries
pub mod stats;

pub use checkpoint::{EngineState, RngState};
pub use error::{EngineError, Result};
pub use fitness::{FitnessEvaluator, FlatEvaluator, TraitOptimumEvaluator};
pub use genome::GenomeLogic;
pub use grn::ExpressionLogic;
pub use metrics::{init_logging, EngineMetrics};
pub use population::{PopulationManager, RunStatus, StepReport};
