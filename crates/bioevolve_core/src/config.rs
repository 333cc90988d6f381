//! Configuration management for engine parameters.
//!
//! Strongly-typed structures mapping to a `bioevolve.toml` file. Every section
//! falls back to its `Default` when omitted.
//!
//! ## Example `bioevolve.toml`
//!
//! ```toml
//! [population]
//! seed = 42
//! ploidy = "diploid"
//! initial_size = 200
//! subpopulations = 2
//! carrying_capacity = 400
//!
//! [mutation]
//! rate = 0.01
//! magnitude = { kind = "gaussian", sigma = 0.05 }
//!
//! [selection]
//! scheme = { kind = "tournament", k = 3 }
//!
//! [speciation]
//! threshold = 0.25
//! persistence_window = 5
//! ```

use bioevolve_data::Ploidy;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};
use serde::{Deserialize, Serialize};

/// Population shape and run identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PopulationConfig {
    pub seed: u64,
    pub ploidy: Ploidy,
    pub initial_size: usize,
    /// Number of demes (sub-populations).
    pub subpopulations: u16,
    pub carrying_capacity: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ploidy: Ploidy::Haploid,
            initial_size: 100,
            subpopulations: 1,
            carrying_capacity: 500,
        }
    }
}

/// Founder genome layout. Shared by every founder so that the whole
/// population starts structurally compatible.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenomeConfig {
    pub chromosomes: usize,
    pub genes_per_chromosome: usize,
    pub regulatory_fraction: f64,
    pub architect_fraction: f64,
    /// Share of non-architect genes with categorical alleles.
    pub categorical_fraction: f64,
    pub categorical_domain: u16,
    /// Maximum traits written by one structural gene.
    pub max_pleiotropy: usize,
    /// Maximum incoming epistasis links per gene.
    pub epistasis_links: usize,
    /// Chance a gene reads an environmental factor.
    pub sensitivity_chance: f64,
    /// Spread of founder allele values around the shared template. 0 gives a clonal founder population.
    pub founder_variation: f64,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            chromosomes: 4,
            genes_per_chromosome: 8,
            regulatory_fraction: 0.2,
            architect_fraction: 0.1,
            categorical_fraction: 0.1,
            categorical_domain: 4,
            max_pleiotropy: 3,
            epistasis_links: 2,
            sensitivity_chance: 0.25,
            founder_variation: 0.1,
        }
    }
}

impl GenomeConfig {
    #[must_use]
    pub fn gene_count(&self) -> usize {
        self.chromosomes * self.genes_per_chromosome
    }
}

/// Distribution of continuous allele perturbations.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MagnitudeDistribution {
    Gaussian { sigma: f64 },
    Uniform { half_width: f64 },
}

impl MagnitudeDistribution {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            MagnitudeDistribution::Gaussian { sigma } => {
                if sigma <= 0.0 {
                    return 0.0;
                }
                match Normal::new(0.0, sigma) {
                    Ok(normal) => normal.sample(rng),
                    Err(_) => 0.0,
                }
            }
            MagnitudeDistribution::Uniform { half_width } => {
                if half_width <= 0.0 {
                    return 0.0;
                }
                rng.gen_range(-half_width..=half_width)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MutationConfig {
    /// Per-allele Bernoulli probability.
    pub rate: f64,
    pub magnitude: MagnitudeDistribution,
    /// Per-genome probability of gaining a new epistasis link.
    pub rewire_rate: f64,
    /// Per-effect probability that a pleiotropic weight drifts alongside an allele mutation.
    pub effect_drift: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            rate: 0.01,
            magnitude: MagnitudeDistribution::Gaussian { sigma: 0.05 },
            rewire_rate: 0.0,
            effect_drift: 0.0,
        }
    }
}

/// Number of break points per chromosome.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrossoverDistribution {
    Poisson { mean: f64 },
    Fixed { count: usize },
}

impl Default for CrossoverDistribution {
    fn default() -> Self {
        CrossoverDistribution::Poisson { mean: 1.0 }
    }
}

impl CrossoverDistribution {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match *self {
            CrossoverDistribution::Fixed { count } => count,
            CrossoverDistribution::Poisson { mean } => {
                if mean <= 0.0 {
                    return 0;
                }
                match Poisson::new(mean) {
                    Ok(poisson) => {
                        let draw: f64 = poisson.sample(rng);
                        draw as usize
                    }
                    Err(_) => 0,
                }
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RecombinationConfig {
    pub crossover_points: CrossoverDistribution,
}

/// Largest accepted tournament size.
pub const MAX_TOURNAMENT_SIZE: usize = 64;

/// Mating-pair selection scheme.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionScheme {
    /// Fitness-proportionate.
    Roulette,
    /// Best of `k` uniform draws, `1..=MAX_TOURNAMENT_SIZE`. `k = 1` is neutral drift.
    Tournament { k: usize },
    /// Linear ranking with selective pressure in `[1, 2]`. 1 is uniform.
    Rank { pressure: f64 },
}

impl Default for SelectionScheme {
    fn default() -> Self {
        SelectionScheme::Tournament { k: 2 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    pub scheme: SelectionScheme,
    /// Mating pairs drawn per deme member each generation.
    pub pairs_per_capita: f64,
    pub max_offspring_per_pair: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            scheme: SelectionScheme::default(),
            pairs_per_capita: 0.5,
            max_offspring_per_pair: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MigrationConfig {
    /// Probability an offspring is born in a different deme.
    pub rate: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Lifespan at longevity 0.5. Scaled by `0.5 + longevity`.
    pub base_lifespan: f64,
    /// Organisms evaluated below this fitness die.
    pub survival_threshold: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            base_lifespan: 4.0,
            survival_threshold: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpeciationConfig {
    /// Genetic distance above which two groups count as diverged.
    pub threshold: f64,
    /// Consecutive generations a divergence must persist.
    pub persistence_window: u32,
    /// Compatibility fails below this viable-offspring rate.
    pub min_viable_offspring_rate: f64,
    /// Slope of hybrid viability around the threshold.
    pub viability_steepness: f64,
    /// Species closer than `merge_ratio * threshold` may hybridize back together.
    pub merge_ratio: f64,
    /// Largest migrant-founded group still counted as peripatric.
    pub peripatric_max_founders: usize,
    /// Smallest group considered as a split candidate.
    pub min_group_size: usize,
    /// Cross pairs sampled by the compatibility check.
    pub compatibility_sample_pairs: usize,
    /// Share of members a phenotype class needs to become dominant.
    pub adaptation_share: f64,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.25,
            persistence_window: 5,
            min_viable_offspring_rate: 0.2,
            viability_steepness: 6.0,
            merge_ratio: 0.5,
            peripatric_max_founders: 10,
            min_group_size: 3,
            compatibility_sample_pairs: 64,
            adaptation_share: 0.5,
        }
    }
}

/// Main engine configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub population: PopulationConfig,
    pub genome: GenomeConfig,
    pub mutation: MutationConfig,
    pub recombination: RecombinationConfig,
    pub selection: SelectionConfig,
    pub migration: MigrationConfig,
    pub lifecycle: LifecycleConfig,
    pub speciation: SpeciationConfig,
    /// Generations between metrics summaries. 0 disables them.
    pub log_interval: u64,
}

fn unit(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

impl EngineConfig {
    /// Validates configuration values are within acceptable ranges.
    pub fn validate(&self) -> anyhow::Result<()> {
        // Population
        anyhow::ensure!(
            self.population.initial_size > 0,
            "Initial population must be positive"
        );
        anyhow::ensure!(
            self.population.subpopulations > 0,
            "At least one subpopulation is required"
        );
        anyhow::ensure!(
            self.population.carrying_capacity > 0,
            "Carrying capacity must be positive"
        );

        // Genome layout
        anyhow::ensure!(self.genome.chromosomes > 0, "Genome needs a chromosome");
        anyhow::ensure!(
            self.genome.genes_per_chromosome > 0,
            "Chromosomes need at least one gene"
        );
        anyhow::ensure!(
            unit(self.genome.regulatory_fraction)
                && unit(self.genome.architect_fraction)
                && self.genome.regulatory_fraction + self.genome.architect_fraction <= 1.0,
            "Regulatory and architect fractions must be in [0.0, 1.0] and sum to at most 1.0"
        );
        anyhow::ensure!(
            unit(self.genome.categorical_fraction),
            "Categorical fraction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.genome.categorical_domain >= 2,
            "Categorical domain needs at least two variants"
        );
        anyhow::ensure!(
            self.genome.max_pleiotropy >= 1,
            "Structural genes must target at least one trait"
        );
        anyhow::ensure!(
            unit(self.genome.sensitivity_chance),
            "Sensitivity chance must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            unit(self.genome.founder_variation),
            "Founder variation must be in [0.0, 1.0]"
        );

        // Mutation
        anyhow::ensure!(
            unit(self.mutation.rate),
            "Mutation rate must be in [0.0, 1.0]"
        );
        match self.mutation.magnitude {
            MagnitudeDistribution::Gaussian { sigma } => anyhow::ensure!(
                sigma.is_finite() && sigma >= 0.0,
                "Gaussian sigma must be non-negative"
            ),
            MagnitudeDistribution::Uniform { half_width } => anyhow::ensure!(
                half_width.is_finite() && half_width >= 0.0,
                "Uniform half width must be non-negative"
            ),
        }
        anyhow::ensure!(
            unit(self.mutation.rewire_rate),
            "Rewire rate must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            unit(self.mutation.effect_drift),
            "Effect drift must be in [0.0, 1.0]"
        );

        // Recombination
        if let CrossoverDistribution::Poisson { mean } = self.recombination.crossover_points {
            anyhow::ensure!(
                mean.is_finite() && mean >= 0.0,
                "Crossover mean must be non-negative"
            );
        }

        // Selection
        match self.selection.scheme {
            SelectionScheme::Roulette => {}
            SelectionScheme::Tournament { k } => {
                anyhow::ensure!(
                    (1..=MAX_TOURNAMENT_SIZE).contains(&k),
                    "Tournament size must be in [1, {MAX_TOURNAMENT_SIZE}]"
                )
            }
            SelectionScheme::Rank { pressure } => anyhow::ensure!(
                (1.0..=2.0).contains(&pressure),
                "Rank pressure must be in [1.0, 2.0]"
            ),
        }
        anyhow::ensure!(
            self.selection.pairs_per_capita.is_finite() && self.selection.pairs_per_capita >= 0.0,
            "Pairs per capita must be non-negative"
        );
        anyhow::ensure!(
            self.selection.max_offspring_per_pair >= 1,
            "Pairs must be able to produce at least one offspring"
        );

        // Migration & lifecycle
        anyhow::ensure!(
            unit(self.migration.rate),
            "Migration rate must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.lifecycle.base_lifespan > 0.0,
            "Base lifespan must be positive"
        );
        anyhow::ensure!(
            self.lifecycle.survival_threshold >= 0.0,
            "Survival threshold must be non-negative"
        );

        // Speciation
        anyhow::ensure!(
            self.speciation.threshold > 0.0,
            "Speciation threshold must be positive"
        );
        anyhow::ensure!(
            self.speciation.persistence_window >= 1,
            "Persistence window must be at least one generation"
        );
        anyhow::ensure!(
            unit(self.speciation.min_viable_offspring_rate),
            "Minimum viable offspring rate must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.speciation.viability_steepness > 0.0,
            "Viability steepness must be positive"
        );
        anyhow::ensure!(
            self.speciation.merge_ratio > 0.0 && self.speciation.merge_ratio < 1.0,
            "Merge ratio must be in (0.0, 1.0)"
        );
        anyhow::ensure!(
            self.speciation.min_group_size >= 1,
            "Minimum group size must be positive"
        );
        anyhow::ensure!(
            self.speciation.compatibility_sample_pairs >= 1,
            "Compatibility check needs at least one sample pair"
        );
        anyhow::ensure!(
            self.speciation.adaptation_share > 0.0 && self.speciation.adaptation_share <= 1.0,
            "Adaptation share must be in (0.0, 1.0]"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Hash of every outcome-relevant section. Logging cadence is excluded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.population).as_bytes());
        hasher.update(format!("{:?}", self.genome).as_bytes());
        hasher.update(format!("{:?}", self.mutation).as_bytes());
        hasher.update(format!("{:?}", self.recombination).as_bytes());
        hasher.update(format!("{:?}", self.selection).as_bytes());
        hasher.update(format!("{:?}", self.migration).as_bytes());
        hasher.update(format!("{:?}", self.lifecycle).as_bytes());
        hasher.update(format!("{:?}", self.speciation).as_bytes());
        hex::encode(hasher.finalize())
    }
}
