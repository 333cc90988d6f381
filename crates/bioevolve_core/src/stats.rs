use bioevolve_data::{BodyPlan, NeuralTier, Population, SpeciesId, Trait};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one generation's population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub generation: u64,
    pub population: usize,
    pub species_alive: usize,
    pub mean_fitness: f64,
    pub max_fitness: f64,
    pub mean_age: f64,
    /// Trait name to population mean.
    pub mean_traits: BTreeMap<String, f64>,
    pub body_plans: BTreeMap<String, usize>,
    pub neural_tiers: BTreeMap<String, usize>,
    /// Shannon index of species abundances (natural log).
    pub species_diversity: f64,
    pub hybrids: usize,
    pub migrants: usize,
}

impl PopulationStats {
    #[must_use]
    pub fn from_population(generation: u64, population: &Population) -> Self {
        let mut stats = Self {
            generation,
            population: population.len(),
            ..Self::default()
        };
        if population.is_empty() {
            return stats;
        }
        let n = population.len() as f64;

        let mut trait_sums = [0.0; Trait::COUNT];
        let mut species_counts: BTreeMap<SpeciesId, usize> = BTreeMap::new();
        let mut plans: BTreeMap<BodyPlan, usize> = BTreeMap::new();
        let mut tiers: BTreeMap<NeuralTier, usize> = BTreeMap::new();
        let mut fitness_sum = 0.0;
        let mut age_sum = 0.0;
        stats.max_fitness = f64::NEG_INFINITY;

        for o in population.iter() {
            fitness_sum += o.fitness;
            stats.max_fitness = stats.max_fitness.max(o.fitness);
            age_sum += f64::from(o.age);
            for (t, v) in o.phenotype.iter() {
                trait_sums[t.index()] += v;
            }
            *species_counts.entry(o.species).or_default() += 1;
            *plans.entry(o.phenotype.class.body_plan).or_default() += 1;
            *tiers.entry(o.phenotype.class.neural_tier).or_default() += 1;
            stats.hybrids += usize::from(o.hybrid);
            stats.migrants += usize::from(o.migrant);
        }

        stats.mean_fitness = fitness_sum / n;
        stats.mean_age = age_sum / n;
        stats.mean_traits = Trait::ALL
            .iter()
            .map(|t| (t.name().to_string(), trait_sums[t.index()] / n))
            .collect();
        stats.body_plans = plans
            .into_iter()
            .map(|(p, c)| (format!("{p:?}"), c))
            .collect();
        stats.neural_tiers = tiers
            .into_iter()
            .map(|(t, c)| (format!("{t:?}"), c))
            .collect();
        stats.species_alive = species_counts.len();
        stats.species_diversity = species_counts
            .values()
            .map(|&c| {
                let p = c as f64 / n;
                -p * p.ln()
            })
            .sum();
        stats
    }
}
