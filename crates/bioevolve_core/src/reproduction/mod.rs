//! Reproduction and variation: generation N to generation N+1.
//!
//! Order within one generation:
//!
//! 1. express every live organism under its deme's conditions (parallel)
//! 2. fitness query (parallel, merged in id order)
//! 3. selection and mating plans, deme by deme (sequential, run generator)
//! 4. recombine + mutate + validate + express offspring (parallel, per-offspring generators)
//! 5. migration is decided in step 3 and applied at birth
//! 6. ageing and death of the parental generation
//! 7. offspring fitness, then carrying-capacity culling

pub mod mating;
pub mod migration;
pub mod mortality;
pub mod selection;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::fitness::{assign_fitness, FitnessEvaluator};
use crate::grn::RegulatoryNetwork;
use crate::metrics::{DeathCause, EngineMetrics, MatingFailureKind};
use bioevolve_data::{
    EnvironmentSnapshot, Organism, OrganismId, Parentage, Population, SpeciesId,
};
use mating::{develop_offspring, plan_matings, MatingFailure};
use migration::{Colony, FlowRecord};
use mortality::{cause_of_death, cull_to_capacity};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::HashSet;

/// An organism that left the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Death {
    pub id: OrganismId,
    pub species: SpeciesId,
    pub cause: DeathCause,
}

/// Birth whose parents belonged to different species.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridBirth {
    pub child: OrganismId,
    pub mother_species: SpeciesId,
    pub father_species: SpeciesId,
    pub deme: u16,
}

/// Everything one generation of reproduction produced.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    pub population: Population,
    /// Newborns still alive after culling, ascending.
    pub births: Vec<OrganismId>,
    /// Newborns culled in their birth generation, ascending. Also listed in `deaths`.
    pub culled_newborns: Vec<Organism>,
    pub deaths: Vec<Death>,
    pub failures: Vec<MatingFailure>,
    pub migrations: Vec<FlowRecord>,
    pub hybrid_births: Vec<HybridBirth>,
    /// Demes a species reached for the first time through a migrant.
    pub colonies: Vec<Colony>,
}

pub struct ReproductionEngine<'a, E: FitnessEvaluator + ?Sized> {
    config: &'a EngineConfig,
    evaluator: &'a E,
    metrics: &'a EngineMetrics,
}

impl<'a, E: FitnessEvaluator + ?Sized> ReproductionEngine<'a, E> {
    pub fn new(config: &'a EngineConfig, evaluator: &'a E, metrics: &'a EngineMetrics) -> Self {
        Self {
            config,
            evaluator,
            metrics,
        }
    }

    /// Re-expresses every organism under the conditions of its deme.
    pub fn express_all(
        &self,
        organisms: &mut [Organism],
        environment: &EnvironmentSnapshot,
        generation: u64,
    ) -> Result<()> {
        let phenotypes: Vec<_> = organisms
            .par_iter()
            .map(|o| {
                RegulatoryNetwork::compile(&o.genome)
                    .map(|net| net.express(environment.for_deme(o.deme)))
                    .map_err(|defect| defect.at(Some(o.id), generation))
            })
            .collect();
        for (organism, phenotype) in organisms.iter_mut().zip(phenotypes) {
            organism.phenotype = phenotype?;
        }
        Ok(())
    }

    /// Produces generation `generation` from `population`.
    ///
    /// `next_id` is the next unused organism id and advances with every birth.
    /// Fails with [`EngineError::EmptyPopulation`] when nothing survives.
    pub fn advance(
        &self,
        population: &Population,
        environment: &EnvironmentSnapshot,
        generation: u64,
        next_id: &mut u64,
        rng: &mut ChaCha8Rng,
    ) -> Result<GenerationOutcome> {
        let config = self.config;
        let mut parents = population.organisms.clone();

        self.express_all(&mut parents, environment, generation)?;
        assign_fitness(self.evaluator, &mut parents, environment, generation)?;

        let (plans, mut failures) = plan_matings(&parents, config, generation, rng);

        let developed: Vec<_> = plans
            .par_iter()
            .map(|plan| {
                develop_offspring(
                    &parents[plan.mother],
                    &parents[plan.father],
                    plan.seed,
                    environment.for_deme(plan.deme),
                    config,
                    generation,
                )
            })
            .collect();

        let occupied: HashSet<(SpeciesId, u16)> =
            parents.iter().map(|o| (o.species, o.deme)).collect();
        let mut outcome = GenerationOutcome::default();
        let mut newborns = Vec::with_capacity(plans.len());

        for (plan, result) in plans.iter().zip(developed) {
            let (mother, father) = (&parents[plan.mother], &parents[plan.father]);
            let (genome, phenotype) = match result {
                Ok(child) => child,
                Err(err) => {
                    let kind = match err {
                        EngineError::InvalidRegulatoryGraph { .. } => {
                            MatingFailureKind::RegulatoryCycle
                        }
                        EngineError::IncompatibleGenome { .. } => MatingFailureKind::Incompatible,
                        _ => MatingFailureKind::Malformed,
                    };
                    tracing::debug!(
                        generation = generation,
                        mother = mother.id.0,
                        father = father.id.0,
                        error = %err,
                        "Offspring rejected"
                    );
                    failures.push(MatingFailure {
                        mother: mother.id,
                        father: father.id,
                        kind,
                        error: Some(err),
                    });
                    continue;
                }
            };

            let id = OrganismId(*next_id);
            *next_id += 1;
            let hybrid = mother.species != father.species;
            if hybrid {
                outcome.hybrid_births.push(HybridBirth {
                    child: id,
                    mother_species: mother.species,
                    father_species: father.species,
                    deme: plan.deme,
                });
            }
            if plan.migrant {
                self.metrics.record_migration();
                outcome.migrations.push(FlowRecord {
                    generation,
                    from: mother.deme,
                    to: plan.deme,
                    species: mother.species,
                });
                if !occupied.contains(&(mother.species, plan.deme)) {
                    outcome.colonies.push(Colony {
                        species: mother.species,
                        deme: plan.deme,
                    });
                }
            }

            newborns.push(Organism {
                id,
                genome,
                phenotype,
                fitness: 0.0,
                age: 0,
                generation: mother.generation.max(father.generation) + 1,
                born_at: generation,
                deme: plan.deme,
                species: mother.species,
                parents: Some(Parentage {
                    mother: mother.id,
                    father: father.id,
                }),
                hybrid,
                migrant: plan.migrant,
            });
        }

        for failure in &failures {
            self.metrics.record_failed_mating(failure.kind);
        }
        outcome.failures = failures;

        // Ageing and death of the parental generation.
        let mut survivors = Vec::with_capacity(parents.len() + newborns.len());
        for mut organism in parents {
            organism.age += 1;
            match cause_of_death(&organism, &config.lifecycle) {
                Some(cause) => {
                    self.metrics.record_death(cause);
                    outcome.deaths.push(Death {
                        id: organism.id,
                        species: organism.species,
                        cause,
                    });
                }
                None => survivors.push(organism),
            }
        }

        assign_fitness(self.evaluator, &mut newborns, environment, generation)?;
        let born: Vec<OrganismId> = newborns.iter().map(|o| o.id).collect();
        survivors.extend(newborns);

        let (kept, culled) = cull_to_capacity(survivors, config.population.carrying_capacity);
        for organism in &culled {
            self.metrics.record_death(DeathCause::Culled);
            outcome.deaths.push(Death {
                id: organism.id,
                species: organism.species,
                cause: DeathCause::Culled,
            });
        }
        let culled_ids: HashSet<OrganismId> = culled.iter().map(|o| o.id).collect();
        let (culled_newborns, born): (Vec<OrganismId>, Vec<OrganismId>) =
            born.into_iter().partition(|id| culled_ids.contains(id));
        let culled_newborns: HashSet<OrganismId> = culled_newborns.into_iter().collect();
        outcome.births = born;
        outcome.culled_newborns = culled
            .into_iter()
            .filter(|o| culled_newborns.contains(&o.id))
            .collect();
        self.metrics.record_births(outcome.births.len());

        if kept.is_empty() {
            tracing::warn!(generation = generation, "Population extinct");
            return Err(EngineError::EmptyPopulation { generation });
        }

        outcome.population = Population::new(kept);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionScheme;
    use crate::fitness::FlatEvaluator;
    use crate::genome::test_support::uniform_genome;
    use bioevolve_data::{Phenotype, Ploidy, Conditions};
    use rand::SeedableRng;

    fn founders(n: u64, ploidy: Ploidy) -> Population {
        Population::new(
            (0..n)
                .map(|i| {
                    Organism::founder(
                        OrganismId(i),
                        uniform_genome(ploidy, 6, 0.5),
                        0,
                        SpeciesId::ROOT,
                    )
                })
                .collect(),
        )
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.selection.scheme = SelectionScheme::Roulette;
        config.lifecycle.base_lifespan = 100.0;
        config.population.carrying_capacity = 1000;
        config
    }

    #[test]
    fn test_children_are_deeper_than_parents() {
        let config = config();
        let metrics = EngineMetrics::new();
        let engine = ReproductionEngine::new(&config, &FlatEvaluator(1.0), &metrics);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut next_id = 20;
        let outcome = engine
            .advance(
                &founders(20, Ploidy::Haploid),
                &EnvironmentSnapshot::default(),
                1,
                &mut next_id,
                &mut rng,
            )
            .expect("population survives");
        assert!(!outcome.births.is_empty());
        for id in &outcome.births {
            let child = outcome.population.get(*id).expect("born");
            assert_eq!(child.generation, 1);
            assert_eq!(child.born_at, 1);
            assert!(child.parents.is_some());
        }
        assert_eq!(next_id as usize, 20 + outcome.births.len());
    }

    #[test]
    fn test_low_fitness_everywhere_is_extinction() {
        let mut config = config();
        config.lifecycle.survival_threshold = 2.0;
        config.selection.pairs_per_capita = 0.0;
        let metrics = EngineMetrics::new();
        let engine = ReproductionEngine::new(&config, &FlatEvaluator(1.0), &metrics);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut next_id = 10;
        let err = engine
            .advance(
                &founders(10, Ploidy::Haploid),
                &EnvironmentSnapshot::default(),
                1,
                &mut next_id,
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err, EngineError::EmptyPopulation { generation: 1 });
    }

    #[test]
    fn test_evaluator_contract_surfaces() {
        let config = config();
        let metrics = EngineMetrics::new();
        let bad = |_: &Phenotype, _: &Conditions| f64::INFINITY;
        let engine = ReproductionEngine::new(&config, &bad, &metrics);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut next_id = 5;
        let err = engine
            .advance(
                &founders(5, Ploidy::Haploid),
                &EnvironmentSnapshot::default(),
                1,
                &mut next_id,
                &mut rng,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::EvaluatorContract { .. }));
    }
}
