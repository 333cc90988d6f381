use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::genome::{check_compatible, GenomeLogic};
use crate::grn::RegulatoryNetwork;
use crate::metrics::MatingFailureKind;
use crate::reproduction::migration::birth_deme;
use crate::reproduction::selection::Selector;
use crate::speciation::distance::hybrid_viability;
use bioevolve_data::{Conditions, Genome, Organism, OrganismId, Phenotype};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One offspring to develop, with everything random already drawn from the run generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffspringPlan {
    /// Positions in the parent slice.
    pub mother: usize,
    pub father: usize,
    /// Seed of this offspring's private generator.
    pub seed: u64,
    pub deme: u16,
    pub migrant: bool,
}

/// A mating attempt that produced no offspring.
#[derive(Debug, Clone, PartialEq)]
pub struct MatingFailure {
    pub mother: OrganismId,
    pub father: OrganismId,
    pub kind: MatingFailureKind,
    /// Engine error behind the failure. `None` for isolation failures.
    pub error: Option<EngineError>,
}

/// Draws mating pairs deme by deme and expands them into offspring plans.
///
/// Pairs per deme: `round(deme size · pairs_per_capita)`. Structurally
/// incompatible pairs are skipped with an `IncompatibleGenome` failure.
/// Cross-species pairs must pass a Bernoulli trial on hybrid viability.
pub fn plan_matings(
    parents: &[Organism],
    config: &EngineConfig,
    generation: u64,
    rng: &mut ChaCha8Rng,
) -> (Vec<OffspringPlan>, Vec<MatingFailure>) {
    let mut plans = Vec::new();
    let mut failures = Vec::new();
    let demes = config.population.subpopulations;

    for deme in 0..demes {
        let members: Vec<usize> = parents
            .iter()
            .enumerate()
            .filter(|(_, o)| o.deme == deme)
            .map(|(i, _)| i)
            .collect();
        if members.len() < 2 {
            continue;
        }
        let fitness: Vec<f64> = members.iter().map(|&i| parents[i].fitness).collect();
        let selector = Selector::new(config.selection.scheme, &fitness);
        let pairs = (members.len() as f64 * config.selection.pairs_per_capita).round() as usize;

        for _ in 0..pairs {
            let Some((a, b)) = selector.pick_pair(rng) else {
                break;
            };
            let (mother_idx, father_idx) = (members[a], members[b]);
            let (mother, father) = (&parents[mother_idx], &parents[father_idx]);

            if let Err(reason) = check_compatible(&mother.genome, &father.genome) {
                tracing::debug!(
                    generation = generation,
                    mother = mother.id.0,
                    father = father.id.0,
                    %reason,
                    "Incompatible mating skipped"
                );
                failures.push(MatingFailure {
                    mother: mother.id,
                    father: father.id,
                    kind: MatingFailureKind::Incompatible,
                    error: Some(EngineError::IncompatibleGenome {
                        generation,
                        mother: mother.id,
                        father: father.id,
                        reason,
                    }),
                });
                continue;
            }

            if mother.species != father.species {
                let distance = mother.genome.distance(&father.genome);
                let viability = hybrid_viability(
                    distance,
                    config.speciation.threshold,
                    config.speciation.viability_steepness,
                );
                if !rng.gen_bool(viability.clamp(0.0, 1.0)) {
                    failures.push(MatingFailure {
                        mother: mother.id,
                        father: father.id,
                        kind: MatingFailureKind::Isolation,
                        error: None,
                    });
                    continue;
                }
            }

            let children = rng.gen_range(1..=config.selection.max_offspring_per_pair);
            for _ in 0..children {
                let seed: u64 = rng.gen();
                let (deme, migrant) = birth_deme(rng, deme, demes, config.migration.rate);
                plans.push(OffspringPlan {
                    mother: mother_idx,
                    father: father_idx,
                    seed,
                    deme,
                    migrant,
                });
            }
        }
    }

    (plans, failures)
}

/// Recombines, mutates, validates and expresses one offspring.
///
/// Pure given its inputs: all randomness comes from `seed`.
pub fn develop_offspring(
    mother: &Organism,
    father: &Organism,
    seed: u64,
    conditions: &Conditions,
    config: &EngineConfig,
    generation: u64,
) -> Result<(Genome, Phenotype)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let genome = mother
        .genome
        .recombine_with_rng(&father.genome, &config.recombination.crossover_points, &mut rng)
            .map_err(|reason| EngineError::IncompatibleGenome {
            generation,
            mother: mother.id,
            father: father.id,
            reason,
        })?;
    let genome = genome.mutate_with_rng(&config.mutation, &mut rng);
    let phenotype = RegulatoryNetwork::compile(&genome)
        .map_err(|defect| defect.at(None, generation))?
        .express(conditions);
    Ok((genome, phenotype))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionScheme;
    use crate::genome::test_support::uniform_genome;
    use bioevolve_data::{Ploidy, SpeciesId};

    fn organism(id: u64, genome: Genome, species: SpeciesId) -> Organism {
        let mut o = Organism::founder(OrganismId(id), genome, 0, species);
        o.fitness = 1.0;
        o
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.selection.scheme = SelectionScheme::Roulette;
        config.selection.pairs_per_capita = 1.0;
        config.selection.max_offspring_per_pair = 1;
        config
    }

    #[test]
    fn test_plans_per_capita() {
        let parents: Vec<Organism> = (0..10)
            .map(|i| organism(i, uniform_genome(Ploidy::Haploid, 4, 0.5), SpeciesId::ROOT))
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (plans, failures) = plan_matings(&parents, &config(), 1, &mut rng);
        assert_eq!(plans.len(), 10);
        assert!(failures.is_empty());
        assert!(plans.iter().all(|p| p.mother != p.father && !p.migrant));
    }

    #[test]
    fn test_ploidy_mismatch_produces_no_offspring() {
        let parents = vec![
            organism(0, uniform_genome(Ploidy::Haploid, 4, 0.5), SpeciesId::ROOT),
            organism(1, uniform_genome(Ploidy::Diploid, 4, 0.5), SpeciesId::ROOT),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let (plans, failures) = plan_matings(&parents, &config(), 3, &mut rng);
        assert!(plans.is_empty());
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|f| matches!(
            f.error,
            Some(EngineError::IncompatibleGenome { generation: 3, .. })
        )));
    }

    #[test]
    fn test_distant_species_are_isolated() {
        let mut config = config();
        config.speciation.threshold = 0.1;
        config.speciation.viability_steepness = 20.0;
        let parents = vec![
            organism(0, uniform_genome(Ploidy::Haploid, 4, 0.0), SpeciesId(0)),
            organism(1, uniform_genome(Ploidy::Haploid, 4, 1.0), SpeciesId(1)),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (plans, failures) = plan_matings(&parents, &config, 1, &mut rng);
        assert!(plans.is_empty());
        assert!(failures
            .iter()
            .all(|f| f.kind == MatingFailureKind::Isolation));
    }

    #[test]
    fn test_develop_offspring_is_deterministic() {
        let mother = organism(0, uniform_genome(Ploidy::Diploid, 6, 0.3), SpeciesId::ROOT);
        let father = organism(1, uniform_genome(Ploidy::Diploid, 6, 0.7), SpeciesId::ROOT);
        let config = config();
        let env = Conditions::default();
        let a = develop_offspring(&mother, &father, 99, &env, &config, 1).expect("valid");
        let b = develop_offspring(&mother, &father, 99, &env, &config, 1).expect("valid");
        assert_eq!(a, b);
    }

    #[test]
    fn test_develop_offspring_rejects_mismatched_ploidy() {
        let mother = organism(0, uniform_genome(Ploidy::Haploid, 3, 0.3), SpeciesId::ROOT);
        let father = organism(1, uniform_genome(Ploidy::Diploid, 3, 0.7), SpeciesId::ROOT);
        let err = develop_offspring(&mother, &father, 1, &Conditions::default(), &config(), 2)
            .unwrap_err();
        assert!(matches!(err, EngineError::IncompatibleGenome { .. }));
    }
}
