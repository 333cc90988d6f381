mod common;

use bioevolve_lib::data::{
    Conditions, EnvironmentSnapshot, Phenotype, Ploidy, Population,
    SpeciationMode, SpeciesId, Trait,
};
use bioevolve_lib::engine::config::{EngineConfig, SelectionScheme};
use bioevolve_lib::engine::error::EngineError;
use bioevolve_lib::engine::metrics::MatingFailureKind;
use bioevolve_lib::engine::reproduction::ReproductionEngine;
use bioevolve_lib::engine::{EngineMetrics, FlatEvaluator, GenomeLogic, RunStatus};
use common::{founder, uniform_env, uniform_genome, EngineBuilder};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

#[test]
fn test_clonal_population_without_mutation_stays_one_species() {
    let mut manager = EngineBuilder::new()
        .with_seed(7)
        .with_config(|c| {
            c.population.initial_size = 50;
            c.population.carrying_capacity = 100;
            c.population.ploidy = Ploidy::Haploid;
            c.genome.founder_variation = 0.0;
            c.mutation.rate = 0.0;
            c.mutation.rewire_rate = 0.0;
            c.mutation.effect_drift = 0.0;
            c.selection.scheme = SelectionScheme::Roulette;
            c.lifecycle.base_lifespan = 50.0;
        })
        .build();
    let reference = manager.population().organisms[0].genome.clone();

    let reports = manager
        .run(20, |_| uniform_env(), &FlatEvaluator::default())
        .expect("Drift run failed");

    assert_eq!(reports.len(), 20);
    assert!(reports.iter().all(|r| r.status == RunStatus::Running));
    assert!(manager
        .events()
        .iter()
        .all(|e| !e.is_speciation()));
    assert_eq!(manager.registry().extant_count(), 1);
    for organism in manager.population().iter() {
        assert_eq!(organism.genome.distance(&reference), 0.0);
        assert_eq!(organism.species, SpeciesId::ROOT);
    }
    assert!(manager.population().len() <= 100);
    assert_membership_consistent!(manager);
}

#[test]
fn test_isolated_demes_split_allopatrically_once() {
    let founders = (0..40).map(|i| {
        let deme = (i % 2) as u16;
        let value = if deme == 0 { 0.2 } else { 0.8 };
        founder(i, uniform_genome(Ploidy::Haploid, 8, value), deme)
    });
    let mut manager = EngineBuilder::new()
        .with_config(|c| {
            c.population.subpopulations = 2;
            c.population.carrying_capacity = 400;
            c.migration.rate = 0.0;
            c.mutation.rate = 0.0;
            c.lifecycle.base_lifespan = 1000.0;
            c.speciation.threshold = 0.3;
            c.speciation.persistence_window = 5;
        })
        .with_organisms(founders)
        .build();

    let evaluator = FlatEvaluator::default();
    for _ in 0..4 {
        let report = manager.step(&uniform_env(), &evaluator).expect("Step failed");
        assert!(report
            .events
            .iter()
            .all(|e| !e.is_speciation()));
    }

    let report = manager.step(&uniform_env(), &evaluator).expect("Step failed");
    assert_eq!(report.generation, 5);
    let splits: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.is_speciation())
        .collect();
    assert_eq!(splits.len(), 1);
    assert_eq!(splits[0].mode(), Some(SpeciationMode::Allopatric));
    assert_eq!(splits[0].species, vec![SpeciesId::ROOT, SpeciesId(1)]);

    for organism in manager.population().iter() {
        let expected = if organism.deme == 0 {
            SpeciesId(1)
        } else {
            SpeciesId::ROOT
        };
        assert_eq!(organism.species, expected, "{} in wrong species", organism.id);
    }

    let later = manager
        .run(10, |_| uniform_env(), &evaluator)
        .expect("Run failed");
    assert!(later
        .iter()
        .flat_map(|r| r.events.iter())
        .all(|e| !e.is_speciation()));
    assert_eq!(manager.registry().extant_count(), 2);
    assert_membership_consistent!(manager);
}

#[test]
fn test_culling_keeps_fittest_and_breaks_ties_by_id() {
    let founders = (0..150u64).map(|i| {
        let value = (i / 3) as f64 / 50.0;
        founder(i, uniform_genome(Ploidy::Haploid, 1, value), 0)
    });
    let mut manager = EngineBuilder::new()
        .with_config(|c| {
            c.population.carrying_capacity = 100;
            c.selection.pairs_per_capita = 0.0;
            c.lifecycle.survival_threshold = 0.0;
            c.lifecycle.base_lifespan = 1000.0;
        })
        .with_organisms(founders)
        .build();

    let size = |p: &Phenotype, _: &Conditions| p.get(Trait::Size);
    let report = manager.step(&uniform_env(), &size).expect("Step failed");

    assert_population!(manager, 100);
    let removed: BTreeSet<u64> = report.deaths.iter().map(|d| d.id.0).collect();
    let mut expected: BTreeSet<u64> = (0..=47).collect();
    expected.insert(49);
    expected.insert(50);
    assert_eq!(removed, expected);
    assert!(report.births.is_empty());
}

#[test]
fn test_mixed_ploidy_matings_fail_without_aborting() {
    let mut organisms = Vec::new();
    for i in 0..2 {
        organisms.push(founder(i, uniform_genome(Ploidy::Haploid, 6, 0.5), 0));
    }
    for i in 2..4 {
        organisms.push(founder(i, uniform_genome(Ploidy::Diploid, 6, 0.5), 0));
    }
    let population = Population::new(organisms);

    let mut config = EngineConfig::default();
    config.selection.pairs_per_capita = 5.0;
    config.lifecycle.base_lifespan = 100.0;
    let metrics = EngineMetrics::new();
    let evaluator = FlatEvaluator::default();
    let engine = ReproductionEngine::new(&config, &evaluator, &metrics);
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut next_id = 4;

    let outcome = engine
        .advance(
            &population,
            &EnvironmentSnapshot::uniform(Conditions::default()),
            1,
            &mut next_id,
            &mut rng,
        )
        .expect("Incompatible pairs must not abort the generation");

    let incompatible: Vec<_> = outcome
        .failures
        .iter()
        .filter(|f| f.kind == MatingFailureKind::Incompatible)
        .collect();
    assert!(!incompatible.is_empty());
    for failure in incompatible {
        assert!(matches!(
            failure.error,
            Some(EngineError::IncompatibleGenome { .. })
        ));
    }

    for id in &outcome.births {
        let child = outcome.population.get(*id).expect("Newborn present");
        let parents = child.parents.expect("Newborn has parents");
        let mother = population.get(parents.mother).expect("Mother present");
        let father = population.get(parents.father).expect("Father present");
        assert_eq!(child.genome.ploidy, mother.genome.ploidy);
        assert_eq!(child.genome.ploidy, father.genome.ploidy);
    }
}
