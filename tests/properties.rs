mod common;

use bioevolve_lib::data::{Allele, AlleleValue, Conditions, EpistasisLink, Genome, Ploidy};
use bioevolve_lib::engine::config::{CrossoverDistribution, SelectionScheme};
use bioevolve_lib::engine::error::GenomeDefect;
use bioevolve_lib::engine::genome::recombine;
use bioevolve_lib::engine::reproduction::selection::selection_probabilities;
use bioevolve_lib::engine::speciation::distance::hybrid_viability;
use bioevolve_lib::engine::{ExpressionLogic, GenomeLogic};
use common::uniform_genome;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Structural genome with one allele value per copy, taken from `values` in order.
fn genome_from(ploidy: Ploidy, values: &[f64]) -> Genome {
    let copies = ploidy.copies();
    let loci = (values.len() / copies) as u32;
    let mut genome = uniform_genome(ploidy, loci, 0.0);
    for (gene, chunk) in genome.chromosomes[0]
        .genes
        .iter_mut()
        .zip(values.chunks(copies))
    {
        gene.alleles = chunk
            .iter()
            .enumerate()
            .map(|(copy, v)| {
                Allele::new(
                    u64::from(gene.locus) * 31 + copy as u64 + (v * 1e6) as u64,
                    AlleleValue::Continuous(*v),
                )
            })
            .collect();
    }
    genome
}

prop_compose! {
    fn arb_genome(ploidy: Ploidy, loci: usize)(
        values in prop::collection::vec(0.0f64..=1.0, loci * ploidy.copies())
    ) -> Genome {
        genome_from(ploidy, &values)
    }
}

prop_compose! {
    fn arb_conditions()(
        temperature in 0.0f64..=1.0,
        resource_density in 0.0f64..=1.0,
        predation_pressure in 0.0f64..=1.0,
        toxicity in 0.0f64..=1.0
    ) -> Conditions {
        Conditions { temperature, resource_density, predation_pressure, toxicity }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn expression_is_deterministic(genome in arb_genome(Ploidy::Diploid, 10), conditions in arb_conditions()) {
        let first = genome.express(&conditions).expect("Valid genome");
        let second = genome.express(&conditions).expect("Valid genome");
        prop_assert_eq!(&first, &second);
        for value in &first.values {
            prop_assert!(*value > 0.0 && *value < 1.0);
        }
    }

    #[test]
    fn recombined_alleles_come_from_parents(
        mother in arb_genome(Ploidy::Haploid, 12),
        father in arb_genome(Ploidy::Haploid, 12),
        points in 0usize..4,
        seed in any::<u64>()
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let child = recombine(&mother, &father, &CrossoverDistribution::Fixed { count: points }, &mut rng)
            .expect("Same layout recombines");
        prop_assert_eq!(child.loci(), mother.loci());
        for gene in child.genes() {
            let m = mother.gene(gene.locus).expect("Locus in mother");
            let f = father.gene(gene.locus).expect("Locus in father");
            prop_assert!(gene.alleles[0] == m.alleles[0] || gene.alleles[0] == f.alleles[0]);
        }
    }

    #[test]
    fn distance_is_symmetric_and_bounded(
        a in arb_genome(Ploidy::Diploid, 8),
        b in arb_genome(Ploidy::Diploid, 8)
    ) {
        let ab = a.distance(&b);
        let ba = b.distance(&a);
        prop_assert!((ab - ba).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn selection_probabilities_form_a_distribution(
        fitness in prop::collection::vec(0.0f64..10.0, 1..50),
        k in 1usize..6,
        pressure in 1.0f64..=2.0
    ) {
        for scheme in [
            SelectionScheme::Roulette,
            SelectionScheme::Tournament { k },
            SelectionScheme::Rank { pressure },
        ] {
            let probabilities = selection_probabilities(&scheme, &fitness);
            prop_assert_eq!(probabilities.len(), fitness.len());
            prop_assert!(probabilities.iter().all(|p| *p >= 0.0));
            let total: f64 = probabilities.iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-9, "{:?} sums to {}", scheme, total);
        }
    }

    #[test]
    fn hybrid_viability_falls_with_distance(
        near in 0.0f64..=1.0,
        gap in 0.0f64..=1.0,
        threshold in 0.05f64..=0.9
    ) {
        let far = near + gap;
        let v_near = hybrid_viability(near, threshold, 6.0);
        let v_far = hybrid_viability(far, threshold, 6.0);
        prop_assert!((0.0..=1.0).contains(&v_near));
        prop_assert!(v_far <= v_near);
    }
}

#[test]
fn test_cyclic_regulation_is_rejected() {
    let mut genome = uniform_genome(Ploidy::Haploid, 3, 0.5);
    genome.chromosomes[0].genes[0].epistasis.push(EpistasisLink {
        source: 2,
        strength: 0.5,
    });
    genome.chromosomes[0].genes[2].epistasis.push(EpistasisLink {
        source: 0,
        strength: -0.5,
    });
    assert!(matches!(genome.validate(), Err(GenomeDefect::Cycle { .. })));
    assert!(genome.express(&Conditions::default()).is_err());
}
