/// Asserts that the live population size matches the expected value.
#[macro_export]
macro_rules! assert_population {
    ($manager:expr, $count:expr) => {
        assert_eq!(
            $manager.population().len(),
            $count,
            "Population count mismatch"
        );
    };
}

/// Asserts the membership invariants: every live organism belongs to an
/// extant species that lists it, and every member list is a subset of the
/// live population.
#[macro_export]
macro_rules! assert_membership_consistent {
    ($manager:expr) => {
        for organism in $manager.population().iter() {
            let species = $manager
                .registry()
                .get(organism.species)
                .expect("Organism points at an unknown species");
            assert!(
                !species.is_extinct(),
                "{} belongs to extinct species {}",
                organism.id,
                species.id
            );
            assert!(
                species.contains(organism.id),
                "{} missing from members of {}",
                organism.id,
                species.id
            );
        }
        for species in $manager.registry().species.iter() {
            for id in &species.members {
                assert!(
                    $manager.population().get(*id).is_some(),
                    "Species {} lists dead organism {}",
                    species.id,
                    id
                );
            }
        }
    };
}
