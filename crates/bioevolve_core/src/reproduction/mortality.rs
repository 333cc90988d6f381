use crate::config::LifecycleConfig;
use crate::metrics::DeathCause;
use bioevolve_data::{Organism, Trait};

/// Maximum age for an organism: `base_lifespan · (0.5 + longevity)`.
#[must_use]
pub fn lifespan(organism: &Organism, config: &LifecycleConfig) -> f64 {
    config.base_lifespan * (0.5 + organism.phenotype.get(Trait::Longevity))
}

/// Why `organism` dies this generation, if it does. Requires a fresh fitness.
#[must_use]
pub fn cause_of_death(organism: &Organism, config: &LifecycleConfig) -> Option<DeathCause> {
    if f64::from(organism.age) > lifespan(organism, config) {
        Some(DeathCause::Senescence)
    } else if organism.fitness < config.survival_threshold {
        Some(DeathCause::LowFitness)
    } else {
        None
    }
}

/// Enforces the carrying capacity: keeps the `capacity` fittest organisms,
/// ties broken by ascending id, and returns `(survivors, culled)` both sorted by id.
#[must_use]
pub fn cull_to_capacity(
    mut organisms: Vec<Organism>,
    capacity: usize,
) -> (Vec<Organism>, Vec<Organism>) {
    if organisms.len() <= capacity {
        return (organisms, Vec::new());
    }
    organisms.sort_by(|a, b| b.fitness.total_cmp(&a.fitness).then(a.id.cmp(&b.id)));
    let mut culled = organisms.split_off(capacity);
    organisms.sort_by_key(|o| o.id);
    culled.sort_by_key(|o| o.id);
    (organisms, culled)
}
