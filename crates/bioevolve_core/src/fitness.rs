//! Fitness evaluator interface and reference evaluators.
//!
//! The engine only depends on [`FitnessEvaluator`]. Evaluators must be pure
//! functions of phenotype and conditions and return a finite value `>= 0`.
//! Violations are surfaced as [`EngineError::EvaluatorContract`], never clamped.

use crate::error::{EngineError, Result};
use bioevolve_data::{Conditions, EnvFactor, EnvironmentSnapshot, Organism, Phenotype, Trait};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub trait FitnessEvaluator: Sync {
    /// Fitness of `phenotype` living under `conditions`.
    fn evaluate(&self, phenotype: &Phenotype, conditions: &Conditions) -> f64;
}

impl<F> FitnessEvaluator for F
where
    F: Fn(&Phenotype, &Conditions) -> f64 + Sync,
{
    fn evaluate(&self, phenotype: &Phenotype, conditions: &Conditions) -> f64 {
        self(phenotype, conditions)
    }
}

/// Evaluates a batch in parallel against each organism's deme conditions.
///
/// Scores come back in input order. The first contract violation in input
/// order is reported.
pub fn evaluate_batch<E: FitnessEvaluator + ?Sized>(
    evaluator: &E,
    organisms: &[Organism],
    environment: &EnvironmentSnapshot,
    generation: u64,
) -> Result<Vec<f64>> {
    let scores: Vec<f64> = organisms
        .par_iter()
        .map(|o| evaluator.evaluate(&o.phenotype, environment.for_deme(o.deme)))
        .collect();

    if let Some((organism, &value)) = organisms
        .iter()
        .zip(scores.iter())
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        tracing::warn!(
            organism = organism.id.0,
            generation = generation,
            value = value,
            "Fitness evaluator contract violated"
        );
        return Err(EngineError::EvaluatorContract {
            organism: organism.id,
            species: organism.species,
            generation,
            value,
        });
    }
    Ok(scores)
}

/// Evaluates and stores fitness on every organism.
pub fn assign_fitness<E: FitnessEvaluator + ?Sized>(
    evaluator: &E,
    organisms: &mut [Organism],
    environment: &EnvironmentSnapshot,
    generation: u64,
) -> Result<()> {
    let scores = evaluate_batch(evaluator, organisms, environment, generation)?;
    for (organism, score) in organisms.iter_mut().zip(scores) {
        organism.fitness = score;
    }
    Ok(())
}

/// Constant fitness: selection is neutral and only drift acts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatEvaluator(pub f64);

impl Default for FlatEvaluator {
    fn default() -> Self {
        Self(1.0)
    }
}

impl FitnessEvaluator for FlatEvaluator {
    fn evaluate(&self, _phenotype: &Phenotype, _conditions: &Conditions) -> f64 {
        self.0
    }
}

/// Where a pressure's optimum comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Optimum {
    Fixed(f64),
    /// Tracks an environmental factor, so demes with different conditions favour different traits.
    Factor(EnvFactor),
}

/// Selective pressure on one trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pressure {
    pub target: Trait,
    pub optimum: Optimum,
    /// Non-negative weight of this pressure.
    pub intensity: f64,
}

impl Pressure {
    /// `intensity · (1 − |value − optimum|)`, clamped at zero.
    #[must_use]
    pub fn effect(&self, phenotype: &Phenotype, conditions: &Conditions) -> f64 {
        let optimum = match self.optimum {
            Optimum::Fixed(v) => v,
            Optimum::Factor(factor) => conditions.get(factor),
        };
        let closeness = 1.0 - (phenotype.get(self.target) - optimum).abs();
        self.intensity * closeness.max(0.0)
    }
}

/// Baseline plus the sum of pressure effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitOptimumEvaluator {
    pub baseline: f64,
    pub pressures: Vec<Pressure>,
}

impl Default for TraitOptimumEvaluator {
    /// Thermal tolerance tracks temperature, size tracks resource density.
    fn default() -> Self {
        Self {
            baseline: 0.1,
            pressures: vec![
                Pressure {
                    target: Trait::ThermalTolerance,
                    optimum: Optimum::Factor(EnvFactor::Temperature),
                    intensity: 1.0,
                },
                Pressure {
                    target: Trait::Size,
                    optimum: Optimum::Factor(EnvFactor::ResourceDensity),
                    intensity: 0.5,
                },
            ],
        }
    }
}

impl FitnessEvaluator for TraitOptimumEvaluator {
    fn evaluate(&self, phenotype: &Phenotype, conditions: &Conditions) -> f64 {
        self.baseline
            + self
                .pressures
                .iter()
                .map(|p| p.effect(phenotype, conditions))
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioevolve_data::{Genome, OrganismId, Ploidy, SpeciesId};

    fn organism(id: u64, deme: u16) -> Organism {
        let genome = Genome {
            ploidy: Ploidy::Haploid,
            chromosomes: Vec::new(),
        };
        Organism::founder(OrganismId(id), genome, deme, SpeciesId::ROOT)
    }

    #[test]
    fn test_flat_evaluator() {
        let f = FlatEvaluator(2.5);
        assert_eq!(f.evaluate(&Phenotype::default(), &Conditions::default()), 2.5);
    }

    #[test]
    fn test_trait_optimum_prefers_matching_deme() {
        let eval = TraitOptimumEvaluator {
            baseline: 0.0,
            pressures: vec![Pressure {
                target: Trait::ThermalTolerance,
                optimum: Optimum::Factor(EnvFactor::Temperature),
                intensity: 1.0,
            }],
        };
        let mut warm = Phenotype::default();
        warm.values[Trait::ThermalTolerance.index()] = 0.8;
        let hot = Conditions {
            temperature: 0.8,
            ..Default::default()
        };
        let cold = Conditions {
            temperature: 0.2,
            ..Default::default()
        };
        assert!((eval.evaluate(&warm, &hot) - 1.0).abs() < 1e-12);
        assert!((eval.evaluate(&warm, &cold) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_batch_preserves_order_and_uses_deme() {
        let organisms = vec![organism(1, 0), organism(2, 1), organism(3, 0)];
        let env = EnvironmentSnapshot {
            global: Conditions::default(),
            demes: vec![
                Conditions {
                    temperature: 0.1,
                    ..Default::default()
                },
                Conditions {
                    temperature: 0.9,
                    ..Default::default()
                },
            ],
        };
        let by_temperature = |_: &Phenotype, c: &Conditions| c.temperature;
        let scores = evaluate_batch(&by_temperature, &organisms, &env, 0).expect("valid");
        assert_eq!(scores, vec![0.1, 0.9, 0.1]);
    }

    #[test]
    fn test_contract_violation_is_reported() {
        let organisms = vec![organism(1, 0), organism(2, 0)];
        let negative = |_: &Phenotype, _: &Conditions| -1.0;
        let err = evaluate_batch(&negative, &organisms, &EnvironmentSnapshot::default(), 4)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::EvaluatorContract {
                organism: OrganismId(1),
                species: SpeciesId::ROOT,
                generation: 4,
                value: -1.0,
            }
        );

        let nan = |_: &Phenotype, _: &Conditions| f64::NAN;
        assert!(evaluate_batch(&nan, &organisms, &EnvironmentSnapshot::default(), 4).is_err());
    }
}
