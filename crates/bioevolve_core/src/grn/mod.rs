//! Gene regulatory network: genotype plus environment to phenotype.
//!
//! Expression runs genes in topological order of the regulatory graph:
//!
//! - activation: `clamp01((dosage + Σ env_weight · factor) · modulation)`
//! - modulation: `clamp(1 + Σ strength · (2 · act_src − 1), 0, 2)` over expressed sources
//! - architect genes open when their activation reaches their threshold; a
//!   gene gated by any closed architect is silenced
//! - each trait is the logistic of the summed `weight · activation` of the
//!   expressed genes targeting it, so traits stay in (0, 1)
//!
//! No randomness is involved: identical genome and conditions always yield
//! an identical phenotype.

pub mod development;
pub mod regulatory_graph;

use crate::error::GenomeDefect;
use crate::genome::GenomeLogic;
use bioevolve_data::{Conditions, Gene, GeneRole, Genome, Phenotype, Trait};
use development::SwitchCounts;
use regulatory_graph::RegulatoryGraph;

#[inline]
fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// A validated genome with its evaluation order resolved.
pub struct RegulatoryNetwork<'a> {
    genes: Vec<&'a Gene>,
    order: Vec<usize>,
    /// Per position: `(source position, strength)`.
    inputs: Vec<Vec<(usize, f64)>>,
    /// Per position: positions of architects gating it.
    gated_by: Vec<Vec<usize>>,
}

impl<'a> RegulatoryNetwork<'a> {
    /// Validates the genome and resolves the regulatory graph.
    ///
    /// Fails with [`GenomeDefect::Cycle`] on cyclic epistasis or gating.
    pub fn compile(genome: &'a Genome) -> Result<Self, GenomeDefect> {
        genome.validate_structure()?;
        let graph = RegulatoryGraph::build(genome);
        let order = graph.evaluation_order()?;

        let genes: Vec<&Gene> = genome.genes().collect();
        let position_of = |locus: u32| genes.iter().position(|g| g.locus == locus);

        let mut inputs = vec![Vec::new(); genes.len()];
        let mut gated_by = vec![Vec::new(); genes.len()];
        for (pos, gene) in genes.iter().enumerate() {
            for link in &gene.epistasis {
                if let Some(src) = position_of(link.source) {
                    inputs[pos].push((src, link.strength));
                }
            }
            if let GeneRole::Architect { gates, .. } = &gene.role {
                for gated in gates {
                    if let Some(target) = position_of(*gated) {
                        gated_by[target].push(pos);
                    }
                }
            }
        }

        Ok(Self {
            genes,
            order,
            inputs,
            gated_by,
        })
    }

    #[must_use]
    pub fn gene_count(&self) -> usize {
        self.genes.len()
    }

    /// Expresses the network under `conditions`.
    #[must_use]
    pub fn express(&self, conditions: &Conditions) -> Phenotype {
        let n = self.genes.len();
        let mut activation = vec![0.0_f64; n];
        let mut expressed = vec![false; n];
        let mut open = vec![false; n];
        let mut switches = SwitchCounts::default();
        let mut sums = [0.0_f64; Trait::COUNT];

        for &pos in &self.order {
            let gene = self.genes[pos];
            if !self.gated_by[pos].iter().all(|&a| open[a]) {
                continue;
            }
            expressed[pos] = true;

            let signal: f64 = gene
                .sensitivities
                .iter()
                .map(|s| s.weight * conditions.get(s.factor))
                .sum();
            let modulation: f64 = 1.0
                + self.inputs[pos]
                    .iter()
                    .filter(|(src, _)| expressed[*src])
                    .map(|&(src, strength)| strength * (2.0 * activation[src] - 1.0))
                    .sum::<f64>();
            let act = ((gene.dosage() + signal) * modulation.clamp(0.0, 2.0)).clamp(0.0, 1.0);
            activation[pos] = act;

            if let GeneRole::Architect {
                threshold, axis, ..
            } = &gene.role
            {
                if act >= *threshold {
                    open[pos] = true;
                    if let Some(axis) = axis {
                        switches.open(*axis);
                    }
                }
            }

            for effect in &gene.effects {
                sums[effect.target.index()] += effect.weight * act;
            }
        }

        Phenotype {
            values: sums.iter().map(|&s| logistic(s)).collect(),
            class: switches.classify(),
        }
    }
}

/// Expression entry point on genomes.
pub trait ExpressionLogic {
    /// Compiles and expresses in one go.
    fn express(&self, conditions: &Conditions) -> Result<Phenotype, GenomeDefect>;
}

impl ExpressionLogic for Genome {
    fn express(&self, conditions: &Conditions) -> Result<Phenotype, GenomeDefect> {
        RegulatoryNetwork::compile(self).map(|net| net.express(conditions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::test_support::{linked, structural, uniform_genome};
    use bioevolve_data::{
        BodyPlan, Chromosome, DevelopmentalAxis, EnvFactor, EnvSensitivity, Ploidy, TraitEffect,
    };

    fn single(genes: Vec<Gene>) -> Genome {
        Genome {
            ploidy: Ploidy::Haploid,
            chromosomes: vec![Chromosome { genes }],
        }
    }

    #[test]
    fn test_traits_are_squashed() {
        let g = uniform_genome(Ploidy::Haploid, 24, 1.0);
        let p = g.express(&Conditions::default()).expect("valid");
        assert_eq!(p.values.len(), Trait::COUNT);
        assert!(p.values.iter().all(|&v| v > 0.0 && v < 1.0));
    }

    #[test]
    fn test_untargeted_trait_is_midpoint() {
        let g = single(vec![structural(0, &[0.8], Trait::Size)]);
        let p = g.express(&Conditions::default()).expect("valid");
        assert!((p.get(Trait::Size) - logistic(0.8)).abs() < 1e-12);
        assert_eq!(p.get(Trait::Speed), 0.5);
    }

    #[test]
    fn test_pleiotropic_gene_writes_every_target() {
        let mut gene = structural(0, &[1.0], Trait::Size);
        gene.effects.push(TraitEffect {
            target: Trait::Cognition,
            weight: -1.0,
        });
        let p = single(vec![gene]).express(&Conditions::default()).expect("valid");
        assert!(p.get(Trait::Size) > 0.5);
        assert!(p.get(Trait::Cognition) < 0.5);
    }

    #[test]
    fn test_epistasis_modulates_target() {
        let regulator = structural(0, &[1.0], Trait::Speed);
        let target = structural(1, &[0.4], Trait::Size);
        let boosted = single(vec![regulator.clone(), linked(target.clone(), 0, 0.5)]);
        let plain = single(vec![regulator, target]);
        let env = Conditions::default();
        let a = boosted.express(&env).expect("valid");
        let b = plain.express(&env).expect("valid");
        // modulation = 1 + 0.5 * (2 * 1 - 1) = 1.5, activation 0.6
        assert!((a.get(Trait::Size) - logistic(0.6)).abs() < 1e-12);
        assert!((b.get(Trait::Size) - logistic(0.4)).abs() < 1e-12);
    }

    #[test]
    fn test_environment_shifts_activation() {
        let mut gene = structural(0, &[0.2], Trait::ThermalTolerance);
        gene.sensitivities.push(EnvSensitivity {
            factor: EnvFactor::Temperature,
            weight: 0.5,
        });
        let g = single(vec![gene]);
        let cold = g
            .express(&Conditions {
                temperature: 0.0,
                ..Default::default()
            })
            .expect("valid");
        let hot = g
            .express(&Conditions {
                temperature: 1.0,
                ..Default::default()
            })
            .expect("valid");
        assert!(hot.get(Trait::ThermalTolerance) > cold.get(Trait::ThermalTolerance));
    }

    #[test]
    fn test_architect_gates_and_switches() {
        let architect = |value: f64| Gene {
            role: GeneRole::Architect {
                threshold: 0.5,
                gates: vec![1],
                axis: Some(DevelopmentalAxis::Multicellularity),
            },
            effects: Vec::new(),
            ..structural(0, &[value], Trait::Size)
        };
        let gated = structural(1, &[1.0], Trait::Size);

        let on = single(vec![architect(0.9), gated.clone()])
            .express(&Conditions::default())
            .expect("valid");
        assert_eq!(on.class.body_plan, BodyPlan::Colonial);
        assert!(on.get(Trait::Size) > 0.5);

        let off = single(vec![architect(0.1), gated])
            .express(&Conditions::default())
            .expect("valid");
        assert_eq!(off.class.body_plan, BodyPlan::Unicellular);
        assert_eq!(off.get(Trait::Size), 0.5);
    }

    #[test]
    fn test_cyclic_genome_not_expressed() {
        let a = linked(structural(0, &[0.5], Trait::Size), 1, 0.2);
        let b = linked(structural(1, &[0.5], Trait::Speed), 0, 0.2);
        let err = single(vec![a, b]).express(&Conditions::default());
        assert!(matches!(err, Err(GenomeDefect::Cycle { .. })));
    }
}
