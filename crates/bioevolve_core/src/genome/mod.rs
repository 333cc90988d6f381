//! Genome operators: validation, mutation, recombination and distance.
//!
//! All operators are pure given their inputs and the RNG handed to them, so
//! they can run concurrently per organism with one RNG per shard.

pub mod crossover;
pub mod founder;
pub mod mutation;

use crate::config::{CrossoverDistribution, MutationConfig};
use crate::error::{GenomeDefect, Incompatibility};
use crate::grn::RegulatoryNetwork;
use crate::speciation::distance::{centroid_distance, centroid_of};
use bioevolve_data::{AlleleValue, GeneRole, Genome};
use rand::Rng;
use std::collections::HashSet;

pub use crossover::{check_compatible, recombine};
pub use founder::{founder_genome, GenomeTemplate};
pub use mutation::mutate;

pub trait GenomeLogic {
    /// Full validation: structure, then regulatory graph acyclicity.
    fn validate(&self) -> Result<(), GenomeDefect>;
    /// Structural checks only (allele counts, unique loci, references, values).
    fn validate_structure(&self) -> Result<(), GenomeDefect>;
    fn mutate_with_rng<R: Rng>(&self, config: &MutationConfig, rng: &mut R) -> Genome;
    fn recombine_with_rng<R: Rng>(
        &self,
        other: &Genome,
        points: &CrossoverDistribution,
        rng: &mut R,
    ) -> Result<Genome, Incompatibility>;
    /// Normalized importance-weighted distance in `[0, 1]` for values in `[0, 1]`.
    fn distance(&self, other: &Genome) -> f64;
    /// Loci in chromosome order.
    fn loci(&self) -> Vec<u32>;
}

impl GenomeLogic for Genome {
    fn validate(&self) -> Result<(), GenomeDefect> {
        RegulatoryNetwork::compile(self).map(|_| ())
    }

    fn validate_structure(&self) -> Result<(), GenomeDefect> {
        let copies = self.ploidy.copies();
        let mut seen = HashSet::with_capacity(self.gene_count());
        for gene in self.genes() {
            if !seen.insert(gene.locus) {
                return Err(GenomeDefect::DuplicateLocus { locus: gene.locus });
            }
            if gene.alleles.len() != copies {
                return Err(GenomeDefect::AlleleCount {
                    locus: gene.locus,
                    expected: copies,
                    found: gene.alleles.len(),
                });
            }
            for allele in &gene.alleles {
                match allele.value {
                    AlleleValue::Continuous(v) if !v.is_finite() => {
                        return Err(GenomeDefect::InvalidValue {
                            locus: gene.locus,
                            reason: format!("non-finite allele value {v}"),
                        });
                    }
                    AlleleValue::Categorical { index, domain } if index >= domain => {
                        return Err(GenomeDefect::InvalidValue {
                            locus: gene.locus,
                            reason: format!("categorical index {index} outside domain {domain}"),
                        });
                    }
                    _ => {}
                }
            }
            if !gene.importance.is_finite() || gene.importance < 0.0 {
                return Err(GenomeDefect::InvalidValue {
                    locus: gene.locus,
                    reason: format!("importance {}", gene.importance),
                });
            }
        }

        for gene in self.genes() {
            for link in &gene.epistasis {
                if !seen.contains(&link.source) {
                    return Err(GenomeDefect::DanglingReference {
                        locus: gene.locus,
                        target: link.source,
                    });
                }
            }
            if let GeneRole::Architect { gates, .. } = &gene.role {
                for gated in gates {
                    if !seen.contains(gated) {
                        return Err(GenomeDefect::DanglingReference {
                            locus: gene.locus,
                            target: *gated,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn mutate_with_rng<R: Rng>(&self, config: &MutationConfig, rng: &mut R) -> Genome {
        mutate(self, config, rng)
    }

    fn recombine_with_rng<R: Rng>(
        &self,
        other: &Genome,
        points: &CrossoverDistribution,
        rng: &mut R,
    ) -> Result<Genome, Incompatibility> {
        recombine(self, other, points, rng)
    }

    fn distance(&self, other: &Genome) -> f64 {
        centroid_distance(&centroid_of([self]), &centroid_of([other]))
    }

    fn loci(&self) -> Vec<u32> {
        self.genes().map(|g| g.locus).collect()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use bioevolve_data::{Ploidy, Trait};

    #[test]
    fn test_uniform_genome_is_valid() {
        let g = uniform_genome(Ploidy::Diploid, 6, 0.5);
        assert!(g.validate().is_ok());
        assert_eq!(g.loci(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_allele_count_must_match_ploidy() {
        let mut g = uniform_genome(Ploidy::Diploid, 3, 0.5);
        g.chromosomes[0].genes[1].alleles.pop();
        assert_eq!(
            g.validate(),
            Err(GenomeDefect::AlleleCount {
                locus: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_duplicate_locus_rejected() {
        let mut g = uniform_genome(Ploidy::Haploid, 3, 0.5);
        g.chromosomes[0].genes[2].locus = 0;
        assert_eq!(g.validate(), Err(GenomeDefect::DuplicateLocus { locus: 0 }));
    }

    #[test]
    fn test_dangling_epistasis_rejected() {
        let mut g = uniform_genome(Ploidy::Haploid, 2, 0.5);
        let gene = g.chromosomes[0].genes[1].clone();
        g.chromosomes[0].genes[1] = linked(gene, 42, 0.5);
        assert_eq!(
            g.validate(),
            Err(GenomeDefect::DanglingReference {
                locus: 1,
                target: 42
            })
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let mut g = uniform_genome(Ploidy::Haploid, 3, 0.5);
        let genes = &mut g.chromosomes[0].genes;
        genes[0] = linked(genes[0].clone(), 2, 0.3);
        genes[2] = linked(genes[2].clone(), 0, 0.3);
        assert!(matches!(g.validate(), Err(GenomeDefect::Cycle { .. })));
    }

    #[test]
    fn test_distance_properties() {
        let a = uniform_genome(Ploidy::Haploid, 4, 0.2);
        let b = uniform_genome(Ploidy::Haploid, 4, 0.8);
        assert_eq!(a.distance(&a), 0.0);
        assert!((a.distance(&b) - 0.6).abs() < 1e-12);
        assert!((a.distance(&b) - b.distance(&a)).abs() < 1e-12);
    }

    #[test]
    fn test_distance_counts_missing_loci_as_one() {
        let a = uniform_genome(Ploidy::Haploid, 2, 0.5);
        let mut b = a.clone();
        b.chromosomes[0].genes[1].locus = 9;
        b.chromosomes[0].genes[1].effects[0].target = Trait::Speed;
        // loci {0,1} vs {0,9}: two unmatched loci of weight 1 each out of three.
        let expected = (2.0_f64 / 3.0).sqrt();
        assert!((a.distance(&b) - expected).abs() < 1e-12);
    }
}
