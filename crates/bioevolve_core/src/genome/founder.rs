use crate::config::GenomeConfig;
use bioevolve_data::data::genome::allele_hash;
use bioevolve_data::{
    Allele, AlleleValue, Chromosome, DevelopmentalAxis, EnvFactor, EnvSensitivity, EpistasisLink,
    Gene, GeneRole, Genome, Ploidy, Trait, TraitEffect,
};
use rand::seq::SliceRandom;
use rand::Rng;

/// Shared layout and reference allele values every founder is drawn around.
///
/// Loci are numbered in chromosome order. Epistasis sources and architect
/// gates always point from a lower locus to a higher one, so the template's
/// regulatory graph is acyclic by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeTemplate {
    pub ploidy: Ploidy,
    /// Genes with a single reference allele each.
    pub chromosomes: Vec<Chromosome>,
}

impl GenomeTemplate {
    pub fn generate<R: Rng + ?Sized>(config: &GenomeConfig, ploidy: Ploidy, rng: &mut R) -> Self {
        let total = config.gene_count();
        let mut genes: Vec<Gene> = Vec::with_capacity(total);

        for index in 0..total {
            let locus = index as u32;
            let roll: f64 = rng.gen();
            let role = if roll < config.architect_fraction {
                GeneRole::Architect {
                    threshold: rng.gen_range(0.3..0.9),
                    gates: Vec::new(),
                    axis: Some(if rng.gen_bool(0.5) {
                        DevelopmentalAxis::Multicellularity
                    } else {
                        DevelopmentalAxis::Neural
                    }),
                }
            } else if roll < config.architect_fraction + config.regulatory_fraction {
                GeneRole::Regulatory
            } else {
                GeneRole::Structural
            };

            let effects = match role {
                GeneRole::Structural => {
                    let count = rng.gen_range(1..=config.max_pleiotropy.min(Trait::COUNT));
                    Trait::ALL
                        .choose_multiple(rng, count)
                        .map(|&target| TraitEffect {
                            target,
                            weight: rng.gen_range(-2.0..2.0),
                        })
                        .collect()
                }
                _ => Vec::new(),
            };

            let mut epistasis = Vec::new();
            if index > 0 {
                for _ in 0..config.epistasis_links {
                    if rng.gen_bool(0.5) {
                        let source = rng.gen_range(0..locus);
                        if epistasis.iter().all(|l: &EpistasisLink| l.source != source) {
                            epistasis.push(EpistasisLink {
                                source,
                                strength: rng.gen_range(-1.0..1.0),
                            });
                        }
                    }
                }
            }

            let sensitivities = if rng.gen_bool(config.sensitivity_chance) {
                let factor = EnvFactor::ALL[rng.gen_range(0..EnvFactor::ALL.len())];
                vec![EnvSensitivity {
                    factor,
                    weight: rng.gen_range(-0.5..0.5),
                }]
            } else {
                Vec::new()
            };

            let value = if !matches!(role, GeneRole::Architect { .. })
                && rng.gen_bool(config.categorical_fraction)
            {
                AlleleValue::Categorical {
                    index: rng.gen_range(0..config.categorical_domain),
                    domain: config.categorical_domain,
                }
            } else {
                AlleleValue::Continuous(rng.gen_range(0.0..1.0))
            };

            genes.push(Gene {
                locus,
                role,
                alleles: vec![Allele::new(allele_hash(u64::from(locus), value.fingerprint()), value)],
                effects,
                epistasis,
                sensitivities,
                importance: rng.gen_range(0.5..1.5),
            });
        }

        // Architect gates on later structural genes.
        let structural: Vec<u32> = genes
            .iter()
            .filter(|g| matches!(g.role, GeneRole::Structural))
            .map(|g| g.locus)
            .collect();
        for gene in genes.iter_mut() {
            let locus = gene.locus;
            if let GeneRole::Architect { gates, .. } = &mut gene.role {
                let later: Vec<u32> = structural.iter().copied().filter(|&l| l > locus).collect();
                let count = rng.gen_range(0..=later.len().min(2));
                gates.extend(later.choose_multiple(rng, count).copied());
                gates.sort_unstable();
            }
        }

        let per = config.genes_per_chromosome;
        let chromosomes = genes
            .chunks(per)
            .map(|chunk| Chromosome {
                genes: chunk.to_vec(),
            })
            .collect();

        Self {
            ploidy,
            chromosomes,
        }
    }
}

/// Draws one founder genome around the template.
///
/// `variation` 0 reproduces the template exactly on every copy.
pub fn founder_genome<R: Rng + ?Sized>(
    template: &GenomeTemplate,
    variation: f64,
    rng: &mut R,
) -> Genome {
    let copies = template.ploidy.copies();
    let chromosomes = template
        .chromosomes
        .iter()
        .map(|chromosome| Chromosome {
            genes: chromosome
                .genes
                .iter()
                .map(|gene| {
                    let reference = gene.alleles[0];
                    let alleles = (0..copies)
                        .map(|_| {
                            if variation <= 0.0 {
                                return reference;
                            }
                            let value = match reference.value {
                                AlleleValue::Continuous(v) => AlleleValue::Continuous(
                                    (v + rng.gen_range(-variation..=variation)).clamp(0.0, 1.0),
                                ),
                                AlleleValue::Categorical { index, domain } => {
                                    if rng.gen_bool(variation) {
                                        AlleleValue::Categorical {
                                            index: rng.gen_range(0..domain),
                                            domain,
                                        }
                                    } else {
                                        AlleleValue::Categorical { index, domain }
                                    }
                                }
                            };
                            if value == reference.value {
                                reference
                            } else {
                                reference.derive(value)
                            }
                        })
                        .collect();
                    Gene {
                        alleles,
                        ..gene.clone()
                    }
                })
                .collect(),
        })
        .collect();

    Genome {
        ploidy: template.ploidy,
        chromosomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::GenomeLogic;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_template_layout_matches_config() {
        let config = GenomeConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let template = GenomeTemplate::generate(&config, Ploidy::Diploid, &mut rng);
        assert_eq!(template.chromosomes.len(), config.chromosomes);
        for c in &template.chromosomes {
            assert_eq!(c.genes.len(), config.genes_per_chromosome);
        }
    }

    #[test]
    fn test_founders_are_valid_and_compatible() {
        let config = GenomeConfig {
            architect_fraction: 0.3,
            epistasis_links: 3,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for ploidy in [Ploidy::Haploid, Ploidy::Diploid] {
            let template = GenomeTemplate::generate(&config, ploidy, &mut rng);
            let a = founder_genome(&template, 0.2, &mut rng);
            let b = founder_genome(&template, 0.2, &mut rng);
            assert!(a.validate().is_ok());
            assert!(b.validate().is_ok());
            assert!(crate::genome::check_compatible(&a, &b).is_ok());
            assert!(a.genes().all(|g| g.alleles.len() == ploidy.copies()));
        }
    }

    #[test]
    fn test_zero_variation_is_clonal() {
        let config = GenomeConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let template = GenomeTemplate::generate(&config, Ploidy::Haploid, &mut rng);
        let a = founder_genome(&template, 0.0, &mut rng);
        let b = founder_genome(&template, 0.0, &mut rng);
        assert_eq!(a, b);
        assert_eq!(a.distance(&b), 0.0);
    }
}
