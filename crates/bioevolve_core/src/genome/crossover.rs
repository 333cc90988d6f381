use crate::config::CrossoverDistribution;
use crate::error::Incompatibility;
use bioevolve_data::{Chromosome, Gene, Genome, Ploidy};
use rand::Rng;

/// Checks that two genomes can be recombined: same ploidy, same chromosome
/// count and the same locus at every position.
pub fn check_compatible(mother: &Genome, father: &Genome) -> Result<(), Incompatibility> {
    if mother.ploidy != father.ploidy {
        return Err(Incompatibility::Ploidy {
            mother: mother.ploidy,
            father: father.ploidy,
        });
    }
    if mother.chromosomes.len() != father.chromosomes.len() {
        return Err(Incompatibility::ChromosomeCount {
            mother: mother.chromosomes.len(),
            father: father.chromosomes.len(),
        });
    }
    for (c, (m, f)) in mother
        .chromosomes
        .iter()
        .zip(father.chromosomes.iter())
        .enumerate()
    {
        if m.genes.len() != f.genes.len() {
            return Err(Incompatibility::Layout {
                chromosome: c,
                position: m.genes.len().min(f.genes.len()),
            });
        }
        if let Some(position) = m
            .genes
            .iter()
            .zip(f.genes.iter())
            .position(|(a, b)| a.locus != b.locus)
        {
            return Err(Incompatibility::Layout {
                chromosome: c,
                position,
            });
        }
    }
    Ok(())
}

/// Sorted, distinct break positions in `1..len`.
fn break_points<R: Rng + ?Sized>(
    len: usize,
    points: &CrossoverDistribution,
    rng: &mut R,
) -> Vec<usize> {
    let count = points.sample(rng);
    if len < 2 || count == 0 {
        return Vec::new();
    }
    let mut breaks: Vec<usize> = (0..count).map(|_| rng.gen_range(1..len)).collect();
    breaks.sort_unstable();
    breaks.dedup();
    breaks
}

/// Multi-point crossover of two structurally compatible genomes.
///
/// Haploid: segments between break points alternate source parent.
/// Diploid: break points are shared; each parent contributes a gamete that
/// alternates between its two homologs at the breaks, giving alleles
/// `[maternal, paternal]`. The gene skeleton (role, effects, links) follows the
/// alternating source parent in both cases.
pub fn recombine<R: Rng + ?Sized>(
    mother: &Genome,
    father: &Genome,
    points: &CrossoverDistribution,
    rng: &mut R,
) -> Result<Genome, Incompatibility> {
    check_compatible(mother, father)?;

    let mut chromosomes = Vec::with_capacity(mother.chromosomes.len());
    for (m, f) in mother.chromosomes.iter().zip(father.chromosomes.iter()) {
        let len = m.genes.len();
        let breaks = break_points(len, points, rng);
        let mother_first = rng.gen_bool(0.5);
        let (mut maternal_homolog, mut paternal_homolog) = match mother.ploidy {
            Ploidy::Haploid => (0, 0),
            Ploidy::Diploid => (rng.gen_range(0..2), rng.gen_range(0..2)),
        };

        let mut genes = Vec::with_capacity(len);
        let mut segment = 0;
        let mut next_break = breaks.iter().peekable();
        for i in 0..len {
            if next_break.peek().is_some_and(|&&b| b == i) {
                next_break.next();
                segment += 1;
                maternal_homolog ^= 1;
                paternal_homolog ^= 1;
            }
            let from_mother = (segment % 2 == 0) == mother_first;
            let skeleton = if from_mother { &m.genes[i] } else { &f.genes[i] };
            let gene = match mother.ploidy {
                Ploidy::Haploid => skeleton.clone(),
                Ploidy::Diploid => Gene {
                    alleles: vec![
                        m.genes[i].alleles[maternal_homolog],
                        f.genes[i].alleles[paternal_homolog],
                    ],
                    ..skeleton.clone()
                },
            };
            genes.push(gene);
        }
        chromosomes.push(Chromosome { genes });
    }

    Ok(Genome {
        ploidy: mother.ploidy,
        chromosomes,
    })
}
