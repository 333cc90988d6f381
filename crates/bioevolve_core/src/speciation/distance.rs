//! Genetic distance and hybrid viability.
//!
//! Distance between two profiles is `sqrt(Σ w_l (x_l − y_l)² / Σ w_l)` over the
//! union of their loci, `w_l` being the mean locus importance. A locus carried
//! by only one side contributes a difference of 1 at that side's importance.

use bioevolve_data::{GeneticCentroid, Genome};
use std::collections::BTreeMap;

/// Per-locus mean dosage and importance over a set of genomes.
pub fn centroid_of<'a, I>(genomes: I) -> GeneticCentroid
where
    I: IntoIterator<Item = &'a Genome>,
{
    // locus -> (dosage sum, importance sum, count)
    let mut acc: BTreeMap<u32, (f64, f64, usize)> = BTreeMap::new();
    let mut sample_size = 0;
    for genome in genomes {
        sample_size += 1;
        for gene in genome.genes() {
            let entry = acc.entry(gene.locus).or_insert((0.0, 0.0, 0));
            entry.0 += gene.dosage();
            entry.1 += gene.importance;
            entry.2 += 1;
        }
    }

    let mut centroid = GeneticCentroid {
        sample_size,
        ..Default::default()
    };
    for (locus, (dosage, importance, count)) in acc {
        let n = count as f64;
        centroid.loci.push(locus);
        centroid.means.push(dosage / n);
        centroid.importance.push(importance / n);
    }
    centroid
}

/// Normalized importance-weighted Euclidean distance between two centroids.
#[must_use]
pub fn centroid_distance(a: &GeneticCentroid, b: &GeneticCentroid) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    while i < a.loci.len() || j < b.loci.len() {
        let next_a = a.loci.get(i).copied();
        let next_b = b.loci.get(j).copied();
        match (next_a, next_b) {
            (Some(la), Some(lb)) if la == lb => {
                let w = 0.5 * (a.importance[i] + b.importance[j]);
                let d = a.means[i] - b.means[j];
                weighted += w * d * d;
                total_weight += w;
                i += 1;
                j += 1;
            }
            (Some(la), Some(lb)) if la < lb => {
                weighted += a.importance[i];
                total_weight += a.importance[i];
                i += 1;
            }
            (Some(_), None) => {
                weighted += a.importance[i];
                total_weight += a.importance[i];
                i += 1;
            }
            _ => {
                weighted += b.importance[j];
                total_weight += b.importance[j];
                j += 1;
            }
        }
    }
    if total_weight <= 0.0 {
        0.0
    } else {
        (weighted / total_weight).sqrt()
    }
}

/// Probability that a cross between genomes at `distance` yields a viable offspring.
#[must_use]
pub fn hybrid_viability(distance: f64, threshold: f64, steepness: f64) -> f64 {
    1.0 / (1.0 + (steepness * (distance / threshold - 1.0)).exp())
}
