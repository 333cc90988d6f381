//! Mating-pair selection.
//!
//! All schemes are distributions over candidates, so realised offspring counts
//! vary from generation to generation. In small demes this variance is genetic
//! drift.

use crate::config::SelectionScheme;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Candidate positions ordered from worst to best, ties by position.
fn ascending_ranks(fitness: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| fitness[a].total_cmp(&fitness[b]).then(a.cmp(&b)));
    order
}

/// Exact probability that each candidate is selected in one draw.
///
/// - roulette: `f / Σf` (uniform when every fitness is zero)
/// - rank: linear ranking, `(2 − s + 2 (s − 1) r / (N − 1)) / N` for rank `r` from 0 (worst)
/// - tournament-k: `(r^k − (r − 1)^k) / N^k` for rank `r` from 1 (worst)
#[must_use]
pub fn selection_probabilities(scheme: &SelectionScheme, fitness: &[f64]) -> Vec<f64> {
    let n = fitness.len();
    if n == 0 {
        return Vec::new();
    }
    let uniform = vec![1.0 / n as f64; n];
    match *scheme {
        SelectionScheme::Roulette => {
            let total: f64 = fitness.iter().sum();
            if total <= 0.0 {
                uniform
            } else {
                fitness.iter().map(|f| f / total).collect()
            }
        }
        SelectionScheme::Rank { pressure } => {
            if n == 1 {
                return uniform;
            }
            let mut probs = vec![0.0; n];
            let nf = n as f64;
            for (r, &idx) in ascending_ranks(fitness).iter().enumerate() {
                probs[idx] = (2.0 - pressure + 2.0 * (pressure - 1.0) * r as f64 / (nf - 1.0)) / nf;
            }
            probs
        }
        SelectionScheme::Tournament { k } => {
            let mut probs = vec![0.0; n];
            let nf = n as f64;
            let k = k as i32;
            for (r, &idx) in ascending_ranks(fitness).iter().enumerate() {
                let r = (r + 1) as f64;
                probs[idx] = (r.powi(k) - (r - 1.0).powi(k)) / nf.powi(k);
            }
            probs
        }
    }
}

/// Draws candidates from one deme.
pub struct Selector<'a> {
    fitness: &'a [f64],
    scheme: SelectionScheme,
    weighted: Option<WeightedIndex<f64>>,
}

impl<'a> Selector<'a> {
    #[must_use]
    pub fn new(scheme: SelectionScheme, fitness: &'a [f64]) -> Self {
        let weighted = match scheme {
            SelectionScheme::Tournament { .. } => None,
            _ => WeightedIndex::new(selection_probabilities(&scheme, fitness)).ok(),
        };
        Self {
            fitness,
            scheme,
            weighted,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fitness.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fitness.is_empty()
    }

    /// One selected candidate position.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let n = self.fitness.len();
        match (&self.scheme, &self.weighted) {
            (SelectionScheme::Tournament { k }, _) => {
                let mut best = rng.gen_range(0..n);
                for _ in 1..*k {
                    let challenger = rng.gen_range(0..n);
                    let better = self.fitness[challenger].total_cmp(&self.fitness[best]);
                    if better.is_gt() || (better.is_eq() && challenger > best) {
                        best = challenger;
                    }
                }
                best
            }
            (_, Some(weighted)) => weighted.sample(rng),
            (_, None) => rng.gen_range(0..n),
        }
    }

    /// Two distinct candidate positions, or `None` with fewer than two candidates.
    pub fn pick_pair<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(usize, usize)> {
        let n = self.fitness.len();
        if n < 2 {
            return None;
        }
        let mother = self.pick(rng);
        for _ in 0..16 {
            let father = self.pick(rng);
            if father != mother {
                return Some((mother, father));
            }
        }
        Some((mother, (mother + 1 + rng.gen_range(0..n - 1)) % n))
    }
}
