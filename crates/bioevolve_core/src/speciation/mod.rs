//! Lineage and speciation tracking.
//!
//! After each generation's births the tracker:
//!
//! 1. assesses every extant species independently (parallel): centroid,
//!    dominant phenotype class, and the most divergent candidate split
//! 2. applies the assessments in species-id order: adaptation events,
//!    persistence streaks and, when a divergence outlasts the window and the
//!    compatibility check fails, a new child species
//! 3. merges species that share ground, converge and interbreed
//! 4. marks species without members extinct
//!
//! Species and centroids are only mutated after all assessments complete.

pub mod ancestry;
pub mod distance;
pub mod mode;
pub mod registry;

use crate::config::EngineConfig;
use crate::genome::{check_compatible, GenomeLogic};
use crate::metrics::EngineMetrics;
use crate::reproduction::migration::{Colony, FlowRecord, GeneFlow};
use crate::reproduction::selection::selection_probabilities;
use crate::reproduction::HybridBirth;
use bioevolve_data::{
    GeneticCentroid, LineageEvent, LineageEventKind, Organism, OrganismId, PhenotypeClass,
    Population, SpeciationMode, SpeciesId,
};
use distance::{centroid_distance, centroid_of, hybrid_viability};
use mode::{classify, ModeEvidence, SplitBasis};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use registry::SpeciesRegistry;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Deme distances closer than this count as equal.
const DISTANCE_TIE: f64 = 1e-12;

/// Consecutive generations a species has shown the same divergent split.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct SplitStreak {
    pub species: SpeciesId,
    pub basis: SplitBasis,
    pub streak: u32,
}

/// Consecutive generations two species have been converging while interbreeding.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct MergeStreak {
    pub survivor: SpeciesId,
    pub absorbed: SpeciesId,
    pub streak: u32,
}

/// A hybrid birth between two species, `first < second`.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct HybridRecord {
    pub generation: u64,
    pub first: SpeciesId,
    pub second: SpeciesId,
}

/// Tracker memory carried between generations. Part of every checkpoint.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct TrackerState {
    pub splits: Vec<SplitStreak>,
    pub merges: Vec<MergeStreak>,
    pub hybrids: Vec<HybridRecord>,
    pub flow: GeneFlow,
}

/// What one generation of reproduction reported to the tracker.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub generation: u64,
    pub migrations: &'a [FlowRecord],
    pub colonies: &'a [Colony],
    pub hybrid_births: &'a [HybridBirth],
}

struct Candidate {
    basis: SplitBasis,
    group: Vec<OrganismId>,
    distance: f64,
    compatibility: f64,
}

struct Assessment {
    species: SpeciesId,
    member_count: usize,
    centroid: GeneticCentroid,
    dominant: Option<(PhenotypeClass, usize)>,
    candidate: Option<Candidate>,
}

/// Builds one lineage event. Ids come from the run generator so replays are identical.
pub fn lineage_event(
    rng: &mut ChaCha8Rng,
    sequence: &mut u64,
    generation: u64,
    kind: LineageEventKind,
    species: Vec<SpeciesId>,
    cause: String,
) -> LineageEvent {
    let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
    let event = LineageEvent {
        id,
        sequence: *sequence,
        generation,
        kind,
        species,
        cause,
    };
    *sequence += 1;
    event
}

/// Most common phenotype class and its count. Ties go to the lower class.
fn dominant_class(members: &[&Organism]) -> Option<(PhenotypeClass, usize)> {
    let mut counts: BTreeMap<PhenotypeClass, usize> = BTreeMap::new();
    for organism in members {
        *counts.entry(organism.phenotype.class).or_default() += 1;
    }
    counts
        .into_iter()
        .fold(None, |best, (class, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((class, count)),
        })
}

fn centroid_at(members: &[&Organism], indices: &[usize]) -> GeneticCentroid {
    centroid_of(indices.iter().map(|&i| &members[i].genome))
}

/// Deterministic 2-means over member genomes. Returns `(smaller, larger)`
/// index clusters, or `None` when the members are genetically uniform.
fn two_means(members: &[&Organism]) -> Option<(Vec<usize>, Vec<usize>)> {
    let n = members.len();
    if n < 2 {
        return None;
    }
    let profiles: Vec<GeneticCentroid> = members
        .iter()
        .map(|o| centroid_of([&o.genome]))
        .collect();
    let overall = centroid_of(members.iter().map(|o| &o.genome));

    let farthest_from = |reference: &GeneticCentroid| {
        let mut best = (0, f64::NEG_INFINITY);
        for (i, p) in profiles.iter().enumerate() {
            let d = centroid_distance(p, reference);
            if d > best.1 {
                best = (i, d);
            }
        }
        best
    };
    let (seed_a, _) = farthest_from(&overall);
    let (seed_b, spread) = farthest_from(&profiles[seed_a]);
    if spread <= 0.0 {
        return None;
    }

    let mut center_a = profiles[seed_a].clone();
    let mut center_b = profiles[seed_b].clone();
    let mut assignment: Vec<bool> = Vec::new();
    for _ in 0..10 {
        let next: Vec<bool> = profiles
            .iter()
            .map(|p| centroid_distance(p, &center_a) <= centroid_distance(p, &center_b))
            .collect();
        if next == assignment {
            break;
        }
        assignment = next;
        let a: Vec<usize> = (0..n).filter(|&i| assignment[i]).collect();
        let b: Vec<usize> = (0..n).filter(|&i| !assignment[i]).collect();
        if a.is_empty() || b.is_empty() {
            return None;
        }
        center_a = centroid_at(members, &a);
        center_b = centroid_at(members, &b);
    }

    let a: Vec<usize> = (0..n).filter(|&i| assignment[i]).collect();
    let b: Vec<usize> = (0..n).filter(|&i| !assignment[i]).collect();
    if a.len() < b.len() {
        Some((a, b))
    } else {
        Some((b, a))
    }
}

pub struct SpeciationTracker<'a> {
    config: &'a EngineConfig,
    metrics: &'a EngineMetrics,
}

impl<'a> SpeciationTracker<'a> {
    pub fn new(config: &'a EngineConfig, metrics: &'a EngineMetrics) -> Self {
        Self { config, metrics }
    }

    /// Rebuilds membership and centroids without emitting events. Used at founding.
    ///
    /// Founders have not been expressed yet, so dominant classes are left for
    /// the first observation to settle.
    pub fn initialize(&self, registry: &mut SpeciesRegistry, population: &Population) {
        registry.rebuild_members(population);
        for (species, members) in group_by_species(population) {
            if let Some(s) = registry.get_mut(species) {
                s.centroid = Some(centroid_of(members.iter().map(|o| &o.genome)));
            }
        }
    }

    /// Viable-offspring rate between two member groups, weighted by how likely
    /// the configured selection scheme is to pick each parent.
    fn compatibility_rate(&self, members: &[&Organism], group: &[usize], rest: &[usize]) -> f64 {
        let samples = self
            .config
            .speciation
            .compatibility_sample_pairs
            .min(group.len() * rest.len());
        if samples == 0 {
            return 1.0;
        }
        let fitness: Vec<f64> = members.iter().map(|o| o.fitness).collect();
        let probs = selection_probabilities(&self.config.selection.scheme, &fitness);

        let (mut weighted, mut weight, mut plain) = (0.0, 0.0, 0.0);
        for k in 0..samples {
            let g = group[k % group.len()];
            let r = rest[(k + k / group.len()) % rest.len()];
            let (a, b) = (members[g], members[r]);
            let viability = if check_compatible(&a.genome, &b.genome).is_err() {
                0.0
            } else {
                hybrid_viability(
                    a.genome.distance(&b.genome),
                    self.config.speciation.threshold,
                    self.config.speciation.viability_steepness,
                )
            };
            let w = probs[g] * probs[r];
            weighted += w * viability;
            weight += w;
            plain += viability;
        }
        if weight > 0.0 {
            weighted / weight
        } else {
            plain / samples as f64
        }
    }

    fn candidate(
        &self,
        members: &[&Organism],
        basis: SplitBasis,
        group: Vec<usize>,
        rest: Vec<usize>,
    ) -> Candidate {
        let distance = centroid_distance(
            &centroid_at(members, &group),
            &centroid_at(members, &rest),
        );
        let compatibility = if distance > self.config.speciation.threshold {
            self.compatibility_rate(members, &group, &rest)
        } else {
            1.0
        };
        Candidate {
            basis,
            group: group.iter().map(|&i| members[i].id).collect(),
            distance,
            compatibility,
        }
    }

    /// Most divergent deme against the rest of the species.
    ///
    /// Distance ties (always the case with two demes) go to a deme the
    /// species colonised through migrants, then to the smaller group, then to
    /// the lowest deme.
    fn deme_candidate(
        &self,
        species: SpeciesId,
        members: &[&Organism],
        flow: &GeneFlow,
    ) -> Option<Candidate> {
        let min = self.config.speciation.min_group_size;
        let mut by_deme: BTreeMap<u16, Vec<usize>> = BTreeMap::new();
        for (i, o) in members.iter().enumerate() {
            by_deme.entry(o.deme).or_default().push(i);
        }
        if by_deme.len() < 2 {
            return None;
        }

        let mut best: Option<(u16, f64, bool, usize)> = None;
        for (&deme, group) in &by_deme {
            let rest: Vec<usize> = (0..members.len())
                .filter(|&i| members[i].deme != deme)
                .collect();
            if group.len() < min || rest.len() < min {
                continue;
            }
            let d = centroid_distance(&centroid_at(members, group), &centroid_at(members, &rest));
            let colonized = flow.was_colonized(species, deme);
            let better = match best {
                None => true,
                Some((_, best_d, _, _)) if (d - best_d).abs() > DISTANCE_TIE => d > best_d,
                Some((_, _, best_colonized, _)) if colonized != best_colonized => colonized,
                Some((_, _, _, best_len)) => group.len() < best_len,
            };
            if better {
                best = Some((deme, d, colonized, group.len()));
            }
        }

        let (deme, ..) = best?;
        let group = by_deme.remove(&deme)?;
        let rest = (0..members.len())
            .filter(|&i| members[i].deme != deme)
            .collect();
        Some(self.candidate(members, SplitBasis::Deme(deme), group, rest))
    }

    fn cluster_candidate(&self, members: &[&Organism]) -> Option<Candidate> {
        let min = self.config.speciation.min_group_size;
        let (group, rest) = two_means(members)?;
        if group.len() < min || rest.len() < min {
            return None;
        }
        Some(self.candidate(members, SplitBasis::Cluster, group, rest))
    }

    fn assess(&self, species: SpeciesId, members: &[&Organism], flow: &GeneFlow) -> Assessment {
        let threshold = self.config.speciation.threshold;
        let by_deme = self.deme_candidate(species, members, flow);
        let candidate = match by_deme {
            Some(c) if c.distance > threshold => Some(c),
            other => match self.cluster_candidate(members) {
                Some(c) if c.distance > threshold => Some(c),
                _ => other,
            },
        };
        Assessment {
            species,
            member_count: members.len(),
            centroid: centroid_of(members.iter().map(|o| &o.genome)),
            dominant: dominant_class(members),
            candidate,
        }
    }

    /// Runs one tracker pass and returns the events it produced, in order.
    pub fn observe(
        &self,
        state: &mut TrackerState,
        registry: &mut SpeciesRegistry,
        population: &mut Population,
        observation: Observation<'_>,
        rng: &mut ChaCha8Rng,
        sequence: &mut u64,
    ) -> Vec<LineageEvent> {
        let cfg = &self.config.speciation;
        let generation = observation.generation;
        let since = generation.saturating_sub(u64::from(cfg.persistence_window) - 1);
        let mut events = Vec::new();

        for record in observation.migrations {
            state.flow.record(*record);
        }
        for colony in observation.colonies {
            state.flow.mark_colonized(colony.species, colony.deme);
        }
        for birth in observation.hybrid_births {
            let (first, second) = if birth.mother_species < birth.father_species {
                (birth.mother_species, birth.father_species)
            } else {
                (birth.father_species, birth.mother_species)
            };
            state.hybrids.push(HybridRecord {
                generation,
                first,
                second,
            });
        }
        registry.rebuild_members(population);

        let assessments: Vec<Assessment> = {
            let groups = group_by_species(population);
            let flow = &state.flow;
            groups
                .par_iter()
                .map(|(species, members)| self.assess(*species, members, flow))
                .collect()
        };

        for assessment in assessments {
            let species = assessment.species;
            if let Some(s) = registry.get_mut(species) {
                s.centroid = Some(assessment.centroid);
                if let Some((class, count)) = assessment.dominant {
                    let share = count as f64 / assessment.member_count.max(1) as f64;
                    if share >= cfg.adaptation_share {
                        match s.dominant_class {
                            Some(previous) if previous != class => {
                                s.dominant_class = Some(class);
                                tracing::info!(
                                    generation = generation,
                                    species = species.0,
                                    from = %previous,
                                    to = %class,
                                    "Major adaptation"
                                );
                                events.push(lineage_event(
                                    rng,
                                    sequence,
                                    generation,
                                    LineageEventKind::MajorAdaptation {
                                        from: previous,
                                        to: class,
                                    },
                                    vec![species],
                                    format!(
                                        "{} shifted from {previous} to {class} ({:.0}% of {} members)",
                                        s.name,
                                        share * 100.0,
                                        assessment.member_count
                                    ),
                                ));
                            }
                            None => s.dominant_class = Some(class),
                            _ => {}
                        }
                    }
                }
            }

            let streak = match &assessment.candidate {
                Some(c) if c.distance > cfg.threshold => {
                    match state.splits.iter_mut().find(|s| s.species == species) {
                        Some(entry) if entry.basis == c.basis => {
                            entry.streak += 1;
                            entry.streak
                        }
                        Some(entry) => {
                            entry.basis = c.basis;
                            entry.streak = 1;
                            1
                        }
                        None => {
                            state.splits.push(SplitStreak {
                                species,
                                basis: c.basis,
                                streak: 1,
                            });
                            1
                        }
                    }
                }
                _ => {
                    state.splits.retain(|s| s.species != species);
                    0
                }
            };

            let Some(candidate) = assessment.candidate else {
                continue;
            };
            if streak < cfg.persistence_window
                || candidate.compatibility >= cfg.min_viable_offspring_rate
            {
                continue;
            }

            let evidence = match candidate.basis {
                SplitBasis::Deme(deme) => ModeEvidence {
                    basis: candidate.basis,
                    group_size: candidate.group.len(),
                    colonized: state.flow.was_colonized(species, deme),
                    exchanges: state.flow.exchanges(species, deme, since),
                },
                SplitBasis::Cluster => ModeEvidence {
                    basis: candidate.basis,
                    group_size: candidate.group.len(),
                    colonized: false,
                    exchanges: 0,
                },
            };
            let mode = classify(&evidence, cfg);
            let child = registry.create_child(species, generation, mode);
            for id in &candidate.group {
                if let Some(organism) = population.get_mut(*id) {
                    organism.species = child;
                }
            }
            if let SplitBasis::Deme(deme) = candidate.basis {
                state.flow.reassign(species, child, deme);
            }
            state.splits.retain(|s| s.species != species);
            self.metrics.record_speciation();

            let parent_name = registry
                .get(species)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            let where_ = match candidate.basis {
                SplitBasis::Deme(deme) => format!("deme {deme}"),
                SplitBasis::Cluster => "a genetic cluster".to_string(),
            };
            tracing::info!(
                generation = generation,
                parent = species.0,
                child = child.0,
                mode = ?mode,
                distance = candidate.distance,
                "Speciation"
            );
            events.push(lineage_event(
                rng,
                sequence,
                generation,
                LineageEventKind::Speciation { mode },
                vec![species, child],
                format!(
                    "{} members in {where_} diverged from {parent_name} (distance {:.3} > {:.3} for {} generations, viable offspring rate {:.3})",
                    candidate.group.len(),
                    candidate.distance,
                    cfg.threshold,
                    streak,
                    candidate.compatibility
                ),
            ));
        }

        registry.rebuild_members(population);
        self.merge_converged(state, registry, population, generation, since, rng, sequence, &mut events);
        registry.rebuild_members(population);

        // Extinctions.
        let emptied: Vec<SpeciesId> = registry
            .extant()
            .filter(|s| s.members.is_empty())
            .map(|s| s.id)
            .collect();
        for species in emptied {
            registry.mark_extinct(species, generation);
            state.splits.retain(|s| s.species != species);
            state
                .merges
                .retain(|m| m.survivor != species && m.absorbed != species);
            self.metrics.record_extinction();
            let name = registry
                .get(species)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            tracing::info!(generation = generation, species = species.0, "Extinction");
            events.push(lineage_event(
                rng,
                sequence,
                generation,
                LineageEventKind::Extinction,
                vec![species],
                format!("{name} has no surviving members"),
            ));
        }

        state.flow.prune(since);
        state.hybrids.retain(|h| h.generation >= since);
        events
    }

    /// Hybridization merges between species sharing a deme.
    #[allow(clippy::too_many_arguments)]
    fn merge_converged(
        &self,
        state: &mut TrackerState,
        registry: &mut SpeciesRegistry,
        population: &mut Population,
        generation: u64,
        since: u64,
        rng: &mut ChaCha8Rng,
        sequence: &mut u64,
        events: &mut Vec<LineageEvent>,
    ) {
        let cfg = &self.config.speciation;
        let summaries: Vec<(SpeciesId, HashSet<u16>, GeneticCentroid)> = {
            let groups = group_by_species(population);
            groups
                .par_iter()
                .map(|(species, members)| {
                    (
                        *species,
                        members.iter().map(|o| o.deme).collect(),
                        centroid_of(members.iter().map(|o| &o.genome)),
                    )
                })
                .collect()
        };
        for (species, _, centroid) in &summaries {
            if let Some(s) = registry.get_mut(*species) {
                s.centroid = Some(centroid.clone());
            }
        }

        let mut absorbed_now: HashSet<SpeciesId> = HashSet::new();
        for i in 0..summaries.len() {
            for j in (i + 1)..summaries.len() {
                let (survivor, demes_a, centroid_a) = &summaries[i];
                let (absorbed, demes_b, centroid_b) = &summaries[j];
                if absorbed_now.contains(survivor) || absorbed_now.contains(absorbed) {
                    continue;
                }
                let distance = centroid_distance(centroid_a, centroid_b);
                let hybrids = state
                    .hybrids
                    .iter()
                    .filter(|h| h.generation >= since)
                    .filter(|h| h.first == *survivor && h.second == *absorbed)
                    .count();
                let converging = demes_a.intersection(demes_b).next().is_some()
                    && distance < cfg.merge_ratio * cfg.threshold
                    && hybrids > 0;

                if !converging {
                    state
                        .merges
                        .retain(|m| !(m.survivor == *survivor && m.absorbed == *absorbed));
                    continue;
                }
                let streak = match state
                    .merges
                    .iter_mut()
                    .find(|m| m.survivor == *survivor && m.absorbed == *absorbed)
                {
                    Some(entry) => {
                        entry.streak += 1;
                        entry.streak
                    }
                    None => {
                        state.merges.push(MergeStreak {
                            survivor: *survivor,
                            absorbed: *absorbed,
                            streak: 1,
                        });
                        1
                    }
                };
                if streak < cfg.persistence_window {
                    continue;
                }

                for organism in population.organisms.iter_mut() {
                    if organism.species == *absorbed {
                        organism.species = *survivor;
                    }
                }
                absorbed_now.insert(*absorbed);
                state
                    .merges
                    .retain(|m| m.survivor != *absorbed && m.absorbed != *absorbed);
                self.metrics.record_speciation();

                let name = |id: SpeciesId| {
                    registry
                        .get(id)
                        .map(|s| s.name.clone())
                        .unwrap_or_default()
                };
                tracing::info!(
                    generation = generation,
                    survivor = survivor.0,
                    absorbed = absorbed.0,
                    distance = distance,
                    "Hybridization merge"
                );
                events.push(lineage_event(
                    rng,
                    sequence,
                    generation,
                    LineageEventKind::Speciation {
                        mode: SpeciationMode::Hybrid,
                    },
                    vec![*survivor, *absorbed],
                    format!(
                        "{} absorbed into {} (distance {:.3} < {:.3} with {} hybrid births)",
                        name(*absorbed),
                        name(*survivor),
                        distance,
                        cfg.merge_ratio * cfg.threshold,
                        hybrids
                    ),
                ));
            }
        }
    }
}

/// Live members per species, ascending by species then organism id.
fn group_by_species(population: &Population) -> Vec<(SpeciesId, Vec<&Organism>)> {
    let mut groups: BTreeMap<SpeciesId, Vec<&Organism>> = BTreeMap::new();
    for organism in population.iter() {
        groups.entry(organism.species).or_default().push(organism);
    }
    groups.into_iter().collect()
}
