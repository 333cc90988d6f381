use crate::data::lineage::SpeciationMode;
use crate::data::organism::OrganismId;
use crate::data::phenotype::PhenotypeClass;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Run-unique species identity. The root species is `SpeciesId(0)`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(transparent)]
pub struct SpeciesId(pub u64);

impl SpeciesId {
    pub const ROOT: SpeciesId = SpeciesId(0);
}

impl std::fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SpeciesStatus {
    Extant,
    /// Terminal.
    Extinct { at: u64 },
}

/// Per-locus mean allele value over a set of genomes.
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
pub struct GeneticCentroid {
    /// Loci in ascending order.
    pub loci: Vec<u32>,
    /// Mean dosage per locus, parallel to `loci`.
    pub means: Vec<f64>,
    /// Mean locus importance, parallel to `loci`.
    pub importance: Vec<f64>,
    /// Genomes summarised.
    pub sample_size: usize,
}

impl GeneticCentroid {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sample_size == 0
    }

    /// Mean dosage at `locus`, if any sampled genome carries it.
    #[must_use]
    pub fn mean_at(&self, locus: u32) -> Option<f64> {
        self.loci
            .binary_search(&locus)
            .ok()
            .map(|i| self.means[i])
    }
}

/// Node of the phylogenetic tree. Never deleted.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Species {
    pub id: SpeciesId,
    pub name: String,
    /// `None` only for the root species.
    pub parent: Option<SpeciesId>,
    pub founded_at: u64,
    pub status: SpeciesStatus,
    /// Live members, ascending. Rebuilt from the population every step.
    pub members: Vec<OrganismId>,
    pub peak_members: usize,
    /// Centroid of the live members at the last tracker pass.
    pub centroid: Option<GeneticCentroid>,
    /// Most common phenotype class among members at the last tracker pass.
    pub dominant_class: Option<PhenotypeClass>,
    pub children: Vec<SpeciesId>,
    /// How the species arose; `None` for the root.
    pub origin: Option<SpeciationMode>,
}

impl Species {
    #[must_use]
    pub fn new(
        id: SpeciesId,
        name: String,
        parent: Option<SpeciesId>,
        founded_at: u64,
        origin: Option<SpeciationMode>,
    ) -> Self {
        Self {
            id,
            name,
            parent,
            founded_at,
            status: SpeciesStatus::Extant,
            members: Vec::new(),
            peak_members: 0,
            centroid: None,
            dominant_class: None,
            children: Vec::new(),
            origin,
        }
    }

    #[must_use]
    pub fn is_extinct(&self) -> bool {
        matches!(self.status, SpeciesStatus::Extinct { .. })
    }

    #[must_use]
    pub fn extinct_at(&self) -> Option<u64> {
        match self.status {
            SpeciesStatus::Extinct { at } => Some(at),
            SpeciesStatus::Extant => None,
        }
    }

    #[must_use]
    pub fn contains(&self, id: OrganismId) -> bool {
        self.members.binary_search(&id).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_lookup() {
        let c = GeneticCentroid {
            loci: vec![1, 4, 9],
            means: vec![0.1, 0.4, 0.9],
            importance: vec![1.0; 3],
            sample_size: 3,
        };
        assert_eq!(c.mean_at(4), Some(0.4));
        assert_eq!(c.mean_at(5), None);
    }

    #[test]
    fn test_species_membership() {
        let mut s = Species::new(SpeciesId(2), "Test".into(), Some(SpeciesId::ROOT), 3, None);
        s.members = vec![OrganismId(1), OrganismId(5)];
        assert!(s.contains(OrganismId(5)));
        assert!(!s.contains(OrganismId(2)));
        assert!(!s.is_extinct());
        s.status = SpeciesStatus::Extinct { at: 10 };
        assert_eq!(s.extinct_at(), Some(10));
    }
}
