use crate::data::genome::Genome;
use crate::data::phenotype::Phenotype;
use crate::data::species::SpeciesId;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Run-unique organism identity, assigned in birth order.
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
pub struct OrganismId(pub u64);

impl std::fmt::Display for OrganismId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two parents of a sexually produced organism.
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
pub struct Parentage {
    pub mother: OrganismId,
    pub father: OrganismId,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Organism {
    pub id: OrganismId,
    pub genome: Genome,
    pub phenotype: Phenotype,
    /// Fitness from the most recent evaluation.
    pub fitness: f64,
    /// Generations survived.
    pub age: u32,
    /// Generational depth: 0 for founders, `max(parents) + 1` otherwise.
    pub generation: u64,
    /// Engine generation counter at birth.
    pub born_at: u64,
    /// Sub-population the organism lives in.
    pub deme: u16,
    /// Non-owning species reference.
    pub species: SpeciesId,
    /// `None` for founders.
    pub parents: Option<Parentage>,
    /// Parents belonged to different species.
    pub hybrid: bool,
    /// Born outside its parents' deme.
    pub migrant: bool,
}

impl Organism {
    /// Founder organism with no parents.
    #[must_use]
    pub fn founder(id: OrganismId, genome: Genome, deme: u16, species: SpeciesId) -> Self {
        Self {
            id,
            genome,
            phenotype: Phenotype::default(),
            fitness: 0.0,
            age: 0,
            generation: 0,
            born_at: 0,
            deme,
            species,
            parents: None,
            hybrid: false,
            migrant: false,
        }
    }

    #[must_use]
    pub fn is_founder(&self) -> bool {
        self.parents.is_none()
    }
}
