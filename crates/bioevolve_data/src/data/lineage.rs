use crate::data::phenotype::PhenotypeClass;
use crate::data::species::SpeciesId;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a lineage split (or re-joined).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(rename_all = "snake_case")]
pub enum SpeciationMode {
    /// Geographically disjoint groups diverged independently.
    Allopatric,
    /// Divergence without geographic separation.
    Sympatric,
    /// Divergence despite ongoing gene flow between the groups.
    Parapatric,
    /// A small migrant founder group diverged.
    Peripatric,
    /// Two species converged through cross-mating and merged.
    Hybrid,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineageEventKind {
    Speciation { mode: SpeciationMode },
    Extinction,
    MajorAdaptation {
        from: PhenotypeClass,
        to: PhenotypeClass,
    },
}

/// Immutable, self-contained record in the lineage event stream.
///
/// `species` ordering by kind:
/// - speciation: `[parent, child]`; hybrid merge: `[survivor, absorbed]`
/// - extinction: `[extinct]`
/// - major adaptation: `[species]`
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct LineageEvent {
    pub id: Uuid,
    /// Position in the run's event log.
    pub sequence: u64,
    pub generation: u64,
    #[serde(flatten)]
    pub kind: LineageEventKind,
    pub species: Vec<SpeciesId>,
    pub cause: String,
}

impl LineageEvent {
    #[must_use]
    pub fn is_speciation(&self) -> bool {
        matches!(self.kind, LineageEventKind::Speciation { .. })
    }

    #[must_use]
    pub fn mode(&self) -> Option<SpeciationMode> {
        match self.kind {
            LineageEventKind::Speciation { mode } => Some(mode),
            _ => None,
        }
    }
}
