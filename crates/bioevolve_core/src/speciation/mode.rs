use crate::config::SpeciationConfig;
use bioevolve_data::SpeciationMode;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// How a candidate split partitions a species.
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
#[serde(tag = "basis", content = "deme", rename_all = "snake_case")]
pub enum SplitBasis {
    /// Members living in one deme against the rest of the species.
    Deme(u16),
    /// Genetic clusters within shared ground.
    Cluster,
}

/// Geographic evidence gathered for a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeEvidence {
    pub basis: SplitBasis,
    pub group_size: usize,
    /// The group's deme was first reached by migrant founders.
    pub colonized: bool,
    /// Migrant births across the group's deme boundary within the persistence window.
    pub exchanges: usize,
}

/// Speciation mode implied by the evidence.
///
/// - cluster split: sympatric
/// - small group in a migrant-founded deme: peripatric
/// - gene flow across the boundary during the window: parapatric
/// - otherwise: allopatric
#[must_use]
pub fn classify(evidence: &ModeEvidence, config: &SpeciationConfig) -> SpeciationMode {
    match evidence.basis {
        SplitBasis::Cluster => SpeciationMode::Sympatric,
        SplitBasis::Deme(_) => {
            if evidence.colonized && evidence.group_size <= config.peripatric_max_founders {
                SpeciationMode::Peripatric
            } else if evidence.exchanges > 0 {
                SpeciationMode::Parapatric
            } else {
                SpeciationMode::Allopatric
            }
        }
    }
}
