//! Error types for the evolutionary engine.
//!
//! Every variant carries enough identity (organism, species, generation) to
//! locate the failing state in a checkpoint.

use bioevolve_data::{OrganismId, Ploidy, SpeciesId};
use thiserror::Error;

/// Why two genomes cannot be recombined.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Incompatibility {
    #[error("ploidy mismatch ({mother:?} vs {father:?})")]
    Ploidy { mother: Ploidy, father: Ploidy },

    #[error("chromosome count mismatch ({mother} vs {father})")]
    ChromosomeCount { mother: usize, father: usize },

    #[error("chromosome {chromosome}: gene layout differs at position {position}")]
    Layout { chromosome: usize, position: usize },
}

/// Structural or regulatory defect found while validating a genome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenomeDefect {
    #[error("regulatory graph has a cycle through locus {locus}")]
    Cycle { locus: u32 },

    #[error("locus {locus} carries {found} alleles, ploidy requires {expected}")]
    AlleleCount {
        locus: u32,
        expected: usize,
        found: usize,
    },

    #[error("locus {locus} appears more than once")]
    DuplicateLocus { locus: u32 },

    #[error("locus {locus} references missing locus {target}")]
    DanglingReference { locus: u32, target: u32 },

    #[error("locus {locus} has an invalid value: {reason}")]
    InvalidValue { locus: u32, reason: String },
}

impl GenomeDefect {
    /// Attaches organism context, mapping cycles to
    /// [`EngineError::InvalidRegulatoryGraph`] and the rest to
    /// [`EngineError::MalformedGenome`].
    #[must_use]
    pub fn at(self, organism: Option<OrganismId>, generation: u64) -> EngineError {
        match self {
            GenomeDefect::Cycle { locus } => EngineError::InvalidRegulatoryGraph {
                organism,
                generation,
                cycle_locus: locus,
            },
            other => EngineError::MalformedGenome {
                organism,
                generation,
                reason: other.to_string(),
            },
        }
    }
}

/// Main error type for engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Ploidy or structure mismatch at mating. Recovered locally.
    #[error("incompatible genomes at generation {generation} ({mother} x {father}): {reason}")]
    IncompatibleGenome {
        generation: u64,
        mother: OrganismId,
        father: OrganismId,
        #[source]
        reason: Incompatibility,
    },

    /// Cyclic epistasis. The genome never enters the population.
    #[error(
        "invalid regulatory graph at generation {generation} (organism {organism:?}): cycle through locus {cycle_locus}"
    )]
    InvalidRegulatoryGraph {
        organism: Option<OrganismId>,
        generation: u64,
        cycle_locus: u32,
    },

    #[error("malformed genome at generation {generation} (organism {organism:?}): {reason}")]
    MalformedGenome {
        organism: Option<OrganismId>,
        generation: u64,
        reason: String,
    },

    /// Whole-run extinction. Terminal.
    #[error("population went extinct at generation {generation}")]
    EmptyPopulation { generation: u64 },

    /// Fitness evaluator returned a negative or non-finite value.
    #[error(
        "fitness evaluator returned {value} for organism {organism} ({species}) at generation {generation}"
    )]
    EvaluatorContract {
        organism: OrganismId,
        species: SpeciesId,
        generation: u64,
        value: f64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Checkpoint does not belong to the active configuration.
    #[error("checkpoint fingerprint {found} does not match configuration {expected}")]
    CheckpointMismatch { expected: String, found: String },
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::InvalidConfig(format!("{err:#}"))
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_maps_to_regulatory_error() {
        let err = GenomeDefect::Cycle { locus: 4 }.at(None, 7);
        assert!(matches!(
            err,
            EngineError::InvalidRegulatoryGraph {
                cycle_locus: 4,
                generation: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_other_defects_map_to_malformed() {
        let err = GenomeDefect::DuplicateLocus { locus: 2 }.at(Some(OrganismId(9)), 1);
        match err {
            EngineError::MalformedGenome { reason, organism, .. } => {
                assert!(reason.contains("locus 2"));
                assert_eq!(organism, Some(OrganismId(9)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_display_carries_context() {
        let err = EngineError::IncompatibleGenome {
            generation: 3,
            mother: OrganismId(1),
            father: OrganismId(2),
            reason: Incompatibility::Ploidy {
                mother: Ploidy::Haploid,
                father: Ploidy::Diploid,
            },
        };
        let text = err.to_string();
        assert!(text.contains("generation 3"));
        assert!(text.contains("#1"));
        assert!(text.contains("ploidy"));
    }
}
