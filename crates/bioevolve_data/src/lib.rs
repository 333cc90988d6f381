//! Core data structures for the BioEvolve engine.
//!
//! Everything in this crate is plain data: genomes, phenotypes, organisms,
//! species records and the lineage event stream. Behaviour lives in
//! `bioevolve_core`, which implements logic traits over these types.

pub mod data;

pub use data::environment::{Conditions, EnvFactor, EnvironmentSnapshot};
pub use data::genome::{
    Allele, AlleleValue, Chromosome, DevelopmentalAxis, EnvSensitivity, EpistasisLink, Gene,
    GeneRole, Genome, Ploidy, TraitEffect,
};
pub use data::lineage::{LineageEvent, LineageEventKind, SpeciationMode};
pub use data::organism::{Organism, OrganismId, Parentage};
pub use data::phenotype::{BodyPlan, NeuralTier, Phenotype, PhenotypeClass, Trait};
pub use data::population::Population;
pub use data::species::{GeneticCentroid, Species, SpeciesId, SpeciesStatus};
