//! Core data structures for the BioEvolve simulation.

pub mod environment;
pub mod genome;
pub mod lineage;
pub mod organism;
pub mod phenotype;
pub mod population;
pub mod species;
