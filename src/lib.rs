//! BioEvolve: an evolutionary engine with speciation tracking.
//!
//! This crate bundles the workspace members behind one library and hosts the
//! batch runner used by the `bioevolve` binary.

pub mod runner;

pub use bioevolve_core as engine;
pub use bioevolve_data as data;
pub use bioevolve_io as io;
