//! # BioEvolve IO
//!
//! Persistence layer for the evolutionary engine:
//! - Structured error handling with [`IoError`]
//! - Checkpoint files (gzip JSON with checksum, or rkyv archives)
//! - Append-only JSONL lineage event log
//! - JSON and HexDNA helpers for genome exchange

/// Checkpoint save/load in both formats
pub mod checkpoint;
/// Error types and result aliases for I/O operations
pub mod error;
/// JSONL lineage event stream
pub mod event_log;
/// Validated rkyv archives
pub mod persistence;
/// JSON and HexDNA helpers
pub mod serialization;

pub use checkpoint::{load_checkpoint, save_checkpoint};
pub use error::{IoError, Result};
pub use event_log::{read_events, EventLog, LoggedEvent};
pub use serialization::{
    export_genome, from_hex_dna, from_json, import_genome, read_json_file, to_hex_dna, to_json,
    to_json_pretty, write_json_file,
};
