//! Serialization helpers for JSON and HexDNA.

use crate::error::{IoError, Result};
use bioevolve_data::Genome;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializes data to JSON.
pub fn to_json<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

/// Serializes data to pretty-printed JSON.
pub fn to_json_pretty<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

/// Deserializes data from a JSON string. Empty input is rejected.
pub fn from_json<T>(json: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if json.trim().is_empty() {
        return Err(IoError::validation("Empty JSON string"));
    }

    serde_json::from_str(json)
        .map_err(|e| IoError::serialization(format!("JSON deserialization failed: {}", e)))
}

/// Serializes data to HexDNA (Base16-encoded JSON).
///
/// This is the exchange format for genomes.
pub fn to_hex_dna<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    let json = to_json(data)?;
    Ok(hex::encode(json.as_bytes()))
}

/// Deserializes data from HexDNA.
pub fn from_hex_dna<T>(hex_str: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if hex_str.trim().is_empty() {
        return Err(IoError::validation("Empty hex string"));
    }

    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| IoError::validation(format!("Invalid hex encoding: {}", e)))?;

    let json = String::from_utf8(bytes)
        .map_err(|e| IoError::validation(format!("Invalid UTF-8 in hex: {}", e)))?;

    from_json(&json)
}

/// Exports a genome as HexDNA.
pub fn export_genome(genome: &Genome) -> Result<String> {
    to_hex_dna(genome)
}

/// Imports a HexDNA genome and checks its allele layout against its ploidy.
pub fn import_genome(hex_str: &str) -> Result<Genome> {
    let genome: Genome = from_hex_dna(hex_str)?;
    let copies = genome.ploidy.copies();
    if let Some(gene) = genome.genes().find(|g| g.alleles.len() != copies) {
        return Err(IoError::validation(format!(
            "locus {} carries {} alleles for {:?} genome",
            gene.locus,
            gene.alleles.len(),
            genome.ploidy
        )));
    }
    Ok(genome)
}

/// Writes pretty JSON to a file.
pub fn write_json_file<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json = to_json_pretty(data)?;
    std::fs::write(&path, json).map_err(|e| {
        IoError::FileSystem(e).during(format!("writing JSON to {:?}", path.as_ref()))
    })?;
    Ok(())
}

/// Reads JSON from a file.
pub fn read_json_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let json = std::fs::read_to_string(&path).map_err(|e| {
        IoError::FileSystem(e).during(format!("reading JSON from {:?}", path.as_ref()))
    })?;
    from_json(&json)
}
