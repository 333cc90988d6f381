//! Checkpoint files.
//!
//! Two formats, picked by extension:
//! - `*.rkyv`: validated rkyv archive of the engine state
//! - anything else: gzip-compressed JSON envelope whose payload carries a
//!   SHA-256 checksum and the configuration fingerprint
//!
//! Files are written to a sibling temporary path and renamed into place, so a
//! reader never observes a half-written checkpoint.

use crate::error::{IoError, Result};
use crate::persistence::{from_rkyv_bytes, to_rkyv_bytes};
use bioevolve_core::EngineState;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointEnvelope {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub generation: u64,
    pub config_fingerprint: String,
    /// SHA-256 of `payload`, hex-encoded.
    pub checksum: String,
    /// The engine state as JSON.
    pub payload: String,
}

fn checksum(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Gzip-compressed JSON envelope bytes for `state`.
pub fn encode_checkpoint(state: &EngineState) -> Result<Vec<u8>> {
    let payload = serde_json::to_string(state)?;
    let envelope = CheckpointEnvelope {
        format_version: FORMAT_VERSION,
        created_at: Utc::now(),
        generation: state.generation,
        config_fingerprint: state.config_fingerprint.clone(),
        checksum: checksum(&payload),
        payload,
    };
    let json = serde_json::to_vec(&envelope)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| IoError::compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| IoError::compression(e.to_string()))
}

/// Reads an envelope back and verifies version, checksum and header consistency.
pub fn decode_checkpoint(bytes: &[u8]) -> Result<EngineState> {
    let mut decoder = GzDecoder::new(bytes);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| IoError::compression(e.to_string()))?;
    let envelope: CheckpointEnvelope = serde_json::from_slice(&json)?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(IoError::validation(format!(
            "unsupported checkpoint format version {}",
            envelope.format_version
        )));
    }
    let found = checksum(&envelope.payload);
    if found != envelope.checksum {
        return Err(IoError::Checksum {
            expected: envelope.checksum,
            found,
        });
    }
    let state: EngineState = serde_json::from_str(&envelope.payload)?;
    if state.generation != envelope.generation
        || state.config_fingerprint != envelope.config_fingerprint
    {
        return Err(IoError::validation(
            "checkpoint header disagrees with its payload",
        ));
    }
    Ok(state)
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "rkyv")
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes a checkpoint, replacing any previous file at `path`.
pub fn save_checkpoint<P: AsRef<Path>>(state: &EngineState, path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = if is_binary(path) {
        to_rkyv_bytes(state)?
    } else {
        encode_checkpoint(state)?
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temporary_sibling(path);
    std::fs::write(&tmp, &bytes)
        .map_err(|e| IoError::FileSystem(e).during(format!("writing {:?}", tmp)))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| IoError::FileSystem(e).during(format!("replacing {:?}", path)))?;
    tracing::info!(
        generation = state.generation,
        path = %path.display(),
        bytes = bytes.len(),
        "Checkpoint saved"
    );
    Ok(())
}

pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<EngineState> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IoError::not_found(format!("{:?}", path)),
        _ => IoError::FileSystem(e),
    })?;
    let state = if is_binary(path) {
        from_rkyv_bytes(&bytes)
    } else {
        decode_checkpoint(&bytes)
    }
    .map_err(|e| e.during(format!("loading checkpoint {:?}", path)))?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioevolve_core::config::EngineConfig;
    use bioevolve_core::PopulationManager;

    fn state() -> EngineState {
        let mut config = EngineConfig::default();
        config.population.initial_size = 12;
        config.genome.chromosomes = 2;
        config.genome.genes_per_chromosome = 3;
        PopulationManager::new(config).unwrap().checkpoint()
    }

    #[test]
    fn test_envelope_roundtrip() {
        let original = state();
        let bytes = encode_checkpoint(&original).unwrap();
        assert_eq!(decode_checkpoint(&bytes).unwrap(), original);
    }

    #[test]
    fn test_tampered_payload_fails_checksum() {
        let original = state();
        let mut envelope = CheckpointEnvelope {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            generation: original.generation,
            config_fingerprint: original.config_fingerprint.clone(),
            checksum: String::new(),
            payload: serde_json::to_string(&original).unwrap(),
        };
        envelope.checksum = checksum(&envelope.payload);
        envelope.payload = envelope.payload.replace("\"extinct\":false", "\"extinct\":true");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&serde_json::to_vec(&envelope).unwrap())
            .unwrap();
        let bytes = encoder.finish().unwrap();
        assert!(matches!(
            decode_checkpoint(&bytes),
            Err(IoError::Checksum { .. })
        ));
    }

    #[test]
    fn test_files_in_both_formats() {
        let original = state();
        let dir = std::env::temp_dir().join(format!("bioevolve_ckpt_{}", std::process::id()));
        for name in ["run.ckpt.gz", "run.rkyv"] {
            let path = dir.join(name);
            save_checkpoint(&original, &path).unwrap();
            assert!(!temporary_sibling(&path).exists());
            assert_eq!(load_checkpoint(&path).unwrap(), original);
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_not_gzip_is_compression_error() {
        assert!(matches!(
            decode_checkpoint(b"plain text"),
            Err(IoError::Compression(_))
        ));
    }
}
