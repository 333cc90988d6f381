use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::speciation::ancestry::AncestryLedger;
use crate::speciation::registry::SpeciesRegistry;
use crate::speciation::TrackerState;
use bioevolve_data::{LineageEvent, Population};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Exact position of the run generator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct RngState {
    pub seed: [u8; 32],
    pub stream: u64,
    pub word_pos: u128,
}

impl RngState {
    #[must_use]
    pub fn capture(rng: &ChaCha8Rng) -> Self {
        Self {
            seed: rng.get_seed(),
            stream: rng.get_stream(),
            word_pos: rng.get_word_pos(),
        }
    }

    #[must_use]
    pub fn restore(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::from_seed(self.seed);
        rng.set_stream(self.stream);
        rng.set_word_pos(self.word_pos);
        rng
    }
}

/// Everything needed to resume a run between generations.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct EngineState {
    /// Last completed generation.
    pub generation: u64,
    pub next_organism_id: u64,
    pub next_event_sequence: u64,
    pub rng: RngState,
    pub population: Population,
    pub registry: SpeciesRegistry,
    pub ancestry: AncestryLedger,
    pub tracker: TrackerState,
    pub events: Vec<LineageEvent>,
    /// Whether the run ended in total extinction.
    pub extinct: bool,
    pub config_fingerprint: String,
}

impl EngineState {
    /// Confirms the state was produced under `config`.
    pub fn verify(&self, config: &EngineConfig) -> Result<()> {
        let expected = config.fingerprint();
        if self.config_fingerprint != expected {
            return Err(EngineError::CheckpointMismatch {
                expected,
                found: self.config_fingerprint.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_rng_state_resumes_exactly() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..13 {
            rng.gen::<u64>();
        }
        let state = RngState::capture(&rng);
        let mut resumed = state.restore();
        let a: Vec<u32> = (0..32).map(|_| rng.gen()).collect();
        let b: Vec<u32> = (0..32).map(|_| resumed.gen()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_mismatch_rejected() {
        let config = EngineConfig::default();
        let mut state = EngineState {
            generation: 0,
            next_organism_id: 0,
            next_event_sequence: 0,
            rng: RngState::capture(&ChaCha8Rng::seed_from_u64(1)),
            population: Population::default(),
            registry: SpeciesRegistry::with_root(0),
            ancestry: AncestryLedger::default(),
            tracker: TrackerState::default(),
            events: Vec::new(),
            extinct: false,
            config_fingerprint: config.fingerprint(),
        };
        assert!(state.verify(&config).is_ok());

        state.config_fingerprint = "stale".to_string();
        assert!(matches!(
            state.verify(&config),
            Err(EngineError::CheckpointMismatch { .. })
        ));
    }
}
