use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Environmental field a gene can be sensitive to.
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
pub enum EnvFactor {
    Temperature,
    ResourceDensity,
    PredationPressure,
    Toxicity,
}

impl EnvFactor {
    pub const ALL: [EnvFactor; 4] = [
        EnvFactor::Temperature,
        EnvFactor::ResourceDensity,
        EnvFactor::PredationPressure,
        EnvFactor::Toxicity,
    ];
}

/// Numeric conditions in one place, each nominally in [0, 1].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(default)]
pub struct Conditions {
    pub temperature: f64,
    pub resource_density: f64,
    pub predation_pressure: f64,
    pub toxicity: f64,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            resource_density: 0.5,
            predation_pressure: 0.0,
            toxicity: 0.0,
        }
    }
}

impl Conditions {
    #[must_use]
    pub fn get(&self, factor: EnvFactor) -> f64 {
        match factor {
            EnvFactor::Temperature => self.temperature,
            EnvFactor::ResourceDensity => self.resource_density,
            EnvFactor::PredationPressure => self.predation_pressure,
            EnvFactor::Toxicity => self.toxicity,
        }
    }
}

/// Environment supplied by the host for one generation. Frozen for the whole step.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct EnvironmentSnapshot {
    /// Conditions used by demes without an override.
    pub global: Conditions,
    /// Per-deme overrides, indexed by deme.
    #[serde(default)]
    pub demes: Vec<Conditions>,
}

impl EnvironmentSnapshot {
    /// Same conditions everywhere.
    #[must_use]
    pub fn uniform(conditions: Conditions) -> Self {
        Self {
            global: conditions,
            demes: Vec::new(),
        }
    }

    /// Conditions in force for `deme`.
    #[must_use]
    pub fn for_deme(&self, deme: u16) -> &Conditions {
        self.demes.get(usize::from(deme)).unwrap_or(&self.global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deme_override_falls_back_to_global() {
        let hot = Conditions {
            temperature: 0.9,
            ..Default::default()
        };
        let env = EnvironmentSnapshot {
            global: Conditions::default(),
            demes: vec![hot],
        };
        assert_eq!(env.for_deme(0).temperature, 0.9);
        assert_eq!(env.for_deme(3).temperature, 0.5);
        assert_eq!(env.for_deme(0).get(EnvFactor::Temperature), 0.9);
    }
}
