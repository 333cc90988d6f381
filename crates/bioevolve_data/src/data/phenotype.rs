use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Named phenotype trait slot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Size,
    Speed,
    Metabolism,
    ThermalTolerance,
    Longevity,
    Fecundity,
    Sociality,
    Cognition,
}

impl Trait {
    /// Every trait, in slot order.
    pub const ALL: [Trait; 8] = [
        Trait::Size,
        Trait::Speed,
        Trait::Metabolism,
        Trait::ThermalTolerance,
        Trait::Longevity,
        Trait::Fecundity,
        Trait::Sociality,
        Trait::Cognition,
    ];

    /// Number of trait slots in a phenotype vector.
    pub const COUNT: usize = Self::ALL.len();

    /// Slot index in a phenotype vector.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Trait::Size => "size",
            Trait::Speed => "speed",
            Trait::Metabolism => "metabolism",
            Trait::ThermalTolerance => "thermal_tolerance",
            Trait::Longevity => "longevity",
            Trait::Fecundity => "fecundity",
            Trait::Sociality => "sociality",
            Trait::Cognition => "cognition",
        }
    }
}

/// Organisation of the body, from open multicellularity switches.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(rename_all = "snake_case")]
pub enum BodyPlan {
    #[default]
    Unicellular,
    Colonial,
    Multicellular,
    Complex,
}

impl BodyPlan {
    pub const ALL: [BodyPlan; 4] = [
        BodyPlan::Unicellular,
        BodyPlan::Colonial,
        BodyPlan::Multicellular,
        BodyPlan::Complex,
    ];

    /// Plan reached with `open` switches on the multicellularity axis.
    #[must_use]
    pub fn from_switches(open: usize) -> Self {
        match open {
            0 => BodyPlan::Unicellular,
            1 => BodyPlan::Colonial,
            2 => BodyPlan::Multicellular,
            _ => BodyPlan::Complex,
        }
    }
}

/// Nervous system organisation, from open neural switches.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(rename_all = "snake_case")]
pub enum NeuralTier {
    #[default]
    None,
    NerveNet,
    Ganglia,
    Centralized,
    Cortex,
}

impl NeuralTier {
    #[must_use]
    pub fn from_switches(open: usize) -> Self {
        match open {
            0 => NeuralTier::None,
            1 => NeuralTier::NerveNet,
            2 => NeuralTier::Ganglia,
            3 => NeuralTier::Centralized,
            _ => NeuralTier::Cortex,
        }
    }
}

/// Closed phenotype class decided by developmental switches.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct PhenotypeClass {
    pub body_plan: BodyPlan,
    pub neural_tier: NeuralTier,
}

impl std::fmt::Display for PhenotypeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}/{:?}", self.body_plan, self.neural_tier)
    }
}

/// Observable trait values plus the developmental class.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Phenotype {
    /// One value per [`Trait`], indexed by [`Trait::index`]. Each lies in (0, 1).
    pub values: Vec<f64>,
    pub class: PhenotypeClass,
}

impl Default for Phenotype {
    fn default() -> Self {
        Self {
            values: vec![0.5; Trait::COUNT],
            class: PhenotypeClass::default(),
        }
    }
}

impl Phenotype {
    #[must_use]
    pub fn get(&self, t: Trait) -> f64 {
        self.values.get(t.index()).copied().unwrap_or(0.0)
    }

    /// `(trait, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Trait, f64)> + '_ {
        Trait::ALL.iter().map(move |&t| (t, self.get(t)))
    }

    /// Trait-name to value mapping.
    #[must_use]
    pub fn to_map(&self) -> std::collections::BTreeMap<&'static str, f64> {
        self.iter().map(|(t, v)| (t.name(), v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_indices_are_dense() {
        for (i, t) in Trait::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_switch_classes_saturate() {
        assert_eq!(BodyPlan::from_switches(0), BodyPlan::Unicellular);
        assert_eq!(BodyPlan::from_switches(9), BodyPlan::Complex);
        assert_eq!(NeuralTier::from_switches(4), NeuralTier::Cortex);
        assert_eq!(NeuralTier::from_switches(2), NeuralTier::Ganglia);
    }

    #[test]
    fn test_phenotype_map() {
        let mut p = Phenotype::default();
        p.values[Trait::Speed.index()] = 0.9;
        let map = p.to_map();
        assert_eq!(map.len(), Trait::COUNT);
        assert_eq!(map["speed"], 0.9);
    }
}
