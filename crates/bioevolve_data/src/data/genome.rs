use crate::data::environment::EnvFactor;
use crate::data::phenotype::Trait;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Number of allele copies carried at every locus.
///
/// Fixed for the whole run at population creation.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[serde(rename_all = "lowercase")]
pub enum Ploidy {
    /// One allele per locus.
    #[default]
    Haploid,
    /// Two homologous alleles per locus.
    Diploid,
}

impl Ploidy {
    /// Allele copies per gene.
    #[must_use]
    pub const fn copies(self) -> usize {
        match self {
            Ploidy::Haploid => 1,
            Ploidy::Diploid => 2,
        }
    }
}

/// Effect value carried by an allele.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub enum AlleleValue {
    /// Quantitative effect, perturbed by mutation.
    Continuous(f64),
    /// Discrete variant drawn from `0..domain`.
    Categorical { index: u16, domain: u16 },
}

impl AlleleValue {
    /// Bit pattern identifying the value, used for allele ids.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        match *self {
            AlleleValue::Continuous(v) => v.to_bits(),
            AlleleValue::Categorical { index, domain } => {
                (u64::from(domain) << 16) | u64::from(index)
            }
        }
    }

    /// Value mapped onto a common scale: continuous values are used as-is,
    /// categorical values become `index / (domain - 1)`.
    #[must_use]
    pub fn normalized(&self) -> f64 {
        match *self {
            AlleleValue::Continuous(v) => v,
            AlleleValue::Categorical { index, domain } => {
                if domain <= 1 {
                    0.0
                } else {
                    f64::from(index) / f64::from(domain - 1)
                }
            }
        }
    }
}

/// A variant at a locus. Never edited after creation; mutation produces a new allele.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Allele {
    /// Content-derived identifier.
    pub id: u64,
    /// Effect value.
    pub value: AlleleValue,
}

impl Allele {
    /// Creates an allele with the given id.
    #[must_use]
    pub const fn new(id: u64, value: AlleleValue) -> Self {
        Self { id, value }
    }

    /// Derives a descendant allele carrying `value`. The id is a hash of the
    /// ancestor id and the new value, so identical mutations on identical
    /// ancestors collapse onto the same identifier.
    #[must_use]
    pub fn derive(&self, value: AlleleValue) -> Self {
        Self {
            id: allele_hash(self.id, value.fingerprint()),
            value,
        }
    }
}

/// FNV-1a over two words.
#[must_use]
pub fn allele_hash(a: u64, b: u64) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for byte in a.to_le_bytes().into_iter().chain(b.to_le_bytes()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3_u64);
    }
    hash
}

/// Developmental switch family an architect gene belongs to.
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
pub enum DevelopmentalAxis {
    /// Cell adhesion / differentiation programme.
    Multicellularity,
    /// Nervous system organisation.
    Neural,
}

/// Regulatory role of a gene.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub enum GeneRole {
    /// Writes into trait slots; may be gated by architect genes.
    Structural,
    /// Transcription-factor style gene feeding epistasis links.
    Regulatory,
    /// Developmental switch: open when its activation reaches `threshold`,
    /// and gated loci are only expressed while every gate on them is open.
    Architect {
        threshold: f64,
        gates: Vec<u32>,
        axis: Option<DevelopmentalAxis>,
    },
}

/// Contribution of a gene to one trait slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct TraitEffect {
    /// Trait written by the gene.
    pub target: Trait,
    /// Multiplier on the gene's activation.
    pub weight: f64,
}

/// Directed epistasis edge: the activation of `source` modulates this gene.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct EpistasisLink {
    /// Locus of the modulating gene.
    pub source: u32,
    /// Signed modulation strength.
    pub strength: f64,
}

/// Environmental sensitivity of a gene's activation.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct EnvSensitivity {
    /// Environmental factor read from the snapshot.
    pub factor: EnvFactor,
    /// Shift in activation per unit of the factor.
    pub weight: f64,
}

/// A locus: its alleles plus the regulatory wiring that decides how they are expressed.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Gene {
    /// Locus identifier, unique within a genome and shared across the population.
    pub locus: u32,
    /// Regulatory role.
    pub role: GeneRole,
    /// One allele per homologous copy.
    pub alleles: Vec<Allele>,
    /// Trait slots written by this gene. More than one makes the gene pleiotropic.
    pub effects: Vec<TraitEffect>,
    /// Incoming epistasis links.
    pub epistasis: Vec<EpistasisLink>,
    /// Environmental inputs.
    pub sensitivities: Vec<EnvSensitivity>,
    /// Weight of this locus in genetic distance.
    pub importance: f64,
}

impl Gene {
    /// Mean normalized allele value across homologous copies.
    #[must_use]
    pub fn dosage(&self) -> f64 {
        if self.alleles.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.alleles.iter().map(|a| a.value.normalized()).sum();
        sum / self.alleles.len() as f64
    }

    #[must_use]
    pub fn is_pleiotropic(&self) -> bool {
        self.effects.len() > 1
    }

    #[must_use]
    pub fn is_architect(&self) -> bool {
        matches!(self.role, GeneRole::Architect { .. })
    }
}

/// Ordered run of genes inherited as a unit between crossover points.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Chromosome {
    pub genes: Vec<Gene>,
}

/// Complete genetic blueprint of an organism.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Genome {
    /// Allele copies per locus.
    pub ploidy: Ploidy,
    /// Chromosomes in order.
    pub chromosomes: Vec<Chromosome>,
}

impl Genome {
    /// All genes in chromosome order.
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.chromosomes.iter().flat_map(|c| c.genes.iter())
    }

    /// Mutable access to all genes in chromosome order.
    pub fn genes_mut(&mut self) -> impl Iterator<Item = &mut Gene> {
        self.chromosomes.iter_mut().flat_map(|c| c.genes.iter_mut())
    }

    #[must_use]
    pub fn gene_count(&self) -> usize {
        self.chromosomes.iter().map(|c| c.genes.len()).sum()
    }

    /// Looks up a gene by locus.
    #[must_use]
    pub fn gene(&self, locus: u32) -> Option<&Gene> {
        self.genes().find(|g| g.locus == locus)
    }

    /// Serialize genome to hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(bytes)
    }

    /// Deserialize genome from hex string.
    pub fn from_hex(hex_str: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(hex_str)?;
        let genome = serde_json::from_slice(&bytes)?;
        Ok(genome)
    }
}
