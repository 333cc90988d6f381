use bioevolve_data::SpeciesId;
use rand::Rng;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Birth deme for one offspring: with probability `rate` a uniformly chosen
/// deme other than the parents' one. Returns `(deme, migrated)`.
pub fn birth_deme<R: Rng + ?Sized>(
    rng: &mut R,
    parent_deme: u16,
    demes: u16,
    rate: f64,
) -> (u16, bool) {
    if demes < 2 || rate <= 0.0 || !rng.gen_bool(rate) {
        return (parent_deme, false);
    }
    let mut target = rng.gen_range(0..demes - 1);
    if target >= parent_deme {
        target += 1;
    }
    (target, true)
}

/// One migrant birth.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct FlowRecord {
    pub generation: u64,
    pub from: u16,
    pub to: u16,
    pub species: SpeciesId,
}

/// A deme first reached by a species through a migrant birth.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Colony {
    pub species: SpeciesId,
    pub deme: u16,
}

/// Recent gene flow between demes, plus which demes each species first reached by migration.
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
pub struct GeneFlow {
    pub records: Vec<FlowRecord>,
    /// Demes colonised by a migrant founder, sorted.
    pub colonized: Vec<Colony>,
}

impl GeneFlow {
    pub fn record(&mut self, record: FlowRecord) {
        self.records.push(record);
    }

    pub fn mark_colonized(&mut self, species: SpeciesId, deme: u16) {
        let colony = Colony { species, deme };
        if let Err(pos) = self.colonized.binary_search(&colony) {
            self.colonized.insert(pos, colony);
        }
    }

    #[must_use]
    pub fn was_colonized(&self, species: SpeciesId, deme: u16) -> bool {
        self.colonized
            .binary_search(&Colony { species, deme })
            .is_ok()
    }

    /// Migrant births of `species` into or out of `deme` since `since` (inclusive).
    #[must_use]
    pub fn exchanges(&self, species: SpeciesId, deme: u16, since: u64) -> usize {
        self.records
            .iter()
            .filter(|r| r.generation >= since && r.species == species)
            .filter(|r| r.from == deme || r.to == deme)
            .count()
    }

    /// Drops records older than `horizon`.
    pub fn prune(&mut self, horizon: u64) {
        self.records.retain(|r| r.generation >= horizon);
    }

    /// Moves flow bookkeeping of `from` over to `to` for `deme`, after a split
    /// hands that deme to a new species.
    pub fn reassign(&mut self, from: SpeciesId, to: SpeciesId, deme: u16) {
        for r in self.records.iter_mut() {
            if r.species == from && (r.to == deme || r.from == deme) {
                r.species = to;
            }
        }
        if self.was_colonized(from, deme) {
            self.mark_colonized(to, deme);
        }
    }
}
