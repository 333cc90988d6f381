use bioevolve_data::{Organism, OrganismId, Parentage, SpeciesId};
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Permanent record of one organism, kept after its death.
#[derive(
    Serialize, Deserialize, Debug, Clone, PartialEq, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct AncestryRecord {
    pub id: OrganismId,
    pub parents: Option<Parentage>,
    /// Generational depth.
    pub depth: u64,
    pub born_at: u64,
    pub died_at: Option<u64>,
    pub species_at_birth: SpeciesId,
    pub deme_at_birth: u16,
}

/// Append-only ancestry DAG, sorted by id.
///
/// Ids are assigned in birth order, so appending keeps the ledger sorted and a
/// parent always appears before its children.
#[derive(
    Serialize, Deserialize, Debug, Clone, Default, PartialEq, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct AncestryLedger {
    pub records: Vec<AncestryRecord>,
}

impl AncestryLedger {
    pub fn record_birth(&mut self, organism: &Organism) {
        if self
            .records
            .last()
            .is_some_and(|last| last.id >= organism.id)
        {
            return;
        }
        self.records.push(AncestryRecord {
            id: organism.id,
            parents: organism.parents,
            depth: organism.generation,
            born_at: organism.born_at,
            died_at: None,
            species_at_birth: organism.species,
            deme_at_birth: organism.deme,
        });
    }

    pub fn record_death(&mut self, id: OrganismId, at: u64) {
        if let Some(record) = self.get_mut(id) {
            record.died_at.get_or_insert(at);
        }
    }

    #[must_use]
    pub fn get(&self, id: OrganismId) -> Option<&AncestryRecord> {
        self.records
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|i| &self.records[i])
    }

    fn get_mut(&mut self, id: OrganismId) -> Option<&mut AncestryRecord> {
        self.records
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|i| &mut self.records[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All recorded ancestors of `id`, ascending.
    #[must_use]
    pub fn ancestors(&self, id: OrganismId) -> Vec<OrganismId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if let Some(Parentage { mother, father }) = self.get(current).and_then(|r| r.parents)
            {
                for parent in [mother, father] {
                    if seen.insert(parent) {
                        queue.push_back(parent);
                    }
                }
            }
        }
        seen.into_iter().collect()
    }

    /// Whether `ancestor` is in the ancestry of `id`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: OrganismId, id: OrganismId) -> bool {
        self.ancestors(id).binary_search(&ancestor).is_ok()
    }
}
