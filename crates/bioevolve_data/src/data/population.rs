use crate::data::organism::{Organism, OrganismId};
use crate::data::species::SpeciesId;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// All live organisms of one generation, kept sorted by id.
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
pub struct Population {
    pub organisms: Vec<Organism>,
}

impl Population {
    /// Builds a population, sorting by id.
    #[must_use]
    pub fn new(mut organisms: Vec<Organism>) -> Self {
        organisms.sort_by_key(|o| o.id);
        Self { organisms }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms
            .binary_search_by_key(&id, |o| o.id)
            .ok()
            .map(|i| &self.organisms[i])
    }

    pub fn get_mut(&mut self, id: OrganismId) -> Option<&mut Organism> {
        self.organisms
            .binary_search_by_key(&id, |o| o.id)
            .ok()
            .map(|i| &mut self.organisms[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Organism> {
        self.organisms.iter()
    }

    pub fn in_deme(&self, deme: u16) -> impl Iterator<Item = &Organism> {
        self.organisms.iter().filter(move |o| o.deme == deme)
    }

    pub fn members_of(&self, species: SpeciesId) -> impl Iterator<Item = &Organism> {
        self.organisms.iter().filter(move |o| o.species == species)
    }

    /// Highest deme index in use plus one.
    #[must_use]
    pub fn deme_span(&self) -> u16 {
        self.organisms
            .iter()
            .map(|o| o.deme.saturating_add(1))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::genome::{Genome, Ploidy};

    fn org(id: u64, deme: u16) -> Organism {
        let genome = Genome {
            ploidy: Ploidy::Haploid,
            chromosomes: Vec::new(),
        };
        Organism::founder(OrganismId(id), genome, deme, SpeciesId::ROOT)
    }

    #[test]
    fn test_population_sorted_lookup() {
        let pop = Population::new(vec![org(5, 0), org(2, 1), org(9, 1)]);
        let ids: Vec<u64> = pop.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![2, 5, 9]);
        assert!(pop.get(OrganismId(9)).is_some());
        assert!(pop.get(OrganismId(3)).is_none());
        assert_eq!(pop.in_deme(1).count(), 2);
        assert_eq!(pop.deme_span(), 2);
        assert_eq!(pop.members_of(SpeciesId::ROOT).count(), 3);
    }
}
