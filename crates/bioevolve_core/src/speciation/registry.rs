use bioevolve_data::{Population, SpeciationMode, Species, SpeciesId, SpeciesStatus};
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

const GENERA: [&str; 12] = [
    "Proto", "Archae", "Cyano", "Myxo", "Volvo", "Choano", "Placo", "Cteno", "Cnido", "Bilat",
    "Neuro", "Chordo",
];
const EPITHETS: [&str; 10] = [
    "primus", "minor", "vagans", "robustus", "gracilis", "borealis", "australis", "insularis",
    "profundus", "novus",
];

/// Binomial-style name derived from the species id.
#[must_use]
pub fn species_name(id: SpeciesId) -> String {
    let n = id.0 as usize;
    let genus = GENERA[n % GENERA.len()];
    let epithet = EPITHETS[(n / GENERA.len()) % EPITHETS.len()];
    let cycle = n / (GENERA.len() * EPITHETS.len());
    if cycle == 0 {
        format!("{genus}formis {epithet}")
    } else {
        format!("{genus}formis {epithet} {}", cycle + 1)
    }
}

/// Every species that ever existed, indexed by id. Species are never removed.
#[derive(
    Serialize, Deserialize, Debug, Clone, Default, PartialEq, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct SpeciesRegistry {
    pub species: Vec<Species>,
}

impl SpeciesRegistry {
    /// Registry holding only the root species.
    #[must_use]
    pub fn with_root(founded_at: u64) -> Self {
        let mut registry = Self::default();
        registry.species.push(Species::new(
            SpeciesId::ROOT,
            species_name(SpeciesId::ROOT),
            None,
            founded_at,
            None,
        ));
        registry
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.species.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: SpeciesId) -> Option<&mut Species> {
        self.species.get_mut(id.0 as usize)
    }

    pub fn extant(&self) -> impl Iterator<Item = &Species> {
        self.species.iter().filter(|s| !s.is_extinct())
    }

    #[must_use]
    pub fn extant_count(&self) -> usize {
        self.extant().count()
    }

    /// Registers a child species of `parent`.
    pub fn create_child(
        &mut self,
        parent: SpeciesId,
        founded_at: u64,
        mode: SpeciationMode,
    ) -> SpeciesId {
        let id = SpeciesId(self.species.len() as u64);
        self.species.push(Species::new(
            id,
            species_name(id),
            Some(parent),
            founded_at,
            Some(mode),
        ));
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Marks a species extinct. Returns `false` if it already was.
    pub fn mark_extinct(&mut self, id: SpeciesId, at: u64) -> bool {
        match self.get_mut(id) {
            Some(s) if !s.is_extinct() => {
                s.status = SpeciesStatus::Extinct { at };
                s.members.clear();
                true
            }
            _ => false,
        }
    }

    /// Rebuilds member lists from the live population.
    pub fn rebuild_members(&mut self, population: &Population) {
        for s in self.species.iter_mut() {
            s.members.clear();
        }
        for organism in population.iter() {
            if let Some(s) = self.species.get_mut(organism.species.0 as usize) {
                s.members.push(organism.id);
            }
        }
        for s in self.species.iter_mut() {
            s.peak_members = s.peak_members.max(s.members.len());
        }
    }
}
