pub mod macros;

use bioevolve_lib::data::{
    Allele, AlleleValue, Chromosome, Conditions, EnvironmentSnapshot, Gene, GeneRole, Genome,
    Organism, OrganismId, Ploidy, Population, SpeciesId, Trait, TraitEffect,
};
use bioevolve_lib::engine::config::EngineConfig;
use bioevolve_lib::engine::PopulationManager;

/// Genome of structural genes, one per trait slot in turn, all alleles at `value`.
#[allow(dead_code)]
pub fn uniform_genome(ploidy: Ploidy, loci: u32, value: f64) -> Genome {
    Genome {
        ploidy,
        chromosomes: vec![Chromosome {
            genes: (0..loci)
                .map(|locus| Gene {
                    locus,
                    role: GeneRole::Structural,
                    alleles: (0..ploidy.copies())
                        .map(|_| Allele::new(u64::from(locus), AlleleValue::Continuous(value)))
                        .collect(),
                    effects: vec![TraitEffect {
                        target: Trait::ALL[locus as usize % Trait::COUNT],
                        weight: 1.0,
                    }],
                    epistasis: Vec::new(),
                    sensitivities: Vec::new(),
                    importance: 1.0,
                })
                .collect(),
        }],
    }
}

#[allow(dead_code)]
pub fn founder(id: u64, genome: Genome, deme: u16) -> Organism {
    Organism::founder(OrganismId(id), genome, deme, SpeciesId::ROOT)
}

#[allow(dead_code)]
pub fn uniform_env() -> EnvironmentSnapshot {
    EnvironmentSnapshot::uniform(Conditions::default())
}

#[allow(dead_code)]
pub struct EngineBuilder {
    config: EngineConfig,
    organisms: Vec<Organism>,
}

#[allow(dead_code)]
impl EngineBuilder {
    /// Small, fast defaults: 40 founders, cap 200, 2x4 gene layout.
    pub fn new() -> Self {
        let mut config = EngineConfig::default();
        config.population.initial_size = 40;
        config.population.carrying_capacity = 200;
        config.genome.chromosomes = 2;
        config.genome.genes_per_chromosome = 4;
        Self {
            config,
            organisms: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.population.seed = seed;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut EngineConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_organism(mut self, organism: Organism) -> Self {
        self.organisms.push(organism);
        self
    }

    pub fn with_organisms<I: IntoIterator<Item = Organism>>(mut self, organisms: I) -> Self {
        self.organisms.extend(organisms);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generated founders unless organisms were supplied.
    pub fn build(self) -> PopulationManager {
        let result = if self.organisms.is_empty() {
            PopulationManager::new(self.config)
        } else {
            PopulationManager::from_population(self.config, Population::new(self.organisms))
        };
        result.expect("Failed to build engine")
    }
}
