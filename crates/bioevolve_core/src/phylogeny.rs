use crate::speciation::registry::SpeciesRegistry;
use bioevolve_data::{LineageEvent, SpeciationMode, SpeciesId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// A node in the species tree.
#[derive(Debug, Clone)]
pub struct PhyloNode {
    pub id: SpeciesId,
    pub name: String,
    pub founded_at: u64,
    pub extinct_at: Option<u64>,
    pub peak_members: usize,
    pub members: usize,
    pub origin: Option<SpeciationMode>,
}

/// Species tree rooted at the founding species. Edges point parent to child.
pub struct PhylogeneticTree {
    pub graph: DiGraph<PhyloNode, SpeciationMode>,
    id_map: HashMap<SpeciesId, NodeIndex>,
}

/// Many speciation events branching from one ancestor in a short window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdaptiveRadiation {
    pub ancestor: SpeciesId,
    pub start: u64,
    pub end: u64,
    pub branches: Vec<SpeciesId>,
}

impl PhylogeneticTree {
    /// Builds the tree from every species that ever existed.
    pub fn build(registry: &SpeciesRegistry) -> Self {
        let mut graph = DiGraph::new();
        let mut id_map = HashMap::new();

        for s in &registry.species {
            let idx = graph.add_node(PhyloNode {
                id: s.id,
                name: s.name.clone(),
                founded_at: s.founded_at,
                extinct_at: s.extinct_at(),
                peak_members: s.peak_members,
                members: s.members.len(),
                origin: s.origin,
            });
            id_map.insert(s.id, idx);
        }
        for s in &registry.species {
            if let (Some(parent), Some(origin)) = (s.parent, s.origin) {
                if let (Some(&p_idx), Some(&c_idx)) = (id_map.get(&parent), id_map.get(&s.id)) {
                    graph.add_edge(p_idx, c_idx, origin);
                }
            }
        }

        Self { graph, id_map }
    }

    #[must_use]
    pub fn node(&self, id: SpeciesId) -> Option<&PhyloNode> {
        self.id_map.get(&id).map(|&idx| &self.graph[idx])
    }

    #[must_use]
    pub fn species_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Path from `id` back to the root, starting with `id`.
    #[must_use]
    pub fn lineage(&self, id: SpeciesId) -> Vec<SpeciesId> {
        let mut path = Vec::new();
        let mut current = self.id_map.get(&id).copied();
        while let Some(idx) = current {
            path.push(self.graph[idx].id);
            current = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .next();
        }
        path
    }

    /// Every species descended from `id`, ascending.
    #[must_use]
    pub fn descendants(&self, id: SpeciesId) -> Vec<SpeciesId> {
        let Some(&start) = self.id_map.get(&id) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(idx) = bfs.next(&self.graph) {
            if idx != start {
                found.push(self.graph[idx].id);
            }
        }
        found.sort();
        found
    }

    /// Longest root-to-leaf path, counted in species.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| self.lineage(self.graph[idx].id).len())
            .max()
            .unwrap_or(0)
    }

    /// Export the tree to Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph Phylogeny {\n");
        dot.push_str("  node [shape=box, style=filled, fontname=\"Arial\"];\n");

        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            let (color, fate) = match node.extinct_at {
                Some(at) => ("#eeeeee", format!("extinct @{at}")),
                None => ("#e1f5fe", format!("{} alive", node.members)),
            };
            dot.push_str(&format!(
                "  \"{}\" [label=\"{}\\nfounded @{}\\n{}, peak {}\", fillcolor=\"{}\"];\n",
                node.id, node.name, node.founded_at, fate, node.peak_members, color
            ));
        }

        for edge in self.graph.edge_references() {
            dot.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{:?}\"];\n",
                self.graph[edge.source()].id,
                self.graph[edge.target()].id,
                edge.weight()
            ));
        }

        dot.push_str("}\n");
        dot
    }
}

/// Scans the event log for ancestors that produced at least `min_branches`
/// children within `window` generations.
#[must_use]
pub fn find_adaptive_radiations(
    events: &[LineageEvent],
    window: u64,
    min_branches: usize,
) -> Vec<AdaptiveRadiation> {
    let mut splits: BTreeMap<SpeciesId, Vec<(u64, SpeciesId)>> = BTreeMap::new();
    for event in events {
        match (event.mode(), event.species.as_slice()) {
            (Some(mode), [parent, child]) if mode != SpeciationMode::Hybrid => {
                splits
                    .entry(*parent)
                    .or_default()
                    .push((event.generation, *child));
            }
            _ => {}
        }
    }

    let mut radiations = Vec::new();
    for (ancestor, mut births) in splits {
        births.sort();
        let mut start = 0;
        while start < births.len() {
            let end = births
                .iter()
                .rposition(|(g, _)| *g <= births[start].0 + window)
                .unwrap_or(start);
            if end + 1 - start >= min_branches.max(1) {
                radiations.push(AdaptiveRadiation {
                    ancestor,
                    start: births[start].0,
                    end: births[end].0,
                    branches: births[start..=end].iter().map(|(_, c)| *c).collect(),
                });
                start = end + 1;
            } else {
                start += 1;
            }
        }
    }
    radiations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speciation::lineage_event;
    use bioevolve_data::LineageEventKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn registry() -> SpeciesRegistry {
        let mut registry = SpeciesRegistry::with_root(0);
        let a = registry.create_child(SpeciesId::ROOT, 3, SpeciationMode::Allopatric);
        registry.create_child(SpeciesId::ROOT, 4, SpeciationMode::Sympatric);
        registry.create_child(a, 9, SpeciationMode::Peripatric);
        registry.mark_extinct(SpeciesId(2), 12);
        registry
    }

    #[test]
    fn test_lineage_and_descendants() {
        let tree = PhylogeneticTree::build(&registry());
        assert_eq!(tree.species_count(), 4);
        assert_eq!(
            tree.lineage(SpeciesId(3)),
            vec![SpeciesId(3), SpeciesId(1), SpeciesId::ROOT]
        );
        assert_eq!(
            tree.descendants(SpeciesId::ROOT),
            vec![SpeciesId(1), SpeciesId(2), SpeciesId(3)]
        );
        assert!(tree.descendants(SpeciesId(3)).is_empty());
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.node(SpeciesId(2)).unwrap().extinct_at, Some(12));
    }

    #[test]
    fn test_dot_export_has_every_node_and_edge() {
        let dot = PhylogeneticTree::build(&registry()).to_dot();
        assert!(dot.starts_with("digraph Phylogeny {"));
        assert_eq!(dot.matches(" -> ").count(), 3);
        assert!(dot.contains("extinct @12"));
        assert!(dot.contains("Peripatric"));
    }

    #[test]
    fn test_radiation_detection() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut seq = 0;
        let mut split = |generation: u64, parent: u64, child: u64| {
            lineage_event(
                &mut rng,
                &mut seq,
                generation,
                LineageEventKind::Speciation {
                    mode: SpeciationMode::Sympatric,
                },
                vec![SpeciesId(parent), SpeciesId(child)],
                String::new(),
            )
        };
        let events = vec![
            split(10, 0, 1),
            split(12, 0, 2),
            split(14, 0, 3),
            split(40, 0, 4),
            split(41, 1, 5),
        ];
        let radiations = find_adaptive_radiations(&events, 5, 3);
        assert_eq!(radiations.len(), 1);
        assert_eq!(radiations[0].ancestor, SpeciesId::ROOT);
        assert_eq!(
            radiations[0].branches,
            vec![SpeciesId(1), SpeciesId(2), SpeciesId(3)]
        );
        assert_eq!((radiations[0].start, radiations[0].end), (10, 14));
    }
}
