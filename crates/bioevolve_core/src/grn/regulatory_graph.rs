use crate::error::GenomeDefect;
use bioevolve_data::{GeneRole, Genome};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::HashMap;

/// Edge kinds in the regulatory graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Regulation {
    /// Source activation modulates the target's expression strength.
    Epistasis(f64),
    /// Source architect gates whether the target is expressed at all.
    Gate,
}

/// Directed gene-gene regulation graph. Node `i` is the gene at position `i`
/// in chromosome order.
pub struct RegulatoryGraph {
    pub graph: DiGraph<u32, Regulation>,
}

impl RegulatoryGraph {
    /// Builds the graph. References must already be validated.
    #[must_use]
    pub fn build(genome: &Genome) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of: HashMap<u32, usize> = HashMap::new();
        let mut nodes = Vec::with_capacity(genome.gene_count());
        for (i, gene) in genome.genes().enumerate() {
            nodes.push(graph.add_node(gene.locus));
            index_of.insert(gene.locus, i);
        }

        for (target, gene) in genome.genes().enumerate() {
            for link in &gene.epistasis {
                if let Some(&source) = index_of.get(&link.source) {
                    graph.add_edge(
                        nodes[source],
                        nodes[target],
                        Regulation::Epistasis(link.strength),
                    );
                }
            }
            if let GeneRole::Architect { gates, .. } = &gene.role {
                for gated in gates {
                    if let Some(&gated_idx) = index_of.get(gated) {
                        graph.add_edge(nodes[target], nodes[gated_idx], Regulation::Gate);
                    }
                }
            }
        }

        Self { graph }
    }

    /// Gene positions in an order where every regulator precedes its targets.
    pub fn evaluation_order(&self) -> Result<Vec<usize>, GenomeDefect> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|n| n.index()).collect()),
            Err(cycle) => Err(GenomeDefect::Cycle {
                locus: self.graph[cycle.node_id()],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::test_support::{linked, uniform_genome};
    use bioevolve_data::Ploidy;

    #[test]
    fn test_order_respects_links() {
        let mut g = uniform_genome(Ploidy::Haploid, 4, 0.5);
        // 3 -> 0 and 0 -> 1
        let genes = &mut g.chromosomes[0].genes;
        genes[0] = linked(genes[0].clone(), 3, 0.5);
        genes[1] = linked(genes[1].clone(), 0, 0.5);
        let graph = RegulatoryGraph::build(&g);
        assert_eq!(graph.graph.edge_count(), 2);
        let order = graph.evaluation_order().expect("acyclic");
        let pos = |p: usize| order.iter().position(|&x| x == p).unwrap();
        assert!(pos(3) < pos(0));
        assert!(pos(0) < pos(1));
    }

    #[test]
    fn test_gate_cycle_detected() {
        let mut g = uniform_genome(Ploidy::Haploid, 2, 0.5);
        let genes = &mut g.chromosomes[0].genes;
        genes[0].role = GeneRole::Architect {
            threshold: 0.5,
            gates: vec![1],
            axis: None,
        };
        genes[0] = linked(genes[0].clone(), 1, 0.2);
        let graph = RegulatoryGraph::build(&g);
        assert!(matches!(
            graph.evaluation_order(),
            Err(GenomeDefect::Cycle { .. })
        ));
    }
}
