use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, kosaraju_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::ModuleError;
use crate::registry::ModuleDescriptor;

/// Ordering constraints between enabled modules
///
/// Nodes are added in registration order, so a node index is also the
/// module's registration position. Edges point from a required module to the
/// module requiring it.
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
}

impl DependencyGraph {
    /// Build the graph over `descriptors`. Requirements naming modules outside
    /// of `descriptors` are ignored here; the manager reports them when the
    /// dependent module is initialized.
    pub fn new(descriptors: &[ModuleDescriptor]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        // First pass: create all nodes
        for descriptor in descriptors {
            let node = graph.add_node(descriptor.name().to_string());
            node_map.insert(descriptor.name().to_string(), node);
        }

        // Second pass: add edges based on requires
        for descriptor in descriptors {
            let dependent = node_map[descriptor.name()];
            for required in descriptor.requires_modules() {
                if let Some(&required_node) = node_map.get(required) {
                    graph.update_edge(required_node, dependent, ());
                }
            }
        }

        Self { graph }
    }

    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Topological order that falls back to registration order wherever no
    /// requirement applies. Returns registration positions.
    pub fn ordered_positions(&self) -> Result<Vec<usize>, ModuleError> {
        if self.has_cycles() {
            let cycle = self.find_cycles().into_iter().next().unwrap_or_default();
            return Err(ModuleError::DependencyCycle { cycle });
        }

        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|node| {
                self.graph
                    .neighbors_directed(node, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(position, _)| Reverse(position))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(Reverse(position)) = ready.pop() {
            order.push(position);
            for next in self.graph.neighbors(NodeIndex::new(position)) {
                let degree = &mut in_degree[next.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }

        Ok(order)
    }

    /// Cycles in the graph, each listed in registration order
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();

        for mut scc in kosaraju_scc(&self.graph) {
            let is_cycle = scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]);
            if is_cycle {
                scc.sort();
                cycles.push(scc.into_iter().map(|n| self.graph[n].clone()).collect());
            }
        }

        cycles.sort();
        cycles
    }
}
