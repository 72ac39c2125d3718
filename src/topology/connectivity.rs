//! Connected-component checks.
//!
//! Every edge counts in both directions. Both the input map and the
//! generated topology must form exactly one component.

use std::collections::HashMap;

use super::types::OutputGraph;
use crate::gml_parser::GmlGraph;

/// A graph viewed as `node_count` vertices joined by undirected index pairs
pub trait UndirectedGraph {
    fn node_count(&self) -> usize;

    /// Endpoints of every edge as node positions. Edges whose endpoints
    /// cannot be resolved are left out.
    fn edge_endpoints(&self) -> Vec<(usize, usize)>;
}

impl UndirectedGraph for GmlGraph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_endpoints(&self) -> Vec<(usize, usize)> {
        let index: HashMap<u32, usize> = self.index_by_id();
        self.edges
            .iter()
            .filter_map(|edge| Some((*index.get(&edge.source)?, *index.get(&edge.target)?)))
            .collect()
    }
}

impl UndirectedGraph for OutputGraph {
    fn node_count(&self) -> usize {
        self.nodes().len()
    }

    fn edge_endpoints(&self) -> Vec<(usize, usize)> {
        self.edges()
            .iter()
            .filter_map(|edge| Some((self.index_of(&edge.source)?, self.index_of(&edge.target)?)))
            .collect()
    }
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

/// Number of connected components. An empty graph has none.
pub fn count_components<G: UndirectedGraph + ?Sized>(graph: &G) -> usize {
    let count = graph.node_count();
    let mut parent: Vec<usize> = (0..count).collect();
    let mut components = count;

    for (a, b) in graph.edge_endpoints() {
        let root_a = find(&mut parent, a);
        let root_b = find(&mut parent, b);
        if root_a != root_b {
            parent[root_a] = root_b;
            components -= 1;
        }
    }

    components
}

pub fn is_single_component<G: UndirectedGraph + ?Sized>(graph: &G) -> bool {
    count_components(graph) == 1
}
