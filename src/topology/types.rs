//! Output topology type definitions.
//!
//! The output graph is undirected: an edge between two keys covers both
//! directions, and adding it again replaces its latency list.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::gml_parser::{GmlEdge, GmlGraph, GmlNode};

/// Key of the synthetic node that carries the aggregate statistics
pub const AGGREGATOR_NODE_ID: &str = "dummynode";

/// Latency placed on the aggregator's only edge. Large enough that no
/// shortest path will route through it.
pub const AGGREGATOR_LATENCY: &str = "10000.0";

/// Role of a host node in the output topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Pop,
    Relay,
    Server,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pop => "pop",
            Self::Relay => "relay",
            Self::Server => "server",
        }
    }
}

/// The three serialized `code=value,...` statistic strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStrings {
    pub bandwidth_up: String,
    pub bandwidth_down: String,
    pub packet_loss: String,
}

impl AggregateStrings {
    /// Attribute name/value pairs as written to the topology file
    pub fn attributes(&self) -> [(&'static str, &str); 3] {
        [
            ("bandwidthup", self.bandwidth_up.as_str()),
            ("bandwidthdown", self.bandwidth_down.as_str()),
            ("packetloss", self.packet_loss.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputNodeKind {
    Host {
        nodetype: NodeType,
        geocodes: String,
        asn: String,
        /// Written as a `nodeid` attribute when set
        nodeid: Option<String>,
    },
    Aggregator(AggregateStrings),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNode {
    pub key: String,
    pub kind: OutputNodeKind,
}

impl OutputNode {
    pub fn host(key: impl Into<String>, nodetype: NodeType, geocodes: impl Into<String>, asn: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: OutputNodeKind::Host {
                nodetype,
                geocodes: geocodes.into(),
                asn: asn.into(),
                nodeid: None,
            },
        }
    }

    /// Also write the node's key as its `nodeid` attribute
    pub fn with_nodeid(mut self) -> Self {
        if let OutputNodeKind::Host { nodeid, .. } = &mut self.kind {
            *nodeid = Some(self.key.clone());
        }
        self
    }

    pub fn nodetype(&self) -> Option<NodeType> {
        match &self.kind {
            OutputNodeKind::Host { nodetype, .. } => Some(*nodetype),
            OutputNodeKind::Aggregator(_) => None,
        }
    }

    fn gml_attributes(&self) -> BTreeMap<String, String> {
        match &self.kind {
            OutputNodeKind::Host { nodetype, geocodes, asn, nodeid } => {
                let mut attributes = BTreeMap::from([
                    ("nodetype".to_string(), nodetype.as_str().to_string()),
                    ("geocodes".to_string(), geocodes.clone()),
                    ("asn".to_string(), asn.clone()),
                ]);
                if let Some(nodeid) = nodeid {
                    attributes.insert("nodeid".to_string(), nodeid.clone());
                }
                attributes
            }
            OutputNodeKind::Aggregator(aggregates) => aggregates
                .attributes()
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEdge {
    pub source: String,
    pub target: String,
    pub latencies: String,
}

/// Normalized topology keyed by IP address or PoP id.
///
/// Nodes and edges keep insertion order so the written file is deterministic.
#[derive(Debug, Clone, Default)]
pub struct OutputGraph {
    nodes: Vec<OutputNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<OutputEdge>,
    edge_index: HashMap<(String, String), usize>,
    /// Graph-level copy of the aggregate statistics
    pub aggregates: Option<AggregateStrings>,
}

fn undirected_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl OutputGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or replace the attributes of an existing node with the
    /// same key while keeping its position.
    ///
    /// Returns true if the key was new.
    pub fn add_node(&mut self, node: OutputNode) -> bool {
        match self.node_index.get(&node.key) {
            Some(&index) => {
                self.nodes[index] = node;
                false
            }
            None => {
                self.node_index.insert(node.key.clone(), self.nodes.len());
                self.nodes.push(node);
                true
            }
        }
    }

    /// Add an undirected edge, replacing the latencies of an existing one.
    ///
    /// Both endpoints must already be nodes; returns false otherwise.
    pub fn add_edge(&mut self, source: &str, target: &str, latencies: &str) -> bool {
        if !self.contains(source) || !self.contains(target) {
            return false;
        }

        let key = undirected_key(source, target);
        match self.edge_index.get(&key) {
            Some(&index) => self.edges[index].latencies = latencies.to_string(),
            None => {
                self.edge_index.insert(key, self.edges.len());
                self.edges.push(OutputEdge {
                    source: source.to_string(),
                    target: target.to_string(),
                    latencies: latencies.to_string(),
                });
            }
        }
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.node_index.contains_key(key)
    }

    pub fn node(&self, key: &str) -> Option<&OutputNode> {
        self.node_index.get(key).map(|&index| &self.nodes[index])
    }

    pub fn nodes(&self) -> &[OutputNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[OutputEdge] {
        &self.edges
    }

    /// Latency list of the edge between two keys, in either direction
    pub fn edge_latencies(&self, a: &str, b: &str) -> Option<&str> {
        self.edge_index
            .get(&undirected_key(a, b))
            .map(|&index| self.edges[index].latencies.as_str())
    }

    pub(crate) fn index_of(&self, key: &str) -> Option<usize> {
        self.node_index.get(key).copied()
    }

    /// Convert to the GML form: numeric ids in insertion order, the key as
    /// the label, and `directed 0` plus the aggregates as graph attributes.
    pub fn to_gml(&self) -> GmlGraph {
        let mut attributes = BTreeMap::from([("directed".to_string(), "0".to_string())]);
        if let Some(aggregates) = &self.aggregates {
            for (name, value) in aggregates.attributes() {
                attributes.insert(name.to_string(), value.to_string());
            }
        }

        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(id, node)| GmlNode {
                id: id as u32,
                label: Some(node.key.clone()),
                attributes: node.gml_attributes(),
            })
            .collect();

        let edges = self
            .edges
            .iter()
            .map(|edge| GmlEdge {
                source: self.node_index[&edge.source] as u32,
                target: self.node_index[&edge.target] as u32,
                attributes: BTreeMap::from([("latencies".to_string(), edge.latencies.clone())]),
            })
            .collect();

        GmlGraph { nodes, edges, attributes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_node_replaces_in_place() {
        let mut graph = OutputGraph::new();
        assert!(graph.add_node(OutputNode::host("1.2.3.4", NodeType::Relay, "US", "10")));
        assert!(graph.add_node(OutputNode::host("1", NodeType::Pop, "FR", "20")));
        assert!(!graph.add_node(OutputNode::host("1.2.3.4", NodeType::Server, "DE", "30")));

        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.nodes()[0].key, "1.2.3.4");
        assert_eq!(graph.node("1.2.3.4").unwrap().nodetype(), Some(NodeType::Server));
    }

    #[test]
    fn test_edges_are_undirected() {
        let mut graph = OutputGraph::new();
        graph.add_node(OutputNode::host("a", NodeType::Pop, "US", "1"));
        graph.add_node(OutputNode::host("b", NodeType::Pop, "US", "1"));

        assert!(graph.add_edge("a", "b", "1.0"));
        assert!(graph.add_edge("b", "a", "2.0"));

        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edge_latencies("a", "b"), Some("2.0"));
        assert_eq!(graph.edge_latencies("b", "a"), Some("2.0"));
    }

    #[test]
    fn test_add_edge_requires_endpoints() {
        let mut graph = OutputGraph::new();
        graph.add_node(OutputNode::host("a", NodeType::Pop, "US", "1"));

        assert!(!graph.add_edge("a", "missing", "1.0"));
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_to_gml() {
        let mut graph = OutputGraph::new();
        graph.add_node(OutputNode::host("10.0.0.1", NodeType::Relay, "DE", "3320"));
        graph.add_node(OutputNode {
            key: AGGREGATOR_NODE_ID.to_string(),
            kind: OutputNodeKind::Aggregator(AggregateStrings {
                bandwidth_up: "DE=100".to_string(),
                bandwidth_down: "DE=200".to_string(),
                packet_loss: "DE=0.01".to_string(),
            }),
        });
        graph.add_edge(AGGREGATOR_NODE_ID, "10.0.0.1", AGGREGATOR_LATENCY);

        let gml = graph.to_gml();

        assert_eq!(gml.attributes.get("directed"), Some(&"0".to_string()));
        assert_eq!(gml.nodes[0].label.as_deref(), Some("10.0.0.1"));
        assert_eq!(gml.nodes[0].attribute("nodetype"), Some("relay"));
        assert_eq!(gml.nodes[0].attribute("nodeid"), None);
        assert_eq!(gml.nodes[1].attribute("packetloss"), Some("DE=0.01"));
        assert_eq!(gml.nodes[1].attribute("nodetype"), None);
        assert_eq!(gml.edges[0].source, 1);
        assert_eq!(gml.edges[0].target, 0);
        assert_eq!(gml.edges[0].attribute("latencies"), Some("10000.0"));
    }
}
