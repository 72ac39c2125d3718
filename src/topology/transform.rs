//! Raw relay map to Shadow topology.
//!
//! One pass over raw nodes, one pass over raw edges, then the aggregator node
//! is attached so the statistics travel with the graph and the result stays a
//! single component.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt::Display;

use super::connectivity::count_components;
use super::raw::{rewrite_endpoint, Classified, RawNode};
use super::types::{
    AggregateStrings, NodeType, OutputGraph, OutputNode, OutputNodeKind, AGGREGATOR_LATENCY,
    AGGREGATOR_NODE_ID,
};
use crate::error::{RecordError, StructuralError};
use crate::geo::GeoTable;
use crate::gml_parser::{validate_topology, GmlGraph};
use crate::measurements::{format_fraction, BandwidthTable, PacketLossTable};

/// Aggregate strings plus the region codes that took the mean loss
#[derive(Debug, Clone, PartialEq)]
pub struct MergedAggregates {
    pub strings: AggregateStrings,
    pub mean_filled: Vec<String>,
}

/// Soft-skip diagnostics collected during a transform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Raw keys of nodes without a usable `nodetype`
    pub skipped_nodes: Vec<String>,
    /// Rewritten endpoints of edges that were dropped
    pub skipped_edges: Vec<(String, String)>,
}

fn join_pairs<V: Display>(keys: &[&String], value: impl Fn(&str) -> V) -> String {
    keys.iter()
        .map(|key| format!("{}={}", key, value(key)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Serialize the three statistic tables over the sorted upload key set.
///
/// Upload codes missing from the loss table get the mean loss fraction.
/// Loss fractions are written with 12 significant digits.
pub fn merge_aggregates(bandwidth: &BandwidthTable, loss: &PacketLossTable) -> MergedAggregates {
    let keys: Vec<&String> = bandwidth.upload.keys().collect();

    let mean_filled = keys
        .iter()
        .filter(|key| !loss.contains(key))
        .map(|key| key.to_string())
        .collect();

    let strings = AggregateStrings {
        bandwidth_up: join_pairs(&keys, |key| bandwidth.upload[key]),
        bandwidth_down: join_pairs(&keys, |key| {
            bandwidth.download.get(key).copied().unwrap_or_default()
        }),
        packet_loss: join_pairs(&keys, |key| format_fraction(loss.fraction_or_mean(key))),
    };

    MergedAggregates { strings, mean_filled }
}

/// Inputs shared by every step of the transform
pub struct TopologyTransformer<'a> {
    aggregates: &'a AggregateStrings,
    geo: &'a GeoTable,
}

impl<'a> TopologyTransformer<'a> {
    pub fn new(aggregates: &'a AggregateStrings, geo: &'a GeoTable) -> Self {
        Self { aggregates, geo }
    }

    /// Build the output graph from a raw map that is already known to be
    /// a single component.
    pub fn run(&self, raw: &GmlGraph) -> Result<(OutputGraph, TransformReport)> {
        let mut graph = OutputGraph::new();
        let mut report = TransformReport::default();

        let fingerprints = self.add_nodes(raw, &mut graph, &mut report)?;
        self.add_edges(raw, &fingerprints, &mut graph, &mut report)?;
        self.attach_aggregator(&mut graph)?;

        Ok((graph, report))
    }

    /// Node pass. Returns the fingerprint to IP table built from relays.
    fn add_nodes(
        &self,
        raw: &GmlGraph,
        graph: &mut OutputGraph,
        report: &mut TransformReport,
    ) -> Result<HashMap<String, String>> {
        let mut fingerprints = HashMap::new();

        for gml_node in &raw.nodes {
            let raw_node = match RawNode::classify(gml_node)? {
                Classified::Typed(raw_node) => raw_node,
                Classified::Untyped => {
                    report.skipped_nodes.push(gml_node.key());
                    continue;
                }
                Classified::Unknown(nodetype) => {
                    warn!("Skipping node {} with unknown nodetype '{}'", gml_node.key(), nodetype);
                    report.skipped_nodes.push(gml_node.key());
                    continue;
                }
            };

            let node = match raw_node {
                RawNode::Pop(pop) => {
                    let geocodes = pop.geocodes().to_string();
                    OutputNode::host(pop.nodeid, NodeType::Pop, geocodes, pop.asn)
                }
                RawNode::Relay(relay) => {
                    let geocodes = self
                        .geo
                        .lookup(&relay.relay_ip)
                        .wrap_err_with(|| format!("Relay {} has a bad address", relay.fingerprint))?
                        .to_string();
                    fingerprints.insert(relay.fingerprint, relay.relay_ip.clone());
                    OutputNode::host(relay.relay_ip, NodeType::Relay, geocodes, relay.asn)
                }
                RawNode::Dest(dest) => {
                    OutputNode::host(dest.ip(), NodeType::Server, dest.country, dest.asn)
                }
            };

            let key = node.key.clone();
            if !graph.add_node(node) {
                debug!("Node {} seen twice, keeping the later attributes", key);
            }
        }

        if !report.skipped_nodes.is_empty() {
            warn!(
                "Skipped {} nodes without a usable nodetype: {:?}",
                report.skipped_nodes.len(),
                report.skipped_nodes
            );
        }
        info!("Node pass produced {} nodes", graph.nodes().len());

        Ok(fingerprints)
    }

    fn add_edges(
        &self,
        raw: &GmlGraph,
        fingerprints: &HashMap<String, String>,
        graph: &mut OutputGraph,
        report: &mut TransformReport,
    ) -> Result<(), RecordError> {
        let index = raw.index_by_id();

        for edge in &raw.edges {
            let (Some(&source), Some(&target)) = (index.get(&edge.source), index.get(&edge.target)) else {
                continue;
            };
            let source = raw.nodes[source].key();
            let target = raw.nodes[target].key();

            let latencies = edge.attribute("latency").ok_or_else(|| RecordError::MissingEdgeAttribute {
                from: source.clone(),
                to: target.clone(),
                attribute: "latency",
            })?;

            let s = rewrite_endpoint(&source, fingerprints);
            let d = rewrite_endpoint(&target, fingerprints);

            if !graph.add_edge(&s, &d, latencies) {
                warn!("skipped edge: {} -- {}", s, d);
                report.skipped_edges.push((s, d));
            }
        }

        info!(
            "Edge pass produced {} edges ({} skipped)",
            graph.edges().len(),
            report.skipped_edges.len()
        );
        Ok(())
    }

    /// Add the aggregator node and tie it to the first node in insertion order.
    ///
    /// Fails if a host node already took the aggregator's key.
    fn attach_aggregator(&self, graph: &mut OutputGraph) -> Result<(), StructuralError> {
        if graph.contains(AGGREGATOR_NODE_ID) {
            return Err(StructuralError::ReservedNodeKey(AGGREGATOR_NODE_ID.to_string()));
        }
        let anchor = graph.nodes().first().map(|node| node.key.clone());

        graph.add_node(OutputNode {
            key: AGGREGATOR_NODE_ID.to_string(),
            kind: OutputNodeKind::Aggregator(self.aggregates.clone()),
        });
        graph.aggregates = Some(self.aggregates.clone());

        if let Some(anchor) = anchor {
            graph.add_edge(AGGREGATOR_NODE_ID, &anchor, AGGREGATOR_LATENCY);
            debug!("Aggregator node attached to {}", anchor);
        }
        Ok(())
    }
}

/// Check the raw map, transform it, and check the result.
///
/// Fails with [`StructuralError`] when either graph is not exactly one
/// connected component, and with [`RecordError`] on malformed nodes or edges.
pub fn transform_topology(
    raw: &GmlGraph,
    aggregates: &AggregateStrings,
    geo: &GeoTable,
) -> Result<(OutputGraph, TransformReport)> {
    validate_topology(raw)?;

    let components = count_components(raw);
    if components != 1 {
        return Err(StructuralError::InputNotConnected { components }.into());
    }
    info!("Input topology appears OK: {} nodes, {} edges, 1 component", raw.nodes.len(), raw.edges.len());

    let (graph, report) = TopologyTransformer::new(aggregates, geo).run(raw)?;

    let components = count_components(&graph);
    if components != 1 {
        return Err(StructuralError::OutputNotConnected { components }.into());
    }
    info!("Output topology is connected with 1 component");

    Ok((graph, report))
}
