//! Network topology module.
//!
//! This module contains the typed view of the raw relay map, the output
//! topology model, the transform between them, and the connectivity checks
//! applied on both sides.

pub mod types;
pub mod raw;
pub mod connectivity;
pub mod transform;
pub mod sample;

// Re-export key types and functions for easier access
pub use types::{
    AggregateStrings, NodeType, OutputEdge, OutputGraph, OutputNode, OutputNodeKind,
    AGGREGATOR_LATENCY, AGGREGATOR_NODE_ID,
};
pub use raw::{Classified, RawNode};
pub use connectivity::{count_components, is_single_component, UndirectedGraph};
pub use transform::{merge_aggregates, transform_topology, MergedAggregates, TopologyTransformer, TransformReport};
pub use sample::sample_graph;
