//! Small hand-built topology for smoke-testing simulator setups.

use super::types::{AggregateStrings, NodeType, OutputGraph, OutputNode};

const ACCESS_LATENCIES: &str = "2.0,2.1,2.2,2.2,2.2,2.3,2.6,2.8,3.0,3.5";
const BACKBONE_LATENCIES: &str = "80.3,83.6,88.5,89.4,89.6,89.9,90.9,91.2,92.3,95.0";

/// One relay behind PoP 1 (US), one server behind PoP 2 (Europe), with the
/// statistics stored as graph attributes only.
pub fn sample_graph() -> OutputGraph {
    let mut graph = OutputGraph::new();
    graph.aggregates = Some(AggregateStrings {
        bandwidth_up: "USDC=1024,USVA=1024,USMD=968,FR=600,DE=750".to_string(),
        bandwidth_down: "USDC=1024,USVA=1024,USMD=968,FR=600,DE=750".to_string(),
        packet_loss: "USDC=0.001,USVA=0.001,USMD=0.001,FR=0.001,DE=0.001".to_string(),
    });

    graph.add_node(OutputNode::host("141.161.20.54", NodeType::Relay, "USDC", "10").with_nodeid());
    graph.add_node(OutputNode::host("1", NodeType::Pop, "USDC,USVA,USMD", "10").with_nodeid());
    graph.add_node(OutputNode::host("2", NodeType::Pop, "FR,DE", "20").with_nodeid());
    graph.add_node(OutputNode::host("137.150.145.240", NodeType::Server, "DE", "30").with_nodeid());

    graph.add_edge("141.161.20.54", "1", ACCESS_LATENCIES);
    graph.add_edge("1", "2", BACKBONE_LATENCIES);
    graph.add_edge("2", "137.150.145.240", ACCESS_LATENCIES);

    graph
}
