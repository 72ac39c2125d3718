//! GML serialization.
//!
//! Output is deterministic: graph attributes, then nodes and edges in the
//! order they appear in the graph, with attributes in key order. Attribute
//! values are always written as quoted strings; only ids, endpoints and the
//! `directed` flag are bare.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::gml_parser::GmlGraph;

/// Graph attribute holding the `0`/`1` directedness flag
pub const DIRECTED_ATTRIBUTE: &str = "directed";

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn write_attributes(out: &mut String, indent: &str, attributes: &BTreeMap<String, String>) {
    for (key, value) in attributes {
        out.push_str(&format!("{}{} \"{}\"\n", indent, key, escape(value)));
    }
}

/// Render a graph as GML text
pub fn to_gml_string(graph: &GmlGraph) -> String {
    let mut out = String::from("graph [\n");

    let mut attributes = graph.attributes.clone();
    if let Some(directed) = attributes.remove(DIRECTED_ATTRIBUTE) {
        let flag = if directed == "1" { 1 } else { 0 };
        out.push_str(&format!("  {} {}\n", DIRECTED_ATTRIBUTE, flag));
    }
    write_attributes(&mut out, "  ", &attributes);

    for node in &graph.nodes {
        out.push_str("  node [\n");
        out.push_str(&format!("    id {}\n", node.id));
        if let Some(label) = &node.label {
            out.push_str(&format!("    label \"{}\"\n", escape(label)));
        }
        write_attributes(&mut out, "    ", &node.attributes);
        out.push_str("  ]\n");
    }

    for edge in &graph.edges {
        out.push_str("  edge [\n");
        out.push_str(&format!("    source {}\n", edge.source));
        out.push_str(&format!("    target {}\n", edge.target));
        write_attributes(&mut out, "    ", &edge.attributes);
        out.push_str("  ]\n");
    }

    out.push_str("]\n");
    out
}

/// Write a graph to a GML file, replacing any existing file
pub fn write_gml_file(graph: &GmlGraph, path: &Path) -> Result<()> {
    fs::write(path, to_gml_string(graph))
        .wrap_err_with(|| format!("Failed to write GML file '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gml_parser::{parse_gml, parse_gml_file, GmlEdge, GmlNode};
    use tempfile::TempDir;

    fn sample() -> GmlGraph {
        GmlGraph {
            nodes: vec![
                GmlNode {
                    id: 0,
                    label: Some("141.161.20.54".to_string()),
                    attributes: BTreeMap::from([
                        ("asn".to_string(), "10".to_string()),
                        ("geocodes".to_string(), "USDC".to_string()),
                        ("nodetype".to_string(), "relay".to_string()),
                    ]),
                },
                GmlNode {
                    id: 1,
                    label: Some("odd \"name\"".to_string()),
                    attributes: BTreeMap::new(),
                },
            ],
            edges: vec![GmlEdge {
                source: 0,
                target: 1,
                attributes: BTreeMap::from([("latencies".to_string(), "2.0,2.1".to_string())]),
            }],
            attributes: BTreeMap::from([
                ("directed".to_string(), "0".to_string()),
                ("packetloss".to_string(), "US=0.001".to_string()),
            ]),
        }
    }

    #[test]
    fn test_to_gml_string_layout() {
        let text = to_gml_string(&sample());

        assert!(text.starts_with("graph [\n  directed 0\n  packetloss \"US=0.001\"\n"));
        assert!(text.contains("    label \"141.161.20.54\"\n    asn \"10\"\n    geocodes \"USDC\"\n"));
        assert!(text.contains("    label \"odd \\\"name\\\"\"\n"));
        assert!(text.contains("  edge [\n    source 0\n    target 1\n    latencies \"2.0,2.1\"\n  ]\n"));
        assert!(text.ends_with("]\n"));
    }

    #[test]
    fn test_written_file_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("topology.gml");
        fs::write(&path, "stale contents").unwrap();

        let graph = sample();
        write_gml_file(&graph, &path).unwrap();

        assert_eq!(parse_gml_file(&path).unwrap(), graph);
        assert_eq!(parse_gml(&to_gml_string(&graph)).unwrap(), graph);
    }
}
