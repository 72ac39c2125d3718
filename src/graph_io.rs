//! Topology file format selection.
//!
//! `.gml` paths are read and written as GML; every other path (`.xml`,
//! `.graphml`, ...) is GraphML.

use color_eyre::Result;
use log::debug;
use std::path::Path;

use crate::gml_parser::{parse_gml_file, GmlGraph};
use crate::gml_writer::write_gml_file;
use crate::graphml::{parse_graphml_file, write_graphml_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Gml,
    GraphMl,
}

impl GraphFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(extension) if extension.eq_ignore_ascii_case("gml") => Self::Gml,
            _ => Self::GraphMl,
        }
    }
}

/// Read a topology file in the format its extension names
pub fn read_graph_file(path: &Path) -> Result<GmlGraph> {
    let format = GraphFormat::from_path(path);
    debug!("Reading {:?} as {:?}", path, format);

    match format {
        GraphFormat::Gml => parse_gml_file(path),
        GraphFormat::GraphMl => parse_graphml_file(path),
    }
}

/// Write a topology file in the format its extension names
pub fn write_graph_file(graph: &GmlGraph, path: &Path) -> Result<()> {
    let format = GraphFormat::from_path(path);
    debug!("Writing {:?} as {:?}", path, format);

    match format {
        GraphFormat::Gml => write_gml_file(graph, path),
        GraphFormat::GraphMl => write_graphml_file(graph, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gml_parser::GmlNode;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(GraphFormat::from_path(Path::new("relays.gml")), GraphFormat::Gml);
        assert_eq!(GraphFormat::from_path(Path::new("relays.GML")), GraphFormat::Gml);
        assert_eq!(GraphFormat::from_path(Path::new("full_tor_map.xml")), GraphFormat::GraphMl);
        assert_eq!(GraphFormat::from_path(Path::new("topology.full.graphml.xml")), GraphFormat::GraphMl);
        assert_eq!(GraphFormat::from_path(Path::new("topology")), GraphFormat::GraphMl);
    }

    #[test]
    fn test_round_trip_in_both_formats() {
        let dir = TempDir::new().unwrap();
        let graph = GmlGraph {
            nodes: vec![GmlNode {
                id: 0,
                label: Some("1".to_string()),
                attributes: BTreeMap::from([("nodetype".to_string(), "pop".to_string())]),
            }],
            edges: Vec::new(),
            attributes: BTreeMap::from([("directed".to_string(), "0".to_string())]),
        };

        for name in ["topology.gml", "topology.graphml.xml"] {
            let path = dir.path().join(name);
            write_graph_file(&graph, &path).unwrap();
            assert_eq!(read_graph_file(&path).unwrap(), graph);
        }

        let gml = fs::read_to_string(dir.path().join("topology.gml")).unwrap();
        assert!(gml.starts_with("graph ["));
        let graphml = fs::read_to_string(dir.path().join("topology.graphml.xml")).unwrap();
        assert!(graphml.contains("<graphml"));
    }
}
