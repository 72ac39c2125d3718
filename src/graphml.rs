//! GraphML reading and writing.
//!
//! GraphML documents are lowered into the same [`GmlGraph`] attribute bag the
//! GML reader produces. Every `<data>` value becomes a string attribute named
//! after its key's `attr.name`, key defaults fill in missing values, and the
//! GraphML node id becomes the node label. Only the first top-level `<graph>`
//! is read; nested graphs are skipped.

use color_eyre::eyre::{eyre, Result, WrapErr};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::error::StructuralError;
use crate::gml_parser::{GmlEdge, GmlGraph, GmlNode};
use crate::gml_writer::DIRECTED_ATTRIBUTE;

const GRAPHML_NAMESPACE: &str = "http://graphml.graphdrawing.org/xmlns";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const GRAPHML_SCHEMA: &str =
    "http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd";

/// Elements a `<key>` declaration applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyDomain {
    Graph,
    Node,
    Edge,
    All,
}

impl KeyDomain {
    fn parse(value: &str) -> Self {
        match value {
            "graph" => Self::Graph,
            "node" => Self::Node,
            "edge" => Self::Edge,
            _ => Self::All,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Node => "node",
            Self::Edge => "edge",
            Self::All => "all",
        }
    }

    fn covers(self, other: KeyDomain) -> bool {
        self == Self::All || self == other
    }
}

#[derive(Debug, Clone)]
struct KeySpec {
    domain: KeyDomain,
    name: String,
    default: Option<String>,
}

/// Element whose `<data>` children are being collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Document,
    Graph,
    Node(usize),
    Edge(usize),
}

/// Text content being collected, and where it goes
#[derive(Debug, Clone)]
enum Capture {
    Default(String),
    Data(String),
}

struct PendingEdge {
    source: String,
    target: String,
    attributes: BTreeMap<String, String>,
}

#[derive(Default)]
struct Document {
    keys: HashMap<String, KeySpec>,
    directed: bool,
    graph_attributes: BTreeMap<String, String>,
    nodes: Vec<(String, BTreeMap<String, String>)>,
    edges: Vec<PendingEdge>,
}

fn element_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn attribute(element: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().into_inner() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required_attribute(element: &BytesStart, name: &str) -> Result<String> {
    attribute(element, name)?.ok_or_else(|| {
        eyre!(
            "<{}> element missing required '{}' attribute",
            element_name(element.local_name().into_inner()),
            name
        )
    })
}

fn defaults_for(keys: &HashMap<String, KeySpec>, domain: KeyDomain) -> Vec<(String, String)> {
    let mut defaults: Vec<(String, String)> = keys
        .values()
        .filter(|spec| spec.domain.covers(domain))
        .filter_map(|spec| Some((spec.name.clone(), spec.default.clone()?)))
        .collect();
    defaults.sort();
    defaults
}

fn apply_defaults(attributes: &mut BTreeMap<String, String>, defaults: &[(String, String)]) {
    for (name, value) in defaults {
        attributes.entry(name.clone()).or_insert_with(|| value.clone());
    }
}

impl Document {
    fn add_key(&mut self, element: &BytesStart) -> Result<String> {
        let id = required_attribute(element, "id")?;
        let domain = KeyDomain::parse(attribute(element, "for")?.as_deref().unwrap_or("all"));
        let name = attribute(element, "attr.name")?.unwrap_or_else(|| id.clone());

        self.keys.insert(id.clone(), KeySpec { domain, name, default: None });
        Ok(id)
    }

    fn add_node(&mut self, element: &BytesStart) -> Result<usize> {
        let key = required_attribute(element, "id")?;
        self.nodes.push((key, BTreeMap::new()));
        Ok(self.nodes.len() - 1)
    }

    fn add_edge(&mut self, element: &BytesStart) -> Result<usize> {
        let source = required_attribute(element, "source")?;
        let target = required_attribute(element, "target")?;
        self.edges.push(PendingEdge { source, target, attributes: BTreeMap::new() });
        Ok(self.edges.len() - 1)
    }

    fn set_default(&mut self, key: &str, value: String) {
        if let Some(spec) = self.keys.get_mut(key) {
            spec.default = Some(value);
        }
    }

    fn set_data(&mut self, scope: Scope, key: &str, value: String) {
        // Data naming an undeclared key keeps the raw key id as its name
        let name = self
            .keys
            .get(key)
            .map(|spec| spec.name.clone())
            .unwrap_or_else(|| key.to_string());

        let target = match scope {
            Scope::Graph => &mut self.graph_attributes,
            Scope::Node(index) => &mut self.nodes[index].1,
            Scope::Edge(index) => &mut self.edges[index].attributes,
            Scope::Document => return,
        };
        target.insert(name, value);
    }

    fn into_graph(self) -> Result<GmlGraph, StructuralError> {
        let Document { keys, directed, mut graph_attributes, nodes, edges } = self;

        let node_defaults = defaults_for(&keys, KeyDomain::Node);
        let edge_defaults = defaults_for(&keys, KeyDomain::Edge);
        apply_defaults(&mut graph_attributes, &defaults_for(&keys, KeyDomain::Graph));
        graph_attributes.insert(
            DIRECTED_ATTRIBUTE.to_string(),
            if directed { "1" } else { "0" }.to_string(),
        );

        let mut ids = HashMap::new();
        let mut graph_nodes = Vec::with_capacity(nodes.len());
        for (index, (key, mut attributes)) in nodes.into_iter().enumerate() {
            let id = index as u32;
            if ids.insert(key.clone(), id).is_some() {
                return Err(StructuralError::DuplicateNodeKey(key));
            }
            apply_defaults(&mut attributes, &node_defaults);
            graph_nodes.push(GmlNode { id, label: Some(key), attributes });
        }

        let resolve = |endpoint: &'static str, key: &str| {
            ids.get(key).copied().ok_or_else(|| StructuralError::UnknownEndpoint {
                endpoint,
                key: key.to_string(),
            })
        };

        let mut graph_edges = Vec::with_capacity(edges.len());
        for mut edge in edges {
            apply_defaults(&mut edge.attributes, &edge_defaults);
            graph_edges.push(GmlEdge {
                source: resolve("source", &edge.source)?,
                target: resolve("target", &edge.target)?,
                attributes: edge.attributes,
            });
        }

        Ok(GmlGraph { nodes: graph_nodes, edges: graph_edges, attributes: graph_attributes })
    }
}

/// Parse GraphML text into a graph
pub fn parse_graphml(content: &str) -> Result<GmlGraph> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut document = Document::default();
    let mut scope = Scope::Document;
    let mut graph_depth = 0usize;
    let mut graphs_seen = 0usize;
    let mut open_key: Option<String> = None;
    let mut capture: Option<Capture> = None;
    let mut text = String::new();

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .wrap_err_with(|| format!("Malformed GraphML near byte {}", position))?;

        match event {
            Event::Start(element) => {
                // Only the first top-level graph counts
                let in_graph = graph_depth == 1 && graphs_seen == 1;
                match element_name(element.local_name().into_inner()).as_str() {
                    "key" => open_key = Some(document.add_key(&element)?),
                    "default" => {
                        if let Some(key) = &open_key {
                            capture = Some(Capture::Default(key.clone()));
                            text.clear();
                        }
                    }
                    "graph" => {
                        graph_depth += 1;
                        if graph_depth == 1 {
                            graphs_seen += 1;
                            if graphs_seen == 1 {
                                scope = Scope::Graph;
                                document.directed =
                                    attribute(&element, "edgedefault")?.as_deref() == Some("directed");
                            }
                        }
                    }
                    "node" if in_graph => scope = Scope::Node(document.add_node(&element)?),
                    "edge" if in_graph => scope = Scope::Edge(document.add_edge(&element)?),
                    "data" if in_graph => {
                        capture = Some(Capture::Data(required_attribute(&element, "key")?));
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(element) => {
                let in_graph = graph_depth == 1 && graphs_seen == 1;
                match element_name(element.local_name().into_inner()).as_str() {
                    "key" => {
                        document.add_key(&element)?;
                    }
                    "graph" if graph_depth == 0 => {
                        graphs_seen += 1;
                        if graphs_seen == 1 {
                            document.directed =
                                attribute(&element, "edgedefault")?.as_deref() == Some("directed");
                        }
                    }
                    "node" if in_graph => {
                        document.add_node(&element)?;
                    }
                    "edge" if in_graph => {
                        document.add_edge(&element)?;
                    }
                    "data" if in_graph => {
                        let key = required_attribute(&element, "key")?;
                        document.set_data(scope, &key, String::new());
                    }
                    _ => {}
                }
            }
            Event::Text(value) => {
                if capture.is_some() {
                    text.push_str(&value.unescape()?);
                }
            }
            Event::CData(value) => {
                if capture.is_some() {
                    text.push_str(std::str::from_utf8(&value)?);
                }
            }
            Event::End(element) => match element_name(element.local_name().into_inner()).as_str() {
                "key" => open_key = None,
                "default" | "data" => match capture.take() {
                    Some(Capture::Default(key)) => document.set_default(&key, std::mem::take(&mut text)),
                    Some(Capture::Data(key)) => document.set_data(scope, &key, std::mem::take(&mut text)),
                    None => {}
                },
                "node" | "edge" if graph_depth == 1 && graphs_seen == 1 => scope = Scope::Graph,
                "graph" => {
                    graph_depth = graph_depth.saturating_sub(1);
                    if graph_depth == 0 {
                        scope = Scope::Document;
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if graphs_seen == 0 {
        return Err(eyre!("No <graph> element found"));
    }
    if graph_depth != 0 {
        return Err(eyre!("Unclosed <graph> element"));
    }

    Ok(document.into_graph()?)
}

/// Parse a GraphML file
pub fn parse_graphml_file(path: &Path) -> Result<GmlGraph> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read GraphML file '{}'", path.display()))?;

    parse_graphml(&content)
        .wrap_err_with(|| format!("Failed to parse GraphML file '{}'", path.display()))
}

fn write_data(
    writer: &mut Writer<Vec<u8>>,
    key_ids: &HashMap<(KeyDomain, String), String>,
    domain: KeyDomain,
    attributes: &BTreeMap<String, String>,
) -> Result<()> {
    for (name, value) in attributes {
        let Some(id) = key_ids.get(&(domain, name.clone())) else {
            continue;
        };
        writer.write_event(Event::Start(BytesStart::new("data").with_attributes([("key", id.as_str())])))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new("data")))?;
    }
    Ok(())
}

/// Render a graph as GraphML text.
///
/// All attributes are declared as `string` keys, numbered `d0, d1, ...` in
/// graph, node, edge order. Node ids are the node keys.
pub fn to_graphml_string(graph: &GmlGraph) -> Result<String> {
    let mut graph_attributes = graph.attributes.clone();
    let directed = graph_attributes.remove(DIRECTED_ATTRIBUTE).as_deref() == Some("1");

    let node_names: BTreeSet<&String> = graph.nodes.iter().flat_map(|node| node.attributes.keys()).collect();
    let edge_names: BTreeSet<&String> = graph.edges.iter().flat_map(|edge| edge.attributes.keys()).collect();

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("graphml").with_attributes([
        ("xmlns", GRAPHML_NAMESPACE),
        ("xmlns:xsi", XSI_NAMESPACE),
        ("xsi:schemaLocation", GRAPHML_SCHEMA),
    ])))?;

    let declarations = [
        (KeyDomain::Graph, graph_attributes.keys().collect::<Vec<_>>()),
        (KeyDomain::Node, node_names.into_iter().collect()),
        (KeyDomain::Edge, edge_names.into_iter().collect()),
    ];
    let mut key_ids = HashMap::new();
    for (domain, names) in declarations {
        for name in names {
            let id = format!("d{}", key_ids.len());
            writer.write_event(Event::Empty(BytesStart::new("key").with_attributes([
                ("attr.name", name.as_str()),
                ("attr.type", "string"),
                ("for", domain.as_str()),
                ("id", id.as_str()),
            ])))?;
            key_ids.insert((domain, name.clone()), id);
        }
    }

    let edgedefault = if directed { "directed" } else { "undirected" };
    writer.write_event(Event::Start(BytesStart::new("graph").with_attributes([("edgedefault", edgedefault)])))?;
    write_data(&mut writer, &key_ids, KeyDomain::Graph, &graph_attributes)?;

    let index = graph.index_by_id();
    for node in &graph.nodes {
        let key = node.key();
        writer.write_event(Event::Start(BytesStart::new("node").with_attributes([("id", key.as_str())])))?;
        write_data(&mut writer, &key_ids, KeyDomain::Node, &node.attributes)?;
        writer.write_event(Event::End(BytesEnd::new("node")))?;
    }

    for edge in &graph.edges {
        let endpoint_key = |endpoint: &'static str, id: u32| {
            index
                .get(&id)
                .map(|&position| graph.nodes[position].key())
                .ok_or(StructuralError::DanglingEdge { endpoint, id })
        };
        let source = endpoint_key("source", edge.source)?;
        let target = endpoint_key("target", edge.target)?;

        writer.write_event(Event::Start(
            BytesStart::new("edge").with_attributes([("source", source.as_str()), ("target", target.as_str())]),
        ))?;
        write_data(&mut writer, &key_ids, KeyDomain::Edge, &edge.attributes)?;
        writer.write_event(Event::End(BytesEnd::new("edge")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("graph")))?;
    writer.write_event(Event::End(BytesEnd::new("graphml")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

/// Write a graph to a GraphML file, replacing any existing file
pub fn write_graphml_file(graph: &GmlGraph, path: &Path) -> Result<()> {
    fs::write(path, to_graphml_string(graph)?)
        .wrap_err_with(|| format!("Failed to write GraphML file '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RELAY_MAP: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
  <key id="d0" for="node" attr.name="nodetype" attr.type="string"/>
  <key id="d1" for="node" attr.name="asn" attr.type="string"/>
  <key id="d2" for="node" attr.name="relay_ip" attr.type="string"/>
  <key id="d3" for="node" attr.name="countries" attr.type="string">
    <default>US</default>
  </key>
  <key id="d4" for="edge" attr.name="latency" attr.type="string"/>
  <key id="d5" for="graph" attr.name="source" attr.type="string"/>
  <graph edgedefault="undirected">
    <data key="d5">tor &amp; friends</data>
    <node id="9695DFC35FFEB861329B9F1AB04C46397020CE31">
      <data key="d0">relay</data>
      <data key="d1">AS30 University</data>
      <data key="d2">141.161.20.54</data>
    </node>
    <node id="1">
      <data key="d0">pop</data>
      <data key="d1"><![CDATA[AS10 <Backbone>]]></data>
      <data key="d3">USDC,USVA</data>
    </node>
    <node id="2"/>
    <edge source="9695DFC35FFEB861329B9F1AB04C46397020CE31" target="1">
      <data key="d4">2.0,2.1,2.2</data>
    </edge>
    <edge source="2" target="1"/>
  </graph>
</graphml>
"#;

    #[test]
    fn test_parse_relay_map() {
        let graph = parse_graphml(RELAY_MAP).unwrap();

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.attributes.get("source").map(String::as_str), Some("tor & friends"));
        assert_eq!(graph.attributes.get("directed").map(String::as_str), Some("0"));

        let relay = &graph.nodes[0];
        assert_eq!(relay.key(), "9695DFC35FFEB861329B9F1AB04C46397020CE31");
        assert_eq!(relay.attribute("nodetype"), Some("relay"));
        assert_eq!(relay.attribute("relay_ip"), Some("141.161.20.54"));

        assert_eq!(graph.nodes[1].attribute("asn"), Some("AS10 <Backbone>"));
        assert_eq!(graph.nodes[1].attribute("countries"), Some("USDC,USVA"));
        // Key defaults fill in missing data
        assert_eq!(graph.nodes[2].attribute("countries"), Some("US"));
        assert_eq!(graph.nodes[2].attribute("nodetype"), None);

        assert_eq!(graph.edges[0].attribute("latency"), Some("2.0,2.1,2.2"));
        assert_eq!(
            graph.edge_keys(),
            vec![
                ("9695DFC35FFEB861329B9F1AB04C46397020CE31".to_string(), "1".to_string()),
                ("2".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_edge_may_precede_its_nodes() {
        let graph = parse_graphml(
            r#"<graphml><graph edgedefault="directed">
                <edge source="a" target="b"/>
                <node id="a"/><node id="b"/>
            </graph></graphml>"#,
        )
        .unwrap();

        assert_eq!(graph.attributes.get("directed").map(String::as_str), Some("1"));
        assert_eq!(graph.edge_keys(), vec![("a".to_string(), "b".to_string())]);
    }

    #[test]
    fn test_unknown_endpoint_rejected() {
        let err = parse_graphml(
            r#"<graphml><graph edgedefault="undirected">
                <node id="a"/>
                <edge source="a" target="ghost"/>
            </graph></graphml>"#,
        )
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<StructuralError>(),
            Some(&StructuralError::UnknownEndpoint { endpoint: "target", key: "ghost".to_string() })
        );
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let err = parse_graphml(
            r#"<graphml><graph edgedefault="undirected"><node id="a"/><node id="a"/></graph></graphml>"#,
        )
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<StructuralError>(),
            Some(&StructuralError::DuplicateNodeKey("a".to_string()))
        );
    }

    #[test]
    fn test_nested_graph_is_skipped() {
        let graph = parse_graphml(
            r#"<graphml><graph edgedefault="undirected">
                <node id="outer">
                    <graph edgedefault="undirected"><node id="inner"/></graph>
                </node>
            </graph></graphml>"#,
        )
        .unwrap();

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].key(), "outer");
    }

    #[test]
    fn test_missing_graph_rejected() {
        assert!(parse_graphml("<graphml></graphml>").is_err());
        assert!(parse_graphml("<graphml><graph>").is_err());
    }

    fn output_graph() -> GmlGraph {
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
                    label: Some("dummynode".to_string()),
                    attributes: BTreeMap::from([("packetloss".to_string(), "US=0.001".to_string())]),
                },
            ],
            edges: vec![GmlEdge {
                source: 1,
                target: 0,
                attributes: BTreeMap::from([("latencies".to_string(), "10000.0".to_string())]),
            }],
            attributes: BTreeMap::from([
                ("directed".to_string(), "0".to_string()),
                ("packetloss".to_string(), "US=0.001".to_string()),
            ]),
        }
    }

    #[test]
    fn test_to_graphml_string_layout() {
        let text = to_graphml_string(&output_graph()).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains(r#"<key attr.name="packetloss" attr.type="string" for="graph" id="d0"/>"#));
        assert!(text.contains(r#"<key attr.name="asn" attr.type="string" for="node" id="d1"/>"#));
        assert!(text.contains(r#"<key attr.name="latencies" attr.type="string" for="edge" id="d5"/>"#));
        assert!(text.contains(r#"<graph edgedefault="undirected">"#));
        assert!(text.contains(r#"<data key="d1">10</data>"#));
        assert!(text.contains(r#"<edge source="dummynode" target="141.161.20.54">"#));
        assert!(!text.contains("attr.name=\"directed\""));
    }

    #[test]
    fn test_written_file_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("topology.graphml.xml");
        fs::write(&path, "stale contents").unwrap();

        let graph = output_graph();
        write_graphml_file(&graph, &path).unwrap();

        assert_eq!(parse_graphml_file(&path).unwrap(), graph);
    }
}
