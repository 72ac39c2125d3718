use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use color_eyre::eyre::{Result, eyre, WrapErr};

use crate::error::StructuralError;

/// Represents a node in a GML graph
#[derive(Debug, Clone, PartialEq)]
pub struct GmlNode {
    pub id: u32,
    pub label: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl GmlNode {
    /// The node's name in the source topology: its label, or the numeric id
    /// when no label was written.
    pub fn key(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.id.to_string())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Represents an edge in a GML graph
#[derive(Debug, Clone, PartialEq)]
pub struct GmlEdge {
    pub source: u32,
    pub target: u32,
    pub attributes: BTreeMap<String, String>,
}

impl GmlEdge {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Represents a complete graph.
///
/// Both the GML and the GraphML readers produce this attribute bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GmlGraph {
    pub nodes: Vec<GmlNode>,
    pub edges: Vec<GmlEdge>,
    pub attributes: BTreeMap<String, String>,
}

impl GmlGraph {
    /// Map from numeric node id to position in `nodes`
    pub fn index_by_id(&self) -> HashMap<u32, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, index))
            .collect()
    }

    /// Source and target keys for every edge, in edge order.
    ///
    /// Call [`validate_topology`] first; edges naming unknown ids are skipped.
    pub fn edge_keys(&self) -> Vec<(String, String)> {
        let index = self.index_by_id();
        self.edges
            .iter()
            .filter_map(|edge| {
                let source = index.get(&edge.source)?;
                let target = index.get(&edge.target)?;
                Some((self.nodes[*source].key(), self.nodes[*target].key()))
            })
            .collect()
    }
}

/// A parsed GML value: either a scalar or a nested `[ ... ]` list
#[derive(Debug, Clone, PartialEq)]
enum GmlValue {
    Scalar(String),
    List(Vec<(String, GmlValue)>),
}

/// Token types for GML parsing
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Key(String),
    Number(String),
    Text(String),
    Open,
    Close,
    Eof,
}

/// Tokenizer for GML text
struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if ch == Some('\n') {
            self.line += 1;
        }
        ch
    }

    fn skip_trivia(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '#' {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn read_text(&mut self) -> Result<String> {
        let start_line = self.line;
        self.bump(); // opening quote
        let mut result = String::new();

        while let Some(ch) = self.bump() {
            match ch {
                '"' => return Ok(result),
                '\\' => match self.bump() {
                    Some('n') => result.push('\n'),
                    Some('t') => result.push('\t'),
                    Some('r') => result.push('\r'),
                    Some('\\') => result.push('\\'),
                    Some('"') => result.push('"'),
                    Some(other) => {
                        result.push('\\');
                        result.push(other);
                    }
                    None => break,
                },
                _ => result.push(ch),
            }
        }

        Err(eyre!("Unterminated string starting on line {}", start_line))
    }

    fn read_word(&mut self) -> String {
        let mut result = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphanumeric() || matches!(ch, '_' | '.' | '-' | '+') {
                result.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        result
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();

        match self.chars.peek().copied() {
            None => Ok(Token::Eof),
            Some('[') => {
                self.bump();
                Ok(Token::Open)
            }
            Some(']') => {
                self.bump();
                Ok(Token::Close)
            }
            Some('"') => Ok(Token::Text(self.read_text()?)),
            Some(ch) if ch.is_alphabetic() || ch == '_' => Ok(Token::Key(self.read_word())),
            Some(ch) if ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.') => {
                Ok(Token::Number(self.read_word()))
            }
            Some(ch) => Err(eyre!("Unexpected character '{}' on line {}", ch, self.line)),
        }
    }
}

/// Recursive-descent parser producing nested key/value lists
struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Parse `key value` pairs until `]` (nested) or end of input (top level)
    fn parse_list(&mut self, nested: bool) -> Result<Vec<(String, GmlValue)>> {
        let mut entries = Vec::new();

        loop {
            match self.advance()? {
                Token::Close if nested => return Ok(entries),
                Token::Eof if !nested => return Ok(entries),
                Token::Eof => {
                    return Err(eyre!("Unexpected end of input, missing ']'"));
                }
                Token::Key(key) => {
                    let value = self.parse_value(&key)?;
                    entries.push((key, value));
                }
                other => {
                    return Err(eyre!(
                        "Expected attribute name on line {}, found {:?}",
                        self.lexer.line,
                        other
                    ));
                }
            }
        }
    }

    fn parse_value(&mut self, key: &str) -> Result<GmlValue> {
        match self.advance()? {
            Token::Open => Ok(GmlValue::List(self.parse_list(true)?)),
            Token::Key(value) | Token::Number(value) | Token::Text(value) => {
                Ok(GmlValue::Scalar(value))
            }
            other => Err(eyre!(
                "Expected value for '{}' on line {}, found {:?}",
                key,
                self.lexer.line,
                other
            )),
        }
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| eyre!("Invalid {}: {}", key, value))
}

/// Scalar attributes of a list; nested lists such as `graphics` are dropped
fn scalar_attributes(entries: Vec<(String, GmlValue)>) -> BTreeMap<String, String> {
    entries
        .into_iter()
        .filter_map(|(key, value)| match value {
            GmlValue::Scalar(value) => Some((key, value)),
            GmlValue::List(_) => None,
        })
        .collect()
}

fn build_node(entries: Vec<(String, GmlValue)>) -> Result<GmlNode> {
    let mut attributes = scalar_attributes(entries);

    let id = attributes
        .remove("id")
        .ok_or_else(|| eyre!("Node missing required 'id' attribute"))?;
    let id = parse_u32("node id", &id)?;
    let label = attributes.remove("label");

    Ok(GmlNode { id, label, attributes })
}

fn build_edge(entries: Vec<(String, GmlValue)>) -> Result<GmlEdge> {
    let mut attributes = scalar_attributes(entries);

    let source = attributes
        .remove("source")
        .ok_or_else(|| eyre!("Edge missing required 'source' attribute"))?;
    let target = attributes
        .remove("target")
        .ok_or_else(|| eyre!("Edge missing required 'target' attribute"))?;

    Ok(GmlEdge {
        source: parse_u32("edge source", &source)?,
        target: parse_u32("edge target", &target)?,
        attributes,
    })
}

/// Parse GML text into a graph
pub fn parse_gml(content: &str) -> Result<GmlGraph> {
    let mut parser = Parser::new(content)?;
    let document = parser.parse_list(false)?;

    let body = document
        .into_iter()
        .find_map(|(key, value)| match (key.as_str(), value) {
            ("graph", GmlValue::List(body)) => Some(body),
            _ => None,
        })
        .ok_or_else(|| eyre!("No 'graph [ ... ]' block found"))?;

    let mut graph = GmlGraph::default();
    for (key, value) in body {
        match (key.as_str(), value) {
            ("node", GmlValue::List(entries)) => graph.nodes.push(build_node(entries)?),
            ("edge", GmlValue::List(entries)) => graph.edges.push(build_edge(entries)?),
            (_, GmlValue::Scalar(value)) => {
                graph.attributes.insert(key, value);
            }
            (_, GmlValue::List(_)) => {}
        }
    }

    Ok(graph)
}

/// Parse a GML file and return a GmlGraph object
pub fn parse_gml_file(path: &Path) -> Result<GmlGraph> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read GML file '{}'", path.display()))?;

    parse_gml(&content).wrap_err_with(|| format!("Failed to parse GML file '{}'", path.display()))
}

/// Check node ids are unique and every edge references an existing node
pub fn validate_topology(graph: &GmlGraph) -> Result<(), StructuralError> {
    let mut node_ids = HashSet::new();
    for node in &graph.nodes {
        if !node_ids.insert(node.id) {
            return Err(StructuralError::DuplicateNodeId(node.id));
        }
    }

    for edge in &graph.edges {
        if !node_ids.contains(&edge.source) {
            return Err(StructuralError::DanglingEdge { endpoint: "source", id: edge.source });
        }
        if !node_ids.contains(&edge.target) {
            return Err(StructuralError::DanglingEdge { endpoint: "target", id: edge.target });
        }
    }

    Ok(())
}
