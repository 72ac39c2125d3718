//! Typed view of the raw relay map.
//!
//! Raw nodes carry an open attribute bag. The node pass converts each one
//! into exactly one [`RawNode`] variant holding only the fields it needs, so
//! the rest of the transform works on closed types.

use std::collections::HashMap;

use crate::error::RecordError;
use crate::gml_parser::GmlNode;

/// Geocode assigned to a PoP that lists no countries
pub const DEFAULT_POP_GEOCODES: &str = "US";

/// Marker that identifies a destination node id such as `dest_1_2_3_4`
pub const DEST_MARKER: &str = "dest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopNode {
    pub nodeid: String,
    pub countries: Option<String>,
    pub asn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayNode {
    /// Relay fingerprint; edges in the raw map refer to relays by it
    pub fingerprint: String,
    pub relay_ip: String,
    pub asn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestNode {
    pub nodeid: String,
    pub country: String,
    pub asn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawNode {
    Pop(PopNode),
    Relay(RelayNode),
    Dest(DestNode),
}

/// Outcome of reading a raw node's `nodetype`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Typed(RawNode),
    /// No `nodetype` attribute at all
    Untyped,
    /// A `nodetype` naming none of pop, relay or dest
    Unknown(String),
}

/// Extract the AS number from strings like `"AS3356 Level 3"`.
///
/// Takes the first whitespace-separated token and drops its two-character
/// prefix. Returns `None` when the string has no token.
pub fn parse_asn(raw: &str) -> Option<String> {
    raw.split_whitespace()
        .next()
        .map(|token| token.chars().skip(2).collect())
}

/// Turn a destination id `prefix_a_b_c_d` into the address `a.b.c.d`
pub fn dest_id_to_ip(id: &str) -> String {
    id.split('_').skip(1).collect::<Vec<_>>().join(".")
}

/// Rewrite a raw edge endpoint into an output node key.
///
/// Destination ids become their embedded address, relay fingerprints become
/// the relay's IP, and anything else (PoP ids) is kept as is.
pub fn rewrite_endpoint(id: &str, fingerprints: &HashMap<String, String>) -> String {
    if id.contains(DEST_MARKER) {
        dest_id_to_ip(id)
    } else if let Some(ip) = fingerprints.get(id) {
        ip.clone()
    } else {
        id.to_string()
    }
}

fn required<'a>(node: &'a GmlNode, kind: &'static str, attribute: &'static str) -> Result<&'a str, RecordError> {
    node.attribute(attribute)
        .ok_or_else(|| RecordError::MissingNodeAttribute {
            kind,
            node: node.key(),
            attribute,
        })
}

fn required_asn(node: &GmlNode, kind: &'static str) -> Result<String, RecordError> {
    parse_asn(required(node, kind, "asn")?).ok_or_else(|| RecordError::MissingNodeAttribute {
        kind,
        node: node.key(),
        attribute: "asn",
    })
}

impl RawNode {
    /// Classify a raw node by its `nodetype` attribute.
    ///
    /// Matching is by substring in the order pop, relay, dest. A typed node
    /// missing one of its required attributes is an error.
    pub fn classify(node: &GmlNode) -> Result<Classified, RecordError> {
        let Some(nodetype) = node.attribute("nodetype") else {
            return Ok(Classified::Untyped);
        };

        let raw = if nodetype.contains("pop") {
            RawNode::Pop(PopNode {
                nodeid: required(node, "pop", "nodeid")?.to_string(),
                countries: node.attribute("countries").map(str::to_string),
                asn: required_asn(node, "pop")?,
            })
        } else if nodetype.contains("relay") {
            RawNode::Relay(RelayNode {
                fingerprint: node.key(),
                relay_ip: required(node, "relay", "relay_ip")?.to_string(),
                asn: required_asn(node, "relay")?,
            })
        } else if nodetype.contains(DEST_MARKER) {
            RawNode::Dest(DestNode {
                nodeid: required(node, "dest", "nodeid")?.to_string(),
                country: required(node, "dest", "country")?.to_string(),
                asn: required_asn(node, "dest")?,
            })
        } else {
            return Ok(Classified::Unknown(nodetype.to_string()));
        };

        Ok(Classified::Typed(raw))
    }
}

impl PopNode {
    pub fn geocodes(&self) -> &str {
        self.countries.as_deref().unwrap_or(DEFAULT_POP_GEOCODES)
    }
}

impl DestNode {
    pub fn ip(&self) -> String {
        dest_id_to_ip(&self.nodeid)
    }
}
