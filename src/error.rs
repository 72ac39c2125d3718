//! Error types shared across the pipeline stages.
//!
//! Both kinds are fatal: the run stops and no output file is written.
//! Stage functions wrap them in `color_eyre` reports with context, so callers
//! that need the failure class can `downcast_ref` the report.

/// A corrupt input record or a node/edge missing a required attribute.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RecordError {
    #[error("packet loss {fraction} for region '{code}' is outside the open interval (0, 1)")]
    LossOutOfRange { code: String, fraction: f64 },

    #[error("invalid throughput {value} kbit/s for region '{code}'")]
    InvalidThroughput { code: String, value: f64 },

    #[error("packet-loss source contains no records")]
    NoLossRecords,

    #[error("malformed geo entry on line {line}: {reason}")]
    GeoEntry { line: usize, reason: String },

    #[error("invalid IPv4 address '{0}'")]
    InvalidIp(String),

    #[error("{kind} node '{node}' is missing required attribute '{attribute}'")]
    MissingNodeAttribute {
        kind: &'static str,
        node: String,
        attribute: &'static str,
    },

    #[error("edge {from} -- {to} is missing required attribute '{attribute}'")]
    MissingEdgeAttribute {
        from: String,
        to: String,
        attribute: &'static str,
    },
}

/// A violation of the single-component invariant or a dangling reference.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StructuralError {
    #[error("input topology has {components} connected components, expected exactly 1")]
    InputNotConnected { components: usize },

    #[error("output topology has {components} connected components, expected exactly 1")]
    OutputNotConnected { components: usize },

    #[error("duplicate node id {0} in topology file")]
    DuplicateNodeId(u32),

    #[error("edge references non-existent {endpoint} node {id}")]
    DanglingEdge { endpoint: &'static str, id: u32 },

    #[error("edge references unknown {endpoint} node '{key}'")]
    UnknownEndpoint { endpoint: &'static str, key: String },

    #[error("duplicate node key '{0}' in topology file")]
    DuplicateNodeKey(String),

    #[error("node '{0}' uses the key reserved for the aggregator node")]
    ReservedNodeKey(String),
}
