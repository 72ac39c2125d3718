//! # Topogen - Shadow topology builder for Tor network simulations
//!
//! This library turns a raw Tor relay map plus regional measurement data into
//! a single attributed topology file for the Shadow network simulator.
//!
//! ## Overview
//!
//! The raw map describes three kinds of nodes: points of presence (PoPs),
//! relays and destinations, joined by edges that carry latency samples.
//! Topogen re-keys those nodes by IP address or PoP id, annotates them with
//! geocodes and AS numbers, and attaches per-region bandwidth and packet-loss
//! statistics to the graph.
//!
//! ## Architecture
//!
//! - `config`: Input/output paths with defaults and validation
//! - `config_loader`: YAML loading and CLI overrides
//! - `measurements`: Bandwidth and packet-loss tables keyed by region code
//! - `geo`: IPv4 range table and country lookup
//! - `gml_parser` / `gml_writer`: GML reading and writing
//! - `graphml`: GraphML reading and writing into the same attribute graph
//! - `graph_io`: Picks GML or GraphML from the file extension
//! - `topology`: Raw node typing, the transform, and connectivity checks
//! - `orchestrator`: Runs a complete build
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use topogen::{config::Config, orchestrator};
//!
//! let summary = orchestrator::generate_topology(&Config::default())?;
//! println!("{} nodes written", summary.output_nodes);
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Guarantees
//!
//! The written topology always forms exactly one connected component. A
//! synthetic `dummynode` carries the aggregate statistics and is linked to
//! the rest of the graph by a single high-latency edge.
//!
//! ## Error Handling
//!
//! Domain failures are `thiserror` enums (`RecordError`, `StructuralError`,
//! `ConfigError`) wrapped in `color_eyre` reports. No output is written when
//! a build fails.

pub mod error;
pub mod config;
pub mod config_loader;
pub mod measurements;
pub mod geo;
pub mod gml_parser;
pub mod gml_writer;
pub mod graphml;
pub mod graph_io;
pub mod topology;
pub mod orchestrator;

pub use error::{RecordError, StructuralError};
