//! Topology build orchestrator.
//!
//! This module runs the whole build in order: load the measurement tables
//! and the geo table, merge the statistics, transform the relay map, and
//! write the result. Nothing is written unless every stage succeeds.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::geo::load_geo_table;
use crate::graph_io::{read_graph_file, write_graph_file};
use crate::measurements::{load_bandwidth, load_packet_loss};
use crate::topology::{merge_aggregates, sample_graph, transform_topology, AggregateStrings};

/// What a build produced, for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub output_nodes: usize,
    pub output_edges: usize,
    pub skipped_nodes: Vec<String>,
    pub skipped_edges: Vec<(String, String)>,
    /// Region codes with bandwidth data but no loss data
    pub mean_loss_regions: Vec<String>,
    pub aggregates: AggregateStrings,
}

/// Build the topology described by `config` and write it to its output path
pub fn generate_topology(config: &Config) -> Result<RunSummary> {
    config.validate()?;

    let bandwidth = load_bandwidth(&config.bandwidth_path)?;
    let loss = load_packet_loss(&config.loss_path)?;

    let merged = merge_aggregates(&bandwidth, &loss);
    if !merged.mean_filled.is_empty() {
        info!(
            "Using mean packet loss {} for {} regions without loss data",
            loss.mean,
            merged.mean_filled.len()
        );
    }

    let geo = load_geo_table(&config.geo_path)?;

    info!("Loading relay map from: {:?}", config.map_path);
    let raw = read_graph_file(&config.map_path)?;

    let (graph, report) = transform_topology(&raw, &merged.strings, &geo)
        .wrap_err_with(|| format!("Failed to transform relay map '{}'", config.map_path.display()))?;

    write_graph_file(&graph.to_gml(), &config.output_path)?;
    info!("Wrote topology to {:?}", config.output_path);

    Ok(RunSummary {
        output_nodes: graph.nodes().len(),
        output_edges: graph.edges().len(),
        skipped_nodes: report.skipped_nodes,
        skipped_edges: report.skipped_edges,
        mean_loss_regions: merged.mean_filled,
        aggregates: merged.strings,
    })
}

/// Write the built-in sample topology
pub fn write_sample_topology(path: &Path) -> Result<()> {
    write_graph_file(&sample_graph().to_gml(), path)?;
    info!("Wrote sample topology to {:?}", path);
    Ok(())
}

/// Write a run summary as pretty-printed JSON
pub fn write_summary_json(summary: &RunSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .wrap_err("Failed to serialize run summary to JSON")?;

    fs::write(path, json)
        .wrap_err_with(|| format!("Failed to write run summary to {}", path.display()))?;

    info!("Run summary written to {}", path.display());
    Ok(())
}

/// Log a run summary
pub fn log_summary(summary: &RunSummary) {
    info!(
        "Topology has {} nodes and {} edges",
        summary.output_nodes, summary.output_edges
    );
    if !summary.skipped_nodes.is_empty() {
        warn!("{} raw nodes were skipped", summary.skipped_nodes.len());
    }
    if !summary.skipped_edges.is_empty() {
        warn!("{} raw edges were skipped", summary.skipped_edges.len());
    }
}
