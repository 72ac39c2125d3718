use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use topogen::config_loader::{resolve_config, CliOverrides};
use topogen::orchestrator::{
    generate_topology, log_summary, write_sample_topology, write_summary_json,
};

/// Build a Shadow topology from a Tor relay map and regional measurements
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional YAML file with input and output paths
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bandwidth CSV (country, region, download kbit/s, upload kbit/s)
    #[arg(long)]
    bandwidth: Option<PathBuf>,

    /// Packet-loss CSV (country, region, jitter, loss %, latency)
    #[arg(long)]
    loss: Option<PathBuf>,

    /// Raw relay map (GraphML, or GML for a .gml path)
    #[arg(long)]
    map: Option<PathBuf>,

    /// IPv4 range table (low,high,country per line)
    #[arg(long)]
    geo: Option<PathBuf>,

    /// Path of the generated topology (GraphML, or GML for a .gml path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the run summary as JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Write the small sample topology to this path and exit
    #[arg(
        long,
        conflicts_with_all = ["config", "bandwidth", "loss", "map", "geo", "output", "summary"]
    )]
    write_sample: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bandwidth: self.bandwidth.clone(),
            loss: self.loss.clone(),
            map: self.map.clone(),
            geo: self.geo.clone(),
            output: self.output.clone(),
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Some(path) = &args.write_sample {
        return write_sample_topology(path);
    }

    let config = resolve_config(args.config.as_deref(), &args.overrides())?;
    info!("Bandwidth: {:?}", config.bandwidth_path);
    info!("Packet loss: {:?}", config.loss_path);
    info!("Relay map: {:?}", config.map_path);
    info!("Geo table: {:?}", config.geo_path);

    let summary = generate_topology(&config)?;
    log_summary(&summary);
    if let Some(path) = &args.summary {
        write_summary_json(&summary, path)?;
    }

    info!("Ready to run Shadow with topology {:?}", config.output_path);
    Ok(())
}
