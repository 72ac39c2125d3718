use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default bandwidth export (country, region, download kbit/s, upload kbit/s)
pub const DEFAULT_BANDWIDTH_PATH: &str = "aggregate_mean_netspeeds.csv";
/// Default network-quality export (country, region, jitter, loss %, latency)
pub const DEFAULT_LOSS_PATH: &str = "aggregate_mean_netquality.csv";
/// Default raw relay map
pub const DEFAULT_MAP_PATH: &str = "full_tor_map.xml";
/// Default IPv4 range table
pub const DEFAULT_GEO_PATH: &str = "geoip";
/// Default generated topology
pub const DEFAULT_OUTPUT_PATH: &str = "topology.full.graphml.xml";

/// Input and output locations for one topology build.
///
/// Every field falls back to its default file name when omitted from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_bandwidth_path")]
    pub bandwidth_path: PathBuf,
    #[serde(default = "default_loss_path")]
    pub loss_path: PathBuf,
    #[serde(default = "default_map_path")]
    pub map_path: PathBuf,
    #[serde(default = "default_geo_path")]
    pub geo_path: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

fn default_bandwidth_path() -> PathBuf {
    PathBuf::from(DEFAULT_BANDWIDTH_PATH)
}

fn default_loss_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOSS_PATH)
}

fn default_map_path() -> PathBuf {
    PathBuf::from(DEFAULT_MAP_PATH)
}

fn default_geo_path() -> PathBuf {
    PathBuf::from(DEFAULT_GEO_PATH)
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bandwidth_path: default_bandwidth_path(),
            loss_path: default_loss_path(),
            map_path: default_map_path(),
            geo_path: default_geo_path(),
            output_path: default_output_path(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} cannot be empty")]
    EmptyPath(&'static str),
    #[error("output_path '{path}' would overwrite the {input}")]
    OutputOverwritesInput { path: String, input: &'static str },
}

impl Config {
    /// Input paths with the field name used in error messages
    pub fn inputs(&self) -> [(&'static str, &PathBuf); 4] {
        [
            ("bandwidth_path", &self.bandwidth_path),
            ("loss_path", &self.loss_path),
            ("map_path", &self.map_path),
            ("geo_path", &self.geo_path),
        ]
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, path) in self.inputs() {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyPath(name));
            }
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("output_path"));
        }

        for (name, path) in self.inputs() {
            if *path == self.output_path {
                return Err(ConfigError::OutputOverwritesInput {
                    path: self.output_path.display().to_string(),
                    input: name,
                });
            }
        }

        Ok(())
    }
}
