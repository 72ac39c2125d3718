use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration file '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration file '{}'", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// Per-path CLI arguments that take precedence over YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bandwidth: Option<PathBuf>,
    pub loss: Option<PathBuf>,
    pub map: Option<PathBuf>,
    pub geo: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Apply CLI overrides to a configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    let fields = [
        ("bandwidth_path", &overrides.bandwidth, &mut config.bandwidth_path),
        ("loss_path", &overrides.loss, &mut config.loss_path),
        ("map_path", &overrides.map, &mut config.map_path),
        ("geo_path", &overrides.geo, &mut config.geo_path),
        ("output_path", &overrides.output, &mut config.output_path),
    ];

    for (name, value, target) in fields {
        if let Some(path) = value {
            info!("Overriding {} with {:?}", name, path);
            *target = path.clone();
        }
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

/// Resolve the configuration for a run: YAML file if given, else defaults,
/// then CLI overrides on top
pub fn resolve_config(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, overrides)?;
    Ok(config)
}
