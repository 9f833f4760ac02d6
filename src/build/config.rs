use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use zonemap::render::MapStyle;
use zonemap::PipelineInputs;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inputs: PipelineInputs,
    #[serde(default)]
    pub map: MapStyle,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
