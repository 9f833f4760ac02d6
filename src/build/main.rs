//! Delivery map builder.
//!
//! Runs the zone/boundary/road pipeline and writes one self-contained HTML map.

mod config;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use zonemap::render::{HtmlMapRenderer, Renderer};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "build-map")]
#[command(about = "Build an interactive delivery zone map from KML and vector layers")]
struct Args {
    /// TOML config with [inputs] and [map] tables
    #[arg(short, long)]
    config: PathBuf,

    /// Output HTML file
    #[arg(short, long, default_value = "delivery_map.html")]
    output: PathBuf,

    /// Map access token (overrides the config)
    #[arg(long, env = "MAPBOX_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Zonemap Builder");
    info!("Config: {}", args.config.display());

    let mut config = Config::load_from_file(&args.config)?;
    if let Some(token) = args.token {
        config.inputs.access_token = token;
    }
    if config.inputs.access_token.is_empty() {
        warn!("No access token configured; the map tiles will not load");
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message("Normalizing zones and layers...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let output = zonemap::run(&config.inputs);
    spinner.finish_and_clear();
    let output = output.context("Pipeline failed")?;

    let stats = &output.stats;
    info!(
        "{} zones, {} boundary repairs, {} road repairs, {} region parts, {} complement parts",
        stats.zones.zones,
        stats.boundary_repair.repaired,
        stats.roads_repair.repaired,
        stats.region_parts,
        stats.complement_parts
    );

    let html = HtmlMapRenderer::new(config.map)
        .render(&output)
        .context("Failed to render map")?;

    fs::write(&args.output, html)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!("Map saved to {}", args.output.display());

    Ok(())
}
