//! Single-run normalization pipeline.
//!
//! Every input arrives through [`PipelineInputs`]; nothing is read from the
//! process environment. Stages run to completion one after another and the
//! first fatal error aborts the run, so a [`PipelineOutput`] only exists when
//! every stage succeeded.

use std::path::PathBuf;
use std::time::Instant;

use serde::Deserialize;
use tracing::info;

use crate::assembler::{assemble, MapLayers};
use crate::error::Result;
use crate::layers::{load_layer, repair_layer, LayerSource, RepairReport};
use crate::region::{compute_regions, CONTINENTAL_BOX};
use crate::zones::{extract_zones_from_path, ExtractReport};

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineInputs {
    /// KML document with the delivery zone placemarks.
    pub zones: PathBuf,
    pub boundary: LayerSource,
    pub roads: LayerSource,
    /// Passed through to the renderer untouched.
    #[serde(default)]
    pub access_token: String,
}

/// Per-stage counters of a completed run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub zones: ExtractReport,
    pub boundary_repair: RepairReport,
    pub roads_repair: RepairReport,
    pub region_parts: usize,
    pub complement_parts: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub layers: MapLayers,
    pub access_token: String,
    pub stats: PipelineStats,
}

/// Run every stage and assemble the map layers.
pub fn run(inputs: &PipelineInputs) -> Result<PipelineOutput> {
    let start = Instant::now();

    let mut boundary = load_layer("boundary", &inputs.boundary)?;
    let mut roads = load_layer("roads", &inputs.roads)?;

    let boundary_repair = repair_layer(&mut boundary);
    let roads_repair = repair_layer(&mut roads);

    let extraction = extract_zones_from_path(&inputs.zones)?;

    let regions = compute_regions(&boundary, &CONTINENTAL_BOX)?;

    let layers = assemble(&extraction.zones, &boundary, &roads, &regions);

    info!(
        "Data conversion took {:.2} seconds.",
        start.elapsed().as_secs_f64()
    );

    Ok(PipelineOutput {
        layers,
        access_token: inputs.access_token.clone(),
        stats: PipelineStats {
            zones: extraction.report,
            boundary_repair,
            roads_repair,
            region_parts: regions.region.0.len(),
            complement_parts: regions.complement.0.len(),
        },
    })
}
