//! Zonemap - delivery zone map builder
//!
//! Normalizes KML delivery zones and boundary/road vector layers into
//! GeoJSON, computing the unserved area around the served region.

pub mod assembler;
pub mod error;
pub mod layers;
pub mod models;
pub mod pipeline;
pub mod region;
pub mod render;
pub mod zones;

pub use error::{Error, Result};
pub use models::{Crs, LayerRecord, VectorLayer, Zone};
pub use pipeline::{run, PipelineInputs, PipelineOutput};
