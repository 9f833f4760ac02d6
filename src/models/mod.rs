//! Core data models for the zone map pipeline.

pub mod layer;
pub mod zone;

pub use layer::{Crs, LayerRecord, VectorLayer, WGS84_EPSG};
pub use zone::{close_ring, Zone, UNNAMED_ZONE};
