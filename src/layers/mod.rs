//! Vector layer loading, reprojection and repair.
//!
//! Boundary and road datasets are read from GeoJSON or shapefiles, brought
//! into lon/lat degrees, and have invalid polygons fixed before any set
//! algebra runs on them.

mod crs;
mod loader;
mod repair;

pub use crs::{reproject_records, Reprojector};
pub use loader::{crs_from_wkt, load_layer, DatasetFormat, LayerSource};
pub use repair::{repair_geometry, repair_layer, zero_buffer, RepairReport};
