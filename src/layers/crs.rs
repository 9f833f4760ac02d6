//! Reprojection into geographic longitude/latitude.

use geo::{Coord, Geometry, MapCoords};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use tracing::info;

use crate::models::{Crs, LayerRecord};

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Transforms coordinates from one source system into lon/lat degrees.
pub struct Reprojector {
    source: Proj,
    target: Proj,
}

impl Reprojector {
    pub fn new(source: &Crs) -> Result<Self, String> {
        let source = match source {
            Crs::Wgs84 => Proj::from_proj_string(WGS84_PROJ),
            Crs::Epsg(code) => Proj::from_epsg_code(*code),
            Crs::Proj(def) => Proj::from_proj_string(def),
        }
        .map_err(|e| format!("unsupported source CRS {}: {:?}", source, e))?;

        let target = Proj::from_proj_string(WGS84_PROJ)
            .map_err(|e| format!("failed to build target CRS: {:?}", e))?;

        Ok(Self { source, target })
    }

    /// Transform a single coordinate. Geographic input and output are in degrees.
    pub fn coord(&self, c: Coord<f64>) -> Result<Coord<f64>, String> {
        let mut point = if self.source.is_latlong() {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };

        transform(&self.source, &self.target, &mut point)
            .map_err(|e| format!("cannot reproject ({}, {}): {:?}", c.x, c.y, e))?;

        let out = Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        };
        if !(out.x.is_finite() && out.y.is_finite()) {
            return Err(format!("({}, {}) reprojected to a non-finite position", c.x, c.y));
        }
        Ok(out)
    }

    pub fn geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, String> {
        geometry.try_map_coords(|c| self.coord(c))
    }
}

/// Reproject every record in place. Record count and attributes are untouched.
pub fn reproject_records(records: &mut [LayerRecord], source: &Crs) -> Result<(), String> {
    let reprojector = Reprojector::new(source)?;
    info!("Reprojecting {} records from {}", records.len(), source);

    for record in records.iter_mut() {
        record.geometry = reprojector.geometry(&record.geometry)?;
    }
    Ok(())
}
