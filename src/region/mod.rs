//! Region algebra: the served region and everything around it.
//!
//! `region` is the union of all boundary polygons; `complement` is a fixed
//! outer box minus that region, i.e. the area that is not served.

use geo::{unary_union, BooleanOps, Coord, Geometry, MultiPolygon, Polygon, Rect, Validation};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::layers::zero_buffer;
use crate::models::VectorLayer;

/// Axis-aligned lon/lat rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OuterBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// Continental extent the complement is cut from.
pub const CONTINENTAL_BOX: OuterBox = OuterBox {
    min_lon: -130.0,
    min_lat: 20.0,
    max_lon: -60.0,
    max_lat: 55.0,
};

impl OuterBox {
    pub fn to_polygon(&self) -> Polygon<f64> {
        Rect::new(
            Coord {
                x: self.min_lon,
                y: self.min_lat,
            },
            Coord {
                x: self.max_lon,
                y: self.max_lat,
            },
        )
        .to_polygon()
    }

    pub fn area(&self) -> f64 {
        (self.max_lon - self.min_lon).abs() * (self.max_lat - self.min_lat).abs()
    }
}

/// The served region and its complement within the outer box.
#[derive(Debug, Clone)]
pub struct Regions {
    pub region: MultiPolygon<f64>,
    pub complement: MultiPolygon<f64>,
}

/// Union every polygonal geometry of the layer. Input order does not matter.
pub fn union_boundaries(layer: &VectorLayer) -> MultiPolygon<f64> {
    let mut polygons: Vec<Polygon<f64>> = Vec::with_capacity(layer.len());
    let mut ignored = 0;

    for record in &layer.records {
        match &record.geometry {
            Geometry::Polygon(p) => polygons.push(p.clone()),
            Geometry::MultiPolygon(mp) => polygons.extend(mp.0.iter().cloned()),
            Geometry::Rect(r) => polygons.push(r.to_polygon()),
            Geometry::Triangle(t) => polygons.push(t.to_polygon()),
            _ => ignored += 1,
        }
    }

    if ignored > 0 {
        debug!("Ignoring {} non-polygonal records in {}", ignored, layer.name);
    }
    if polygons.is_empty() {
        warn!("{} has no polygons; region is empty", layer.name);
    }

    let region = unary_union(polygons.iter());
    info!(
        "Unioned {} polygons from {} into {} parts",
        polygons.len(),
        layer.name,
        region.0.len()
    );
    region
}

/// `outer_box - region`.
///
/// An invalid region gets one more zero-width repair; if it is still invalid,
/// or the difference comes out invalid, this fails with [`Error::Geometry`].
pub fn complement(outer_box: &OuterBox, region: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    let repaired;
    let region = if region.is_valid() {
        region
    } else {
        warn!("Region is invalid; attempting zero-width repair");
        repaired = zero_buffer(region);
        if !repaired.is_valid() {
            return Err(Error::Geometry(
                "region is invalid and could not be repaired".to_string(),
            ));
        }
        &repaired
    };

    let outer = MultiPolygon::new(vec![outer_box.to_polygon()]);
    let complement = outer.difference(region);

    if !complement.is_valid() {
        return Err(Error::Geometry(
            "difference of outer box and region is invalid".to_string(),
        ));
    }

    debug!("Complement has {} parts", complement.0.len());
    Ok(complement)
}

/// Compute the region of a repaired boundary layer and its complement.
pub fn compute_regions(boundary: &VectorLayer, outer_box: &OuterBox) -> Result<Regions> {
    let region = union_boundaries(boundary);
    let complement = complement(outer_box, &region)?;
    Ok(Regions { region, complement })
}
