//! Zero-width buffer repair for invalid polygon geometries.

use geo::{unary_union, BooleanOps, Geometry, MultiPolygon, Polygon, Validation};
use tracing::{debug, info, warn};

use crate::models::VectorLayer;

/// Outcome of one repair pass over a layer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub checked: usize,
    pub invalid: usize,
    pub repaired: usize,
    /// Invalid records the repair could not fix (including non-polygonal ones).
    pub unrepaired: usize,
}

/// Re-derive a polygon boundary, the equivalent of buffering by a distance
/// of zero.
///
/// Each part goes through the overlay engine on its own, which splits
/// self-intersections into simple parts and drops zero-area rings. The
/// cleaned parts are then merged, so overlapping parts are filled rather
/// than cancelled out.
pub fn zero_buffer(polygons: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let empty = MultiPolygon::new(Vec::new());
    let parts: Vec<Polygon<f64>> = polygons
        .iter()
        .flat_map(|polygon| MultiPolygon::new(vec![polygon.clone()]).union(&empty))
        .collect();
    unary_union(parts.iter())
}

/// Repair a single geometry. Returns `None` for non-polygonal input.
pub fn repair_geometry(geometry: &Geometry<f64>) -> Option<Geometry<f64>> {
    let polygons = match geometry {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
        Geometry::MultiPolygon(mp) => mp.clone(),
        Geometry::Rect(r) => MultiPolygon::new(vec![r.to_polygon()]),
        Geometry::Triangle(t) => MultiPolygon::new(vec![t.to_polygon()]),
        _ => return None,
    };

    let mut repaired = zero_buffer(&polygons);
    if repaired.0.len() == 1 {
        repaired.0.pop().map(Geometry::Polygon)
    } else {
        Some(Geometry::MultiPolygon(repaired))
    }
}

/// Repair the invalid records of a layer in place.
///
/// Validity of the whole layer is checked first and only invalid records are
/// touched, so a valid layer comes back exactly as it went in. Repair is
/// best-effort: a record may still be invalid afterwards.
pub fn repair_layer(layer: &mut VectorLayer) -> RepairReport {
    let invalid: Vec<usize> = layer
        .records
        .iter()
        .enumerate()
        .filter(|(_, record)| !record.geometry.is_valid())
        .map(|(index, _)| index)
        .collect();

    let mut report = RepairReport {
        checked: layer.records.len(),
        invalid: invalid.len(),
        ..Default::default()
    };

    if invalid.is_empty() {
        debug!("All {} {} geometries are valid", report.checked, layer.name);
        return report;
    }

    warn!(
        "Fixing {} invalid geometries in {}...",
        invalid.len(),
        layer.name
    );

    for index in invalid {
        let record = &mut layer.records[index];
        let Some(repaired) = repair_geometry(&record.geometry) else {
            debug!("Record {} in {} is not polygonal; left as is", index, layer.name);
            report.unrepaired += 1;
            continue;
        };

        if repaired.is_valid() {
            report.repaired += 1;
        } else {
            warn!("Record {} in {} is still invalid after repair", index, layer.name);
            report.unrepaired += 1;
        }
        record.geometry = repaired;
    }

    info!(
        "Repaired {}/{} invalid geometries in {}",
        report.repaired, report.invalid, layer.name
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Crs, LayerRecord};
    use geo::{polygon, Area, LineString};
    use geojson::JsonObject;

    fn layer(geometries: Vec<Geometry<f64>>) -> VectorLayer {
        let records = geometries
            .into_iter()
            .map(|g| LayerRecord::new(g, JsonObject::new()))
            .collect();
        VectorLayer::new("test", Crs::Wgs84, records)
    }

    fn bowtie() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ])
    }

    fn square() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 10.0, y: 10.0),
            (x: 11.0, y: 10.0),
            (x: 11.0, y: 11.0),
            (x: 10.0, y: 11.0),
            (x: 10.0, y: 10.0),
        ])
    }

    #[test]
    fn test_bowtie_split_into_lobes() {
        assert!(!bowtie().is_valid());

        let mut layer = layer(vec![bowtie()]);
        let report = repair_layer(&mut layer);

        assert_eq!(report.invalid, 1);
        assert_eq!(layer.len(), 1);

        let repaired = &layer.records[0].geometry;
        assert!(matches!(
            repaired,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_)
        ));
        // Two triangular lobes of area 1 each
        assert!((repaired.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_valid_layer_unchanged() {
        let original = layer(vec![square(), square()]);
        let mut repaired = original.clone();
        let report = repair_layer(&mut repaired);

        assert_eq!(report.invalid, 0);
        assert_eq!(report.checked, 2);
        assert_eq!(repaired.records, original.records);
    }

    #[test]
    fn test_only_invalid_records_touched() {
        let mut layer = layer(vec![square(), bowtie()]);
        layer.records[0]
            .properties
            .insert("NAME".to_string(), "Lake".into());

        let report = repair_layer(&mut layer);

        assert_eq!(report.invalid, 1);
        assert_eq!(layer.records[0].geometry, square());
        assert_eq!(layer.records[0].properties["NAME"], "Lake");
    }

    #[test]
    fn test_degenerate_ring_removed() {
        let flat = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ]);
        let mut layer = layer(vec![flat]);
        repair_layer(&mut layer);

        assert_eq!(layer.len(), 1);
        assert!(layer.records[0].geometry.unsigned_area() < 1e-12);
    }

    #[test]
    fn test_invalid_line_left_alone() {
        let nan_line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (f64::NAN, 1.0)]));
        let mut layer = layer(vec![nan_line]);
        let report = repair_layer(&mut layer);

        assert_eq!(report.unrepaired, 1);
        assert!(matches!(layer.records[0].geometry, Geometry::LineString(_)));
    }

    #[test]
    fn test_overlapping_parts_are_merged() {
        let overlapping = Geometry::MultiPolygon(MultiPolygon::new(vec![
            polygon![(x: -90.0, y: 30.0), (x: -89.0, y: 30.0), (x: -89.0, y: 31.0), (x: -90.0, y: 31.0), (x: -90.0, y: 30.0)],
            polygon![(x: -89.5, y: 30.5), (x: -88.5, y: 30.5), (x: -88.5, y: 31.5), (x: -89.5, y: 31.5), (x: -89.5, y: 30.5)],
        ]));
        assert!(!overlapping.is_valid());

        let mut layer = layer(vec![overlapping]);
        let report = repair_layer(&mut layer);

        assert_eq!(report.repaired, 1);
        let repaired = &layer.records[0].geometry;
        assert!(matches!(repaired, Geometry::Polygon(_)));
        assert!((repaired.unsigned_area() - 1.75).abs() < 1e-9);

        let region = crate::region::union_boundaries(&layer);
        assert!((region.unsigned_area() - 1.75).abs() < 1e-9);
    }

    #[test]
    fn test_bowtie_next_to_square_keeps_both_lobes() {
        let parts = match bowtie() {
            Geometry::Polygon(p) => vec![p, polygon![(x: 5.0, y: 0.0), (x: 6.0, y: 0.0), (x: 6.0, y: 1.0), (x: 5.0, y: 1.0), (x: 5.0, y: 0.0)]],
            _ => unreachable!(),
        };
        let repaired = zero_buffer(&MultiPolygon::new(parts));
        assert!((repaired.unsigned_area() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_repair_idempotent_on_valid_geometry() {
        let repaired = repair_geometry(&square()).unwrap();
        assert!((repaired.unsigned_area() - 1.0).abs() < 1e-12);
        assert!(repaired.is_valid());
    }
}
