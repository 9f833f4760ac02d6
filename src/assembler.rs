//! GeoJSON assembly for the rendering layer.
//!
//! Purely structural: geometries are emitted as they are, with no
//! reprojection or simplification.

use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use serde::Serialize;

use crate::models::{VectorLayer, Zone};
use crate::region::Regions;

/// The structures handed to a renderer.
#[derive(Debug, Clone, Serialize)]
pub struct MapLayers {
    pub zones: FeatureCollection,
    pub boundary: FeatureCollection,
    pub roads: FeatureCollection,
    /// Union of the boundary layer.
    pub region: Feature,
    pub complement: Feature,
}

impl MapLayers {
    pub fn zones_geojson(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.zones)
    }

    pub fn boundary_geojson(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.boundary)
    }

    pub fn roads_geojson(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.roads)
    }

    pub fn region_geojson(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.region)
    }

    pub fn complement_geojson(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.complement)
    }
}

fn feature(geometry: Value, properties: Option<JsonObject>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties,
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// A zone as a Polygon feature with a `name` property.
pub fn zone_feature(zone: &Zone) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), JsonValue::from(zone.name()));
    feature(Value::from(&zone.polygon()), Some(properties))
}

/// One feature per zone, in extraction order.
pub fn zones_to_collection(zones: &[Zone]) -> FeatureCollection {
    collection(zones.iter().map(zone_feature).collect())
}

/// One feature per record; attribute columns are carried over unchanged.
pub fn layer_to_collection(layer: &VectorLayer) -> FeatureCollection {
    collection(
        layer
            .records
            .iter()
            .map(|record| {
                feature(
                    Value::from(&record.geometry),
                    Some(record.properties.clone()),
                )
            })
            .collect(),
    )
}

/// A derived region as a single feature. One part is emitted as a Polygon.
pub fn region_feature(region: &MultiPolygon<f64>) -> Feature {
    let value = match region.0.as_slice() {
        [single] => Value::from(single),
        _ => Value::from(region),
    };
    feature(value, None)
}

pub fn assemble(
    zones: &[Zone],
    boundary: &VectorLayer,
    roads: &VectorLayer,
    regions: &Regions,
) -> MapLayers {
    MapLayers {
        zones: zones_to_collection(zones),
        boundary: layer_to_collection(boundary),
        roads: layer_to_collection(roads),
        region: region_feature(&regions.region),
        complement: region_feature(&regions.complement),
    }
}
