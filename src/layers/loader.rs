//! Vector dataset loading (GeoJSON and ESRI shapefile).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use geo::Geometry;
use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use regex::Regex;
use serde::Deserialize;
use shapefile::dbase::{FieldValue, Record};
use shapefile::Shape;
use tracing::{debug, info, warn};

use super::crs::reproject_records;
use crate::error::{Error, Result};
use crate::models::{Crs, LayerRecord, VectorLayer};

/// Where a layer comes from, and optionally which system its coordinates use.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayerSource {
    pub path: PathBuf,
    /// Overrides whatever the dataset declares.
    #[serde(default)]
    pub crs: Option<Crs>,
}

impl LayerSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            crs: None,
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    GeoJson,
    Shapefile,
}

impl DatasetFormat {
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(DatasetFormat::GeoJson),
            "shp" => Some(DatasetFormat::Shapefile),
            _ => None,
        }
    }
}

/// Records read from a dataset before normalization.
struct RawLayer {
    records: Vec<LayerRecord>,
    declared_crs: Option<Crs>,
    skipped: usize,
}

/// Load a dataset and express every geometry in lon/lat degrees.
///
/// Datasets already in the target system pass through unchanged.
pub fn load_layer(name: &str, source: &LayerSource) -> Result<VectorLayer> {
    let path = source.path.as_path();
    info!("Loading {} layer from {}", name, path.display());

    let format = DatasetFormat::detect(path)
        .ok_or_else(|| Error::load(path, "unrecognized vector dataset extension"))?;

    let raw = match format {
        DatasetFormat::GeoJson => read_geojson(path)?,
        DatasetFormat::Shapefile => read_shapefile(path)?,
    };

    let source_crs = match (&source.crs, raw.declared_crs) {
        (Some(configured), _) => configured.clone(),
        (None, Some(declared)) => declared,
        (None, None) => {
            if format == DatasetFormat::Shapefile {
                warn!(
                    "{} has no .prj and no configured crs; assuming lon/lat",
                    path.display()
                );
            }
            Crs::Wgs84
        }
    };

    let mut records = raw.records;
    if !source_crs.is_target() {
        reproject_records(&mut records, &source_crs).map_err(|reason| Error::load(path, reason))?;
    }

    info!(
        "Loaded {} {} records ({} skipped, source {})",
        records.len(),
        name,
        raw.skipped,
        source_crs
    );

    Ok(VectorLayer::new(name, Crs::Wgs84, records))
}

fn read_geojson(path: &Path) -> Result<RawLayer> {
    let text = fs::read_to_string(path).map_err(|e| Error::load(path, e))?;
    let geojson: GeoJson = text.parse().map_err(|e| Error::load(path, e))?;

    let (features, foreign_members) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(mut f) => {
            let foreign = f.foreign_members.take();
            (vec![f], foreign)
        }
        GeoJson::Geometry(g) => (
            vec![Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            None,
        ),
    };

    let declared_crs = foreign_members
        .as_ref()
        .and_then(legacy_crs_name)
        .map(|name| name.parse::<Crs>().map_err(|reason| Error::load(path, reason)))
        .transpose()?;

    let mut records = Vec::with_capacity(features.len());
    let mut skipped = 0;

    for (index, feature) in features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            debug!("Skipping feature {} in {}: null geometry", index, path.display());
            skipped += 1;
            continue;
        };
        let geometry = Geometry::<f64>::try_from(geometry)
            .map_err(|e| Error::load(path, format!("feature {}: {}", index, e)))?;
        records.push(LayerRecord::new(
            geometry,
            feature.properties.unwrap_or_default(),
        ));
    }

    Ok(RawLayer {
        records,
        declared_crs,
        skipped,
    })
}

/// `{"crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}}}`
fn legacy_crs_name(members: &JsonObject) -> Option<&str> {
    members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
}

fn read_shapefile(path: &Path) -> Result<RawLayer> {
    let mut reader = shapefile::Reader::from_path(path).map_err(|e| Error::load(path, e))?;

    let mut records = Vec::new();
    let mut skipped = 0;

    for (index, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.map_err(|e| Error::load(path, e))?;
        if matches!(shape, Shape::NullShape) {
            debug!("Skipping shape {} in {}: null shape", index, path.display());
            skipped += 1;
            continue;
        }
        let geometry = Geometry::<f64>::try_from(shape)
            .map_err(|e| Error::load(path, format!("shape {}: {:?}", index, e)))?;
        records.push(LayerRecord::new(geometry, record_properties(record)));
    }

    Ok(RawLayer {
        records,
        declared_crs: read_prj(path)?,
        skipped,
    })
}

fn record_properties(record: Record) -> JsonObject {
    record
        .into_iter()
        .map(|(field, value)| (field, field_to_json(value)))
        .collect()
}

fn field_to_json(value: FieldValue) -> JsonValue {
    match value {
        FieldValue::Character(v) => v
            .map(|s| JsonValue::String(s.trim_end().to_string()))
            .unwrap_or(JsonValue::Null),
        FieldValue::Memo(s) => JsonValue::String(s),
        FieldValue::Numeric(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        FieldValue::Float(v) => v
            .map(|f| JsonValue::from(f as f64))
            .unwrap_or(JsonValue::Null),
        FieldValue::Double(d) => JsonValue::from(d),
        FieldValue::Currency(c) => JsonValue::from(c),
        FieldValue::Integer(i) => JsonValue::from(i),
        FieldValue::Logical(v) => v.map(JsonValue::Bool).unwrap_or(JsonValue::Null),
        FieldValue::Date(Some(d)) => {
            JsonValue::String(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
        }
        FieldValue::Date(None) => JsonValue::Null,
        other => JsonValue::String(format!("{:?}", other)),
    }
}

/// Read the `.prj` sidecar next to a shapefile, if there is one.
fn read_prj(shp: &Path) -> Result<Option<Crs>> {
    let prj = shp.with_extension("prj");
    let wkt = match fs::read_to_string(&prj) {
        Ok(wkt) => wkt,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::load(&prj, e)),
    };
    crs_from_wkt(&wkt)
        .map(Some)
        .map_err(|reason| Error::load(&prj, reason))
}

/// Resolve a WKT1 projection definition to a [`Crs`].
///
/// The outermost `AUTHORITY["EPSG", ...]` wins. Without one, a geographic
/// definition is taken as lon/lat; a projected one can't be resolved.
pub fn crs_from_wkt(wkt: &str) -> std::result::Result<Crs, String> {
    static TOP_LEVEL_AUTHORITY: OnceLock<Regex> = OnceLock::new();
    let authority = TOP_LEVEL_AUTHORITY.get_or_init(|| {
        Regex::new(r#"AUTHORITY\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]\s*\]\s*$"#)
            .expect("authority pattern is valid")
    });

    let wkt = wkt.trim();
    if let Some(code) = authority.captures(wkt).and_then(|caps| caps.get(1)) {
        return code
            .as_str()
            .parse::<u16>()
            .map(Crs::from_epsg)
            .map_err(|_| format!("invalid EPSG code {}", code.as_str()));
    }

    if wkt.starts_with("GEOGCS") || wkt.starts_with("GEOGCRS") {
        return Ok(Crs::Wgs84);
    }

    Err("projected .prj without an EPSG authority; set `crs` on the layer source".to_string())
}
