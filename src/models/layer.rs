//! Vector layer types: geometry records plus a reference system tag.

use std::fmt;
use std::str::FromStr;

use geo::Geometry;
use geojson::JsonObject;
use serde::Deserialize;

/// EPSG code of plain longitude/latitude degrees.
pub const WGS84_EPSG: u16 = 4326;

/// Coordinate reference system of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Crs {
    /// Geographic longitude/latitude in degrees (the pipeline target).
    Wgs84,
    /// Any other EPSG-registered system.
    Epsg(u16),
    /// A raw proj string such as `+proj=utm +zone=17 +datum=NAD83`.
    Proj(String),
}

impl Crs {
    pub fn is_target(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    pub fn from_epsg(code: u16) -> Self {
        if code == WGS84_EPSG {
            Crs::Wgs84
        } else {
            Crs::Epsg(code)
        }
    }
}

impl FromStr for Crs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('+') {
            return Ok(Crs::Proj(s.to_string()));
        }

        let upper = s.to_ascii_uppercase();
        if matches!(upper.as_str(), "WGS84" | "CRS84" | "OGC:CRS84")
            || upper.ends_with("OGC:1.3:CRS84")
        {
            return Ok(Crs::Wgs84);
        }

        // EPSG:3857, urn:ogc:def:crs:EPSG::3857, urn:ogc:def:crs:EPSG:6.6:3857
        let code = upper
            .strip_prefix("EPSG:")
            .or_else(|| upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:"))
            .map(|rest| rest.rsplit(':').next().unwrap_or(rest))
            .ok_or_else(|| format!("unrecognized coordinate reference system: {}", s))?;

        code.parse::<u16>()
            .map(Crs::from_epsg)
            .map_err(|_| format!("invalid EPSG code in {}", s))
    }
}

impl TryFrom<String> for Crs {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Wgs84 => write!(f, "EPSG:{}", WGS84_EPSG),
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Proj(def) => write!(f, "{}", def),
        }
    }
}

/// One feature of a vector layer. Owns its geometry and attribute columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub geometry: Geometry<f64>,
    pub properties: JsonObject,
}

impl LayerRecord {
    pub fn new(geometry: Geometry<f64>, properties: JsonObject) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    pub fn is_polygonal(&self) -> bool {
        matches!(
            self.geometry,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_)
        )
    }
}

/// A loaded dataset: boundary regions or roadways.
#[derive(Debug, Clone)]
pub struct VectorLayer {
    pub name: String,
    pub crs: Crs,
    pub records: Vec<LayerRecord>,
}

impl VectorLayer {
    pub fn new(name: impl Into<String>, crs: Crs, records: Vec<LayerRecord>) -> Self {
        Self {
            name: name.into(),
            crs,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::Wgs84);
        assert_eq!("epsg:3857".parse::<Crs>().unwrap(), Crs::Epsg(3857));
        assert_eq!(
            "urn:ogc:def:crs:EPSG::2236".parse::<Crs>().unwrap(),
            Crs::Epsg(2236)
        );
        assert_eq!(
            "urn:ogc:def:crs:OGC:1.3:CRS84".parse::<Crs>().unwrap(),
            Crs::Wgs84
        );
        assert_eq!(
            "+proj=merc +datum=WGS84".parse::<Crs>().unwrap(),
            Crs::Proj("+proj=merc +datum=WGS84".to_string())
        );
    }

    #[test]
    fn test_parse_crs_rejects_garbage() {
        assert!("mercator please".parse::<Crs>().is_err());
        assert!("EPSG:notanumber".parse::<Crs>().is_err());
    }

    #[test]
    fn test_crs_display() {
        assert_eq!(Crs::Wgs84.to_string(), "EPSG:4326");
        assert_eq!(Crs::Epsg(3857).to_string(), "EPSG:3857");
    }
}
