//! Named delivery zones extracted from KML placemarks.

use geo::{Coord, LineString, Polygon};

/// Label used for placemarks without a `<name>` element.
pub const UNNAMED_ZONE: &str = "Unnamed";

/// A named delivery zone with a closed outer ring (lon/lat degrees).
///
/// Zones are built once during extraction and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    name: String,
    ring: LineString<f64>,
}

impl Zone {
    /// Build a zone, closing the ring if its endpoints differ.
    ///
    /// A missing or blank name becomes [`UNNAMED_ZONE`]; other names are trimmed.
    pub fn new(name: Option<&str>, coords: Vec<Coord<f64>>) -> Self {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => UNNAMED_ZONE.to_string(),
        };

        let mut ring = coords;
        close_ring(&mut ring);

        Self {
            name,
            ring: LineString::new(ring),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ring(&self) -> &LineString<f64> {
        &self.ring
    }

    /// The zone as a hole-free polygon.
    pub fn polygon(&self) -> Polygon<f64> {
        Polygon::new(self.ring.clone(), vec![])
    }
}

/// Append the first coordinate when the ring is not already closed.
pub fn close_ring(ring: &mut Vec<Coord<f64>>) {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last()) {
        if first != *last {
            ring.push(first);
        }
    }
}
