//! Delivery zone extraction from KML documents.

mod kml;

pub use kml::{
    extract_zones, extract_zones_from_path, extract_zones_from_str, ExtractReport, ZoneExtraction,
};
