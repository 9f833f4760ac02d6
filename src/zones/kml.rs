//! KML placemark polygon extraction.
//!
//! Streams the document with `quick-xml`, tracking the element path so that
//! only `Placemark/.../Polygon/outerBoundaryIs/LinearRing/coordinates` text is
//! collected. Namespace prefixes are ignored; elements match on local name.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use geo::Coord;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::models::Zone;

const PLACEMARK: &str = "Placemark";
const NAME: &str = "name";
const RING_PATH: [&str; 4] = ["Polygon", "outerBoundaryIs", "LinearRing", "coordinates"];

/// Counters for one extraction run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub placemarks: usize,
    pub zones: usize,
    /// Placemarks without a usable polygon.
    pub skipped_placemarks: usize,
    /// Coordinate tokens with fewer than two numeric fields.
    pub skipped_tokens: usize,
}

/// Zones in document order plus what was dropped along the way.
#[derive(Debug, Clone)]
pub struct ZoneExtraction {
    pub zones: Vec<Zone>,
    pub report: ExtractReport,
}

/// Placemark being read. `depth` is the element stack length at its start tag.
struct PlacemarkState {
    depth: usize,
    name: Option<String>,
    coordinates: Option<String>,
    ring_done: bool,
}

impl PlacemarkState {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            name: None,
            coordinates: None,
            ring_done: false,
        }
    }

    fn at_name(&self, stack: &[String]) -> bool {
        stack.len() == self.depth + 1 && stack.last().map(String::as_str) == Some(NAME)
    }

    fn at_ring(&self, stack: &[String]) -> bool {
        !self.ring_done
            && stack.len() >= self.depth + RING_PATH.len()
            && stack[stack.len() - RING_PATH.len()..]
                .iter()
                .zip(RING_PATH)
                .all(|(open, expected)| open == expected)
    }

    fn push_text(&mut self, stack: &[String], text: &str) {
        if self.at_name(stack) {
            self.name.get_or_insert_with(String::new).push_str(text);
        } else if self.at_ring(stack) {
            self.coordinates.get_or_insert_with(String::new).push_str(text);
        }
    }
}

/// Read zones from a KML file on disk.
pub fn extract_zones_from_path(path: &Path) -> Result<ZoneExtraction> {
    info!("Extracting zones from {}", path.display());
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    extract_zones(BufReader::new(file))
}

/// Read zones from an in-memory KML document.
pub fn extract_zones_from_str(kml: &str) -> Result<ZoneExtraction> {
    extract_zones(kml.as_bytes())
}

/// Read zones from any buffered KML source.
///
/// Malformed XML fails with [`Error::Parse`]. Placemarks without a polygon and
/// coordinate tokens that don't carry a lon/lat pair are skipped.
pub fn extract_zones<R: BufRead>(input: R) -> Result<ZoneExtraction> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();

    let mut stack: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut current: Option<PlacemarkState> = None;

    let mut zones = Vec::new();
    let mut report = ExtractReport::default();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| parse_error(&reader, e.to_string()))?;

        match event {
            Event::Start(e) => {
                if stack.is_empty() {
                    if seen_root {
                        return Err(parse_error(&reader, "multiple root elements"));
                    }
                    seen_root = true;
                }
                stack.push(local_name(e.local_name().as_ref()));

                if current.is_none() && stack.last().map(String::as_str) == Some(PLACEMARK) {
                    current = Some(PlacemarkState::new(stack.len()));
                    report.placemarks += 1;
                }

                // An empty coordinates element still marks a polygon
                if let Some(pm) = current.as_mut() {
                    if pm.at_ring(&stack) {
                        pm.coordinates.get_or_insert_with(String::new);
                    }
                }
            }
            Event::Empty(e) => {
                let local = local_name(e.local_name().as_ref());
                if stack.is_empty() {
                    if seen_root {
                        return Err(parse_error(&reader, "multiple root elements"));
                    }
                    seen_root = true;
                }

                if let Some(pm) = current.as_mut() {
                    stack.push(local);
                    if pm.at_name(&stack) {
                        pm.name.get_or_insert_with(String::new);
                    } else if pm.at_ring(&stack) {
                        pm.coordinates.get_or_insert_with(String::new);
                        pm.ring_done = true;
                    }
                    stack.pop();
                } else if local == PLACEMARK {
                    report.placemarks += 1;
                    report.skipped_placemarks += 1;
                    debug!("Skipping empty placemark");
                }
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| parse_error(&reader, err.to_string()))?;
                if stack.is_empty() {
                    if !text.trim().is_empty() {
                        return Err(parse_error(&reader, "text outside of the root element"));
                    }
                } else if let Some(pm) = current.as_mut() {
                    pm.push_text(&stack, &text);
                }
            }
            Event::CData(e) => {
                let bytes = e.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                if let Some(pm) = current.as_mut() {
                    pm.push_text(&stack, &text);
                }
            }
            Event::End(_) => {
                if let Some(pm) = current.as_mut() {
                    if pm.at_ring(&stack) {
                        pm.ring_done = true;
                    }
                }

                if current.as_ref().map(|pm| pm.depth) == Some(stack.len()) {
                    if let Some(pm) = current.take() {
                        if let Some(zone) = finish_placemark(pm, &mut report) {
                            zones.push(zone);
                        }
                    }
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(
            &reader,
            format!("unexpected end of document inside <{}>", open),
        ));
    }
    if !seen_root {
        return Err(parse_error(&reader, "no root element"));
    }

    report.zones = zones.len();
    info!(
        "Extracted {} zones from {} placemarks ({} skipped, {} bad coordinate tokens)",
        report.zones, report.placemarks, report.skipped_placemarks, report.skipped_tokens
    );

    Ok(ZoneExtraction { zones, report })
}

fn finish_placemark(pm: PlacemarkState, report: &mut ExtractReport) -> Option<Zone> {
    let name = pm.name.as_deref();

    let Some(text) = pm.coordinates else {
        debug!("Skipping placemark {:?}: no polygon", name);
        report.skipped_placemarks += 1;
        return None;
    };

    let coords = parse_coordinates(&text, &mut report.skipped_tokens);
    if coords.is_empty() {
        debug!("Skipping placemark {:?}: no usable coordinates", name);
        report.skipped_placemarks += 1;
        return None;
    }

    Some(Zone::new(name, coords))
}

/// Parse whitespace-separated `lon,lat[,alt]` tuples. Altitude is dropped.
fn parse_coordinates(text: &str, skipped: &mut usize) -> Vec<Coord<f64>> {
    text.split_whitespace()
        .filter_map(|token| {
            let coord = parse_token(token);
            if coord.is_none() {
                trace!("Skipping coordinate token {:?}", token);
                *skipped += 1;
            }
            coord
        })
        .collect()
}

fn parse_token(token: &str) -> Option<Coord<f64>> {
    let mut parts = token.split(',');
    let x: f64 = parts.next()?.parse().ok()?;
    let y: f64 = parts.next()?.parse().ok()?;
    (x.is_finite() && y.is_finite()).then_some(Coord { x, y })
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn parse_error<R>(reader: &Reader<R>, message: impl Into<String>) -> Error {
    Error::Parse {
        position: reader.buffer_position() as u64,
        message: message.into(),
    }
}
