//! Declarative map presentation settings.

use hashbrown::HashMap;
use serde::Deserialize;

/// Everything that differs between map variants: view, colors, and which
/// interactive features are switched on. Geometry never depends on it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapStyle {
    pub title: String,
    /// `[lon, lat]` of the initial view.
    pub center: [f64; 2],
    pub zoom: f64,
    pub style_url: String,

    /// Address search bar.
    pub geocoder: bool,
    /// Zoom to a zone on click, fly back out when clicking elsewhere.
    pub click_zoom: bool,
    /// Cover everything outside the served region.
    pub mask_outside: bool,
    pub zone_max_zoom: f64,

    pub background_color: String,
    pub boundary_color: String,
    pub road_color: String,
    pub zone_color: String,
    pub mask_color: String,

    pub deliverable_label: String,
    pub undeliverable_label: String,

    /// Delivery schedule text keyed by zone name, shown in zone popups.
    pub schedules: HashMap<String, String>,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            title: "Delivery Map".to_string(),
            center: [-81.76, 27.9944],
            zoom: 7.0,
            style_url: "mapbox://styles/mapbox/light-v10".to_string(),
            geocoder: true,
            click_zoom: true,
            mask_outside: true,
            zone_max_zoom: 14.0,
            background_color: "#FAF0E6".to_string(),
            boundary_color: "#ffffff".to_string(),
            road_color: "#000000".to_string(),
            zone_color: "#a28834".to_string(),
            mask_color: "#122017".to_string(),
            deliverable_label: "Deliverable".to_string(),
            undeliverable_label: "Not Deliverable".to_string(),
            schedules: HashMap::new(),
        }
    }
}

impl MapStyle {
    pub fn schedule_for(&self, zone: &str) -> Option<&str> {
        self.schedules.get(zone).map(String::as_str)
    }
}
