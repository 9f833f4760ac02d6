//! Self-contained Mapbox GL page.

use std::fmt::Write;
use std::sync::OnceLock;

use anyhow::{bail, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{MapStyle, Renderer};
use crate::pipeline::PipelineOutput;

const MAPBOX_GL: &str = "https://api.tiles.mapbox.com/mapbox-gl-js/v2.13.0";
const GEOCODER: &str = "https://api.mapbox.com/mapbox-gl-js/plugins/mapbox-gl-geocoder/v4.7.2";
const TURF: &str = "https://cdn.jsdelivr.net/npm/@turf/turf@6/turf.min.js";

/// Renders the pipeline output as one HTML document with the GeoJSON inlined.
pub struct HtmlMapRenderer {
    style: MapStyle,
}

impl HtmlMapRenderer {
    pub fn new(style: MapStyle) -> Self {
        Self { style }
    }

    /// Schedules of the zones actually on the map, for popups.
    fn zone_schedules(&self, output: &PipelineOutput) -> Map<String, Value> {
        output
            .layers
            .zones
            .features
            .iter()
            .filter_map(|f| f.property("name").and_then(Value::as_str))
            .filter_map(|name| {
                self.style
                    .schedule_for(name)
                    .map(|s| (name.to_string(), Value::from(s)))
            })
            .collect()
    }
}

/// Serialize for inlining inside a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Colors end up in CSS declarations, so only plain color syntax is let through:
/// hex, named colors and `rgb()`/`hsl()` style functions.
fn css_color(value: &str) -> Result<&str> {
    static COLOR: OnceLock<Regex> = OnceLock::new();
    let pattern = COLOR.get_or_init(|| {
        Regex::new(r"^(#[0-9A-Fa-f]{3,8}|[A-Za-z]+|[A-Za-z]+\([0-9.,%\s]*\))$")
            .expect("color pattern is valid")
    });
    if !pattern.is_match(value) {
        bail!("invalid map color {:?}", value);
    }
    Ok(value)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Renderer for HtmlMapRenderer {
    fn render(&self, output: &PipelineOutput) -> Result<String> {
        let style = &self.style;
        let layers = &output.layers;
        let schedules = self.zone_schedules(output);

        let mut html = String::new();

        writeln!(html, "<!DOCTYPE html>\n<html>\n<head>")?;
        writeln!(html, "  <meta charset=\"utf-8\" />")?;
        writeln!(html, "  <title>{}</title>", escape_html(&style.title))?;
        writeln!(
            html,
            "  <meta name=\"viewport\" content=\"initial-scale=1,maximum-scale=1,user-scalable=no\" />"
        )?;
        writeln!(html, "  <script src=\"{}/mapbox-gl.js\"></script>", MAPBOX_GL)?;
        writeln!(html, "  <link href=\"{}/mapbox-gl.css\" rel=\"stylesheet\" />", MAPBOX_GL)?;
        if style.click_zoom {
            writeln!(html, "  <script src=\"{}\"></script>", TURF)?;
        }
        if style.geocoder {
            writeln!(html, "  <script src=\"{}/mapbox-gl-geocoder.min.js\"></script>", GEOCODER)?;
            writeln!(
                html,
                "  <link rel=\"stylesheet\" href=\"{}/mapbox-gl-geocoder.css\" type=\"text/css\" />",
                GEOCODER
            )?;
        }

        writeln!(html, "  <style>")?;
        writeln!(html, "    body {{ margin: 0; padding: 0; }}")?;
        writeln!(
            html,
            "    #map {{ position: absolute; top: 0; bottom: 0; width: 100%; background-color: {}; }}",
            css_color(&style.background_color)?
        )?;
        writeln!(
            html,
            "    .legend {{ background-color: rgba(255,255,255,0.8); border-radius: 8px; bottom: 20px; left: 20px; \
             padding: 10px; position: absolute; z-index: 1; font-family: Arial, sans-serif; color: #000; width: 220px; }}"
        )?;
        writeln!(
            html,
            "    .swatch {{ width: 15px; height: 15px; margin-right: 10px; }}\n    .row {{ display: flex; align-items: center; margin-bottom: 5px; }}"
        )?;
        writeln!(html, "  </style>\n</head>\n<body>")?;

        writeln!(html, "<div id=\"map\"></div>")?;
        writeln!(html, "<div class=\"legend\">")?;
        writeln!(html, "  <h4 style=\"margin: 0; text-align: center;\">Delivery Areas</h4>")?;
        writeln!(html, "  <hr style=\"border: 1px solid black;\">")?;
        writeln!(
            html,
            "  <div class=\"row\"><div class=\"swatch\" style=\"background-color: {};\"></div><span>{}</span></div>",
            css_color(&style.zone_color)?,
            escape_html(&style.deliverable_label)
        )?;
        writeln!(
            html,
            "  <div class=\"row\"><div class=\"swatch\" style=\"background-color: {};\"></div><span>{}</span></div>",
            css_color(&style.mask_color)?,
            escape_html(&style.undeliverable_label)
        )?;
        writeln!(html, "</div>")?;

        writeln!(html, "<script>")?;
        writeln!(html, "  mapboxgl.accessToken = {};", script_json(&output.access_token)?)?;
        writeln!(html, "  var home = {{ center: {}, zoom: {} }};", script_json(&style.center)?, style.zoom)?;
        writeln!(
            html,
            "  var map = new mapboxgl.Map({{ container: 'map', style: {}, center: home.center, zoom: home.zoom }});",
            script_json(&style.style_url)?
        )?;

        if style.geocoder {
            writeln!(
                html,
                "  map.addControl(new MapboxGeocoder({{ accessToken: mapboxgl.accessToken, mapboxgl: mapboxgl, \
                 marker: true, placeholder: 'Search for an address' }}), 'top-right');"
            )?;
        }

        writeln!(html, "  map.on('load', function () {{")?;
        write_source(&mut html, "boundary", &script_json(&layers.boundary)?)?;
        writeln!(
            html,
            "    map.addLayer({{ id: 'boundary_layer', type: 'fill', source: 'boundary', \
             paint: {{ 'fill-color': {}, 'fill-outline-color': '#000000', 'fill-opacity': 1.0 }} }});",
            script_json(&style.boundary_color)?
        )?;
        write_source(&mut html, "roads", &script_json(&layers.roads)?)?;
        writeln!(
            html,
            "    map.addLayer({{ id: 'roads_layer', type: 'line', source: 'roads', \
             paint: {{ 'line-color': {}, 'line-width': 1 }} }});",
            script_json(&style.road_color)?
        )?;
        write_source(&mut html, "zones", &script_json(&layers.zones)?)?;
        writeln!(
            html,
            "    map.addLayer({{ id: 'zones_layer', type: 'fill', source: 'zones', \
             paint: {{ 'fill-color': {}, 'fill-outline-color': '#000000', 'fill-opacity': 0.8 }} }});",
            script_json(&style.zone_color)?
        )?;

        if style.mask_outside {
            write_source(&mut html, "outside", &script_json(&layers.complement)?)?;
            writeln!(
                html,
                "    map.addLayer({{ id: 'outside_layer', type: 'fill', source: 'outside', \
                 paint: {{ 'fill-color': {}, 'fill-opacity': 1.0 }} }});",
                script_json(&style.mask_color)?
            )?;
        }

        if style.click_zoom {
            writeln!(html, "    map.on('click', 'zones_layer', function (e) {{")?;
            writeln!(html, "      var bbox = turf.bbox(e.features[0]);")?;
            writeln!(
                html,
                "      map.fitBounds([[bbox[0], bbox[1]], [bbox[2], bbox[3]]], {{ padding: 20, maxZoom: {}, duration: 2000 }});",
                style.zone_max_zoom
            )?;
            writeln!(html, "    }});")?;
            writeln!(html, "    map.on('click', function (e) {{")?;
            writeln!(
                html,
                "      if (!map.queryRenderedFeatures(e.point, {{ layers: ['zones_layer'] }}).length) {{"
            )?;
            writeln!(
                html,
                "        map.flyTo({{ center: home.center, zoom: home.zoom, duration: 3000 }});"
            )?;
            writeln!(html, "      }}\n    }});")?;
        }

        if !schedules.is_empty() {
            writeln!(html, "    var schedules = {};", script_json(&schedules)?)?;
            writeln!(html, "    map.on('click', 'zones_layer', function (e) {{")?;
            writeln!(html, "      var name = e.features[0].properties.name;")?;
            writeln!(html, "      var popup = document.createElement('div');")?;
            writeln!(html, "      var title = document.createElement('strong');")?;
            writeln!(html, "      title.textContent = name;")?;
            writeln!(html, "      popup.appendChild(title);")?;
            writeln!(html, "      popup.appendChild(document.createElement('br'));")?;
            writeln!(
                html,
                "      popup.appendChild(document.createTextNode(schedules[name] || 'No scheduled delivery'));"
            )?;
            writeln!(
                html,
                "      new mapboxgl.Popup().setLngLat(e.lngLat).setDOMContent(popup).addTo(map);"
            )?;
            writeln!(html, "    }});")?;
        }

        writeln!(html, "  }});\n</script>\n</body>\n</html>")?;

        Ok(html)
    }
}

fn write_source(html: &mut String, id: &str, data: &str) -> std::fmt::Result {
    writeln!(
        html,
        "    map.addSource('{}', {{ type: 'geojson', data: {} }});",
        id, data
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::models::{Crs, VectorLayer, Zone};
    use crate::pipeline::PipelineStats;
    use crate::region::{Regions, CONTINENTAL_BOX};
    use geo::{Coord, MultiPolygon};

    fn output(zone_name: &str) -> PipelineOutput {
        let zone = Zone::new(
            Some(zone_name),
            vec![
                Coord { x: -81.6, y: 28.8 },
                Coord { x: -81.5, y: 28.8 },
                Coord { x: -81.5, y: 28.9 },
            ],
        );
        let empty = VectorLayer::new("empty", Crs::Wgs84, vec![]);
        let regions = Regions {
            region: MultiPolygon::new(vec![zone.polygon()]),
            complement: MultiPolygon::new(vec![CONTINENTAL_BOX.to_polygon()]),
        };
        PipelineOutput {
            layers: assemble(&[zone], &empty, &empty, &regions),
            access_token: "pk.abc".to_string(),
            stats: PipelineStats::default(),
        }
    }

    #[test]
    fn test_full_variant() {
        let html = HtmlMapRenderer::new(MapStyle::default())
            .render(&output("Mt Dora"))
            .unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("mapboxgl.accessToken = \"pk.abc\";"));
        assert!(html.contains("\"name\":\"Mt Dora\""));
        assert!(html.contains("MapboxGeocoder"));
        assert!(html.contains("map.addSource('outside'"));
        assert!(html.contains("turf.bbox"));
        assert!(!html.contains("var schedules"));
    }

    #[test]
    fn test_flags_switch_features_off() {
        let style = MapStyle {
            geocoder: false,
            click_zoom: false,
            mask_outside: false,
            ..MapStyle::default()
        };
        let html = HtmlMapRenderer::new(style).render(&output("Mt Dora")).unwrap();

        assert!(!html.contains("MapboxGeocoder"));
        assert!(!html.contains("turf"));
        assert!(!html.contains("'outside'"));
        assert!(html.contains("map.addSource('zones'"));
    }

    #[test]
    fn test_schedule_popup_only_for_known_zones() {
        let mut style = MapStyle::default();
        style
            .schedules
            .insert("Mt Dora".to_string(), "Tuesday".to_string());
        style
            .schedules
            .insert("Eustis".to_string(), "Friday".to_string());

        let html = HtmlMapRenderer::new(style).render(&output("Mt Dora")).unwrap();
        assert!(html.contains("var schedules = {\"Mt Dora\":\"Tuesday\"};"));
        assert!(!html.contains("Friday"));
    }

    #[test]
    fn test_script_breakout_escaped() {
        let html = HtmlMapRenderer::new(MapStyle::default())
            .render(&output("</script><b>x"))
            .unwrap();
        assert!(html.contains("<\\/script><b>x"));
        assert_eq!(html.matches("</script>").count(), 4);
    }

    #[test]
    fn test_colors_serialized_into_script() {
        let html = HtmlMapRenderer::new(MapStyle::default())
            .render(&output("Mt Dora"))
            .unwrap();
        assert!(html.contains("'fill-color': \"#a28834\""));
        assert!(html.contains("'line-color': \"#000000\""));
    }

    #[test]
    fn test_color_breakout_rejected() {
        let style = MapStyle {
            zone_color: "red; } </style><script>alert(1)</script>".to_string(),
            ..MapStyle::default()
        };
        assert!(HtmlMapRenderer::new(style).render(&output("Mt Dora")).is_err());

        let style = MapStyle {
            mask_color: "rgba(18, 32, 23, 0.9)".to_string(),
            road_color: "'); alert(1); ('".to_string(),
            ..MapStyle::default()
        };
        let html = HtmlMapRenderer::new(style).render(&output("Mt Dora")).unwrap();
        assert!(html.contains("background-color: rgba(18, 32, 23, 0.9);"));
        assert!(html.contains("'line-color': \"'); alert(1); ('\""));
    }

    #[test]
    fn test_css_color_forms() {
        assert!(css_color("#FAF0E6").is_ok());
        assert!(css_color("white").is_ok());
        assert!(css_color("hsl(120, 50%, 50%)").is_ok());
        assert!(css_color("#fff; background: url(x)").is_err());
        assert!(css_color("").is_err());
    }
}
