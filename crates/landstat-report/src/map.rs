//! Standalone Leaflet maps
//!
//! A map is one HTML file: the Leaflet page template with the AOI, buffer
//! rings and result layers embedded as GeoJSON. All geometry handed to
//! [`LeafletMap`] must already be in WGS84.

use crate::{FeatureLayer, ReportError, Result};
use geo::Geometry;
use landstat_domain::Value;
use landstat_geo::Feature;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JsonMap};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

const TEMPLATE: &str = include_str!("map.html");

/// Columns never shown in popups
const HIDDEN_COLUMNS: &[&str] = &["GEOM_WKT", "SHAPE"];

/// Map appearance and content options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Page title and legend heading
    pub title: String,

    /// XYZ tile URL template
    pub tile_url: String,

    /// Tile attribution text
    pub attribution: String,

    /// Leaflet release loaded from unpkg
    pub leaflet_version: String,

    /// Seed for feature colours; the same seed gives the same colours
    pub color_seed: u64,

    /// Default tooltip column for layers without their own
    pub label_column: Option<String>,

    /// Popup columns in display order; empty shows every attribute
    pub popup_columns: Vec<String>,

    /// AOI outline colour
    pub aoi_color: String,

    /// Buffer ring outline colour
    pub ring_color: String,

    /// Fill opacity for result polygons
    pub fill_opacity: f64,

    /// Show a search box that zooms to features by label
    pub search: bool,
}

impl MapConfig {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.tile_url.contains(placeholder) {
                return Err(format!("tile_url must contain {}", placeholder));
            }
        }
        if self.leaflet_version.is_empty()
            || !self.leaflet_version.chars().all(|c| c.is_ascii_digit() || c == '.')
        {
            return Err(format!("leaflet_version '{}' is not a release number", self.leaflet_version));
        }
        for (name, color) in [("aoi_color", &self.aoi_color), ("ring_color", &self.ring_color)] {
            if !is_hex_color(color) {
                return Err(format!("{} must be a #rrggbb colour, got '{}'", name, color));
            }
        }
        if !(0.0..=1.0).contains(&self.fill_opacity) {
            return Err("fill_opacity must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> std::result::Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            title: "Status map".to_string(),
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors".to_string(),
            leaflet_version: "1.9.4".to_string(),
            color_seed: 42,
            label_column: None,
            popup_columns: Vec::new(),
            aoi_color: "#ff0000".to_string(),
            ring_color: "#ff8c00".to_string(),
            fill_opacity: 0.4,
            search: true,
        }
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// A Leaflet map under construction
#[derive(Debug, Clone)]
pub struct LeafletMap {
    config: MapConfig,
    aoi: Option<(String, Geometry<f64>)>,
    rings: Vec<(String, Geometry<f64>)>,
    layers: Vec<FeatureLayer>,
}

impl LeafletMap {
    /// Create an empty map
    pub fn new(config: MapConfig) -> Result<Self> {
        config.validate().map_err(ReportError::Config)?;
        Ok(Self {
            config,
            aoi: None,
            rings: Vec::new(),
            layers: Vec::new(),
        })
    }

    /// Set the AOI outline
    pub fn set_aoi(&mut self, name: impl Into<String>, geometry: Geometry<f64>) {
        self.aoi = Some((name.into(), geometry));
    }

    /// Add a buffer ring outline
    pub fn add_ring(&mut self, name: impl Into<String>, geometry: Geometry<f64>) {
        self.rings.push((name.into(), geometry));
    }

    /// Add a result layer; empty layers are skipped
    pub fn add_layer(&mut self, layer: FeatureLayer) {
        if !layer.is_empty() {
            self.layers.push(layer);
        }
    }

    /// Number of result layers
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Render the page
    pub fn render(&self) -> Result<String> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.color_seed);

        let aoi = match &self.aoi {
            Some((name, geometry)) => json!({
                "name": name,
                "color": self.config.aoi_color,
                "data": collection(std::iter::once((geometry, JsonMap::new())))?,
            }),
            None => serde_json::Value::Null,
        };

        let rings = self
            .rings
            .iter()
            .map(|(name, geometry)| {
                Ok(json!({
                    "name": name,
                    "color": self.config.ring_color,
                    "data": collection(std::iter::once((geometry, JsonMap::new())))?,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut layers = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let layer_color = random_color(&mut rng);
            let mut features = Vec::with_capacity(layer.len());
            for feature in &layer.features {
                let mut props = JsonMap::new();
                props.insert("_color".into(), json!(random_color(&mut rng)));
                props.insert("_label".into(), json!(self.label(layer, feature)));
                props.insert("_popup".into(), json!(self.popup_rows(feature)));
                features.push((&feature.geometry, props));
            }
            layers.push(json!({
                "name": layer.name,
                "color": layer_color,
                "count": layer.len(),
                "data": collection(features.into_iter())?,
            }));
        }

        let search = if self.config.search { self.search_labels() } else { Vec::new() };
        let data = json!({
            "title": self.config.title,
            "search": search,
            "tiles": {"url": self.config.tile_url, "attribution": self.config.attribution},
            "fillOpacity": self.config.fill_opacity,
            "aoi": aoi,
            "rings": rings,
            "layers": layers,
        });
        // keep a literal "</script>" in the data from closing the script block
        let data = serde_json::to_string(&data)?.replace("</", "<\\/");

        Ok(TEMPLATE
            .replace("__DATA__", &data)
            .replacen("__TITLE__", &escape_html(&self.config.title), 1)
            .replacen("__LEAFLET__", &self.config.leaflet_version, 2))
    }

    /// Render and write the page to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()?)?;
        info!("Saved map {} ({} layers)", path.display(), self.layers.len());
        Ok(())
    }

    /// Distinct feature labels offered by the search box, sorted
    fn search_labels(&self) -> Vec<String> {
        let labels: BTreeSet<String> = self
            .layers
            .iter()
            .flat_map(|layer| layer.features.iter().filter_map(move |f| self.label(layer, f)))
            .filter(|label| !label.trim().is_empty())
            .collect();
        labels.into_iter().collect()
    }

    fn label(&self, layer: &FeatureLayer, feature: &Feature) -> Option<String> {
        match (&layer.label_column, &self.config.label_column) {
            (None, Some(default)) => feature
                .attribute(default)
                .filter(|v| !v.is_null())
                .map(Value::to_string)
                .or_else(|| layer.label_for(feature)),
            _ => layer.label_for(feature),
        }
    }

    fn popup_rows(&self, feature: &Feature) -> Vec<(String, String)> {
        if self.config.popup_columns.is_empty() {
            return feature
                .attributes
                .iter()
                .filter(|(k, _)| !HIDDEN_COLUMNS.iter().any(|h| h.eq_ignore_ascii_case(k)))
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect();
        }
        self.config
            .popup_columns
            .iter()
            .filter_map(|c| feature.attribute(c).map(|v| (c.clone(), v.to_string())))
            .collect()
    }
}

/// GeoJSON FeatureCollection from geometries and their properties
fn collection<'a, I>(items: I) -> Result<serde_json::Value>
where
    I: Iterator<Item = (&'a Geometry<f64>, JsonMap<String, serde_json::Value>)>,
{
    let features = items
        .map(|(geometry, properties)| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        })
        .collect();
    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    Ok(serde_json::to_value(&collection)?)
}

/// A saturated mid-lightness colour as `#rrggbb`
fn random_color(rng: &mut ChaCha8Rng) -> String {
    let hue = (rng.next_u32() % 360) as f64;
    let (r, g, b) = hsl_to_rgb(hue, 0.7, 0.45);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = match h as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r), channel(g), channel(b))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
