//! Local vector datasets (shapefiles, GeoJSON, KML and KMZ)

use crate::kml::read_kml;
use crate::shp::read_shapefile;
use crate::{to_wkt, Crs, GeoError, Result};
use geo::{BoundingRect, Geometry};
use geojson::GeoJson;
use landstat_domain::{Table, Value};
use std::path::Path;
use tracing::{debug, warn};

/// One feature: attributes plus geometry
#[derive(Debug, Clone)]
pub struct Feature {
    /// Attribute name/value pairs in a stable order
    pub attributes: Vec<(String, Value)>,
    /// Feature geometry
    pub geometry: Geometry<f64>,
}

impl Feature {
    /// Attribute by name (case-insensitive)
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

/// Features read from one file, with their CRS
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// CRS the coordinates are in
    pub crs: Crs,
    /// Features in file order
    pub features: Vec<Feature>,
}

impl FeatureSet {
    /// Reproject every feature
    pub fn reproject(self, to: &Crs) -> Result<Self> {
        if &self.crs == to {
            return Ok(self);
        }
        let transformer = self.crs.transformer(to)?;
        let features = self
            .features
            .into_iter()
            .map(|f| {
                Ok(Feature {
                    geometry: transformer.apply(&f.geometry)?,
                    attributes: f.attributes,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            crs: to.clone(),
            features,
        })
    }

    /// Attribute table, optionally with a WKT geometry column
    pub fn to_table(&self, geometry_column: Option<&str>) -> Table {
        let mut table = Table::default();
        for feature in &self.features {
            let geometry = geometry_column.map(|column| (column.to_string(), Value::Text(to_wkt(&feature.geometry))));
            table.append(Table::from_record(
                feature.attributes.iter().cloned().chain(geometry),
            ));
        }
        table
    }

    /// Overall extent as (min x, min y, max x, max y)
    pub fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .fold(None, |acc, r| {
                let (min, max) = (r.min(), r.max());
                Some(match acc {
                    None => (min.x, min.y, max.x, max.y),
                    Some((x0, y0, x1, y1)) => (x0.min(min.x), y0.min(min.y), x1.max(max.x), y1.max(max.y)),
                })
            })
    }

    fn fits_lon_lat(&self) -> bool {
        self.extent().is_none_or(|(x0, y0, x1, y1)| {
            x0 >= -180.0 && x1 <= 180.0 && y0 >= -90.0 && y1 <= 90.0
        })
    }
}

/// Read a shapefile, GeoJSON, KML or KMZ file
///
/// `fallback` is used when the file carries no CRS information: a shapefile
/// without a `.prj`, or a GeoJSON file without a `crs` member whose
/// coordinates cannot be longitude/latitude. Geographic coordinates out of
/// range are rejected rather than reprojected.
pub fn read_vector(path: &Path, fallback: &Crs) -> Result<FeatureSet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let set = match ext.as_str() {
        "shp" => read_shapefile(path, fallback)?,
        "geojson" | "json" => read_geojson(path, fallback)?,
        "kml" | "kmz" => read_kml(path)?,
        _ => return Err(GeoError::UnsupportedFormat(path.display().to_string())),
    };

    if set.crs.is_geographic() && !set.fits_lon_lat() {
        return Err(GeoError::CoordinateRange {
            path: path.display().to_string(),
            reason: format!("coordinates exceed longitude/latitude bounds for {}", set.crs),
        });
    }

    debug!(path = %path.display(), features = set.features.len(), crs = %set.crs, "read vector file");
    Ok(set)
}

fn read_geojson(path: &Path, fallback: &Crs) -> Result<FeatureSet> {
    let text = std::fs::read_to_string(path)?;
    let geojson: GeoJson = text.parse()?;

    let (features, declared) = match geojson {
        GeoJson::FeatureCollection(fc) => {
            let declared = fc
                .foreign_members
                .as_ref()
                .and_then(|m| m.get("crs"))
                .map(crs_from_member)
                .transpose()?;
            (fc.features, declared)
        }
        GeoJson::Feature(f) => (vec![f], None),
        GeoJson::Geometry(g) => (
            vec![geojson::Feature {
                geometry: Some(g),
                ..Default::default()
            }],
            None,
        ),
    };

    let mut out = Vec::with_capacity(features.len());
    for (i, feature) in features.into_iter().enumerate() {
        let Some(gj_geometry) = feature.geometry else {
            warn!(path = %path.display(), index = i, "skipping feature without geometry");
            continue;
        };
        let geometry = Geometry::<f64>::try_from(gj_geometry)
            .map_err(|e| GeoError::InvalidGeometry(e.to_string()))?;

        let mut attributes: Vec<(String, Value)> = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, json_value(v)))
            .collect();
        attributes.sort_by(|a, b| a.0.cmp(&b.0));

        out.push(Feature { attributes, geometry });
    }

    let mut set = FeatureSet {
        crs: Crs::WGS84,
        features: out,
    };
    match declared {
        Some(crs) => set.crs = crs,
        // RFC 7946 longitude/latitude unless the numbers cannot be
        None if !set.fits_lon_lat() => {
            if fallback.is_geographic() {
                return Err(GeoError::CoordinateRange {
                    path: path.display().to_string(),
                    reason: format!("no crs member and coordinates are not {}", fallback),
                });
            }
            warn!(path = %path.display(), crs = %fallback, "projected coordinates without a crs member, assuming fallback CRS");
            set.crs = fallback.clone();
        }
        None => {}
    }
    Ok(set)
}

/// Legacy GeoJSON `crs` member, e.g. `{"type": "name", "properties": {"name": "EPSG:3005"}}`
fn crs_from_member(member: &serde_json::Value) -> Result<Crs> {
    let name = member
        .pointer("/properties/name")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| GeoError::UnrecognisedCrs(member.to_string()))?;

    if name.ends_with("CRS84") {
        return Ok(Crs::WGS84);
    }
    let upper = name.to_ascii_uppercase();
    let code = upper
        .rsplit_once("EPSG")
        .and_then(|(_, rest)| rest.rsplit(|c: char| !c.is_ascii_digit()).next())
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| GeoError::UnrecognisedCrs(name.to_string()))?;
    Crs::from_epsg(code)
}

fn json_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Number).unwrap_or_default(),
        },
        serde_json::Value::String(s) => Value::text(s),
        other => Value::Text(other.to_string()),
    }
}
