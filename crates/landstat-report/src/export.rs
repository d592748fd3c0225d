//! GeoJSON, KML and shapefile export of result features (WGS84)

use crate::{FeatureLayer, ReportError, Result};
use geo::{Coord, Geometry, LineString, Polygon};
use landstat_domain::Value;
use landstat_geo::{write_shapefile, Crs, Feature, ShapeKind};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Map as JsonMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Property naming the layer a feature came from
pub const LAYER_PROPERTY: &str = "LAYER";

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Date(_) | Value::DateTime(_) => serde_json::Value::String(value.to_string()),
    }
}

/// All layers as one GeoJSON FeatureCollection
///
/// Each feature carries its attributes plus a `LAYER` property.
pub fn to_geojson(layers: &[FeatureLayer]) -> Result<String> {
    let features = layers
        .iter()
        .flat_map(|layer| layer.features.iter().map(move |f| (layer, f)))
        .map(|(layer, feature)| {
            let mut properties = JsonMap::new();
            properties.insert(LAYER_PROPERTY.to_string(), layer.name.clone().into());
            for (key, value) in &feature.attributes {
                properties.insert(key.clone(), json_value(value));
            }
            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&feature.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    Ok(serde_json::to_string_pretty(&collection)?)
}

/// Write [`to_geojson`] output to `path`
pub fn write_geojson(layers: &[FeatureLayer], path: &Path) -> Result<()> {
    std::fs::write(path, to_geojson(layers)?)?;
    info!("Saved GeoJSON {}", path.display());
    Ok(())
}

/// Feature layers with a `LAYER` attribute, one map entry per shape family
fn by_shape_kind(layers: &[FeatureLayer]) -> BTreeMap<ShapeKind, Vec<Feature>> {
    let mut groups: BTreeMap<ShapeKind, Vec<Feature>> = BTreeMap::new();
    for layer in layers {
        for feature in &layer.features {
            let Some(kind) = ShapeKind::of(&feature.geometry) else {
                warn!("Skipping geometry collection in layer '{}'", layer.name);
                continue;
            };
            let mut attributes = vec![(LAYER_PROPERTY.to_string(), Value::text(layer.name.as_str()))];
            attributes.extend(feature.attributes.iter().cloned());
            groups.entry(kind).or_default().push(Feature {
                attributes,
                geometry: feature.geometry.clone(),
            });
        }
    }
    groups
}

/// Write all layers as WGS84 shapefiles in `dir`
///
/// A shapefile holds one geometry family, so features are split into
/// `<stem>_points.shp`, `<stem>_lines.shp` and `<stem>_polygons.shp`; families
/// with no features are not written. Returns the `.shp` paths.
pub fn write_shapefiles(layers: &[FeatureLayer], dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (kind, features) in by_shape_kind(layers) {
        let path = dir.join(format!("{}_{}.shp", stem, kind.suffix()));
        write_shapefile(&path, kind, &features, &Crs::WGS84)?;
        written.push(path);
    }
    Ok(written)
}

fn xml_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Xml(e.to_string())
}

/// Element-level helpers over the quick-xml writer
struct KmlWriter {
    writer: Writer<Vec<u8>>,
}

impl KmlWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn start(&mut self, element: BytesStart<'_>) -> Result<()> {
        self.writer.write_event(Event::Start(element)).map_err(xml_error)
    }

    fn open(&mut self, tag: &str) -> Result<()> {
        self.start(BytesStart::new(tag))
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)
    }

    fn text_element(&mut self, tag: &str, text: &str) -> Result<()> {
        self.open(tag)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)?;
        self.close(tag)
    }

    fn coordinates<'a>(&mut self, coords: impl Iterator<Item = &'a Coord<f64>>) -> Result<()> {
        let text = coords
            .map(|c| format!("{},{}", c.x, c.y))
            .collect::<Vec<_>>()
            .join(" ");
        self.text_element("coordinates", &text)
    }

    fn line(&mut self, line: &LineString<f64>) -> Result<()> {
        self.open("LineString")?;
        self.coordinates(line.coords())?;
        self.close("LineString")
    }

    fn ring(&mut self, boundary: &str, ring: &LineString<f64>) -> Result<()> {
        self.open(boundary)?;
        self.open("LinearRing")?;
        self.coordinates(ring.coords())?;
        self.close("LinearRing")?;
        self.close(boundary)
    }

    fn polygon(&mut self, polygon: &Polygon<f64>) -> Result<()> {
        self.open("Polygon")?;
        self.ring("outerBoundaryIs", polygon.exterior())?;
        for ring in polygon.interiors() {
            self.ring("innerBoundaryIs", ring)?;
        }
        self.close("Polygon")
    }

    fn multi<T>(&mut self, parts: impl IntoIterator<Item = T>, mut f: impl FnMut(&mut Self, T) -> Result<()>) -> Result<()> {
        self.open("MultiGeometry")?;
        for part in parts {
            f(self, part)?;
        }
        self.close("MultiGeometry")
    }

    fn geometry(&mut self, geometry: &Geometry<f64>) -> Result<()> {
        match geometry {
            Geometry::Point(p) => {
                self.open("Point")?;
                self.coordinates(std::iter::once(&p.0))?;
                self.close("Point")
            }
            Geometry::Line(l) => self.line(&LineString::from(vec![l.start, l.end])),
            Geometry::LineString(l) => self.line(l),
            Geometry::Polygon(p) => self.polygon(p),
            Geometry::Rect(r) => self.polygon(&r.to_polygon()),
            Geometry::Triangle(t) => self.polygon(&t.to_polygon()),
            Geometry::MultiPoint(mp) => self.multi(mp, |w, p| w.geometry(&Geometry::Point(*p))),
            Geometry::MultiLineString(ml) => self.multi(ml, |w, l| w.line(l)),
            Geometry::MultiPolygon(mp) => self.multi(mp, |w, p| w.polygon(p)),
            Geometry::GeometryCollection(gc) => self.multi(gc, |w, g| w.geometry(g)),
        }
    }

    fn placemark(&mut self, layer: &FeatureLayer, feature: &Feature) -> Result<()> {
        self.open("Placemark")?;
        if let Some(label) = layer.label_for(feature) {
            self.text_element("name", &label)?;
        }
        self.open("ExtendedData")?;
        for (key, value) in &feature.attributes {
            self.start(BytesStart::new("Data").with_attributes([("name", key.as_str())]))?;
            self.text_element("value", &value.to_string())?;
            self.close("Data")?;
        }
        self.close("ExtendedData")?;
        self.geometry(&feature.geometry)?;
        self.close("Placemark")
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(xml_error)
    }
}

/// All layers as a KML document: one folder per layer, one placemark per feature
pub fn to_kml(layers: &[FeatureLayer], document_name: &str) -> Result<String> {
    let mut kml = KmlWriter::new();
    kml.writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    kml.start(BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)]))?;
    kml.open("Document")?;
    kml.text_element("name", document_name)?;

    for layer in layers {
        kml.open("Folder")?;
        kml.text_element("name", &layer.name)?;
        for feature in &layer.features {
            kml.placemark(layer, feature)?;
        }
        kml.close("Folder")?;
    }

    kml.close("Document")?;
    kml.close("kml")?;
    kml.finish()
}

/// Write [`to_kml`] output to `path`
pub fn write_kml(layers: &[FeatureLayer], document_name: &str, path: &Path) -> Result<()> {
    std::fs::write(path, to_kml(layers, document_name)?)?;
    info!("Saved KML {}", path.display());
    Ok(())
}
