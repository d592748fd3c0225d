//! KML and KMZ input
//!
//! Placemarks become features in WGS84. The placemark name, description and
//! enclosing folder are kept as `NAME`, `DESCRIPTION` and `FOLDER`, alongside
//! any `Data` or `SimpleData` fields.

use crate::{Crs, Feature, FeatureSet, GeoError, Result};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use landstat_domain::Value;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Read a `.kml` file or the main document of a `.kmz` archive
pub fn read_kml(path: &Path) -> Result<FeatureSet> {
    let is_kmz = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("kmz"));

    let text = if is_kmz {
        kmz_document(path)?
    } else {
        std::fs::read_to_string(path)?
    };

    let features = parse_kml(&text)?;
    if features.is_empty() {
        warn!(path = %path.display(), "no placemarks with geometry");
    }
    Ok(FeatureSet {
        crs: Crs::WGS84,
        features,
    })
}

/// `doc.kml`, or else the first `.kml` entry, of a KMZ archive
fn kmz_document(path: &Path) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path)?)?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let entry = names
        .iter()
        .find(|n| n.eq_ignore_ascii_case("doc.kml"))
        .or_else(|| names.iter().find(|n| n.to_ascii_lowercase().ends_with(".kml")))
        .ok_or_else(|| GeoError::Kml(format!("{} holds no .kml document", path.display())))?;

    let mut text = String::new();
    archive.by_name(entry)?.read_to_string(&mut text)?;
    Ok(text)
}

#[derive(Default)]
struct Placemark {
    attributes: Vec<(String, Value)>,
    parts: Vec<Geometry<f64>>,
}

impl Placemark {
    fn set(&mut self, name: &str, value: &str) {
        let value = Value::text(value.trim());
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    fn finish(mut self, folder: Option<&str>) -> Option<Feature> {
        if let Some(folder) = folder {
            self.set("FOLDER", folder);
        }
        self.attributes.sort_by(|a, b| a.0.cmp(&b.0));
        let geometry = collapse(self.parts)?;
        Some(Feature {
            attributes: self.attributes,
            geometry,
        })
    }
}

/// One geometry, or the multi-type of homogeneous parts
fn collapse(mut parts: Vec<Geometry<f64>>) -> Option<Geometry<f64>> {
    if parts.len() <= 1 {
        return parts.pop();
    }
    if parts.iter().all(|g| matches!(g, Geometry::Point(_))) {
        let points = parts.into_iter().filter_map(|g| Point::try_from(g).ok()).collect::<Vec<_>>();
        return Some(Geometry::MultiPoint(MultiPoint(points)));
    }
    if parts.iter().all(|g| matches!(g, Geometry::LineString(_))) {
        let lines = parts.into_iter().filter_map(|g| LineString::try_from(g).ok()).collect();
        return Some(Geometry::MultiLineString(MultiLineString(lines)));
    }
    if parts.iter().all(|g| matches!(g, Geometry::Polygon(_))) {
        let polygons = parts.into_iter().filter_map(|g| Polygon::try_from(g).ok()).collect();
        return Some(Geometry::MultiPolygon(MultiPolygon(polygons)));
    }
    Some(Geometry::GeometryCollection(GeometryCollection(parts)))
}

/// `lon,lat[,alt]` tuples separated by whitespace
fn parse_coordinates(text: &str) -> Result<Vec<Coord<f64>>> {
    text.split_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',').map(|p| p.trim().parse::<f64>());
            match (parts.next(), parts.next()) {
                (Some(Ok(x)), Some(Ok(y))) => Ok(Coord { x, y }),
                _ => Err(GeoError::Kml(format!("bad coordinate tuple '{}'", tuple))),
            }
        })
        .collect()
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn name_attribute(e: &BytesStart<'_>) -> Result<Option<String>> {
    let attribute = e
        .try_get_attribute("name")
        .map_err(|err| GeoError::Kml(err.to_string()))?;
    attribute
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .map_err(|err| GeoError::Kml(err.to_string()))
        })
        .transpose()
}

/// Parse a KML document into features
pub fn parse_kml(text: &str) -> Result<Vec<Feature>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut folders: Vec<Option<String>> = Vec::new();
    let mut placemark: Option<Placemark> = None;
    let mut data_name: Option<String> = None;
    let mut coords = String::new();
    let mut outer: Option<LineString<f64>> = None;
    let mut inner: Vec<LineString<f64>> = Vec::new();
    let mut features = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| GeoError::Kml(format!("at byte {}: {}", reader.buffer_position(), e)))?;
        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                match name.as_str() {
                    "Folder" | "Document" => folders.push(None),
                    "Placemark" => placemark = Some(Placemark::default()),
                    "Data" | "SimpleData" => data_name = name_attribute(&e)?,
                    "coordinates" => coords.clear(),
                    "Polygon" => {
                        outer = None;
                        inner.clear();
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|err| GeoError::Kml(err.to_string()))?;
                on_text(&path, &text, &mut placemark, &mut folders, data_name.as_deref(), &mut coords);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                on_text(&path, &text, &mut placemark, &mut folders, data_name.as_deref(), &mut coords);
            }
            Event::End(_) => {
                let Some(name) = path.pop() else {
                    return Err(GeoError::Kml("unbalanced end tag".to_string()));
                };
                let parent = path.last().map(String::as_str);
                match name.as_str() {
                    "Folder" | "Document" => {
                        folders.pop();
                    }
                    "Placemark" => {
                        let folder = folders.iter().rev().flatten().next().map(String::as_str);
                        match placemark.take().and_then(|p| p.finish(folder)) {
                            Some(feature) => features.push(feature),
                            None => warn!(index = features.len(), "skipping placemark without geometry"),
                        }
                    }
                    "Data" | "SimpleData" => data_name = None,
                    "coordinates" => {
                        let ring = LineString::from(parse_coordinates(&coords)?);
                        let part = match parent {
                            Some("Point") => ring.0.first().map(|c| Geometry::Point(Point(*c))),
                            Some("LineString") => Some(Geometry::LineString(ring)),
                            Some("LinearRing") => {
                                let boundary = path.iter().rev().nth(1).map(String::as_str);
                                match boundary {
                                    Some("outerBoundaryIs") => outer = Some(ring),
                                    Some("innerBoundaryIs") => inner.push(ring),
                                    _ => outer = Some(ring),
                                }
                                None
                            }
                            _ => None,
                        };
                        if let (Some(part), Some(p)) = (part, placemark.as_mut()) {
                            p.parts.push(part);
                        }
                    }
                    "Polygon" => {
                        if let (Some(exterior), Some(p)) = (outer.take(), placemark.as_mut()) {
                            p.parts.push(Geometry::Polygon(Polygon::new(exterior, std::mem::take(&mut inner))));
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(features)
}

fn on_text(
    path: &[String],
    text: &str,
    placemark: &mut Option<Placemark>,
    folders: &mut [Option<String>],
    data_name: Option<&str>,
    coords: &mut String,
) {
    let (Some(current), parent) = (path.last().map(String::as_str), path.iter().rev().nth(1).map(String::as_str)) else {
        return;
    };
    match (current, parent) {
        ("coordinates", _) => {
            coords.push(' ');
            coords.push_str(text);
        }
        ("name", Some("Placemark")) => {
            if let Some(p) = placemark.as_mut() {
                p.set("NAME", text);
            }
        }
        ("description", Some("Placemark")) => {
            if let Some(p) = placemark.as_mut() {
                p.set("DESCRIPTION", text);
            }
        }
        ("name", Some("Folder" | "Document")) => {
            if let Some(last) = folders.last_mut() {
                *last = Some(text.trim().to_string());
            }
        }
        ("value", Some("Data")) | ("SimpleData", _) => {
            if let (Some(p), Some(name)) = (placemark.as_mut(), data_name) {
                p.set(name, text);
            }
        }
        _ => {}
    }
}
