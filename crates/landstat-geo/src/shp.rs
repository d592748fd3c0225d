//! ESRI shapefiles: reading with `.prj` resolution, writing with a dBase table

use crate::{Crs, Feature, FeatureSet, GeoError, Result};
use chrono::NaiveDate;
use geo::{Geometry, LineString, Polygon};
use landstat_domain::Value;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, PolygonRing, Shape};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

// dBase limits
const MAX_FIELD_NAME: usize = 10;
const CHARACTER_WIDTH: u8 = 254;

pub(crate) fn read_shapefile(path: &Path, fallback: &Crs) -> Result<FeatureSet> {
    let crs = match std::fs::read_to_string(path.with_extension("prj")) {
        Ok(prj) => Crs::from_prj(&prj)?,
        Err(_) => {
            warn!(path = %path.display(), crs = %fallback, "no .prj beside shapefile, assuming fallback CRS");
            fallback.clone()
        }
    };

    let mut reader = shapefile::Reader::from_path(path)?;
    let mut features = Vec::new();
    for (i, shape_record) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = shape_record?;
        match shape_feature(shape, record) {
            Ok(Some(feature)) => features.push(feature),
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), index = i, error = %e, "skipping unconvertible shape"),
        }
    }

    Ok(FeatureSet { crs, features })
}

/// One shape and its record as a feature; null shapes yield `None`
fn shape_feature(shape: Shape, record: Record) -> Result<Option<Feature>> {
    if matches!(shape, Shape::NullShape) {
        return Ok(None);
    }
    let geometry = Geometry::<f64>::try_from(shape).map_err(|e| GeoError::InvalidGeometry(e.to_string()))?;

    let mut attributes: Vec<(String, Value)> = record
        .into_iter()
        .map(|(name, value)| (name, field_value(value)))
        .collect();
    attributes.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(Some(Feature { attributes, geometry }))
}

fn field_value(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(s) => s.map(Value::text).unwrap_or_default(),
        FieldValue::Memo(s) => Value::text(s),
        FieldValue::Numeric(n) => n.map(Value::Number).unwrap_or_default(),
        FieldValue::Float(f) => f.map(|f| Value::Number(f as f64)).unwrap_or_default(),
        FieldValue::Double(d) => Value::Number(d),
        FieldValue::Currency(c) => Value::Number(c),
        FieldValue::Integer(i) => Value::Integer(i as i64),
        FieldValue::Logical(b) => b.map(Value::Bool).unwrap_or_default(),
        FieldValue::Date(d) => d
            .and_then(|d| NaiveDate::from_ymd_opt(d.year() as i32, d.month(), d.day()))
            .map(Value::Date)
            .unwrap_or_default(),
        other => Value::text(format!("{:?}", other)),
    }
}

/// Geometry family a shapefile can hold; one file holds one family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    /// Points (multi-points are split into one record per point)
    Point,
    /// Lines and multi-lines
    Line,
    /// Polygons and multi-polygons
    Polygon,
}

impl ShapeKind {
    /// Family of a geometry; collections have none
    pub fn of(geometry: &Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(Self::Point),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => Some(Self::Line),
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
                Some(Self::Polygon)
            }
            Geometry::GeometryCollection(_) => None,
        }
    }

    /// File name suffix, e.g. `site_polygons.shp`
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Point => "points",
            Self::Line => "lines",
            Self::Polygon => "polygons",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldKind {
    Numeric,
    Logical,
    Character,
}

/// dBase columns for a set of features: attribute name, dBase name, kind
fn dbase_fields(features: &[&Feature]) -> Vec<(String, String, FieldKind)> {
    let mut kinds: BTreeMap<&str, Option<FieldKind>> = BTreeMap::new();
    let mut order: Vec<&str> = Vec::new();
    for feature in features {
        for (name, value) in &feature.attributes {
            let kind = match value {
                Value::Null => None,
                Value::Integer(_) | Value::Number(_) => Some(FieldKind::Numeric),
                Value::Bool(_) => Some(FieldKind::Logical),
                _ => Some(FieldKind::Character),
            };
            let entry = kinds.entry(name.as_str()).or_insert_with(|| {
                order.push(name.as_str());
                None
            });
            *entry = match (*entry, kind) {
                (None, k) | (k, None) => k,
                (Some(a), Some(b)) if a == b => Some(a),
                _ => Some(FieldKind::Character),
            };
        }
    }

    let mut used: Vec<String> = Vec::new();
    let mut fields = Vec::with_capacity(order.len());
    for name in order {
        let short = unique_field_name(name, &used);
        used.push(short.clone());
        let kind = kinds.get(name).copied().flatten().unwrap_or(FieldKind::Character);
        fields.push((name.to_string(), short, kind));
    }
    fields
}

/// Up to ten ASCII characters, numbered when a truncation collides
fn unique_field_name(name: &str, used: &[String]) -> String {
    let base: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .take(MAX_FIELD_NAME)
        .collect();
    let base = if base.is_empty() { "FIELD".to_string() } else { base };
    if !used.contains(&base) {
        return base;
    }
    (1..)
        .map(|n| {
            let tag = n.to_string();
            let keep = MAX_FIELD_NAME.saturating_sub(tag.len()).min(base.len());
            format!("{}{}", &base[..keep], tag)
        })
        .find(|candidate| !used.contains(candidate))
        .unwrap_or(base)
}

fn points(line: &LineString<f64>) -> Vec<Point> {
    line.coords().map(|c| Point::new(c.x, c.y)).collect()
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<PolygonRing<Point>> {
    std::iter::once(PolygonRing::Outer(points(polygon.exterior())))
        .chain(polygon.interiors().iter().map(|ring| PolygonRing::Inner(points(ring))))
        .collect()
}

fn record_for(feature: &Feature, fields: &[(String, String, FieldKind)]) -> Record {
    let mut record = Record::default();
    for (attribute, field_name, kind) in fields {
        let value = feature.attribute(attribute).unwrap_or(&Value::Null);
        let field_value = match kind {
            FieldKind::Numeric => FieldValue::Numeric(value.as_f64()),
            FieldKind::Logical => FieldValue::Logical(match value {
                Value::Bool(b) => Some(*b),
                _ => None,
            }),
            FieldKind::Character => FieldValue::Character(match value {
                Value::Null => None,
                other => Some(other.to_string()),
            }),
        };
        record.insert(field_name.clone(), field_value);
    }
    record
}

/// Write features of one [`ShapeKind`] to a shapefile with its `.dbf`
///
/// Attribute names are cut to dBase's ten characters. A `.prj` is written
/// when the CRS has one. Returns the number of records written.
pub fn write_shapefile(path: &Path, kind: ShapeKind, features: &[Feature], crs: &Crs) -> Result<usize> {
    let selected: Vec<&Feature> = features
        .iter()
        .filter(|f| ShapeKind::of(&f.geometry) == Some(kind))
        .collect();
    if selected.is_empty() {
        return Err(GeoError::Empty(path.display().to_string()));
    }

    let fields = dbase_fields(&selected);
    let mut table = TableWriterBuilder::new();
    for (_, short, field_kind) in &fields {
        let name = FieldName::try_from(short.as_str())
            .map_err(|e| GeoError::InvalidGeometry(format!("dBase field name {}: {:?}", short, e)))?;
        table = match field_kind {
            FieldKind::Numeric => table.add_numeric_field(name, 19, 6),
            FieldKind::Logical => table.add_logical_field(name),
            FieldKind::Character => table.add_character_field(name, CHARACTER_WIDTH),
        };
    }

    let mut writer = shapefile::Writer::from_path(path, table)?;
    let mut written = 0;
    for feature in &selected {
        let record = record_for(feature, &fields);
        match (&feature.geometry, kind) {
            (Geometry::Point(p), _) => writer.write_shape_and_record(&Point::new(p.x(), p.y()), &record)?,
            (Geometry::MultiPoint(mp), _) => {
                for p in mp {
                    writer.write_shape_and_record(&Point::new(p.x(), p.y()), &record)?;
                    written += 1;
                }
                continue;
            }
            (geometry, ShapeKind::Line) => {
                let parts: Vec<Vec<Point>> = match geometry {
                    Geometry::Line(l) => vec![vec![Point::new(l.start.x, l.start.y), Point::new(l.end.x, l.end.y)]],
                    Geometry::LineString(l) => vec![points(l)],
                    Geometry::MultiLineString(ml) => ml.iter().map(points).collect(),
                    _ => continue,
                };
                // a polyline part needs two vertices
                let parts: Vec<Vec<Point>> = parts.into_iter().filter(|p| p.len() >= 2).collect();
                if parts.is_empty() {
                    warn!(path = %path.display(), "skipping degenerate line");
                    continue;
                }
                writer.write_shape_and_record(&shapefile::Polyline::with_parts(parts), &record)?
            }
            (geometry, ShapeKind::Polygon) => {
                let rings: Vec<PolygonRing<Point>> = match geometry {
                    Geometry::Polygon(p) => polygon_rings(p),
                    Geometry::MultiPolygon(mp) => mp.iter().flat_map(polygon_rings).collect(),
                    Geometry::Rect(r) => polygon_rings(&r.to_polygon()),
                    Geometry::Triangle(t) => polygon_rings(&t.to_polygon()),
                    _ => continue,
                };
                if rings.is_empty() {
                    continue;
                }
                writer.write_shape_and_record(&shapefile::Polygon::with_rings(rings), &record)?
            }
            _ => continue,
        }
        written += 1;
    }
    drop(writer);

    if let Some(prj) = crs.esri_wkt() {
        std::fs::write(path.with_extension("prj"), prj)?;
    }
    info!("Saved shapefile {} ({} records)", path.display(), written);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_vector;
    use geo::{line_string, polygon};

    const UTM_10N_PRJ: &str = r#"PROJCS["NAD_1983_UTM_Zone_10N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-123.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    fn tenure(file: &str, area: f64, active: bool, geometry: Geometry<f64>) -> Feature {
        Feature {
            attributes: vec![
                ("CROWN_LANDS_FILE".to_string(), Value::text(file)),
                ("AREA_HA".to_string(), Value::Number(area)),
                ("ACTIVE".to_string(), Value::Bool(active)),
                ("NOTE".to_string(), Value::Null),
            ],
            geometry,
        }
    }

    fn square(x: f64, y: f64, size: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ])
    }

    #[test]
    fn test_write_and_read_polygons_with_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tenures.shp");
        let features = vec![
            tenure("1414465", 12.5, true, square(1_000_000.0, 500_000.0, 100.0)),
            tenure("1414466", 3.0, false, square(1_000_200.0, 500_000.0, 50.0)),
        ];

        let written = write_shapefile(&path, ShapeKind::Polygon, &features, &Crs::BC_ALBERS).unwrap();
        assert_eq!(written, 2);
        assert!(path.with_extension("dbf").is_file());
        assert!(path.with_extension("prj").is_file());

        let set = read_vector(&path, &Crs::WGS84).unwrap();
        assert_eq!(set.crs, Crs::BC_ALBERS);
        assert_eq!(set.features.len(), 2);

        // dBase names are cut to ten characters
        let first = &set.features[0];
        assert_eq!(first.attribute("CROWN_LAND"), Some(&Value::text("1414465")));
        assert_eq!(first.attribute("AREA_HA"), Some(&Value::Number(12.5)));
        assert_eq!(first.attribute("ACTIVE"), Some(&Value::Bool(true)));
        assert_eq!(first.attribute("NOTE"), Some(&Value::Null));
        assert_eq!(set.features[1].attribute("ACTIVE"), Some(&Value::Bool(false)));

        let (x0, y0, x1, y1) = set.extent().unwrap();
        assert!((x0 - 1_000_000.0).abs() < 1e-6 && (y0 - 500_000.0).abs() < 1e-6);
        assert!((x1 - 1_000_250.0).abs() < 1e-6 && (y1 - 500_100.0).abs() < 1e-6);
    }

    #[test]
    fn test_utm_prj_is_reprojected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wells.shp");
        let well = Feature {
            attributes: vec![("WELL_TAG".to_string(), Value::Integer(7))],
            geometry: Geometry::Point(geo::Point::new(500_000.0, 5_363_000.0)),
        };
        write_shapefile(&path, ShapeKind::Point, &[well], &Crs::from_epsg(26910).unwrap()).unwrap();
        std::fs::write(path.with_extension("prj"), UTM_10N_PRJ).unwrap();

        let set = read_vector(&path, &Crs::BC_ALBERS).unwrap();
        assert!(!set.crs.is_geographic());
        assert_ne!(set.crs, Crs::BC_ALBERS);
        assert_eq!(set.features[0].attribute("WELL_TAG"), Some(&Value::Number(7.0)));

        let lonlat = set.reproject(&Crs::WGS84).unwrap();
        let (x, y, _, _) = lonlat.extent().unwrap();
        assert!((x + 123.0).abs() < 1e-6);
        assert!(y > 48.3 && y < 48.5);
    }

    #[test]
    fn test_missing_prj_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roads.shp");
        let road = Feature {
            attributes: vec![("ROAD_NAME".to_string(), Value::text("Forest Service Rd"))],
            geometry: Geometry::LineString(line_string![(x: 1_000_000.0, y: 500_000.0), (x: 1_000_500.0, y: 500_400.0)]),
        };
        // no .prj is written for a CRS without an ESRI definition
        write_shapefile(&path, ShapeKind::Line, &[road], &Crs::from_epsg(26910).unwrap()).unwrap();
        assert!(!path.with_extension("prj").exists());

        let set = read_vector(&path, &Crs::BC_ALBERS).unwrap();
        assert_eq!(set.crs, Crs::BC_ALBERS);
        assert!(matches!(set.features[0].geometry, Geometry::LineString(_) | Geometry::MultiLineString(_)));

        // projected metres cannot pass for longitude/latitude
        let err = read_vector(&path, &Crs::WGS84).unwrap_err();
        assert!(matches!(err, GeoError::CoordinateRange { .. }));
    }

    #[test]
    fn test_unrecognised_prj_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.shp");
        let feature = Feature {
            attributes: vec![],
            geometry: Geometry::Point(geo::Point::new(1.0, 2.0)),
        };
        write_shapefile(&path, ShapeKind::Point, &[feature], &Crs::WGS84).unwrap();
        std::fs::write(path.with_extension("prj"), r#"PROJCS["Odd",GEOGCS["GCS_WGS_1984"],PROJECTION["Bonne"]]"#).unwrap();

        assert!(matches!(read_vector(&path, &Crs::WGS84), Err(GeoError::UnrecognisedCrs(_))));
    }

    #[test]
    fn test_null_shape_is_skipped() {
        assert!(shape_feature(Shape::NullShape, Record::default()).unwrap().is_none());

        let mut record = Record::default();
        record.insert("NAME".to_string(), FieldValue::Character(Some("Beacon Hill".to_string())));
        record.insert("OPEN".to_string(), FieldValue::Logical(None));
        let feature = shape_feature(Shape::Point(Point::new(1.0, 2.0)), record).unwrap().unwrap();
        assert_eq!(feature.attributes[0], ("NAME".to_string(), Value::text("Beacon Hill")));
        assert_eq!(feature.attribute("open"), Some(&Value::Null));
    }

    #[test]
    fn test_field_value_mapping() {
        assert_eq!(field_value(FieldValue::Character(Some("  ".to_string()))), Value::Null);
        assert_eq!(field_value(FieldValue::Numeric(Some(4.5))), Value::Number(4.5));
        assert_eq!(field_value(FieldValue::Numeric(None)), Value::Null);
        assert_eq!(field_value(FieldValue::Integer(3)), Value::Integer(3));
        assert_eq!(field_value(FieldValue::Double(2.25)), Value::Number(2.25));
        assert_eq!(field_value(FieldValue::Logical(Some(false))), Value::Bool(false));
    }

    #[test]
    fn test_field_names_are_unique_and_short() {
        let used = vec!["CROWN_LAND".to_string()];
        assert_eq!(unique_field_name("crown lands file", &[]), "CROWN_LAND");
        assert_eq!(unique_field_name("CROWN_LANDS_FILE", &used), "CROWN_LAN1");
        assert_eq!(unique_field_name("", &[]), "FIELD");
    }

    #[test]
    fn test_kind_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.shp");
        let features = vec![tenure("1", 1.0, true, square(0.0, 0.0, 1.0))];
        assert!(matches!(
            write_shapefile(&path, ShapeKind::Point, &features, &Crs::WGS84),
            Err(GeoError::Empty(_))
        ));
    }
}
