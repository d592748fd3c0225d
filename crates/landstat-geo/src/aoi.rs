//! Area of interest

use crate::measure::{area_ha, round2};
use crate::{parse_wkt, read_vector, to_wkt, Crs, GeoError, Result};
use geo::{BooleanOps, Buffer, Geometry, MultiPolygon, Polygon};
use std::path::Path;
use tracing::info;

/// The geometry every rule is evaluated against
///
/// Always held in BC Albers so buffers and areas are metric.
#[derive(Debug, Clone)]
pub struct Aoi {
    label: String,
    shape: MultiPolygon<f64>,
}

impl Aoi {
    /// Build an AOI from a geometry in `crs`
    pub fn from_geometry(geometry: Geometry<f64>, crs: &Crs, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let projected = crs.transform(&geometry, &Crs::BC_ALBERS)?;
        let polygons = polygons_of(projected);
        if polygons.is_empty() {
            return Err(GeoError::NotPolygonal(label));
        }

        Ok(Self {
            label,
            shape: union_all(polygons),
        })
    }

    /// Build an AOI from WKT in `crs`
    pub fn from_wkt(wkt: &str, crs: &Crs, label: impl Into<String>) -> Result<Self> {
        Self::from_geometry(parse_wkt(wkt)?, crs, label)
    }

    /// Build an AOI from every polygon in a shapefile, GeoJSON, KML or KMZ file
    ///
    /// The label is the file stem.
    pub fn from_file(path: &Path, fallback: &Crs) -> Result<Self> {
        let set = read_vector(path, fallback)?;
        if set.features.is_empty() {
            return Err(GeoError::Empty(path.display().to_string()));
        }

        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "AOI".to_string());

        let set = set.reproject(&Crs::BC_ALBERS)?;
        let polygons: Vec<Polygon<f64>> = set
            .features
            .into_iter()
            .flat_map(|f| polygons_of(f.geometry))
            .collect();
        if polygons.is_empty() {
            return Err(GeoError::NotPolygonal(label));
        }

        let aoi = Self {
            label,
            shape: union_all(polygons),
        };
        info!(aoi = %aoi.label, area_ha = aoi.area_ha(), "loaded AOI");
        Ok(aoi)
    }

    /// Display label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Geometry in BC Albers
    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    /// WKT of the AOI in BC Albers, as bound into spatial SQL
    pub fn wkt(&self) -> String {
        to_wkt(&Geometry::MultiPolygon(self.shape.clone()))
    }

    /// Area in hectares, rounded to two decimals
    pub fn area_ha(&self) -> f64 {
        round2(area_ha(&Geometry::MultiPolygon(self.shape.clone())))
    }

    /// The AOI grown by `metres`
    pub fn buffered(&self, metres: f64) -> MultiPolygon<f64> {
        self.shape.buffer(metres)
    }

    /// The ring between the AOI and its `metres` buffer
    pub fn buffer_ring(&self, metres: f64) -> MultiPolygon<f64> {
        self.buffered(metres).difference(&self.shape)
    }

    /// AOI geometry reprojected to `crs`
    pub fn to_crs(&self, crs: &Crs) -> Result<Geometry<f64>> {
        Crs::BC_ALBERS.transform(&Geometry::MultiPolygon(self.shape.clone()), crs)
    }
}

/// Polygonal parts of a geometry; lines and points are dropped
fn polygons_of(geometry: Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0,
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::Triangle(t) => vec![t.to_polygon()],
        Geometry::GeometryCollection(gc) => gc.0.into_iter().flat_map(polygons_of).collect(),
        _ => Vec::new(),
    }
}

fn union_all(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    polygons
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, p| acc.union(&p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use std::io::Write;

    const ALBERS_SQUARE: &str = "POLYGON ((1000000 500000, 1001000 500000, 1001000 501000, 1000000 501000, 1000000 500000))";

    #[test]
    fn test_from_wkt_albers() {
        let aoi = Aoi::from_wkt(ALBERS_SQUARE, &Crs::BC_ALBERS, "square").unwrap();
        assert_eq!(aoi.label(), "square");
        assert_eq!(aoi.area_ha(), 100.0);
        assert!(aoi.wkt().starts_with("MULTIPOLYGON"));
    }

    #[test]
    fn test_points_are_not_an_aoi() {
        let err = Aoi::from_wkt("POINT (1 2)", &Crs::BC_ALBERS, "pt").unwrap_err();
        assert!(matches!(err, GeoError::NotPolygonal(_)));
    }

    #[test]
    fn test_overlapping_polygons_are_unioned() {
        let wkt = "MULTIPOLYGON (((0 0, 100 0, 100 100, 0 100, 0 0)), ((50 0, 150 0, 150 100, 50 100, 50 0)))";
        let aoi = Aoi::from_wkt(wkt, &Crs::BC_ALBERS, "u").unwrap();
        assert!((aoi.shape().unsigned_area() - 15_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_buffer_ring_excludes_aoi() {
        let aoi = Aoi::from_wkt(ALBERS_SQUARE, &Crs::BC_ALBERS, "square").unwrap();
        let ring = aoi.buffer_ring(100.0);
        let buffered = aoi.buffered(100.0);

        let ring_area = ring.unsigned_area();
        let expected = buffered.unsigned_area() - aoi.shape().unsigned_area();
        assert!((ring_area - expected).abs() < 1.0);
        // 1 km square grown by 100 m: at least the four edge strips
        assert!(ring_area > 4.0 * 1000.0 * 100.0);
    }

    #[test]
    fn test_from_geojson_file_reprojects() {
        let text = r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature", "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [[[-123.0, 49.0], [-122.99, 49.0], [-122.99, 49.01], [-123.0, 49.01], [-123.0, 49.0]]]}
        }]}"#;
        let mut file = tempfile::Builder::new().prefix("site").suffix(".geojson").tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        let aoi = Aoi::from_file(file.path(), &Crs::WGS84).unwrap();
        assert!(aoi.label().starts_with("site"));
        // roughly 0.73 km x 1.11 km at 49 degrees north
        assert!(aoi.area_ha() > 70.0 && aoi.area_ha() < 90.0);
    }

    #[test]
    fn test_from_kml_file() {
        let text = r#"<kml><Document><Placemark><name>site</name><Polygon><outerBoundaryIs><LinearRing>
            <coordinates>-123.0,49.0 -122.99,49.0 -122.99,49.01 -123.0,49.01 -123.0,49.0</coordinates>
        </LinearRing></outerBoundaryIs></Polygon></Placemark></Document></kml>"#;
        let mut file = tempfile::Builder::new().prefix("referral").suffix(".kml").tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        let aoi = Aoi::from_file(file.path(), &Crs::BC_ALBERS).unwrap();
        assert!(aoi.label().starts_with("referral"));
        assert!(aoi.area_ha() > 70.0 && aoi.area_ha() < 90.0);

        let lonlat = aoi.to_crs(&Crs::WGS84).unwrap();
        let rect = geo::BoundingRect::bounding_rect(&lonlat).unwrap();
        assert!((rect.min().x + 123.0).abs() < 1e-6);
        assert!((rect.max().y - 49.01).abs() < 1e-6);
    }
}
