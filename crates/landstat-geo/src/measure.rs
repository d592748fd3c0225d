//! Areas, clipping and overlap percentages
//!
//! Inputs are expected in a projected CRS (BC Albers) so areas come out in
//! square metres.

use geo::{
    Area, BooleanOps, Geometry, GeometryCollection, Intersects, LineString, MultiLineString,
    MultiPoint, MultiPolygon,
};

const SQ_METRES_PER_HECTARE: f64 = 10_000.0;

/// Area of a geometry in hectares (zero for points and lines)
pub fn area_ha(geometry: &Geometry<f64>) -> f64 {
    geometry.unsigned_area() / SQ_METRES_PER_HECTARE
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Part of `geometry` inside `region`, or `None` when nothing is left
pub fn clip(geometry: &Geometry<f64>, region: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Polygon(p) => non_empty_polygons(region.intersection(p)),
        Geometry::MultiPolygon(mp) => non_empty_polygons(region.intersection(mp)),
        Geometry::Rect(r) => non_empty_polygons(region.intersection(&r.to_polygon())),
        Geometry::Triangle(t) => non_empty_polygons(region.intersection(&t.to_polygon())),
        Geometry::LineString(ls) => non_empty_lines(region.clip(&MultiLineString::new(vec![ls.clone()]), false)),
        Geometry::Line(l) => {
            let ls = LineString::from(vec![l.start, l.end]);
            non_empty_lines(region.clip(&MultiLineString::new(vec![ls]), false))
        }
        Geometry::MultiLineString(mls) => non_empty_lines(region.clip(mls, false)),
        Geometry::Point(p) => region.intersects(p).then(|| geometry.clone()),
        Geometry::MultiPoint(mp) => {
            let inside: Vec<_> = mp.iter().filter(|p| region.intersects(*p)).copied().collect();
            (!inside.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(inside)))
        }
        Geometry::GeometryCollection(gc) => {
            let parts: Vec<_> = gc.iter().filter_map(|g| clip(g, region)).collect();
            (!parts.is_empty()).then(|| Geometry::GeometryCollection(GeometryCollection::new_from(parts)))
        }
    }
}

fn non_empty_polygons(mp: MultiPolygon<f64>) -> Option<Geometry<f64>> {
    (!mp.0.is_empty()).then(|| Geometry::MultiPolygon(mp))
}

fn non_empty_lines(mls: MultiLineString<f64>) -> Option<Geometry<f64>> {
    (!mls.0.is_empty()).then(|| Geometry::MultiLineString(mls))
}

/// Overlap of one feature with a region
#[derive(Debug, Clone)]
pub struct Overlap {
    /// Clipped geometry; the original when it only touches the region
    pub geometry: Geometry<f64>,
    /// Clipped area in hectares, for polygonal features
    pub area_ha: Option<f64>,
    /// Clipped area as a percentage of the feature area, for polygonal features
    pub percent: Option<f64>,
}

/// Measure how `geometry` overlaps `region`
///
/// Returns `None` when they do not interact at all.
pub fn overlap(geometry: &Geometry<f64>, region: &MultiPolygon<f64>) -> Option<Overlap> {
    if !geometry.intersects(region) {
        return None;
    }

    let clipped = clip(geometry, region).unwrap_or_else(|| geometry.clone());
    let feature_area = geometry.unsigned_area();
    if feature_area <= 0.0 {
        return Some(Overlap {
            geometry: clipped,
            area_ha: None,
            percent: None,
        });
    }

    let clipped_area = clipped.unsigned_area();
    Some(Overlap {
        area_ha: Some(round2(clipped_area / SQ_METRES_PER_HECTARE)),
        percent: Some(round2((clipped_area / feature_area * 100.0).min(100.0))),
        geometry: clipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, polygon, Rect};

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Rect::new((min, min), (max, max)).to_polygon()])
    }

    #[test]
    fn test_area_ha() {
        let one_hectare = Geometry::Polygon(Rect::new((0.0, 0.0), (100.0, 100.0)).to_polygon());
        assert!((area_ha(&one_hectare) - 1.0).abs() < 1e-9);
        assert_eq!(area_ha(&Geometry::Point(point!(x: 1.0, y: 1.0))), 0.0);
    }

    #[test]
    fn test_half_overlap() {
        let region = square(0.0, 100.0);
        let feature = Geometry::Polygon(polygon![
            (x: 50.0, y: 0.0),
            (x: 150.0, y: 0.0),
            (x: 150.0, y: 100.0),
            (x: 50.0, y: 100.0),
            (x: 50.0, y: 0.0),
        ]);

        let result = overlap(&feature, &region).unwrap();
        assert_eq!(result.area_ha, Some(0.5));
        assert_eq!(result.percent, Some(50.0));
    }

    #[test]
    fn test_disjoint_has_no_overlap() {
        let region = square(0.0, 10.0);
        let feature = Geometry::Polygon(Rect::new((20.0, 20.0), (30.0, 30.0)).to_polygon());
        assert!(overlap(&feature, &region).is_none());
        assert!(clip(&feature, &region).is_none());
    }

    #[test]
    fn test_point_overlap_has_no_area() {
        let region = square(0.0, 10.0);
        let result = overlap(&Geometry::Point(point!(x: 5.0, y: 5.0)), &region).unwrap();
        assert!(result.area_ha.is_none());
        assert!(result.percent.is_none());
    }

    #[test]
    fn test_clip_line() {
        let region = square(0.0, 10.0);
        let line = Geometry::LineString(LineString::from(vec![(-5.0, 5.0), (15.0, 5.0)]));
        match clip(&line, &region) {
            Some(Geometry::MultiLineString(mls)) => assert_eq!(mls.0.len(), 1),
            other => panic!("unexpected clip result: {:?}", other),
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(2.005_000_1), 2.01);
    }
}
