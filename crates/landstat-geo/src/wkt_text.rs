//! Well-known text conversion

use crate::{GeoError, Result};
use ::wkt::{ToWkt, TryFromWkt};
use geo::Geometry;

/// Parse WKT into a 2D geometry
///
/// Z and M ordinates (Oracle returns them for 3D layers) are dropped.
pub fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GeoError::Wkt("empty WKT".to_string()));
    }
    Geometry::<f64>::try_from_wkt_str(trimmed).map_err(|e| GeoError::Wkt(e.to_string()))
}

/// Format a geometry as WKT
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    geometry.wkt_string()
}
