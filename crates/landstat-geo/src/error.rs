//! Error types for geometry handling

use thiserror::Error;

/// Errors that can occur while reading, converting or overlaying geometry
#[derive(Error, Debug)]
pub enum GeoError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GeoJSON parse error
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Shapefile read or write error
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// Malformed WKT
    #[error("WKT error: {0}")]
    Wkt(String),

    /// EPSG code missing from the definition registry
    #[error("Unsupported CRS: EPSG:{0}")]
    UnsupportedCrs(u32),

    /// CRS text (`.prj` WKT or GeoJSON `crs` member) that cannot be translated
    #[error("Unrecognised CRS: {0}")]
    UnrecognisedCrs(String),

    /// Projection setup or coordinate transformation failed
    #[error("Projection error: {0}")]
    Projection(String),

    /// Malformed KML
    #[error("KML error: {0}")]
    Kml(String),

    /// KMZ archive error
    #[error("KMZ error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// File extension not recognised as a vector format
    #[error("Unsupported vector format: {0}")]
    UnsupportedFormat(String),

    /// Geometry has no polygonal part where one is required
    #[error("Geometry is not polygonal: {0}")]
    NotPolygonal(String),

    /// Geometry could not be converted
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Coordinates do not fit the CRS they are declared or assumed to be in
    #[error("{path}: {reason}")]
    CoordinateRange {
        /// File the coordinates came from
        path: String,
        /// What was out of range
        reason: String,
    },

    /// Input contained no usable features
    #[error("No features in {0}")]
    Empty(String),
}
