//! Landstat Geometry Adapter
//!
//! Converts between the formats geometry arrives in (WKT from the database;
//! GeoJSON, shapefiles, KML and KMZ on disk) and `geo` types, reprojects
//! between any EPSG or `.prj` system and BC Albers, writes shapefiles, and
//! runs the client-side overlay used for local datasets.
//!
//! All overlay work happens in BC Albers (EPSG:3005) so buffer radii and
//! areas are in metres.
//!
//! # Examples
//!
//! ```no_run
//! use landstat_geo::{Aoi, Crs};
//!
//! let aoi = Aoi::from_wkt("POLYGON ((-123.4 48.4, -123.3 48.4, -123.3 48.5, -123.4 48.4))", &Crs::WGS84, "site")?;
//! println!("{} ha", aoi.area_ha());
//! # Ok::<(), landstat_geo::GeoError>(())
//! ```

#![warn(missing_docs)]

mod aoi;
mod crs;
mod error;
mod kml;
mod measure;
mod overlay;
mod prj;
mod shp;
mod vector;
mod wkt_text;

pub use aoi::Aoi;
pub use crs::{Crs, Transformer};
pub use error::GeoError;
pub use kml::{parse_kml, read_kml};
pub use measure::{area_ha, clip, overlap, round2, Overlap};
pub use overlay::{overlay_features, Hit};
pub use shp::{write_shapefile, ShapeKind};
pub use vector::{read_vector, Feature, FeatureSet};
pub use wkt_text::{parse_wkt, to_wkt};

/// Result alias for geometry operations
pub type Result<T> = std::result::Result<T, GeoError>;
