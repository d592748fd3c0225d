//! Coordinate reference systems and reprojection
//!
//! A [`Crs`] is a PROJ.4 definition, resolved from an EPSG code, a shapefile
//! `.prj` or a literal `+proj=` string. Coordinates move between systems
//! through `proj4rs`, including any datum shift the definitions carry.

use crate::prj::PrjNode;
use crate::{GeoError, Result};
use geo::{Coord, Geometry, MapCoords};
use proj4rs::proj::Proj;
use std::borrow::Cow;
use std::fmt;

// .prj text written beside exported shapefiles
const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#;
const BC_ALBERS_PRJ: &str = r#"PROJCS["NAD_1983_BC_Environment_Albers",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Albers"],PARAMETER["False_Easting",1000000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-126.0],PARAMETER["Standard_Parallel_1",50.0],PARAMETER["Standard_Parallel_2",58.5],PARAMETER["Latitude_Of_Origin",45.0],UNIT["Meter",1.0],AUTHORITY["EPSG","3005"]]"#;

/// A coordinate reference system
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crs {
    epsg: Option<u32>,
    definition: Cow<'static, str>,
}

impl Crs {
    /// Geographic longitude/latitude on WGS84 (EPSG:4326)
    pub const WGS84: Crs = Crs {
        epsg: Some(4326),
        definition: Cow::Borrowed("+proj=longlat +datum=WGS84 +no_defs"),
    };

    /// BC Albers equal-area conic on NAD83 (EPSG:3005)
    pub const BC_ALBERS: Crs = Crs {
        epsg: Some(3005),
        definition: Cow::Borrowed(
            "+proj=aea +lat_0=45 +lon_0=-126 +lat_1=50 +lat_2=58.5 +x_0=1000000 +y_0=0 +datum=NAD83 +units=m +no_defs",
        ),
    };

    /// Resolve an EPSG code from the bundled definition registry
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            4326 => return Ok(Self::WGS84),
            3005 => return Ok(Self::BC_ALBERS),
            _ => {}
        }
        let def = u16::try_from(code)
            .ok()
            .and_then(crs_definitions::from_code)
            .ok_or(GeoError::UnsupportedCrs(code))?;
        let crs = Self {
            epsg: Some(code),
            definition: Cow::Borrowed(def.proj4),
        };
        crs.proj()?;
        Ok(crs)
    }

    /// Build from a PROJ.4 string such as `+proj=utm +zone=10 +datum=NAD83`
    pub fn from_proj_string(definition: &str) -> Result<Self> {
        let crs = Self {
            epsg: None,
            definition: Cow::Owned(definition.trim().to_string()),
        };
        crs.proj()?;
        Ok(crs)
    }

    /// Resolve the WKT found in a shapefile `.prj`
    ///
    /// An `AUTHORITY["EPSG", ..]` on the outer node wins; otherwise the
    /// projection, parameters, spheroid and units are translated. Anything
    /// that cannot be translated is an error rather than a guess.
    pub fn from_prj(prj: &str) -> Result<Self> {
        let root = PrjNode::parse(prj)?;
        if let Some(code) = root.epsg_authority() {
            if let Ok(crs) = Self::from_epsg(code) {
                return Ok(crs);
            }
        }
        let definition = root.to_proj_string()?;
        let mut crs = Self::from_proj_string(&definition)?;
        crs.epsg = None;
        Ok(crs)
    }

    /// `.prj` WKT for the systems exports are written in
    pub fn esri_wkt(&self) -> Option<&'static str> {
        if *self == Self::WGS84 {
            Some(WGS84_PRJ)
        } else if *self == Self::BC_ALBERS {
            Some(BC_ALBERS_PRJ)
        } else {
            None
        }
    }

    /// EPSG code, when the CRS came from one
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// PROJ.4 definition
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        self.definition
            .split_whitespace()
            .any(|p| matches!(p, "+proj=longlat" | "+proj=latlong" | "+proj=lonlat" | "+proj=latlon"))
    }

    fn proj(&self) -> Result<Proj> {
        Proj::from_proj_string(&self.definition)
            .map_err(|e| GeoError::Projection(format!("{}: {}", self, e)))
    }

    /// A reusable transformation from `self` to `to`
    pub fn transformer(&self, to: &Crs) -> Result<Transformer> {
        if self == to {
            return Ok(Transformer { inner: None });
        }
        Ok(Transformer {
            inner: Some(Projection {
                from: self.proj()?,
                to: to.proj()?,
                from_degrees: self.is_geographic(),
                to_degrees: to.is_geographic(),
            }),
        })
    }

    /// Reproject a geometry from `self` to `to`
    pub fn transform(&self, geometry: &Geometry<f64>, to: &Crs) -> Result<Geometry<f64>> {
        self.transformer(to)?.apply(geometry)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "{}", self.definition),
        }
    }
}

struct Projection {
    from: Proj,
    to: Proj,
    from_degrees: bool,
    to_degrees: bool,
}

/// Source and target projections prepared once for many geometries
pub struct Transformer {
    inner: Option<Projection>,
}

impl Transformer {
    /// Reproject one geometry
    pub fn apply(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        let Some(p) = &self.inner else {
            return Ok(geometry.clone());
        };
        geometry.try_map_coords(|c| p.convert(c))
    }
}

impl Projection {
    fn convert(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        // proj4rs works in radians for geographic systems
        let mut point = if self.from_degrees {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        proj4rs::transform::transform(&self.from, &self.to, &mut point)
            .map_err(|e| GeoError::Projection(format!("({}, {}): {}", coord.x, coord.y, e)))?;

        Ok(if self.to_degrees {
            Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }
}
