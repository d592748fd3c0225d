//! AOIs taken from tenure records

use crate::{OverlayError, Result};
use geo::{Geometry, GeometryCollection};
use landstat_domain::{Bind, BindValue, SpatialDatabase, Value};
use landstat_geo::{parse_wkt, Aoi, Crs};
use landstat_store::{QueryCatalog, StoreError, GEOMETRY_WKT_COLUMN};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// Identifies a tenure, or one parcel of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenureKey {
    /// Crown Lands file number
    pub file_nbr: String,
    /// Disposition transaction id
    pub disposition_id: Option<i64>,
    /// Parcel (interest) id
    pub parcel_id: Option<i64>,
}

impl TenureKey {
    /// Every parcel on a file
    pub fn file(file_nbr: impl Into<String>) -> Self {
        Self {
            file_nbr: file_nbr.into(),
            disposition_id: None,
            parcel_id: None,
        }
    }

    /// One parcel of one disposition
    pub fn parcel(file_nbr: impl Into<String>, disposition_id: i64, parcel_id: i64) -> Self {
        Self {
            file_nbr: file_nbr.into(),
            disposition_id: Some(disposition_id),
            parcel_id: Some(parcel_id),
        }
    }
}

impl fmt::Display for TenureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_nbr)?;
        if let (Some(d), Some(p)) = (self.disposition_id, self.parcel_id) {
            write!(f, "-{}-{}", d, p)?;
        }
        Ok(())
    }
}

/// Build an AOI from the geometry of a tenure
///
/// Geometry comes back in `crs` (the BCGW storage projection). All matching
/// parcels are unioned.
pub fn tenure_aoi<D>(database: &mut D, catalog: &QueryCatalog, key: &TenureKey, crs: &Crs) -> Result<Aoi>
where
    D: SpatialDatabase<Error = StoreError>,
{
    let mut binds = vec![Bind {
        name: "file_nbr".to_string(),
        value: BindValue::Text(key.file_nbr.trim().to_string()),
    }];
    let query = match (key.disposition_id, key.parcel_id) {
        (Some(disposition_id), Some(parcel_id)) => {
            binds.push(Bind {
                name: "disp_id".to_string(),
                value: BindValue::Integer(disposition_id),
            });
            binds.push(Bind {
                name: "parcel_id".to_string(),
                value: BindValue::Integer(parcel_id),
            });
            "tenure_parcel_geometry"
        }
        _ => "tenure_by_file",
    };

    let statement = catalog.render(query, &BTreeMap::new(), binds)?;
    let rows = database.fetch(&statement)?;

    let mut parts = Vec::new();
    for wkt in rows.column(GEOMETRY_WKT_COLUMN).unwrap_or_default() {
        if let Value::Text(text) = wkt {
            let geometry = parse_wkt(text).map_err(|e| OverlayError::BadGeometry {
                dataset: format!("tenure {}", key),
                reason: e.to_string(),
            })?;
            parts.push(geometry);
        }
    }
    if parts.is_empty() {
        return Err(OverlayError::TenureNotFound(key.to_string()));
    }

    let parcels = parts.len();
    let aoi = Aoi::from_geometry(
        Geometry::GeometryCollection(GeometryCollection::new_from(parts)),
        crs,
        key.to_string(),
    )?;
    info!(tenure = %key, parcels, area_ha = aoi.area_ha(), "built AOI from tenure");
    Ok(aoi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use landstat_domain::Table;
    use landstat_store::MemoryDatabase;

    fn parcels(wkts: &[&str]) -> Table {
        let mut table = Table::new(["CROWN_LANDS_FILE", GEOMETRY_WKT_COLUMN]);
        for wkt in wkts {
            table.push_row(vec![Value::text("1414465"), Value::text(*wkt)]).unwrap();
        }
        table
    }

    #[test]
    fn test_single_parcel() {
        let mut db = MemoryDatabase::new().respond(
            "INTRID_SID = :parcel_id",
            parcels(&["POLYGON ((1000000 500000, 1000100 500000, 1000100 500100, 1000000 500100, 1000000 500000))"]),
        );
        let catalog = QueryCatalog::builtin().unwrap();
        let key = TenureKey::parcel("1414465", 920000, 930000);

        let aoi = tenure_aoi(&mut db, &catalog, &key, &Crs::BC_ALBERS).unwrap();
        assert_eq!(aoi.label(), "1414465-920000-930000");
        assert_eq!(aoi.area_ha(), 1.0);
        assert_eq!(db.executed()[0].bind_value("parcel_id"), Some(&BindValue::Integer(930000)));
    }

    #[test]
    fn test_whole_file_unions_parcels() {
        let mut db = MemoryDatabase::new().respond(
            "CROWN_LANDS_FILE = :file_nbr",
            parcels(&[
                "POLYGON ((0 0, 100 0, 100 100, 0 100, 0 0))",
                "POLYGON ((200 0, 300 0, 300 100, 200 100, 200 0))",
            ]),
        );
        let catalog = QueryCatalog::builtin().unwrap();

        let aoi = tenure_aoi(&mut db, &catalog, &TenureKey::file("1414465"), &Crs::BC_ALBERS).unwrap();
        assert_eq!(aoi.area_ha(), 2.0);
        assert_eq!(aoi.shape().0.len(), 2);
    }

    #[test]
    fn test_unknown_tenure() {
        let mut db = MemoryDatabase::new();
        let catalog = QueryCatalog::builtin().unwrap();
        let err = tenure_aoi(&mut db, &catalog, &TenureKey::file("0000000"), &Crs::BC_ALBERS).unwrap_err();
        assert!(matches!(err, OverlayError::TenureNotFound(k) if k == "0000000"));
    }
}
