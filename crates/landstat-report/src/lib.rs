//! Landstat Report Writers
//!
//! Turns tables and overlay results into the files people open: Excel
//! workbooks, standalone Leaflet maps, GeoJSON, KML and shapefiles.
//!
//! # Workbooks
//!
//! [`ReportWorkbook`] writes one sheet per table with a bold header row,
//! `yyyy-mm-dd` dates, autofit widths and an Excel Table whose totals row
//! sums numeric columns and counts the first text column. Sheet names are
//! cleaned to Excel's rules and made unique. An optional `SUMMARY` sheet
//! comes first.
//!
//! # Maps and exports
//!
//! [`LeafletMap`] embeds the AOI, buffer rings and [`FeatureLayer`]s in one
//! HTML page. Feature colours come from a seeded generator, so a rerun with
//! the same [`MapConfig`] draws the same map. The page has a search box
//! that finds features by their label. [`to_geojson`], [`to_kml`] and
//! [`write_shapefiles`] write the same layers for GIS tools.
//!
//! # Example Usage
//!
//! ```no_run
//! use landstat_domain::{Table, Value};
//! use landstat_report::ReportWorkbook;
//! use std::path::Path;
//!
//! # fn example() -> landstat_report::Result<()> {
//! let mut table = Table::new(["FILE", "AREA_HA"]);
//! table.push_row(vec![Value::text("1414465"), Value::Number(12.5)])?;
//!
//! let mut workbook = ReportWorkbook::new();
//! workbook.add_sheet("Tenures", table);
//! workbook.save(Path::new("tenures.xlsx"))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod columns;
mod error;
mod export;
mod layer;
mod map;
mod status;
pub mod tenure;
mod workbook;

pub use columns::{
    add_area_ha, drop_empty_columns, normalize_header, normalize_headers, rename_columns,
    AREA_HA_COLUMN,
};
pub use error::{ReportError, Result};
pub use export::{to_geojson, to_kml, write_geojson, write_kml, write_shapefiles, LAYER_PROPERTY};
pub use layer::FeatureLayer;
pub use map::{LeafletMap, MapConfig};
pub use status::{status_layers, status_map, status_workbook};
pub use workbook::{
    run_facts, sanitize_sheet_name, ReportWorkbook, Summary, MAX_SHEET_NAME, SUMMARY_SHEET,
};
