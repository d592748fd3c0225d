//! Landstat Overlay Runner
//!
//! Evaluates a rule sheet against an area of interest and reports, per
//! rule, the features that intersect the AOI or fall within its buffer.
//!
//! # Overview
//!
//! Each rule names a dataset. Database tables are queried with Oracle
//! Spatial (`SDO_RELATE` for intersection, `SDO_WITHIN_DISTANCE` for the
//! buffer); local shapefiles and GeoJSON files are overlaid in memory. Both
//! paths produce the same result rows:
//!
//! ```text
//! CATEGORY | FEATURECLASS_NAME | DATASOURCE | fields... | RESULT | OVERLAP_HA | OVERLAP_PCT
//! ```
//!
//! `RESULT` is `INTERSECT`, `WITHIN {n} m`, or `NO OVERLAPS FOUND` on the
//! placeholder row of a rule that found nothing. A rule that fails is
//! logged and reported with an `ERROR` column rather than dropped.
//!
//! # Example Usage
//!
//! ```no_run
//! use landstat_geo::{Aoi, Crs};
//! use landstat_overlay::{OverlayConfig, OverlayRunner, RuleSheet};
//! use landstat_store::MemoryDatabase;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let aoi = Aoi::from_file(Path::new("site.shp"), &Crs::BC_ALBERS)?;
//! let rules = RuleSheet::load(Path::new("rules.xlsx"), None)?;
//!
//! let mut runner = OverlayRunner::new(OverlayConfig::default())?
//!     .with_database(MemoryDatabase::new());
//! let report = runner.run(&aoi, &rules)?;
//!
//! println!("{} conflicts, {} failed rules", report.total_conflicts(), report.failed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod rules;
mod runner;
mod tenure_aoi;
mod types;


pub use config::OverlayConfig;
pub use error::{OverlayError, Result};
pub use rules::{RejectedRule, RuleSheet};
pub use runner::OverlayRunner;
pub use tenure_aoi::{tenure_aoi, TenureKey};
pub use types::{
    rule_columns, RuleOutcome, StatusReport, ERROR_COLUMN, OVERLAP_HA_COLUMN, OVERLAP_PCT_COLUMN,
    RESULT_COLUMN,
};
