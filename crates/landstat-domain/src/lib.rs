//! Landstat Domain Layer
//!
//! Core types shared by every landstat crate: overlay rules, result tags,
//! the in-memory `Table` that every loader produces and every writer
//! consumes, SQL statements with bind values, and the trait boundary to
//! the spatial database.
//!
//! ## Key Concepts
//!
//! - **Rule**: one row of a status rule sheet - a target dataset, the fields
//!   to report, an optional definition query and an optional buffer radius
//! - **OverlayTag**: how a result row relates to the AOI (`INTERSECT` or
//!   `WITHIN n m`)
//! - **Table**: ordered columns of typed cells, standing in for a data frame
//! - **Statement**: SQL text plus named binds, never interpolated values
//!
//! ## Architecture
//!
//! This crate holds no I/O. Database, geometry and spreadsheet handling live
//! in the infrastructure crates, which depend on the traits defined here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod rule;
pub mod run;
pub mod statement;
pub mod table;
pub mod tag;
pub mod traits;

// Re-exports for convenience
pub use rule::{Rule, RuleError, Target};
pub use run::RunId;
pub use statement::{Bind, BindValue, Statement};
pub use table::{Row, Table, TableError, Value};
pub use tag::{OverlayTag, NO_OVERLAPS_FOUND};
pub use traits::SpatialDatabase;
