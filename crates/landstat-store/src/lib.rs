//! Landstat Data Access
//!
//! Everything that touches a database or a tabular input file:
//!
//! - **Connector**: [`DbProfile`] and [`Credentials`] resolve how to reach
//!   Oracle; [`OracleDatabase`] implements [`landstat_domain::SpatialDatabase`]
//! - **Query loader**: [`QueryCatalog`] holds named SQL with `{slot}` identifier
//!   placeholders and `:bind` values
//! - **Spatial SQL**: [`SpatialQueryBuilder`] emits the `SDO_RELATE` and
//!   `SDO_WITHIN_DISTANCE` statements used by the overlay runner
//! - **Sheets**: [`read_table`] loads CSV and Excel files into a
//!   [`landstat_domain::Table`]
//!
//! No user-supplied value is ever formatted into SQL text. Names pass through
//! [`Identifier`]; attribute filters through [`DefinitionQuery`].
//!
//! # Example
//!
//! ```no_run
//! use landstat_domain::{Bind, BindValue, SpatialDatabase};
//! use landstat_store::{Credentials, DbProfile, OracleDatabase, QueryCatalog};
//! use std::collections::BTreeMap;
//!
//! # fn example(profile: DbProfile) -> Result<(), landstat_store::StoreError> {
//! let credentials = Credentials::resolve(&profile, None)?;
//! let mut db = OracleDatabase::connect(&profile, &credentials)?;
//!
//! let catalog = QueryCatalog::builtin()?;
//! let statement = catalog.render(
//!     "tenure_by_file",
//!     &BTreeMap::new(),
//!     vec![Bind { name: "file_nbr".into(), value: BindValue::Text("1414465".into()) }],
//! )?;
//! let table = db.fetch(&statement)?;
//! println!("{} parcels", table.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod catalog;
mod config;
mod error;
mod identifier;
mod memory;
mod oracle_db;
mod sheet;
mod sql;

pub use catalog::{NamedQuery, QueryCatalog};
pub use config::{
    load_legacy_profiles, parse_legacy_profiles, Credentials, DbProfile, PASSWORD_ENV_VARS,
    USERNAME_ENV_VARS,
};
pub use error::{Result, StoreError};
pub use identifier::{Identifier, TableName};
pub use memory::MemoryDatabase;
pub use oracle_db::OracleDatabase;
pub use sheet::read_table;
pub use sql::{DefinitionQuery, SpatialQueryBuilder, DEFAULT_SRID, GEOMETRY_WKT_COLUMN};
