//! Trait definitions for external interactions
//!
//! These traits define the boundary between domain logic and infrastructure.
//! Implementations live in other crates.

use crate::{Statement, Table};

/// A spatial database that runs statements and returns tables
///
/// Implemented by the infrastructure layer (landstat-store): `OracleDatabase`
/// for BCGW and `MemoryDatabase` for tests.
pub trait SpatialDatabase {
    /// Error type for database operations
    type Error;

    /// Run a query and collect every row
    fn fetch(&mut self, statement: &Statement) -> Result<Table, Self::Error>;
}

impl<D: SpatialDatabase + ?Sized> SpatialDatabase for &mut D {
    type Error = D::Error;

    fn fetch(&mut self, statement: &Statement) -> Result<Table, Self::Error> {
        (**self).fetch(statement)
    }
}
