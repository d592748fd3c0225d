//! Error types for the overlay runner

use landstat_domain::TableError;
use landstat_geo::GeoError;
use landstat_store::StoreError;
use thiserror::Error;

/// Errors that can occur while evaluating overlay rules
#[derive(Error, Debug)]
pub enum OverlayError {
    /// Database or query error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Geometry error
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// Result table could not be assembled
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Rule sheet lacks a required column
    #[error("Rule sheet has no {0} column")]
    MissingColumn(String),

    /// Rule row could not be turned into a rule
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Requested field absent from a local dataset
    #[error("Field '{field}' not found in {dataset}")]
    FieldNotFound {
        /// Requested field
        field: String,
        /// Dataset searched
        dataset: String,
    },

    /// Table rule evaluated without a database connection
    #[error("Rule '{0}' needs a database connection")]
    NoDatabase(String),

    /// Definition query on a local file
    #[error("Definition queries are only supported for database tables ({0})")]
    UnsupportedFilter(String),

    /// Geometry returned by the database could not be parsed
    #[error("Bad geometry from {dataset}: {reason}")]
    BadGeometry {
        /// Dataset the row came from
        dataset: String,
        /// Parser message
        reason: String,
    },

    /// No tenure record matched the lookup
    #[error("No tenure found for {0}")]
    TenureNotFound(String),

    /// Rule failed with fail-fast set
    #[error("Rule '{rule}' failed: {message}")]
    RuleFailed {
        /// Rule name
        rule: String,
        /// Failure message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias for overlay operations
pub type Result<T> = std::result::Result<T, OverlayError>;
