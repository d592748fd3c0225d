//! Error types for data access

use thiserror::Error;

/// Errors that can occur while talking to the database or reading inputs
#[derive(Error, Debug)]
pub enum StoreError {
    /// Oracle driver error
    #[error("Database error: {0}")]
    Oracle(#[from] oracle::Error),

    /// Query failed (used by non-Oracle backends)
    #[error("Query failed: {0}")]
    Query(String),

    /// Name cannot be used as an Oracle identifier
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Definition query rejected by the validator
    #[error("Unsafe definition query '{query}': {reason}")]
    UnsafeDefinitionQuery {
        /// The rejected fragment
        query: String,
        /// Why it was rejected
        reason: String,
    },

    /// Table has no entry in the spatial metadata
    #[error("No geometry column registered for {0}")]
    NoGeometryColumn(String),

    /// Catalog has no query of that name
    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    /// `{placeholder}` without a substitution
    #[error("Missing identifier for placeholder {{{0}}}")]
    MissingPlaceholder(String),

    /// `:bind` without a value
    #[error("Missing value for bind :{0}")]
    MissingBind(String),

    /// Value supplied for a bind the SQL does not use
    #[error("Bind :{0} is not used by the query")]
    UnusedBind(String),

    /// No password from any source
    #[error("No password for database user '{0}' (set LANDSTAT_DB_PASSWORD or pass --password)")]
    MissingPassword(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Excel workbook error
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Row did not fit the table
    #[error("Table error: {0}")]
    Table(#[from] landstat_domain::TableError),
}

/// Result alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
