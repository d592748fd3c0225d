//! Error types for report output

use thiserror::Error;

/// Errors that can occur while writing workbooks, maps or exports
#[derive(Error, Debug)]
pub enum ReportError {
    /// Excel writer error
    #[error("Excel error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialisation error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// KML writer error
    #[error("XML error: {0}")]
    Xml(String),

    /// Geometry error
    #[error(transparent)]
    Geo(#[from] landstat_geo::GeoError),

    /// Table manipulation error
    #[error("Table error: {0}")]
    Table(#[from] landstat_domain::TableError),

    /// Workbook has no sheets
    #[error("Nothing to write: the workbook has no sheets")]
    EmptyWorkbook,

    /// Required input column missing
    #[error("Column '{0}' not found")]
    MissingColumn(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
