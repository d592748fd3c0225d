//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database or input file error
    #[error(transparent)]
    Store(#[from] landstat_store::StoreError),

    /// Geometry error
    #[error(transparent)]
    Geo(#[from] landstat_geo::GeoError),

    /// Overlay run error
    #[error(transparent)]
    Overlay(#[from] landstat_overlay::OverlayError),

    /// Report writing error
    #[error(transparent)]
    Report(#[from] landstat_report::ReportError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not permitted
    #[error("Operation not permitted: {0}")]
    NotPermitted(String),
}
