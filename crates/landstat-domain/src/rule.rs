//! Overlay rules read from a status rule sheet

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// File extensions treated as local vector datasets
const VECTOR_EXTENSIONS: &[&str] = &["shp", "geojson", "json"];

/// Dataset a rule is evaluated against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Database table or view, addressed as `OWNER.TABLE`
    Table {
        /// Schema owner (e.g. `WHSE_TANTALIS`)
        owner: String,
        /// Table or view name
        table: String,
    },

    /// Local vector file (shapefile or GeoJSON)
    File(PathBuf),
}

impl Target {
    /// Classify a datasource string from a rule sheet
    ///
    /// Anything with a path separator or a known vector extension is a local
    /// file; `OWNER.TABLE` is a database table.
    pub fn parse(datasource: &str) -> Result<Self, RuleError> {
        let trimmed = datasource.trim();
        if trimmed.is_empty() {
            return Err(RuleError::EmptyDatasource);
        }

        let lower = trimmed.to_lowercase();
        let has_vector_ext = VECTOR_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)));
        if trimmed.contains('/') || trimmed.contains('\\') || has_vector_ext {
            return Ok(Self::File(PathBuf::from(trimmed)));
        }

        match trimmed.split_once('.') {
            Some((owner, table)) if !owner.is_empty() && !table.is_empty() && !table.contains('.') => {
                Ok(Self::Table {
                    owner: owner.to_uppercase(),
                    table: table.to_uppercase(),
                })
            }
            _ => Err(RuleError::UnqualifiedTable(trimmed.to_string())),
        }
    }

    /// True when the rule is evaluated server-side
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table { .. })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { owner, table } => write!(f, "{}.{}", owner, table),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One row of a status rule sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Report category the rule belongs to (e.g. "Land Act Tenures")
    pub category: String,

    /// Human-readable feature class name, also used as the sheet name
    pub name: String,

    /// Dataset to overlay against the AOI
    pub target: Target,

    /// Attribute columns to carry into the result
    pub fields: Vec<String>,

    /// Optional attribute filter (a WHERE clause fragment)
    pub definition_query: Option<String>,

    /// Optional buffer radius in metres
    pub buffer_m: Option<f64>,

    /// Column used for map tooltips
    pub label_field: Option<String>,
}

impl Rule {
    /// Create a rule with no fields, filter or buffer
    pub fn new(category: impl Into<String>, name: impl Into<String>, target: Target) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            target,
            fields: Vec::new(),
            definition_query: None,
            buffer_m: None,
            label_field: None,
        }
    }

    /// Set the reported fields
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the definition query
    pub fn with_definition_query(mut self, query: impl Into<String>) -> Self {
        self.definition_query = Some(query.into());
        self
    }

    /// Set the buffer radius in metres
    pub fn with_buffer(mut self, metres: f64) -> Self {
        self.buffer_m = Some(metres);
        self
    }

    /// Set the label field
    pub fn with_label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = Some(field.into());
        self
    }

    /// Buffer radius when one is set and greater than zero
    pub fn effective_buffer(&self) -> Option<f64> {
        self.buffer_m.filter(|b| *b > 0.0)
    }

    /// Check the rule is usable
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.name.trim().is_empty() {
            return Err(RuleError::MissingName);
        }
        if let Some(buffer) = self.buffer_m {
            if !buffer.is_finite() || buffer < 0.0 {
                return Err(RuleError::InvalidBuffer(buffer));
            }
        }
        Ok(())
    }
}

/// Problems with a rule row
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// Datasource cell was blank
    #[error("datasource is empty")]
    EmptyDatasource,
    /// Table name given without an owner
    #[error("table '{0}' must be qualified as OWNER.TABLE")]
    UnqualifiedTable(String),
    /// Feature class name was blank
    #[error("feature class name is empty")]
    MissingName,
    /// Buffer distance negative or not a number
    #[error("invalid buffer distance: {0}")]
    InvalidBuffer(f64),
}
