//! Feature layers shared by maps and spatial exports

use crate::{ReportError, Result};
use landstat_domain::{Table, Value};
use landstat_geo::{parse_wkt, Crs, Feature};

/// A named group of features in WGS84
#[derive(Debug, Clone, Default)]
pub struct FeatureLayer {
    /// Layer name (legend entry, KML folder, `layer` property)
    pub name: String,
    /// Attribute used as the feature label
    pub label_column: Option<String>,
    /// Features with longitude/latitude coordinates
    pub features: Vec<Feature>,
}

impl FeatureLayer {
    /// Create an empty layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the label column
    pub fn with_label_column(mut self, column: Option<String>) -> Self {
        self.label_column = column;
        self
    }

    /// Build a layer from a table holding WKT in `wkt_column`
    ///
    /// Rows without geometry are skipped; geometry is reprojected from
    /// `crs` to WGS84.
    pub fn from_table(name: impl Into<String>, table: &Table, wkt_column: &str, crs: &Crs) -> Result<Self> {
        let idx = table
            .column_index(wkt_column)
            .ok_or_else(|| ReportError::MissingColumn(wkt_column.to_string()))?;

        let transformer = crs.transformer(&Crs::WGS84)?;
        let mut features = Vec::with_capacity(table.len());
        for row in table.iter() {
            let Some(wkt) = row.values()[idx].as_str() else {
                continue;
            };
            let geometry = transformer.apply(&parse_wkt(wkt)?)?;
            let attributes = table
                .columns()
                .iter()
                .zip(row.values())
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .map(|(_, (k, v))| (k.clone(), v.clone()))
                .collect();
            features.push(Feature { attributes, geometry });
        }

        Ok(Self {
            name: name.into(),
            label_column: None,
            features,
        })
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True when the layer has no features
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Label for one feature: the label column when set and non-null,
    /// otherwise the first non-null text attribute
    pub fn label_for(&self, feature: &Feature) -> Option<String> {
        let from_column = self
            .label_column
            .as_deref()
            .and_then(|c| feature.attribute(c))
            .filter(|v| !v.is_null())
            .map(Value::to_string);

        from_column.or_else(|| {
            feature
                .attributes
                .iter()
                .find(|(_, v)| matches!(v, Value::Text(_)))
                .map(|(_, v)| v.to_string())
        })
    }
}
