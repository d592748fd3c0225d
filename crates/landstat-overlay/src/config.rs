//! Configuration for the overlay runner

use landstat_geo::Crs;
use landstat_store::DEFAULT_SRID;
use serde::{Deserialize, Serialize};

/// Configuration for the overlay runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// SRID the AOI is bound in for spatial SQL
    pub srid: u32,

    /// Stop at the first failing rule instead of recording it
    pub fail_fast: bool,

    /// Keep the WKT geometry column in result tables
    pub include_geometry: bool,

    /// EPSG code assumed for local files that carry no CRS
    pub file_crs_epsg: u32,

    /// Add the rule's label field to the selected fields when missing
    pub select_label_field: bool,
}

impl OverlayConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if Crs::from_epsg(self.srid).is_err() {
            return Err(format!("srid {} is not a supported projection", self.srid));
        }
        if Crs::from_epsg(self.file_crs_epsg).is_err() {
            return Err(format!(
                "file_crs_epsg {} is not a supported projection",
                self.file_crs_epsg
            ));
        }
        Ok(())
    }

    /// Strict preset: stop at the first failing rule
    pub fn strict() -> Self {
        Self {
            fail_fast: true,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            srid: DEFAULT_SRID,
            fail_fast: false,
            include_geometry: false,
            file_crs_epsg: DEFAULT_SRID,
            select_label_field: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(OverlayConfig::default().validate().is_ok());
        assert!(OverlayConfig::strict().validate().is_ok());
        assert!(OverlayConfig::strict().fail_fast);
    }

    #[test]
    fn test_unsupported_srid() {
        let config = OverlayConfig {
            srid: 32610,
            ..OverlayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = OverlayConfig::from_toml("fail_fast = true").unwrap();
        assert!(config.fail_fast);
        assert_eq!(config.srid, 3005);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = OverlayConfig {
            include_geometry: true,
            file_crs_epsg: 4326,
            ..OverlayConfig::default()
        };
        let parsed = OverlayConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }
}
