//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use landstat_store::{DbProfile, DEFAULT_SRID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name
    #[serde(default = "default_profile")]
    pub active_profile: String,

    /// Database profiles
    #[serde(default)]
    pub profiles: BTreeMap<String, DbProfile>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// File this configuration was loaded from
    #[serde(skip)]
    location: Option<PathBuf>,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Directory reports are written to (current directory when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// SRID of database geometry
    #[serde(default = "default_srid")]
    pub srid: u32,

    /// Default map tooltip column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_column: Option<String>,

    /// Extra query catalog merged over the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".landstat").join("config.toml"))
    }

    /// Load configuration from the default path, or defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from `path`, or defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)?;
            toml::from_str::<Config>(&contents)?
        } else {
            Self::default()
        };
        config.location = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to the file it came from.
    pub fn save(&self) -> Result<()> {
        let path = match &self.location {
            Some(path) => path.clone(),
            None => Self::path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, contents)?;
        Ok(())
    }

    /// Get the active profile.
    pub fn get_active_profile(&self) -> Result<&DbProfile> {
        self.profiles
            .get(&self.active_profile)
            .ok_or_else(|| CliError::Config(format!("Profile '{}' not found", self.active_profile)))
    }

    /// Add or update a profile.
    pub fn set_profile(&mut self, name: String, profile: DbProfile) {
        self.profiles.insert(name, profile);
    }

    /// Switch to a different profile.
    pub fn switch_profile(&mut self, name: String) -> Result<()> {
        if !self.profiles.contains_key(&name) {
            return Err(CliError::Config(format!("Profile '{}' does not exist", name)));
        }
        self.active_profile = name;
        Ok(())
    }

    /// Directory for report files.
    pub fn output_dir(&self) -> PathBuf {
        self.settings
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "bcgw".to_string(),
            DbProfile {
                hostname: "bcgw.bcgov/idwprod1.bcgov".to_string(),
                port: 1521,
                service_name: None,
                username: String::new(),
                password: None,
                schema: None,
            },
        );

        Self {
            active_profile: "bcgw".to_string(),
            profiles,
            settings: Settings::default(),
            location: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            output_dir: None,
            srid: DEFAULT_SRID,
            label_column: None,
            catalog: None,
        }
    }
}

fn default_profile() -> String {
    "bcgw".to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_srid() -> u32 {
    DEFAULT_SRID
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(host: &str) -> DbProfile {
        DbProfile {
            hostname: host.to_string(),
            port: 1521,
            service_name: Some("idwtest1.bcgov".to_string()),
            username: "analyst".to_string(),
            password: None,
            schema: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.active_profile, "bcgw");
        assert!(config.profiles.contains_key("bcgw"));
        assert!(config.settings.color);
        assert_eq!(config.settings.srid, 3005);
        assert_eq!(config.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_profile_management() {
        let mut config = Config::default();
        config.set_profile("test".to_string(), profile("bcgw-test.bcgov"));
        assert!(config.profiles.contains_key("test"));

        config.switch_profile("test".to_string()).unwrap();
        assert_eq!(config.active_profile, "test");
        assert_eq!(
            config.get_active_profile().unwrap().connect_string(),
            "bcgw-test.bcgov:1521/idwtest1.bcgov"
        );
    }

    #[test]
    fn test_switch_to_nonexistent_profile() {
        let mut config = Config::default();
        let result = config.switch_profile("nonexistent".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::load_from(&path).unwrap();
        config.set_profile("test".to_string(), profile("bcgw-test.bcgov"));
        config.settings.label_column = Some("CROWN_LANDS_FILE".to_string());
        config.save().unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.profiles.get("test"), Some(&profile("bcgw-test.bcgov")));
        assert_eq!(reloaded.settings.label_column.as_deref(), Some("CROWN_LANDS_FILE"));
        assert_eq!(reloaded.settings.format, OutputFormat::Table);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "active_profile = \"bcgw\"\n[settings]\nformat = \"json\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert!(config.settings.color);
        assert!(config.profiles.is_empty());
    }
}
