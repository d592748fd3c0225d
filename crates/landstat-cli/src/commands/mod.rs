//! Command implementations.

pub mod profile;
pub mod query;
pub mod status;
pub mod tenure;

pub use self::profile::execute_profile;
pub use self::query::execute_query;
pub use self::status::execute_status;
pub use self::tenure::execute_tenure;

use crate::config::Config;
use crate::error::Result;
use landstat_store::{Credentials, OracleDatabase};
use std::path::{Path, PathBuf};

/// Open the active profile's database.
pub fn open_database(config: &Config, password: Option<String>) -> Result<OracleDatabase> {
    let profile = config.get_active_profile()?;
    let credentials = Credentials::resolve(profile, password)?;
    Ok(OracleDatabase::connect(profile, &credentials)?)
}

/// File-name-safe form of a report name
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "report".to_string()
    } else {
        stem
    }
}

/// `<dir>/<stem>.<extension>`, creating `dir` when missing
pub fn output_path(dir: &Path, stem: &str, extension: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.join(format!("{}.{}", stem, extension)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Parcel 7/North"), "Parcel_7_North");
        assert_eq!(file_stem("tenure-2024_04"), "tenure-2024_04");
        assert_eq!(file_stem("  "), "report");
    }

    #[test]
    fn test_output_path_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports");
        let path = output_path(&nested, "site_status", "xlsx").unwrap();
        assert!(nested.is_dir());
        assert_eq!(path, nested.join("site_status.xlsx"));
    }
}
