//! Database connection profiles and credentials

use crate::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Environment variables checked for a password, in order
pub const PASSWORD_ENV_VARS: &[&str] = &["LANDSTAT_DB_PASSWORD", "BCGW_PWD"];

/// Environment variables checked for a username, in order
pub const USERNAME_ENV_VARS: &[&str] = &["LANDSTAT_DB_USER", "BCGW_USER"];

/// How to reach one database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbProfile {
    /// Host name, or a full `host:port/service` connect string
    pub hostname: String,

    /// Listener port, used with `service_name`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Service name; when absent `hostname` is used as the connect string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// Database user (may be overridden from the environment)
    #[serde(default)]
    pub username: String,

    /// Stored password (only from imported legacy files; prefer the environment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Default schema for unqualified names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

fn default_port() -> u16 {
    1521
}

impl DbProfile {
    /// Connect string passed to the Oracle client
    pub fn connect_string(&self) -> String {
        match &self.service_name {
            Some(service) => format!("{}:{}/{}", self.hostname, self.port, service),
            None => self.hostname.clone(),
        }
    }
}

/// Entry of the legacy `db_config.json` (`{dbname: {hostname, username, password}}`)
#[derive(Debug, Deserialize)]
struct LegacyEntry {
    hostname: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default, alias = "service", alias = "sid")]
    service_name: Option<String>,
}

/// Read profiles from a legacy JSON config file
pub fn load_legacy_profiles(path: &Path) -> Result<BTreeMap<String, DbProfile>> {
    let text = std::fs::read_to_string(path)?;
    parse_legacy_profiles(&text)
}

/// Parse the legacy JSON config format
pub fn parse_legacy_profiles(text: &str) -> Result<BTreeMap<String, DbProfile>> {
    let entries: BTreeMap<String, LegacyEntry> = serde_json::from_str(text)?;
    Ok(entries
        .into_iter()
        .map(|(name, e)| {
            let profile = DbProfile {
                hostname: e.hostname,
                port: e.port.unwrap_or_else(default_port),
                service_name: e.service_name,
                username: e.username,
                password: e.password,
                schema: None,
            };
            (name, profile)
        })
        .collect())
}

/// Username and password for one connection
#[derive(Clone)]
pub struct Credentials {
    /// Database user
    pub username: String,
    password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Resolve credentials from the process environment
    pub fn resolve(profile: &DbProfile, explicit_password: Option<String>) -> Result<Self> {
        Self::resolve_with(profile, explicit_password, |key| std::env::var(key).ok())
    }

    /// Resolve credentials with a custom environment lookup
    ///
    /// Username: profile, else the first set of [`USERNAME_ENV_VARS`].
    /// Password: explicit, else the first set of [`PASSWORD_ENV_VARS`], else
    /// the profile's stored password.
    pub fn resolve_with<F>(profile: &DbProfile, explicit_password: Option<String>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_env = |keys: &[&str]| keys.iter().find_map(|k| env(k).filter(|v| !v.is_empty()));

        let username = if profile.username.trim().is_empty() {
            first_env(USERNAME_ENV_VARS)
                .ok_or_else(|| StoreError::Config("no database username configured".to_string()))?
        } else {
            profile.username.clone()
        };

        let password = explicit_password
            .or_else(|| first_env(PASSWORD_ENV_VARS))
            .or_else(|| profile.password.clone())
            .ok_or_else(|| StoreError::MissingPassword(username.clone()))?;

        Ok(Self { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn profile(username: &str, password: Option<&str>) -> DbProfile {
        DbProfile {
            hostname: "bcgw.bcgov/idwprod1.bcgov".to_string(),
            port: 1521,
            service_name: None,
            username: username.to_string(),
            password: password.map(str::to_string),
            schema: None,
        }
    }

    #[test]
    fn test_connect_string() {
        assert_eq!(profile("u", None).connect_string(), "bcgw.bcgov/idwprod1.bcgov");

        let with_service = DbProfile {
            hostname: "db.example".to_string(),
            service_name: Some("orcl".to_string()),
            ..profile("u", None)
        };
        assert_eq!(with_service.connect_string(), "db.example:1521/orcl");
    }

    #[test]
    fn test_legacy_json() {
        let profiles = parse_legacy_profiles(
            r#"{
                "BCGW": {"hostname": "bcgw.bcgov/idwprod1.bcgov", "username": "jdoe", "password": "pw"},
                "ODS": {"hostname": "ods.example", "username": "reporter", "port": 1522, "service": "ods1"}
            }"#,
        )
        .unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles["BCGW"].password.as_deref(), Some("pw"));
        assert_eq!(profiles["ODS"].connect_string(), "ods.example:1522/ods1");
    }

    #[test]
    fn test_password_precedence() {
        let env: HashMap<&str, &str> = [("BCGW_PWD", "from-env")].into_iter().collect();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let creds = Credentials::resolve_with(&profile("jdoe", Some("stored")), Some("explicit".into()), lookup).unwrap();
        assert_eq!(creds.password(), "explicit");

        let creds = Credentials::resolve_with(&profile("jdoe", Some("stored")), None, lookup).unwrap();
        assert_eq!(creds.password(), "from-env");

        let creds = Credentials::resolve_with(&profile("jdoe", Some("stored")), None, |_| None).unwrap();
        assert_eq!(creds.password(), "stored");

        let err = Credentials::resolve_with(&profile("jdoe", None), None, |_| None).unwrap_err();
        assert!(matches!(err, StoreError::MissingPassword(user) if user == "jdoe"));
    }

    #[test]
    fn test_username_from_env() {
        let creds = Credentials::resolve_with(&profile("", None), Some("pw".into()), |k| {
            (k == "BCGW_USER").then(|| "envuser".to_string())
        })
        .unwrap();
        assert_eq!(creds.username, "envuser");
        assert!(!format!("{:?}", creds).contains("pw"));
    }
}
