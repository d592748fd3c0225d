//! Validated Oracle identifiers
//!
//! The only text ever spliced into SQL. Unquoted Oracle identifiers: a letter,
//! then letters, digits, `_`, `$` or `#`, at most 128 bytes.

use crate::{Result, StoreError};
use landstat_domain::Target;
use std::fmt;

const MAX_IDENTIFIER_LEN: usize = 128;

/// An unquoted Oracle identifier, stored upper-case
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Validate a name
    pub fn new(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        let mut chars = trimmed.chars();
        let valid = match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#')),
            _ => false,
        };

        if !valid || trimmed.len() > MAX_IDENTIFIER_LEN {
            return Err(StoreError::InvalidIdentifier(name.to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// Identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A schema-qualified table or view name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    /// Schema owner
    pub owner: Identifier,
    /// Table or view
    pub table: Identifier,
}

impl TableName {
    /// Parse `OWNER.TABLE`
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().split_once('.') {
            Some((owner, table)) => Ok(Self {
                owner: Identifier::new(owner)?,
                table: Identifier::new(table)?,
            }),
            None => Err(StoreError::InvalidIdentifier(name.to_string())),
        }
    }

    /// Table name for a database rule target
    pub fn from_target(target: &Target) -> Result<Self> {
        match target {
            Target::Table { owner, table } => Ok(Self {
                owner: Identifier::new(owner)?,
                table: Identifier::new(table)?,
            }),
            Target::File(path) => Err(StoreError::InvalidIdentifier(path.display().to_string())),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert_eq!(Identifier::new("tenure_status").unwrap().as_str(), "TENURE_STATUS");
        assert!(Identifier::new("SHAPE$1").is_ok());
        assert!(Identifier::new("FILE#").is_ok());
    }

    #[test]
    fn test_rejects_injection() {
        for bad in ["", "1ABC", "A B", "A;DROP", "A'--", "\"QUOTED\"", "A.B"] {
            assert!(Identifier::new(bad).is_err(), "accepted {:?}", bad);
        }
        assert!(Identifier::new(&"A".repeat(129)).is_err());
    }

    #[test]
    fn test_table_name() {
        let name = TableName::parse("whse_tantalis.ta_crown_tenures_svw").unwrap();
        assert_eq!(name.to_string(), "WHSE_TANTALIS.TA_CROWN_TENURES_SVW");
        assert!(TableName::parse("NO_OWNER").is_err());
        assert!(TableName::parse("A.B.C").is_err());
    }

    #[test]
    fn test_from_target() {
        let target = Target::parse("WHSE_ADMIN_BOUNDARIES.CLAB_INDIAN_RESERVES").unwrap();
        let name = TableName::from_target(&target).unwrap();
        assert_eq!(name.table.as_str(), "CLAB_INDIAN_RESERVES");

        let file = Target::parse("parks.shp").unwrap();
        assert!(TableName::from_target(&file).is_err());
    }
}
