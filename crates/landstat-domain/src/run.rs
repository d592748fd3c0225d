//! Run identifiers

use std::fmt;
use uuid::Uuid;

/// Identifier stamped on every report run
///
/// UUIDv7, so identifiers sort by start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(Uuid);

impl RunId {
    /// Generate a new run id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// First eight hex digits, used in output file names
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
