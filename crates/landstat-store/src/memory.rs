//! In-memory database for tests and dry runs

use crate::{Result, StoreError};
use landstat_domain::{SpatialDatabase, Statement, Table};

enum Response {
    Rows(Table),
    Fail(String),
}

/// A [`SpatialDatabase`] that answers from canned tables
///
/// Responses are matched by SQL substring in registration order; the first
/// match wins. Unmatched statements return an empty table. Every executed
/// statement is recorded.
#[derive(Default)]
pub struct MemoryDatabase {
    responses: Vec<(String, Response)>,
    executed: Vec<Statement>,
}

impl MemoryDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `fragment` with `table`
    pub fn respond(mut self, fragment: impl Into<String>, table: Table) -> Self {
        self.responses.push((fragment.into(), Response::Rows(table)));
        self
    }

    /// Fail statements containing `fragment`
    pub fn fail(mut self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses.push((fragment.into(), Response::Fail(message.into())));
        self
    }

    /// Statements executed so far
    pub fn executed(&self) -> &[Statement] {
        &self.executed
    }
}

impl SpatialDatabase for MemoryDatabase {
    type Error = StoreError;

    fn fetch(&mut self, statement: &Statement) -> Result<Table> {
        self.executed.push(statement.clone());
        let response = self
            .responses
            .iter()
            .find(|(fragment, _)| statement.sql.contains(fragment.as_str()))
            .map(|(_, response)| response);

        match response {
            Some(Response::Rows(table)) => Ok(table.clone()),
            Some(Response::Fail(message)) => Err(StoreError::Query(message.clone())),
            None => Ok(Table::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landstat_domain::Value;

    #[test]
    fn test_first_match_wins() {
        let mut a = Table::new(["X"]);
        a.push_row(vec![Value::Integer(1)]).unwrap();

        let mut db = MemoryDatabase::new()
            .respond("SDO_RELATE", a)
            .fail("SDO_", "boom");

        let rows = db.fetch(&Statement::new("SELECT SDO_RELATE")).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(db.fetch(&Statement::new("SELECT SDO_WITHIN_DISTANCE")).is_err());
        assert!(db.fetch(&Statement::new("SELECT 1 FROM dual")).unwrap().is_empty());
        assert_eq!(db.executed().len(), 3);
    }
}
