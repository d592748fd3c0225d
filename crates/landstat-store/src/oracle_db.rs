//! Oracle Spatial backend

use crate::config::{Credentials, DbProfile};
use crate::identifier::Identifier;
use crate::Result;
use chrono::NaiveDateTime;
use landstat_domain::{BindValue, SpatialDatabase, Statement, Table, Value};
use oracle::sql_type::OracleType;
use oracle::{Connection, Row};
use tracing::{debug, info};

/// How a result column is read into a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Integer,
    Number,
    DateTime,
    Text,
    /// SDO_GEOMETRY and other object columns are not materialised
    Skip,
}

impl ColumnKind {
    fn of(oracle_type: &OracleType) -> Self {
        match oracle_type {
            OracleType::Number(precision, 0) if *precision > 0 && *precision <= 18 => Self::Integer,
            OracleType::Int64 | OracleType::UInt64 => Self::Integer,
            OracleType::Number(_, _)
            | OracleType::Float(_)
            | OracleType::BinaryFloat
            | OracleType::BinaryDouble => Self::Number,
            OracleType::Date
            | OracleType::Timestamp(_)
            | OracleType::TimestampTZ(_)
            | OracleType::TimestampLTZ(_) => Self::DateTime,
            OracleType::Object(_) | OracleType::BLOB | OracleType::Raw(_) | OracleType::LongRaw => {
                Self::Skip
            }
            _ => Self::Text,
        }
    }
}

/// A live connection to an Oracle database
pub struct OracleDatabase {
    conn: Connection,
}

impl OracleDatabase {
    /// Connect using a profile and resolved credentials
    pub fn connect(profile: &DbProfile, credentials: &Credentials) -> Result<Self> {
        let connect_string = profile.connect_string();
        info!(user = %credentials.username, database = %connect_string, "connecting to Oracle");
        let conn = Connection::connect(&credentials.username, credentials.password(), &connect_string)?;

        if let Some(schema) = &profile.schema {
            let schema = Identifier::new(schema)?;
            conn.execute(&format!("ALTER SESSION SET CURRENT_SCHEMA = {}", schema), &[])?;
            debug!(%schema, "set current schema");
        }
        Ok(Self { conn })
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn read_cell(row: &Row, idx: usize, kind: ColumnKind) -> Result<Value> {
        let value = match kind {
            ColumnKind::Integer => row.get::<_, Option<i64>>(idx)?.into(),
            ColumnKind::Number => row.get::<_, Option<f64>>(idx)?.into(),
            ColumnKind::DateTime => match row.get::<_, Option<NaiveDateTime>>(idx)? {
                Some(dt) if dt.time() == chrono::NaiveTime::MIN => Value::Date(dt.date()),
                Some(dt) => Value::DateTime(dt),
                None => Value::Null,
            },
            ColumnKind::Text => row.get::<_, Option<String>>(idx)?.into(),
            ColumnKind::Skip => Value::Null,
        };
        Ok(value)
    }
}

impl SpatialDatabase for OracleDatabase {
    type Error = crate::StoreError;

    fn fetch(&mut self, statement: &Statement) -> Result<Table> {
        debug!(sql = %statement.sql, binds = statement.binds.len(), "executing query");

        let mut stmt = self.conn.statement(&statement.sql).build()?;
        for bind in &statement.binds {
            let name = bind.name.as_str();
            match &bind.value {
                BindValue::Text(s) => stmt.bind(name, s)?,
                BindValue::Clob(s) => stmt.bind(name, &(s, &OracleType::CLOB))?,
                BindValue::Integer(i) => stmt.bind(name, i)?,
                BindValue::Number(n) => stmt.bind(name, n)?,
            }
        }

        let rows = stmt.query(&[])?;
        let columns: Vec<(String, ColumnKind)> = rows
            .column_info()
            .iter()
            .map(|col| (col.name().to_string(), ColumnKind::of(col.oracle_type())))
            .collect();

        let kept: Vec<(usize, ColumnKind)> = columns
            .iter()
            .enumerate()
            .filter(|(_, (_, kind))| *kind != ColumnKind::Skip)
            .map(|(idx, (_, kind))| (idx, *kind))
            .collect();

        let mut table = Table::new(
            columns
                .iter()
                .filter(|(_, kind)| *kind != ColumnKind::Skip)
                .map(|(name, _)| name.clone()),
        );

        for row in rows {
            let row = row?;
            let values = kept
                .iter()
                .map(|(idx, kind)| Self::read_cell(&row, *idx, *kind))
                .collect::<Result<Vec<_>>>()?;
            table.push_row(values)?;
        }

        debug!(rows = table.len(), columns = table.width(), "query returned");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kinds() {
        assert_eq!(ColumnKind::of(&OracleType::Number(9, 0)), ColumnKind::Integer);
        assert_eq!(ColumnKind::of(&OracleType::Number(38, 0)), ColumnKind::Number);
        assert_eq!(ColumnKind::of(&OracleType::Number(0, -127)), ColumnKind::Number);
        assert_eq!(ColumnKind::of(&OracleType::Date), ColumnKind::DateTime);
        assert_eq!(ColumnKind::of(&OracleType::Varchar2(50)), ColumnKind::Text);
        assert_eq!(ColumnKind::of(&OracleType::CLOB), ColumnKind::Text);
        assert_eq!(ColumnKind::of(&OracleType::BLOB), ColumnKind::Skip);
    }
}
