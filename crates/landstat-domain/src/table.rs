//! In-memory tables of typed cells
//!
//! Every loader (database, spreadsheet, vector file) produces a [`Table`] and
//! every writer consumes one. Column lookups are case-insensitive because the
//! upstream sources disagree on header case.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

/// A single cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing value
    #[default]
    Null,
    /// Text
    Text(String),
    /// Whole number
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// Boolean
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time without zone
    DateTime(NaiveDateTime),
}

impl Value {
    /// Build a text cell, mapping blank strings to `Null`
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::Null
        } else {
            Self::Text(value)
        }
    }

    /// True for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for `Integer` and `Number`
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Number(_))
    }

    /// Numeric value, if the cell holds one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text value, if the cell holds one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Calendar date, if the cell holds a date or datetime
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    /// Type-tagged string used for row identity
    fn key(&self) -> String {
        match self {
            Self::Null => "n:".to_string(),
            Self::Text(s) => format!("t:{}", s),
            Self::Integer(i) => format!("i:{}", i),
            Self::Number(n) => format!("f:{}", n),
            Self::Bool(b) => format!("b:{}", b),
            Self::Date(d) => format!("d:{}", d),
            Self::DateTime(dt) => format!("dt:{}", dt),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Errors from table manipulation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    /// Row or column length did not match the table
    #[error("expected {expected} cells, got {actual}")]
    WidthMismatch {
        /// Expected number of cells
        expected: usize,
        /// Actual number of cells
        actual: usize,
    },
    /// Column name already present
    #[error("column '{0}' already exists")]
    DuplicateColumn(String),
}

/// Borrowed view of one row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Cell by column name (case-insensitive)
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let values = self.values;
        self.table.column_index(column).map(move |i| &values[i])
    }

    /// All cells in column order
    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

/// Ordered columns and rows of typed cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// One-row table from name/value pairs
    pub fn from_record<I, S>(record: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, row): (Vec<String>, Vec<Value>) = record.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self { columns, rows: vec![row] }
    }

    /// Column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw rows
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Iterate rows as [`Row`] views
    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |values| Row {
            table: self,
            values,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column, matched case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name.trim()))
    }

    /// True when the column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` in the named column
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Cells of the named column
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Append a row
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::WidthMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a column computed from each row
    pub fn add_column_with<F>(&mut self, name: impl Into<String>, mut f: F) -> Result<(), TableError>
    where
        F: FnMut(Row<'_>) -> Value,
    {
        let name = name.into();
        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn(name));
        }
        let values: Vec<Value> = self.iter().map(&mut f).collect();
        self.columns.push(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Append a column holding the same value on every row
    pub fn add_constant_column(&mut self, name: impl Into<String>, value: Value) -> Result<(), TableError> {
        self.add_column_with(name, |_| value.clone())
    }

    /// Rename a column, returning false when it does not exist
    pub fn rename_column(&mut self, from: &str, to: impl Into<String>) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.into();
                true
            }
            None => false,
        }
    }

    /// Remove a column, returning false when it does not exist
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Transform every column name in place
    pub fn map_columns<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        for column in &mut self.columns {
            *column = f(column);
        }
    }

    /// Append the rows of `other`, aligning columns by name
    ///
    /// Columns only present in `other` are added; cells missing on either
    /// side become `Null`.
    pub fn append(&mut self, other: Table) {
        let mut mapping = Vec::with_capacity(other.columns.len());
        for column in &other.columns {
            let idx = match self.column_index(column) {
                Some(idx) => idx,
                None => {
                    self.columns.push(column.clone());
                    for row in &mut self.rows {
                        row.push(Value::Null);
                    }
                    self.columns.len() - 1
                }
            };
            mapping.push(idx);
        }

        let width = self.columns.len();
        for row in other.rows {
            let mut aligned = vec![Value::Null; width];
            for (value, idx) in row.into_iter().zip(&mapping) {
                aligned[*idx] = value;
            }
            self.rows.push(aligned);
        }
    }

    /// Drop rows identical to an earlier row, returning how many were removed
    pub fn dedup(&mut self) -> usize {
        self.dedup_by_columns(&[])
    }

    /// Drop rows whose cells in `key_columns` match an earlier row
    ///
    /// An empty key means the whole row.
    pub fn dedup_by_columns(&mut self, key_columns: &[&str]) -> usize {
        let indices: Vec<usize> = if key_columns.is_empty() {
            (0..self.columns.len()).collect()
        } else {
            key_columns.iter().filter_map(|c| self.column_index(c)).collect()
        };

        let before = self.rows.len();
        let mut seen = HashSet::new();
        self.rows.retain(|row| {
            let key: Vec<String> = indices.iter().map(|i| row[*i].key()).collect();
            seen.insert(key.join("\u{1f}"))
        });
        before - self.rows.len()
    }

    /// Rows matching `predicate`, as a new table
    pub fn filter<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(Row<'_>) -> bool,
    {
        let rows = self
            .iter()
            .filter(|r| predicate(*r))
            .map(|r| r.values.to_vec())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Row counts per distinct value of a column, sorted by value
    pub fn count_by(&self, column: &str) -> Option<Vec<(String, usize)>> {
        let idx = self.column_index(column)?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row[idx].to_string()).or_insert(0) += 1;
        }
        Some(counts.into_iter().collect())
    }

    /// True when every non-null cell of the column is numeric and one exists
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        let mut any = false;
        for row in &self.rows {
            match &row[idx] {
                Value::Null => {}
                v if v.is_numeric() => any = true,
                _ => return false,
            }
        }
        any
    }
}
