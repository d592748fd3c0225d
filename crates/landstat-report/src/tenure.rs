//! Tenure extract report
//!
//! Adds date-derived columns to a TITAN/ATS extract and splits it into one
//! sheet per status. Input headers are normalised first, so the source
//! columns are matched against upper-case aliases such as `RECEIVED_DATE`
//! or `DATE_RECEIVED`.

use crate::columns::normalize_headers;
use crate::workbook::{ReportWorkbook, Summary};
use crate::{ReportError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use landstat_domain::{Row, Table, Value};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Days from the received date to the as-of date
pub const DAYS_SINCE_RECEIVED: &str = "DAYS_SINCE_RECEIVED";
/// Whole years from effective to expiry date
pub const TENURE_LENGTH_YEARS: &str = "TENURE_LENGTH_YEARS";
/// Days from the as-of date to expiry; negative once expired
pub const DAYS_TO_EXPIRY: &str = "DAYS_TO_EXPIRY";
/// Fiscal year of the received date, e.g. `2024/25`
pub const FISCAL_YEAR: &str = "FISCAL_YEAR";

/// Sheet holding every row
pub const ALL_SHEET: &str = "ALL";

/// Source column aliases, tried in order against normalised headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenureConfig {
    /// Received date columns
    pub received: Vec<String>,
    /// Effective (commencement) date columns
    pub effective: Vec<String>,
    /// Expiry date columns
    pub expiry: Vec<String>,
    /// Status columns used to split sheets
    pub status: Vec<String>,
}

impl Default for TenureConfig {
    fn default() -> Self {
        let owned = |names: &[&str]| -> Vec<String> { names.iter().map(|s| s.to_string()).collect() };
        Self {
            received: owned(&["RECEIVED_DATE", "DATE_RECEIVED", "APPLICATION_RECEIVED_DATE", "RECEIVED"]),
            effective: owned(&["EFFECTIVE_DATE", "TENURE_EFFECTIVE_DATE", "COMMENCEMENT_DATE", "START_DATE"]),
            expiry: owned(&["EXPIRY_DATE", "TENURE_EXPIRY_DATE", "EXPIRY", "END_DATE"]),
            status: owned(&["STATUS", "TENURE_STATUS", "APPLICATION_STATUS", "STATUS_NME"]),
        }
    }
}

impl TenureConfig {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, aliases) in [
            ("received", &self.received),
            ("effective", &self.effective),
            ("expiry", &self.expiry),
            ("status", &self.status),
        ] {
            if aliases.iter().all(|a| a.trim().is_empty()) {
                return Err(format!("{} needs at least one column name", name));
            }
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }
}

fn find_column(table: &Table, aliases: &[String]) -> Option<usize> {
    aliases.iter().find_map(|a| table.column_index(a))
}

fn date_at(row: Row<'_>, idx: Option<usize>) -> Option<NaiveDate> {
    idx.and_then(|i| row.values().get(i)).and_then(parse_date)
}

/// Parse a date cell: typed dates, or text in ISO or Oracle style
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    if let Some(date) = value.as_date() {
        return Some(date);
    }
    let text = value.as_str()?.trim();
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y", "%d-%b-%y", "%b %d, %Y"];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .map(|dt| dt.date())
        })
}

/// The same month and day `years` later; February 29 falls on February 28
fn add_years(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    let year = date.year() + years;
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
}

/// Whole years between two dates, counting anniversaries
///
/// `None` when expiry precedes the effective date.
pub fn tenure_length_years(effective: NaiveDate, expiry: NaiveDate) -> Option<i64> {
    if expiry < effective {
        return None;
    }
    let mut years = expiry.year() - effective.year();
    if add_years(effective, years).is_some_and(|anniversary| anniversary > expiry) {
        years -= 1;
    }
    Some(years as i64)
}

/// Fiscal year label for a date; years start April 1
pub fn fiscal_year(date: NaiveDate) -> String {
    let start = if date.month() >= 4 { date.year() } else { date.year() - 1 };
    format!("{}/{:02}", start, (start + 1).rem_euclid(100))
}

/// Normalise headers and append the derived date columns
pub fn add_tenure_columns(table: &mut Table, as_of: NaiveDate, config: &TenureConfig) -> Result<()> {
    normalize_headers(table);

    let received = find_column(table, &config.received);
    let effective = find_column(table, &config.effective);
    let expiry = find_column(table, &config.expiry);
    for (name, idx) in [("received", received), ("effective", effective), ("expiry", expiry)] {
        if idx.is_none() {
            warn!("No {} date column found; derived values will be empty", name);
        }
    }

    table.add_column_with(DAYS_SINCE_RECEIVED, |row| {
        date_at(row, received)
            .map(|d| (as_of - d).num_days())
            .into()
    })?;
    table.add_column_with(TENURE_LENGTH_YEARS, |row| {
        match (date_at(row, effective), date_at(row, expiry)) {
            (Some(start), Some(end)) => tenure_length_years(start, end).into(),
            _ => Value::Null,
        }
    })?;
    table.add_column_with(DAYS_TO_EXPIRY, |row| {
        date_at(row, expiry).map(|d| (d - as_of).num_days()).into()
    })?;
    table.add_column_with(FISCAL_YEAR, |row| date_at(row, received).map(fiscal_year).into())?;
    Ok(())
}

/// Derive the tenure columns and lay the table out as a workbook
///
/// Sheets: `SUMMARY` (facts and per-status counts), `ALL`, then one sheet
/// per status value, sorted.
pub fn tenure_workbook(
    mut table: Table,
    as_of: NaiveDate,
    source: &str,
    config: &TenureConfig,
) -> Result<ReportWorkbook> {
    config.validate().map_err(ReportError::Config)?;
    add_tenure_columns(&mut table, as_of, config)?;

    let status_column = config
        .status
        .iter()
        .find(|c| table.has_column(c))
        .cloned()
        .ok_or_else(|| ReportError::MissingColumn(config.status.join("/")))?;

    let counts = table.count_by(&status_column).unwrap_or_default();
    let mut count_table = Table::new([status_column.as_str(), "COUNT"]);
    for (status, count) in &counts {
        count_table.push_row(vec![Value::text(status.as_str()), Value::Integer(*count as i64)])?;
    }

    let summary = Summary::default()
        .fact("SOURCE", source)
        .fact("AS_OF", as_of)
        .fact("ROWS", table.len() as i64)
        .with_table(count_table);

    let mut workbook = ReportWorkbook::new().with_summary(summary);
    workbook.add_sheet(ALL_SHEET, table.clone());
    for (status, _) in &counts {
        let subset = table.filter(|row| {
            row.get(&status_column)
                .map(|v| v.to_string() == *status)
                .unwrap_or(false)
        });
        let sheet_name = if status.is_empty() { "NO STATUS" } else { status.as_str() };
        workbook.add_sheet(sheet_name, subset);
    }
    info!("Tenure report: {} rows, {} statuses", table.len(), counts.len());
    Ok(workbook)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tenure_length_years() {
        assert_eq!(tenure_length_years(date(2020, 1, 15), date(2030, 1, 15)), Some(10));
        assert_eq!(tenure_length_years(date(2020, 1, 15), date(2030, 1, 14)), Some(9));
        assert_eq!(tenure_length_years(date(2020, 2, 29), date(2021, 2, 28)), Some(1));
        assert_eq!(tenure_length_years(date(2020, 2, 29), date(2021, 2, 27)), Some(0));
        assert_eq!(tenure_length_years(date(2021, 1, 1), date(2020, 1, 1)), None);
    }

    #[test]
    fn test_fiscal_year() {
        assert_eq!(fiscal_year(date(2024, 4, 1)), "2024/25");
        assert_eq!(fiscal_year(date(2025, 3, 31)), "2024/25");
        assert_eq!(fiscal_year(date(1999, 6, 1)), "1999/00");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(&Value::text("2024-04-01")), Some(date(2024, 4, 1)));
        assert_eq!(parse_date(&Value::text("01-APR-2024")), Some(date(2024, 4, 1)));
        assert_eq!(parse_date(&Value::text("2024-04-01 13:30:00")), Some(date(2024, 4, 1)));
        assert_eq!(parse_date(&Value::Date(date(2024, 4, 1))), Some(date(2024, 4, 1)));
        assert_eq!(parse_date(&Value::text("soon")), None);
        assert_eq!(parse_date(&Value::Integer(45000)), None);
    }

    #[test]
    fn test_add_tenure_columns() {
        let mut table = Table::new(["File #", "Date Received", "Effective Date", "Expiry Date"]);
        table
            .push_row(vec![
                Value::text("0001"),
                Value::Date(date(2024, 3, 1)),
                Value::text("2020-02-29"),
                Value::text("2030-02-28"),
            ])
            .unwrap();
        table
            .push_row(vec![Value::text("0002"), Value::Null, Value::text("bad"), Value::Null])
            .unwrap();

        add_tenure_columns(&mut table, date(2024, 4, 1), &TenureConfig::default()).unwrap();

        assert!(table.has_column("DATE_RECEIVED"));
        assert_eq!(table.get(0, DAYS_SINCE_RECEIVED), Some(&Value::Integer(31)));
        assert_eq!(table.get(0, TENURE_LENGTH_YEARS), Some(&Value::Integer(10)));
        assert_eq!(table.get(0, DAYS_TO_EXPIRY), Some(&Value::Integer(2159)));
        assert_eq!(table.get(0, FISCAL_YEAR), Some(&Value::text("2023/24")));
        for column in [DAYS_SINCE_RECEIVED, TENURE_LENGTH_YEARS, DAYS_TO_EXPIRY, FISCAL_YEAR] {
            assert_eq!(table.get(1, column), Some(&Value::Null));
        }
    }

    #[test]
    fn test_tenure_workbook_sheets() {
        let mut table = Table::new(["STATUS", "RECEIVED_DATE"]);
        for status in ["ACCEPTED", "OFFERED", "ACCEPTED", ""] {
            table
                .push_row(vec![Value::text(status), Value::text("2024-01-01")])
                .unwrap();
        }

        let workbook = tenure_workbook(table, date(2024, 4, 1), "extract.xlsx", &TenureConfig::default()).unwrap();
        assert_eq!(workbook.sheet_names(), ["SUMMARY", "ALL", "NO STATUS", "ACCEPTED", "OFFERED"]);
        assert_eq!(workbook.sheet("ALL").map(Table::len), Some(4));
        assert_eq!(workbook.sheet("ACCEPTED").map(Table::len), Some(2));
        assert_eq!(workbook.sheet("NO STATUS").map(Table::len), Some(1));
    }

    #[test]
    fn test_missing_status_column() {
        let table = Table::new(["FILE"]);
        let err = tenure_workbook(table, date(2024, 4, 1), "x.csv", &TenureConfig::default()).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn(_)));
    }
}
