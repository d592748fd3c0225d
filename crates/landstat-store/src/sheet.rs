//! Spreadsheet and CSV inputs
//!
//! Rule sheets and TITAN/ATS extracts arrive as `.xlsx` or `.csv`. Both are
//! read into a [`Table`] with the first non-empty row as the header.

use crate::{Result, StoreError};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use landstat_domain::{Table, Value};
use std::path::Path;
use tracing::debug;

/// Read a table from a CSV or workbook file
///
/// `sheet` selects a worksheet by name; the first sheet is used otherwise.
/// It is ignored for CSV.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" | "txt" => read_csv(path)?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(path, sheet)?,
        other => {
            return Err(StoreError::Config(format!(
                "unsupported table format '{}' for {}",
                other,
                path.display()
            )))
        }
    };

    debug!(path = %path.display(), rows = table.len(), columns = table.width(), "read table");
    Ok(table)
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = header_names(reader.headers()?.iter().map(str::to_string));
    let width = headers.len();
    let mut table = Table::new(headers);

    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let mut row: Vec<Value> = record.iter().take(width).map(infer_value).collect();
        row.resize(width, Value::Null);
        table.push_row(row)?;
    }
    Ok(table)
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| StoreError::Config(format!("{} has no worksheets", path.display())))?,
    };
    let range = workbook.worksheet_range(&name)?;

    let mut rows = range
        .rows()
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)));

    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let headers = header_names(header.iter().map(|c| c.to_string()));
    let width = headers.len();
    let mut table = Table::new(headers);

    for row in rows {
        let mut values: Vec<Value> = row.iter().take(width).map(cell_value).collect();
        values.resize(width, Value::Null);
        table.push_row(values)?;
    }
    Ok(table)
}

/// Trimmed header names; blanks become `COLUMN_<n>`
fn header_names(raw: impl Iterator<Item = String>) -> Vec<String> {
    raw.enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("COLUMN_{}", i + 1)
            } else {
                h.to_string()
            }
        })
        .collect()
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::text(s.trim()),
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => Value::Number(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => Value::Date(dt.date()),
            Some(dt) => Value::DateTime(dt),
            None => Value::Null,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => infer_value(s),
    }
}

/// Type a CSV cell
///
/// Numbers with a leading zero (file numbers) stay text.
fn infer_value(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() {
        return Value::Null;
    }

    let leading_zero = s.len() > 1 && s.starts_with('0') && !s.starts_with("0.");
    if !leading_zero {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() {
                return Value::Number(f);
            }
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Value::Date(d);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Value::DateTime(dt);
        }
    }
    Value::Text(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_infer_value() {
        assert_eq!(infer_value("42"), Value::Integer(42));
        assert_eq!(infer_value("2.5"), Value::Number(2.5));
        assert_eq!(infer_value("0.5"), Value::Number(0.5));
        assert_eq!(infer_value("0123456"), Value::Text("0123456".into()));
        assert_eq!(
            infer_value("2024-04-01"),
            Value::Date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap())
        );
        assert_eq!(infer_value("  "), Value::Null);
        assert_eq!(infer_value("NaN"), Value::Text("NaN".into()));
    }

    #[test]
    fn test_read_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "CATEGORY, FEATURECLASS_NAME ,BUFFER_DISTANCE,").unwrap();
        writeln!(file, "Tenure,Crown Tenures,500,").unwrap();
        writeln!(file, ",,,").unwrap();
        writeln!(file, "Parks,Parks,,x").unwrap();
        drop(file);

        let table = read_table(&path, None).unwrap();
        assert_eq!(table.columns(), ["CATEGORY", "FEATURECLASS_NAME", "BUFFER_DISTANCE", "COLUMN_4"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "buffer_distance"), Some(&Value::Integer(500)));
        assert_eq!(table.get(1, "BUFFER_DISTANCE"), Some(&Value::Null));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            read_table(Path::new("rules.docx"), None),
            Err(StoreError::Config(_))
        ));
    }
}
