//! Multi-sheet Excel workbooks

use crate::{ReportError, Result};
use chrono::NaiveDateTime;
use landstat_domain::{Table, Value};
use rust_xlsxwriter::{
    Format, Table as ExcelTable, TableColumn, TableFunction, Workbook, Worksheet,
};
use std::path::Path;
use tracing::{debug, info};

/// Longest worksheet name Excel accepts
pub const MAX_SHEET_NAME: usize = 31;

/// Longest string Excel stores in one cell
const MAX_CELL_CHARS: usize = 32_767;

/// Name of the summary sheet
pub const SUMMARY_SHEET: &str = "SUMMARY";

const FORBIDDEN: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Make a worksheet name Excel will accept and that is not already in `used`
///
/// Forbidden characters become `_`, the name is cut to 31 characters and
/// collisions (case-insensitive) get a ` (2)`, ` (3)`... suffix.
pub fn sanitize_sheet_name(name: &str, used: &[String]) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    let base = truncate_chars(if cleaned.is_empty() { "Sheet" } else { cleaned }, MAX_SHEET_NAME);

    let taken = |candidate: &str| {
        candidate.eq_ignore_ascii_case("History")
            || used.iter().any(|u| u.to_lowercase() == candidate.to_lowercase())
    };
    if !taken(&base) {
        return base;
    }

    let mut n = 2;
    loop {
        let suffix = format!(" ({})", n);
        let stem = truncate_chars(&base, MAX_SHEET_NAME - suffix.chars().count());
        let candidate = format!("{}{}", stem.trim_end(), suffix);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Key/value facts shown above the summary table
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// Facts in display order
    pub facts: Vec<(String, Value)>,
    /// Optional table written below the facts
    pub table: Option<Table>,
}

impl Summary {
    /// Add one fact
    pub fn fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.push((key.into(), value.into()));
        self
    }

    /// Set the summary table
    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }
}

/// A workbook under construction: a summary sheet plus one sheet per table
#[derive(Debug, Clone, Default)]
pub struct ReportWorkbook {
    summary: Option<Summary>,
    sheets: Vec<(String, Table)>,
}

impl ReportWorkbook {
    /// Create an empty workbook
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the summary sheet, written first
    pub fn with_summary(mut self, summary: Summary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Add a table on its own sheet, returning the sheet name used
    pub fn add_sheet(&mut self, name: &str, table: Table) -> String {
        let mut used: Vec<String> = self.sheets.iter().map(|(n, _)| n.clone()).collect();
        used.push(SUMMARY_SHEET.to_string());
        let sheet_name = sanitize_sheet_name(name, &used);
        self.sheets.push((sheet_name.clone(), table));
        sheet_name
    }

    /// Sheet names in write order, summary included
    pub fn sheet_names(&self) -> Vec<&str> {
        self.summary
            .as_ref()
            .map(|_| SUMMARY_SHEET)
            .into_iter()
            .chain(self.sheets.iter().map(|(n, _)| n.as_str()))
            .collect()
    }

    /// Table on a named sheet
    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Write the workbook to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if self.summary.is_none() && self.sheets.is_empty() {
            return Err(ReportError::EmptyWorkbook);
        }

        let formats = Formats::new();
        let mut workbook = Workbook::new();

        if let Some(summary) = &self.summary {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(SUMMARY_SHEET)?;
            write_summary(worksheet, summary, &formats)?;
        }

        for (name, table) in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(name)?;
            write_table(worksheet, 0, table, &formats)?;
            worksheet.set_freeze_panes(1, 0)?;
            worksheet.autofit();
            debug!("Wrote sheet '{}' ({} rows)", name, table.len());
        }

        workbook.save(path)?;
        info!("Saved workbook {} ({} sheets)", path.display(), self.sheet_names().len());
        Ok(())
    }
}

struct Formats {
    bold: Format,
    date: Format,
    datetime: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            bold: Format::new().set_bold(),
            date: Format::new().set_num_format("yyyy-mm-dd"),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        }
    }
}

fn write_summary(worksheet: &mut Worksheet, summary: &Summary, formats: &Formats) -> Result<()> {
    let mut row = 0u32;
    for (key, value) in &summary.facts {
        worksheet.write_string_with_format(row, 0, key, &formats.bold)?;
        write_cell(worksheet, row, 1, value, formats)?;
        row += 1;
    }

    if let Some(table) = &summary.table {
        if row > 0 {
            row += 1;
        }
        write_table(worksheet, row, table, formats)?;
    }
    worksheet.autofit();
    Ok(())
}

/// Header, rows and an Excel Table with a totals row, starting at `first_row`
fn write_table(worksheet: &mut Worksheet, first_row: u32, table: &Table, formats: &Formats) -> Result<()> {
    let headers = unique_headers(table.columns());
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(first_row, col as u16, header, &formats.bold)?;
    }

    for (i, row) in table.rows().iter().enumerate() {
        let r = first_row + 1 + i as u32;
        for (col, value) in row.iter().enumerate() {
            write_cell(worksheet, r, col as u16, value, formats)?;
        }
    }

    // Excel rejects a table without data rows
    if table.is_empty() || headers.is_empty() {
        return Ok(());
    }

    let mut count_placed = false;
    let columns: Vec<TableColumn> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let column = TableColumn::new()
                .set_header(header)
                .set_header_format(&formats.bold);
            if table.is_numeric_column(idx) {
                column.set_total_function(TableFunction::Sum)
            } else if !count_placed && is_text_column(table, idx) {
                count_placed = true;
                column.set_total_function(TableFunction::Count)
            } else {
                column
            }
        })
        .collect();

    let excel_table = ExcelTable::new().set_columns(&columns).set_total_row(true);
    let last_row = first_row + table.len() as u32 + 1;
    let last_col = (headers.len() - 1) as u16;
    worksheet.add_table(first_row, 0, last_row, last_col, &excel_table)?;
    Ok(())
}

fn is_text_column(table: &Table, idx: usize) -> bool {
    table
        .rows()
        .iter()
        .any(|row| matches!(row.get(idx), Some(Value::Text(_))))
}

/// Excel Table headers must be non-empty and unique ignoring case
fn unique_headers(columns: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(columns.len());
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let base = if column.trim().is_empty() {
                format!("Column{}", i + 1)
            } else {
                column.clone()
            };
            let mut header = base.clone();
            let mut n = 2;
            while seen.contains(&header.to_lowercase()) {
                header = format!("{}_{}", base, n);
                n += 1;
            }
            seen.push(header.to_lowercase());
            header
        })
        .collect()
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value, formats: &Formats) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Text(s) => {
            if s.chars().count() > MAX_CELL_CHARS {
                worksheet.write_string(row, col, truncate_chars(s, MAX_CELL_CHARS))?;
            } else {
                worksheet.write_string(row, col, s)?;
            }
        }
        Value::Integer(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        Value::Number(n) if n.is_finite() => {
            worksheet.write_number(row, col, *n)?;
        }
        Value::Number(n) => {
            worksheet.write_string(row, col, n.to_string())?;
        }
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Value::Date(d) => {
            worksheet.write_datetime_with_format(row, col, d, &formats.date)?;
        }
        Value::DateTime(dt) => {
            worksheet.write_datetime_with_format(row, col, dt, &formats.datetime)?;
        }
    }
    Ok(())
}

/// Standard facts for a generated report
pub fn run_facts(run_id: &str, generated_at: NaiveDateTime) -> Summary {
    Summary::default()
        .fact("RUN_ID", run_id)
        .fact("GENERATED_AT", Value::DateTime(generated_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Parks/Protected: Areas?", &[]), "Parks_Protected_ Areas_");
        assert_eq!(sanitize_sheet_name("'quoted'", &[]), "quoted");
        assert_eq!(sanitize_sheet_name("   ", &[]), "Sheet");
        assert_eq!(sanitize_sheet_name("history", &[]), "history (2)");

        let long = "Provincial Parks, Ecological Reserves and Protected Areas";
        let name = sanitize_sheet_name(long, &[]);
        assert_eq!(name.chars().count(), MAX_SHEET_NAME);
    }

    #[test]
    fn test_sanitize_sheet_name_collisions() {
        let used = vec!["Parks".to_string(), "parks (2)".to_string()];
        assert_eq!(sanitize_sheet_name("PARKS", &used), "PARKS (3)");

        let long = "a".repeat(40);
        let used = vec!["a".repeat(31)];
        let name = sanitize_sheet_name(&long, &used);
        assert_eq!(name.chars().count(), MAX_SHEET_NAME);
        assert!(name.ends_with(" (2)"));
    }

    #[test]
    fn test_add_sheet_reserves_summary() {
        let mut workbook = ReportWorkbook::new().with_summary(Summary::default());
        assert_eq!(workbook.add_sheet("Summary", Table::new(["A"])), "Summary (2)");
        assert_eq!(workbook.add_sheet("Data", Table::new(["A"])), "Data");
        assert_eq!(workbook.sheet_names(), ["SUMMARY", "Summary (2)", "Data"]);
    }

    #[test]
    fn test_unique_headers() {
        let columns = vec!["FILE".to_string(), "file".to_string(), String::new()];
        assert_eq!(unique_headers(&columns), ["FILE", "file_2", "Column3"]);
    }

    #[test]
    fn test_save_empty_workbook_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReportWorkbook::new().save(&dir.path().join("x.xlsx")).unwrap_err();
        assert!(matches!(err, ReportError::EmptyWorkbook));
    }
}
