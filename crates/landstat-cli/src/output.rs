//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use landstat_domain::{Table, Value};
use landstat_overlay::StatusReport;
use landstat_store::QueryCatalog;
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Longest cell shown in terminal tables
const MAX_CELL_WIDTH: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format up to `limit` rows of a table.
    pub fn format_table(&self, table: &Table, limit: usize) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_table_json(table, limit),
            OutputFormat::Table => Ok(self.format_table_grid(table, limit)),
            OutputFormat::Quiet => Ok(table.len().to_string()),
        }
    }

    fn format_table_json(&self, table: &Table, limit: usize) -> Result<String> {
        let rows: Vec<serde_json::Value> = table
            .iter()
            .take(limit)
            .map(|row| {
                let object = table
                    .columns()
                    .iter()
                    .zip(row.values())
                    .map(|(k, v)| (k.clone(), json_value(v)))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    fn format_table_grid(&self, table: &Table, limit: usize) -> String {
        if table.is_empty() {
            return self.colorize("No rows found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(table.columns().iter().map(String::as_str));
        for row in table.iter().take(limit) {
            builder.push_record(row.values().iter().map(|v| truncate(&v.to_string())));
        }

        let mut grid = builder.build();
        grid.with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let mut out = grid.to_string();
        if table.len() > limit {
            out.push('\n');
            out.push_str(&self.info(&format!("{} of {} rows shown", limit, table.len())));
        }
        out
    }

    /// Format the per-rule summary of a status run.
    pub fn format_status(&self, report: &StatusReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let rules: Vec<serde_json::Value> = report
                    .outcomes
                    .iter()
                    .map(|o| {
                        serde_json::json!({
                            "category": o.category,
                            "name": o.name,
                            "datasource": o.datasource,
                            "conflicts": o.conflict_count,
                            "status": o.status(),
                            "error": o.error,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&serde_json::json!({
                    "run_id": report.run_id.to_string(),
                    "aoi": report.aoi_label,
                    "aoi_area_ha": report.aoi_area_ha,
                    "total_conflicts": report.total_conflicts(),
                    "failed": report.failed(),
                    "rules": rules,
                }))?)
            }
            OutputFormat::Quiet => Ok(String::new()),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Category", "Feature class", "Conflicts", "Status"]);
                for outcome in &report.outcomes {
                    let status = match outcome.status() {
                        "FAILED" => self.colorize("FAILED", "red"),
                        "CONFLICT" => self.colorize("CONFLICT", "yellow"),
                        other => self.colorize(other, "green"),
                    };
                    builder.push_record([
                        outcome.category.clone(),
                        outcome.name.clone(),
                        outcome.conflict_count.to_string(),
                        status,
                    ]);
                }
                let mut grid = builder.build();
                grid.with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));

                let mut out = grid.to_string();
                out.push('\n');
                out.push_str(&self.info(&format!(
                    "AOI '{}' ({} ha): {} conflicts, {} failed rules, run {}",
                    report.aoi_label,
                    report.aoi_area_ha,
                    report.total_conflicts(),
                    report.failed(),
                    report.run_id.short()
                )));
                for outcome in report.outcomes.iter().filter(|o| o.is_failed()) {
                    out.push('\n');
                    out.push_str(&self.warning(&format!(
                        "{}: {}",
                        outcome.name,
                        outcome.error.as_deref().unwrap_or_default()
                    )));
                }
                Ok(out)
            }
        }
    }

    /// Format the query catalog.
    pub fn format_catalog(&self, catalog: &QueryCatalog) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let queries: Vec<serde_json::Value> = catalog
                    .iter()
                    .map(|q| {
                        serde_json::json!({
                            "name": q.name,
                            "description": q.description,
                            "slots": q.slots(),
                            "params": q.bind_names().unwrap_or_default(),
                            "geometry_column": q.geometry_column,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&queries)?)
            }
            OutputFormat::Quiet => Ok(catalog.iter().map(|q| q.name.clone()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Name", "Description", "--ident", "--param"]);
                for query in catalog.iter() {
                    builder.push_record([
                        query.name.clone(),
                        query.description.clone().unwrap_or_default(),
                        query.slots().join(", "),
                        query.bind_names().unwrap_or_default().join(", "),
                    ]);
                }
                let mut grid = builder.build();
                grid.with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(grid.to_string())
            }
        }
    }

    /// Format a written file.
    pub fn written(&self, what: &str, path: &Path) -> String {
        match self.format {
            OutputFormat::Quiet => path.display().to_string(),
            _ => self.success(&format!("{} written to {}", what, path.display())),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut short: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
    short.push('…');
    short
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        other => serde_json::Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut table = Table::new(["FILE", "AREA_HA", "NOTE"]);
        table
            .push_row(vec![Value::text("1414465"), Value::Number(2.5), Value::text("x".repeat(100))])
            .unwrap();
        table
            .push_row(vec![Value::text("1414466"), Value::Null, Value::Null])
            .unwrap();
        table
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_table(&table(), 10).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["AREA_HA"], serde_json::json!(2.5));
        assert_eq!(parsed[1]["AREA_HA"], serde_json::Value::Null);
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        assert_eq!(formatter.format_table(&table(), 10).unwrap(), "2");
        assert_eq!(formatter.written("Workbook", Path::new("out.xlsx")), "out.xlsx");
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_table(&table(), 1).unwrap();
        assert!(output.contains("AREA_HA"));
        assert!(output.contains('…'));
        assert!(!output.contains("1414466"));
        assert!(output.contains("1 of 2 rows shown"));
    }

    #[test]
    fn test_empty_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_table(&Table::new(["A"]), 10).unwrap();
        assert!(output.contains("No rows found"));
    }

    #[test]
    fn test_catalog_listing() {
        let catalog = QueryCatalog::builtin().unwrap();
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_catalog(&catalog).unwrap();
        assert!(output.contains("tenure_by_file"));
        assert!(output.contains("file_nbr"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
        assert_eq!(formatter.error("bad"), "✗ bad");
    }
}
