//! Rule sheet loading
//!
//! A rule sheet has one row per dataset to check. Header names are matched
//! loosely (case, spaces and punctuation ignored) and a few aliases are
//! accepted, since the sheets are maintained by hand.

use crate::{OverlayError, Result};
use landstat_domain::{Rule, Table, Target, Value};
use std::path::Path;
use tracing::{info, warn};

const CATEGORY: &[&str] = &["CATEGORY"];
const NAME: &[&str] = &["FEATURECLASS_NAME", "FEATURE_CLASS_NAME", "FEATURE_CLASS", "NAME"];
const DATASOURCE: &[&str] = &["DATASOURCE", "DATA_SOURCE", "DATASET", "TABLE_NAME"];
const FIELDS: &[&str] = &[
    "FIELDS_TO_SUMMARIZE",
    "FIELDS_TO_SUMMARIZE2",
    "FIELDS_TO_SUMMARIZE3",
    "FIELDS",
];
const DEFINITION_QUERY: &[&str] = &["DEFINITION_QUERY", "WHERE_CLAUSE"];
const BUFFER: &[&str] = &["BUFFER_DISTANCE", "BUFFER", "BUFFER_M"];
const LABEL: &[&str] = &["LABEL_FIELD", "LABEL"];

/// A rule row that could not be used
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRule {
    /// 1-based data row number
    pub row: usize,
    /// Category cell
    pub category: String,
    /// Feature class name cell
    pub name: String,
    /// Datasource cell
    pub datasource: String,
    /// Why the row was rejected
    pub reason: String,
}

/// Rules read from a sheet, plus the rows that were rejected
#[derive(Debug, Clone, Default)]
pub struct RuleSheet {
    /// Usable rules, in sheet order
    pub rules: Vec<Rule>,
    /// Rows that could not be parsed
    pub rejected: Vec<RejectedRule>,
}

impl RuleSheet {
    /// Read a rule sheet from an `.xlsx` or `.csv` file
    pub fn load(path: &Path, sheet: Option<&str>) -> Result<Self> {
        let table = landstat_store::read_table(path, sheet)?;
        let rules = Self::from_table(&table)?;
        info!(
            path = %path.display(),
            rules = rules.rules.len(),
            rejected = rules.rejected.len(),
            "loaded rule sheet"
        );
        Ok(rules)
    }

    /// Build rules from an already loaded table
    pub fn from_table(table: &Table) -> Result<Self> {
        let columns = SheetColumns::locate(table)?;
        let mut sheet = Self::default();

        for (i, row) in table.rows().iter().enumerate() {
            let cell = |idx: Option<usize>| idx.map(|i| cell_text(&row[i])).unwrap_or_default();
            let category = cell(columns.category);
            let name = cell(columns.name);
            let datasource = cell(Some(columns.datasource));

            match columns.rule(row, &category, &name, &datasource) {
                Ok(rule) => sheet.rules.push(rule),
                Err(reason) => {
                    warn!(row = i + 1, name = %name, %reason, "rejected rule row");
                    sheet.rejected.push(RejectedRule {
                        row: i + 1,
                        category,
                        name,
                        datasource,
                        reason,
                    });
                }
            }
        }
        Ok(sheet)
    }

    /// Total number of rows, usable or not
    pub fn len(&self) -> usize {
        self.rules.len() + self.rejected.len()
    }

    /// True when the sheet had no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when any rule targets a database table
    pub fn needs_database(&self) -> bool {
        self.rules.iter().any(|r| r.target.is_table())
    }
}

struct SheetColumns {
    category: Option<usize>,
    name: Option<usize>,
    datasource: usize,
    fields: Vec<usize>,
    definition_query: Option<usize>,
    buffer: Option<usize>,
    label: Option<usize>,
}

impl SheetColumns {
    fn locate(table: &Table) -> Result<Self> {
        let normalized: Vec<String> = table.columns().iter().map(|c| normalize_header(c)).collect();
        let find = |aliases: &[&str]| normalized.iter().position(|c| aliases.contains(&c.as_str()));

        Ok(Self {
            category: find(CATEGORY),
            name: find(NAME),
            datasource: find(DATASOURCE).ok_or_else(|| OverlayError::MissingColumn("DATASOURCE".to_string()))?,
            fields: normalized
                .iter()
                .enumerate()
                .filter(|(_, c)| FIELDS.contains(&c.as_str()))
                .map(|(i, _)| i)
                .collect(),
            definition_query: find(DEFINITION_QUERY),
            buffer: find(BUFFER),
            label: find(LABEL),
        })
    }

    fn rule(&self, row: &[Value], category: &str, name: &str, datasource: &str) -> std::result::Result<Rule, String> {
        let target = Target::parse(datasource).map_err(|e| e.to_string())?;

        // fall back to the dataset name when the sheet leaves the name blank
        let name = if name.is_empty() { datasource } else { name };
        let mut rule = Rule::new(category, name, target);

        let fields: Vec<String> = self
            .fields
            .iter()
            .flat_map(|i| split_fields(&cell_text(&row[*i])))
            .collect();
        rule = rule.with_fields(fields);

        if let Some(query) = self.definition_query.map(|i| cell_text(&row[i])).filter(|q| !q.is_empty()) {
            rule = rule.with_definition_query(query);
        }
        if let Some(idx) = self.buffer {
            if let Some(metres) = parse_buffer(&row[idx])? {
                rule = rule.with_buffer(metres);
            }
        }
        if let Some(label) = self.label.map(|i| cell_text(&row[i])).filter(|l| !l.is_empty()) {
            rule = rule.with_label_field(label);
        }

        rule.validate().map_err(|e| e.to_string())?;
        Ok(rule)
    }
}

/// Upper-case a header and replace anything but letters and digits with `_`
pub(crate) fn normalize_header(header: &str) -> String {
    let mapped: String = header
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    mapped.trim_matches('_').to_string()
}

fn cell_text(value: &Value) -> String {
    value.to_string().trim().to_string()
}

fn split_fields(cell: &str) -> Vec<String> {
    cell.split([',', ';'])
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_buffer(value: &Value) -> std::result::Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(*i as f64)),
        Value::Number(n) => Ok(Some(*n)),
        Value::Text(s) => {
            let number = s.trim().trim_end_matches(['m', 'M']).trim();
            number
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("buffer distance '{}' is not a number", s))
        }
        other => Err(format!("buffer distance '{}' is not a number", other)),
    }
}
