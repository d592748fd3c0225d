//! Outcome types for an overlay run

use chrono::NaiveDateTime;
use landstat_domain::{Rule, RunId, Table, Value};
use landstat_geo::Hit;

/// Column holding the overlay tag or the placeholder text
pub const RESULT_COLUMN: &str = "RESULT";
/// Clipped area in hectares
pub const OVERLAP_HA_COLUMN: &str = "OVERLAP_HA";
/// Clipped share of the feature area
pub const OVERLAP_PCT_COLUMN: &str = "OVERLAP_PCT";
/// Failure message on the placeholder row of a failed rule
pub const ERROR_COLUMN: &str = "ERROR";

/// Result of evaluating one rule
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    /// Category from the rule sheet
    pub category: String,

    /// Feature class name, used as the sheet and layer name
    pub name: String,

    /// Datasource as written in the rule sheet
    pub datasource: String,

    /// Label column for map tooltips
    pub label_field: Option<String>,

    /// Result rows; a single placeholder row when nothing was found
    pub table: Table,

    /// Result features in BC Albers, for maps and spatial export
    pub hits: Vec<Hit>,

    /// Rows found after deduplication
    pub conflict_count: usize,

    /// Failure message, when the rule could not be evaluated
    pub error: Option<String>,
}

impl RuleOutcome {
    /// Outcome for an evaluated rule
    pub fn found(rule: &Rule, table: Table, hits: Vec<Hit>) -> Self {
        Self {
            category: rule.category.clone(),
            name: rule.name.clone(),
            datasource: rule.target.to_string(),
            label_field: rule.label_field.clone(),
            conflict_count: hits.len(),
            table,
            hits,
            error: None,
        }
    }

    /// Outcome for a rule that failed
    pub fn failed(category: &str, name: &str, datasource: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        let [category_col, name_col, source_col] = rule_columns();
        let table = Table::from_record([
            (category_col, Value::text(category)),
            (name_col, Value::text(name)),
            (source_col, Value::text(datasource)),
            (RESULT_COLUMN, Value::text(landstat_domain::NO_OVERLAPS_FOUND)),
            (ERROR_COLUMN, Value::text(error.clone())),
        ]);

        Self {
            category: category.to_string(),
            name: name.to_string(),
            datasource: datasource.to_string(),
            label_field: None,
            table,
            hits: Vec::new(),
            conflict_count: 0,
            error: Some(error),
        }
    }

    /// True when the rule could not be evaluated
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Status text for summaries
    pub fn status(&self) -> &'static str {
        if self.is_failed() {
            "FAILED"
        } else if self.conflict_count > 0 {
            "CONFLICT"
        } else {
            "CLEAR"
        }
    }
}

/// Columns every result table starts with
pub fn rule_columns() -> [&'static str; 3] {
    ["CATEGORY", "FEATURECLASS_NAME", "DATASOURCE"]
}

/// Everything produced by one status run
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Run identifier
    pub run_id: RunId,

    /// AOI label
    pub aoi_label: String,

    /// AOI area in hectares
    pub aoi_area_ha: f64,

    /// When the run finished (local time)
    pub generated_at: NaiveDateTime,

    /// One outcome per rule row, in sheet order
    pub outcomes: Vec<RuleOutcome>,
}

impl StatusReport {
    /// Rules that failed
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Sum of conflict counts
    pub fn total_conflicts(&self) -> usize {
        self.outcomes.iter().map(|o| o.conflict_count).sum()
    }

    /// Per-rule summary: conflict count, status and error
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new(
            rule_columns()
                .iter()
                .copied()
                .chain(["CONFLICT_COUNT", "STATUS", ERROR_COLUMN]),
        );
        let [category_col, name_col, source_col] = rule_columns();
        for outcome in &self.outcomes {
            table.append(Table::from_record([
                (category_col, Value::text(outcome.category.as_str())),
                (name_col, Value::text(outcome.name.as_str())),
                (source_col, Value::text(outcome.datasource.as_str())),
                ("CONFLICT_COUNT", Value::Integer(outcome.conflict_count as i64)),
                ("STATUS", Value::text(outcome.status())),
                (ERROR_COLUMN, outcome.error.clone().into()),
            ]));
        }
        table
    }

    /// Result tables keyed by rule name, in rule order
    pub fn tables(&self) -> Vec<(&str, &Table)> {
        self.outcomes
            .iter()
            .map(|o| (o.name.as_str(), &o.table))
            .collect()
    }
}
