//! Spatial SQL for overlay rules
//!
//! Values (the AOI, radii, owners) always travel as binds. Names come in as
//! [`Identifier`]s. The definition query is the one free-form fragment; it is
//! checked by [`DefinitionQuery::parse`] and wrapped in parentheses.

use crate::identifier::{Identifier, TableName};
use crate::{Result, StoreError};
use landstat_domain::{BindValue, Statement};

/// SRID of BC Albers, the BCGW storage projection
pub const DEFAULT_SRID: u32 = 3005;

/// Column alias for the WKT geometry returned by overlay queries
pub const GEOMETRY_WKT_COLUMN: &str = "GEOM_WKT";

/// Words that have no business in an attribute filter
const FORBIDDEN_WORDS: &[&str] = &[
    "ALTER", "BEGIN", "COMMIT", "CREATE", "DECLARE", "DELETE", "DROP", "EXEC", "EXECUTE", "GRANT",
    "INSERT", "INTO", "MERGE", "REVOKE", "ROLLBACK", "TRUNCATE", "UNION", "UPDATE",
];

/// Replace the contents of string literals with spaces
///
/// Keeps the quotes so the result has the same length. Fails on an
/// unterminated literal.
pub(crate) fn blank_literals(sql: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            if in_literal && chars.peek() == Some(&'\'') {
                // escaped quote inside a literal
                chars.next();
                out.push_str("  ");
                continue;
            }
            in_literal = !in_literal;
            out.push(c);
        } else if in_literal {
            out.push(' ');
        } else {
            out.push(c);
        }
    }

    if in_literal {
        return Err("unterminated string literal".to_string());
    }
    Ok(out)
}

/// A validated attribute filter (WHERE clause fragment)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionQuery(String);

impl DefinitionQuery {
    /// Validate a filter taken from a rule sheet
    ///
    /// Rejects statement separators, comments, unbalanced quotes or
    /// parentheses, bind markers and DDL/DML keywords outside string literals.
    pub fn parse(fragment: &str) -> Result<Self> {
        let trimmed = fragment.trim();
        let reject = |reason: &str| StoreError::UnsafeDefinitionQuery {
            query: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(reject("empty filter"));
        }

        let code = blank_literals(trimmed).map_err(|r| reject(&r))?;
        if code.contains(';') {
            return Err(reject("statement separator"));
        }
        if code.contains("--") || code.contains("/*") || code.contains("*/") {
            return Err(reject("comment"));
        }
        if code.contains(':') {
            return Err(reject("bind marker"));
        }

        let mut depth: i32 = 0;
        for c in code.chars() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(reject("unbalanced parentheses"));
                    }
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(reject("unbalanced parentheses"));
        }

        let upper = code.to_uppercase();
        if let Some(word) = upper
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .find(|w| FORBIDDEN_WORDS.contains(w))
        {
            return Err(reject(&format!("keyword {} not allowed", word)));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Filter text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Builds the statements the overlay runner sends to Oracle
#[derive(Debug, Clone, Copy)]
pub struct SpatialQueryBuilder {
    srid: u32,
}

impl Default for SpatialQueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SRID)
    }
}

impl SpatialQueryBuilder {
    /// Create a builder for AOIs in `srid`
    pub fn new(srid: u32) -> Self {
        Self { srid }
    }

    /// SRID bound alongside the AOI
    pub fn srid(&self) -> u32 {
        self.srid
    }

    /// Look up the geometry column of a table in the spatial metadata
    pub fn geometry_column(&self, table: &TableName) -> Statement {
        Statement::new(
            "SELECT column_name AS GEOM_NAME \
             FROM all_sdo_geom_metadata \
             WHERE owner = :owner AND table_name = :tab_name",
        )
        .bind("owner", BindValue::Text(table.owner.to_string()))
        .bind("tab_name", BindValue::Text(table.table.to_string()))
    }

    /// Rows of `table` whose geometry interacts with the AOI
    pub fn intersect(
        &self,
        table: &TableName,
        geometry: &Identifier,
        fields: &[Identifier],
        filter: Option<&DefinitionQuery>,
        aoi_wkt: &str,
    ) -> Statement {
        let predicate = format!(
            "SDO_RELATE(a.{geom}, SDO_GEOMETRY(:aoi_wkt, :srid), 'mask=ANYINTERACT') = 'TRUE'",
            geom = geometry
        );
        self.overlay_statement(table, geometry, fields, filter, &predicate)
            .bind("aoi_wkt", BindValue::Clob(aoi_wkt.to_string()))
            .bind("srid", BindValue::Integer(self.srid as i64))
    }

    /// Rows of `table` within `radius_m` metres of the AOI
    pub fn within_distance(
        &self,
        table: &TableName,
        geometry: &Identifier,
        fields: &[Identifier],
        filter: Option<&DefinitionQuery>,
        aoi_wkt: &str,
        radius_m: f64,
    ) -> Statement {
        let predicate = format!(
            "SDO_WITHIN_DISTANCE(a.{geom}, SDO_GEOMETRY(:aoi_wkt, :srid), :within_param) = 'TRUE'",
            geom = geometry
        );
        self.overlay_statement(table, geometry, fields, filter, &predicate)
            .bind("aoi_wkt", BindValue::Clob(aoi_wkt.to_string()))
            .bind("srid", BindValue::Integer(self.srid as i64))
            .bind("within_param", BindValue::Text(format!("distance={} unit=m", radius_m)))
    }

    fn overlay_statement(
        &self,
        table: &TableName,
        geometry: &Identifier,
        fields: &[Identifier],
        filter: Option<&DefinitionQuery>,
        predicate: &str,
    ) -> Statement {
        let select = if fields.is_empty() {
            "a.*".to_string()
        } else {
            fields
                .iter()
                .map(|f| format!("a.{}", f))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!(
            "SELECT {select}, SDO_UTIL.TO_WKTGEOMETRY(a.{geom}) AS {wkt} FROM {table} a WHERE {predicate}",
            select = select,
            geom = geometry,
            wkt = GEOMETRY_WKT_COLUMN,
            table = table,
            predicate = predicate,
        );
        if let Some(filter) = filter {
            sql.push_str(&format!(" AND ({})", filter.as_str()));
        }
        Statement::new(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableName {
        TableName::parse("WHSE_TANTALIS.TA_CROWN_TENURES_SVW").unwrap()
    }

    fn fields() -> Vec<Identifier> {
        vec![
            Identifier::new("CROWN_LANDS_FILE").unwrap(),
            Identifier::new("TENURE_STATUS").unwrap(),
        ]
    }

    #[test]
    fn test_geometry_column_lookup_binds_names() {
        let stmt = SpatialQueryBuilder::default().geometry_column(&table());
        assert!(stmt.sql.contains("all_sdo_geom_metadata"));
        assert_eq!(stmt.bind_value("owner"), Some(&BindValue::Text("WHSE_TANTALIS".into())));
        assert_eq!(
            stmt.bind_value("tab_name"),
            Some(&BindValue::Text("TA_CROWN_TENURES_SVW".into()))
        );
    }

    #[test]
    fn test_intersect_statement() {
        let geom = Identifier::new("SHAPE").unwrap();
        let filter = DefinitionQuery::parse("TENURE_STATUS = 'ACCEPTED'").unwrap();
        let stmt = SpatialQueryBuilder::default().intersect(&table(), &geom, &fields(), Some(&filter), "POINT (1 2)");

        assert_eq!(
            stmt.sql,
            "SELECT a.CROWN_LANDS_FILE, a.TENURE_STATUS, SDO_UTIL.TO_WKTGEOMETRY(a.SHAPE) AS GEOM_WKT \
             FROM WHSE_TANTALIS.TA_CROWN_TENURES_SVW a \
             WHERE SDO_RELATE(a.SHAPE, SDO_GEOMETRY(:aoi_wkt, :srid), 'mask=ANYINTERACT') = 'TRUE' \
             AND (TENURE_STATUS = 'ACCEPTED')"
        );
        assert_eq!(stmt.bind_value("aoi_wkt"), Some(&BindValue::Clob("POINT (1 2)".into())));
        assert_eq!(stmt.bind_value("srid"), Some(&BindValue::Integer(3005)));
        assert!(!stmt.sql.contains("POINT"));
    }

    #[test]
    fn test_within_distance_statement() {
        let geom = Identifier::new("GEOMETRY").unwrap();
        let stmt = SpatialQueryBuilder::new(3005).within_distance(&table(), &geom, &[], None, "POINT (1 2)", 500.0);

        assert!(stmt.sql.starts_with("SELECT a.*, SDO_UTIL.TO_WKTGEOMETRY(a.GEOMETRY)"));
        assert!(stmt.sql.contains("SDO_WITHIN_DISTANCE(a.GEOMETRY, SDO_GEOMETRY(:aoi_wkt, :srid), :within_param)"));
        assert!(!stmt.sql.contains(" AND ("));
        assert_eq!(
            stmt.bind_value("within_param"),
            Some(&BindValue::Text("distance=500 unit=m".into()))
        );
    }

    #[test]
    fn test_definition_query_accepts_filters() {
        for ok in [
            "TENURE_STATUS = 'ACCEPTED'",
            "TENURE_TYPE IN ('LEASE', 'LICENCE') AND AREA_HA > 5",
            "NAME LIKE '%O''BRIEN%'",
            "COMMENTS = 'drop; -- not a comment'",
        ] {
            assert!(DefinitionQuery::parse(ok).is_ok(), "rejected {:?}", ok);
        }
    }

    #[test]
    fn test_definition_query_rejects_injection() {
        for bad in [
            "1=1; DROP TABLE x",
            "1=1 -- trailing",
            "1=1 /* c */",
            "NAME = 'open",
            "(A = 1",
            "A = 1)",
            "A = 1 UNION SELECT password FROM dba_users",
            "A = :b",
            "   ",
        ] {
            assert!(
                matches!(DefinitionQuery::parse(bad), Err(StoreError::UnsafeDefinitionQuery { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_blank_literals() {
        assert_eq!(blank_literals("a = 'x;y'").unwrap(), "a = '   '");
        assert_eq!(blank_literals("'it''s'").unwrap(), "'     '");
        assert!(blank_literals("'open").is_err());
    }
}
