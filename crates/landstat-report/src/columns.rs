//! Column cleanup for exported tables

use crate::Result;
use landstat_domain::{Table, Value};
use landstat_geo::{area_ha, parse_wkt, round2, Crs};

/// Area column added from a geometry column
pub const AREA_HA_COLUMN: &str = "AREA_HA";

/// Normalise one header: trimmed, upper-case, runs of anything other than
/// letters and digits collapsed to a single `_`
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut pending_sep = false;
    for c in header.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_uppercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Normalise every header, suffixing `_2`, `_3`... on collisions
pub fn normalize_headers(table: &mut Table) {
    let mut seen: Vec<String> = Vec::with_capacity(table.width());
    let mut names = Vec::with_capacity(table.width());

    for (i, column) in table.columns().iter().enumerate() {
        let base = match normalize_header(column) {
            empty if empty.is_empty() => format!("COLUMN_{}", i + 1),
            name => name,
        };
        let mut name = base.clone();
        let mut n = 2;
        while seen.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        seen.push(name.clone());
        names.push(name);
    }

    let mut names = names.into_iter();
    table.map_columns(|old| names.next().unwrap_or_else(|| old.to_string()));
}

/// Rename columns by `(from, to)` pairs; missing columns are ignored
///
/// Returns how many columns were renamed.
pub fn rename_columns(table: &mut Table, renames: &[(&str, &str)]) -> usize {
    renames
        .iter()
        .filter(|(from, to)| table.rename_column(from, *to))
        .count()
}

/// Remove columns where every cell is null, returning their names
pub fn drop_empty_columns(table: &mut Table) -> Vec<String> {
    let empty: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| {
            table
                .column(c)
                .map(|cells| cells.iter().all(|v| v.is_null()))
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    if table.is_empty() {
        return Vec::new();
    }
    for column in &empty {
        table.drop_column(column);
    }
    empty
}

/// Append `AREA_HA`, the area of the WKT in `wkt_column` in hectares
///
/// Geometry in any other CRS is projected to BC Albers first. Rows without
/// geometry get a null area; unparseable WKT is an error.
pub fn add_area_ha(table: &mut Table, wkt_column: &str, crs: &Crs) -> Result<()> {
    let idx = table
        .column_index(wkt_column)
        .ok_or_else(|| crate::ReportError::MissingColumn(wkt_column.to_string()))?;

    let transformer = crs.transformer(&Crs::BC_ALBERS)?;
    let mut areas = Vec::with_capacity(table.len());
    for row in table.iter() {
        let area = match row.values()[idx].as_str() {
            Some(wkt) => {
                let geometry = transformer.apply(&parse_wkt(wkt)?)?;
                Value::Number(round2(area_ha(&geometry)))
            }
            None => Value::Null,
        };
        areas.push(area);
    }

    let mut areas = areas.into_iter();
    table.add_column_with(AREA_HA_COLUMN, |_| areas.next().unwrap_or_default())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Date Received "), "DATE_RECEIVED");
        assert_eq!(normalize_header("Area (ha)"), "AREA_HA");
        assert_eq!(normalize_header("File #"), "FILE");
        assert_eq!(normalize_header("--"), "");
    }

    #[test]
    fn test_normalize_headers_dedupes() {
        let mut table = Table::new(["File #", "File Number", "file#", " "]);
        normalize_headers(&mut table);
        assert_eq!(table.columns(), ["FILE", "FILE_NUMBER", "FILE_2", "COLUMN_4"]);
    }

    #[test]
    fn test_rename_and_drop() {
        let mut table = Table::new(["A", "B", "C"]);
        table
            .push_row(vec![Value::Integer(1), Value::Null, Value::text("x")])
            .unwrap();

        assert_eq!(rename_columns(&mut table, &[("a", "ALPHA"), ("missing", "Z")]), 1);
        assert_eq!(drop_empty_columns(&mut table), vec!["B"]);
        assert_eq!(table.columns(), ["ALPHA", "C"]);
    }

    #[test]
    fn test_add_area_ha() {
        let mut table = Table::new(["FILE", "GEOM_WKT"]);
        table
            .push_row(vec![
                Value::text("0001"),
                Value::text("POLYGON ((1000000 500000, 1000100 500000, 1000100 500200, 1000000 500200, 1000000 500000))"),
            ])
            .unwrap();
        table.push_row(vec![Value::text("0002"), Value::Null]).unwrap();

        add_area_ha(&mut table, "GEOM_WKT", &Crs::BC_ALBERS).unwrap();
        assert_eq!(table.get(0, AREA_HA_COLUMN), Some(&Value::Number(2.0)));
        assert_eq!(table.get(1, AREA_HA_COLUMN), Some(&Value::Null));
    }

    #[test]
    fn test_add_area_ha_bad_wkt() {
        let mut table = Table::new(["GEOM_WKT"]);
        table.push_row(vec![Value::text("POLYGON ((")]).unwrap();
        assert!(add_area_ha(&mut table, "GEOM_WKT", &Crs::BC_ALBERS).is_err());
    }

    #[test]
    fn test_drop_keeps_columns_of_empty_table() {
        let mut table = Table::new(["A"]);
        assert!(drop_empty_columns(&mut table).is_empty());
        assert_eq!(table.width(), 1);
    }
}
