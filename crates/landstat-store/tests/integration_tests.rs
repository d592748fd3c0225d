//! Integration tests for landstat-store
//!
//! These tests drive the query catalog and spatial SQL builder against the
//! in-memory database.

use landstat_domain::{Bind, BindValue, SpatialDatabase, Table, Target, Value};
use landstat_store::{
    DefinitionQuery, Identifier, MemoryDatabase, QueryCatalog, SpatialQueryBuilder, StoreError,
    TableName,
};
use std::collections::BTreeMap;

fn tenure_rows() -> Table {
    let mut table = Table::new(["CROWN_LANDS_FILE", "TENURE_STATUS", "GEOM_WKT"]);
    table
        .push_row(vec![
            Value::text("1414465"),
            Value::text("DISPOSITION IN GOOD STANDING"),
            Value::text("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))"),
        ])
        .unwrap();
    table
}

#[test]
fn test_catalog_query_through_database() {
    let catalog = QueryCatalog::builtin().unwrap();
    let statement = catalog
        .render(
            "tenure_by_file",
            &BTreeMap::new(),
            vec![Bind {
                name: "file_nbr".to_string(),
                value: BindValue::Text("1414465".to_string()),
            }],
        )
        .unwrap();

    let mut db = MemoryDatabase::new().respond("TA_CROWN_TENURES_SVW", tenure_rows());
    let table = db.fetch(&statement).unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0, "crown_lands_file"), Some(&Value::text("1414465")));
    assert_eq!(db.executed()[0].binds.len(), 1);
}

#[test]
fn test_overlay_statements_never_embed_values() {
    let target = Target::parse("whse_tantalis.ta_crown_tenures_svw").unwrap();
    let table = TableName::from_target(&target).unwrap();
    let geometry = Identifier::new("SHAPE").unwrap();
    let filter = DefinitionQuery::parse("TENURE_STAGE = 'TENURE'").unwrap();
    let aoi = "POLYGON ((1200000 450000, 1201000 450000, 1201000 451000, 1200000 450000))";

    let builder = SpatialQueryBuilder::default();
    let statements = [
        builder.intersect(&table, &geometry, &[], Some(&filter), aoi),
        builder.within_distance(&table, &geometry, &[], Some(&filter), aoi, 250.0),
    ];

    let mut db = MemoryDatabase::new();
    for statement in &statements {
        assert!(!statement.sql.contains("1200000"));
        assert!(statement.sql.contains("(TENURE_STAGE = 'TENURE')"));
        db.fetch(statement).unwrap();
    }
    assert_eq!(db.executed().len(), 2);
}

#[test]
fn test_database_failure_surfaces_as_query_error() {
    let mut db = MemoryDatabase::new().fail("all_sdo_geom_metadata", "ORA-00942: table or view does not exist");
    let table = TableName::parse("WHSE_X.MISSING").unwrap();
    let result = db.fetch(&SpatialQueryBuilder::default().geometry_column(&table));

    match result {
        Err(StoreError::Query(message)) => assert!(message.contains("ORA-00942")),
        other => panic!("expected query error, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn test_user_catalog_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queries.toml");
    std::fs::write(
        &path,
        r#"
[[query]]
name = "parks_by_name"
description = "Parks matching a name"
sql = "SELECT PROTECTED_LANDS_NAME FROM WHSE_TANTALIS.TA_PARK_ECORES_PA_SVW WHERE PROTECTED_LANDS_NAME LIKE :name"
"#,
    )
    .unwrap();

    let mut catalog = QueryCatalog::builtin().unwrap();
    let builtin_len = catalog.len();
    catalog.merge(QueryCatalog::load(&path).unwrap());

    assert_eq!(catalog.len(), builtin_len + 1);
    let query = catalog.get("parks_by_name").unwrap();
    assert_eq!(query.bind_names().unwrap(), vec!["name"]);
}
