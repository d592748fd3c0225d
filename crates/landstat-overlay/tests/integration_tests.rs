//! Integration tests for landstat-overlay
//!
//! A rule sheet on disk, a local GeoJSON dataset and a scripted database run
//! through a full status run.

use landstat_domain::{Table, Value};
use landstat_geo::{Aoi, Crs};
use landstat_overlay::{OverlayConfig, OverlayRunner, RuleSheet};
use landstat_store::MemoryDatabase;

const AOI_WKT: &str =
    "POLYGON ((1000000 500000, 1001000 500000, 1001000 501000, 1000000 501000, 1000000 500000))";

fn write_fixtures(dir: &std::path::Path) -> std::path::PathBuf {
    let parks = dir.join("parks.geojson");
    std::fs::write(
        &parks,
        r#"{"type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3005"}},
            "features": [
                {"type": "Feature", "properties": {"PARK_NAME": "Inside Park"},
                 "geometry": {"type": "Polygon", "coordinates": [[[1000100, 500100], [1000200, 500100], [1000200, 500200], [1000100, 500200], [1000100, 500100]]]}}
            ]}"#,
    )
    .unwrap();

    let rules = dir.join("rules.csv");
    std::fs::write(
        &rules,
        format!(
            "CATEGORY,FEATURECLASS_NAME,DATASOURCE,FIELDS_TO_SUMMARIZE,DEFINITION_QUERY,BUFFER_DISTANCE\n\
             Tenure,Crown Tenures,WHSE_TANTALIS.TA_CROWN_TENURES_SVW,CROWN_LANDS_FILE,TENURE_STAGE = 'TENURE',250\n\
             Parks,Local Parks,{},PARK_NAME,,\n\
             Broken,Broken,NOT_QUALIFIED,,,\n",
            parks.display()
        ),
    )
    .unwrap();
    rules
}

#[test]
fn test_full_status_run() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = write_fixtures(dir.path());
    let sheet = RuleSheet::load(&rules_path, None).unwrap();
    assert_eq!(sheet.rules.len(), 2);
    assert_eq!(sheet.rejected.len(), 1);

    let mut metadata = Table::new(["GEOM_NAME"]);
    metadata.push_row(vec![Value::text("SHAPE")]).unwrap();
    let mut tenures = Table::new(["CROWN_LANDS_FILE", "GEOM_WKT"]);
    tenures
        .push_row(vec![
            Value::text("1414465"),
            Value::text("POLYGON ((1000500 500500, 1000600 500500, 1000600 500600, 1000500 500600, 1000500 500500))"),
        ])
        .unwrap();

    let db = MemoryDatabase::new()
        .respond("all_sdo_geom_metadata", metadata)
        .respond("SDO_RELATE", tenures);

    let aoi = Aoi::from_wkt(AOI_WKT, &Crs::BC_ALBERS, "site").unwrap();
    let mut runner = OverlayRunner::new(OverlayConfig::default())
        .unwrap()
        .with_database(db);
    let report = runner.run(&aoi, &sheet).unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.total_conflicts(), 2);
    assert_eq!(report.failed(), 1);

    let tenure = &report.outcomes[0];
    assert_eq!(tenure.table.get(0, "OVERLAP_PCT"), Some(&Value::Number(100.0)));

    let parks = &report.outcomes[1];
    assert_eq!(parks.table.get(0, "PARK_NAME"), Some(&Value::text("Inside Park")));
    assert_eq!(parks.hits.len(), 1);

    let summary = report.summary_table();
    assert_eq!(summary.get(2, "STATUS"), Some(&Value::text("FAILED")));
    assert_eq!(report.aoi_area_ha, 100.0);
}
