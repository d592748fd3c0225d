//! Integration tests for landstat-report
//!
//! Workbooks are written to a temporary directory and read back with
//! calamine; maps and exports are checked on disk.

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDate;
use geo::{Geometry, Point};
use landstat_domain::{OverlayTag, Rule, RunId, Table, Target, Value};
use landstat_geo::{Aoi, Crs, Feature, Hit};
use landstat_overlay::{RuleOutcome, StatusReport};
use landstat_report::{
    status_layers, status_map, status_workbook, tenure, write_geojson, write_kml, MapConfig,
    ReportWorkbook,
};

fn status_report() -> StatusReport {
    let rule = Rule::new(
        "Tenure",
        "Crown Tenures: Active/Pending",
        Target::parse("WHSE_TANTALIS.TA_CROWN_TENURES_SVW").unwrap(),
    );
    let mut table = Table::new(["CATEGORY", "FEATURECLASS_NAME", "CROWN_LANDS_FILE", "RESULT", "OVERLAP_HA"]);
    table
        .push_row(vec![
            Value::text("Tenure"),
            Value::text("Crown Tenures"),
            Value::text("1414465"),
            Value::text("INTERSECT"),
            Value::Number(1.25),
        ])
        .unwrap();
    let hit = Hit {
        feature: Feature {
            attributes: vec![("CROWN_LANDS_FILE".to_string(), Value::text("1414465"))],
            geometry: Geometry::Point(Point::new(1000500.0, 500500.0)),
        },
        tag: OverlayTag::Intersect,
        overlap_ha: None,
        overlap_pct: None,
    };

    StatusReport {
        run_id: RunId::new(),
        aoi_label: "site".to_string(),
        aoi_area_ha: 100.0,
        generated_at: NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
        outcomes: vec![
            RuleOutcome::found(&rule, table, vec![hit]),
            RuleOutcome::failed("Parks", "Parks", "WHSE_X.PARKS", "ORA-00942: table or view does not exist"),
        ],
    }
}

#[test]
fn test_status_workbook_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.xlsx");
    status_workbook(&status_report()).save(&path).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    assert_eq!(
        workbook.sheet_names(),
        vec!["SUMMARY", "Crown Tenures_ Active_Pending", "Parks"]
    );

    let summary = workbook.worksheet_range("SUMMARY").unwrap();
    assert_eq!(summary.get_value((0, 0)), Some(&Data::String("RUN_ID".to_string())));
    assert!(matches!(summary.get_value((1, 1)), Some(Data::DateTime(_))));
    assert_eq!(summary.get_value((2, 1)), Some(&Data::String("site".to_string())));

    let tenures = workbook.worksheet_range("Crown Tenures_ Active_Pending").unwrap();
    assert_eq!(tenures.get_value((0, 2)), Some(&Data::String("CROWN_LANDS_FILE".to_string())));
    assert_eq!(tenures.get_value((1, 4)), Some(&Data::Float(1.25)));

    let parks = workbook.worksheet_range("Parks").unwrap();
    assert_eq!(parks.get_value((1, 3)), Some(&Data::String("NO OVERLAPS FOUND".to_string())));
}

#[test]
fn test_tenure_workbook_round_trip() {
    let mut table = Table::new(["File #", "Status", "Date Received", "Expiry Date"]);
    let rows = [
        ("0001", "ACCEPTED", NaiveDate::from_ymd_opt(2024, 1, 10), "2030-01-10"),
        ("0002", "OFFERED", NaiveDate::from_ymd_opt(2023, 6, 1), ""),
        ("0003", "ACCEPTED", None, "2020-01-01"),
    ];
    for (file, status, received, expiry) in rows {
        table
            .push_row(vec![Value::text(file), Value::text(status), received.into(), Value::text(expiry)])
            .unwrap();
    }

    let as_of = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let report = tenure::tenure_workbook(table, as_of, "extract.csv", &tenure::TenureConfig::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tenure.xlsx");
    report.save(&path).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["SUMMARY", "ALL", "ACCEPTED", "OFFERED"]);

    let all = workbook.worksheet_range("ALL").unwrap();
    let headers: Vec<String> = (0..all.width())
        .filter_map(|c| all.get_value((0, c as u32)).map(|v| v.to_string()))
        .collect();
    assert_eq!(
        headers,
        [
            "FILE",
            "STATUS",
            "DATE_RECEIVED",
            "EXPIRY_DATE",
            "DAYS_SINCE_RECEIVED",
            "TENURE_LENGTH_YEARS",
            "DAYS_TO_EXPIRY",
            "FISCAL_YEAR"
        ]
    );
    assert!(matches!(all.get_value((1, 2)), Some(Data::DateTime(_))));
    assert_eq!(all.get_value((1, 4)), Some(&Data::Float(82.0)));
    assert_eq!(all.get_value((1, 7)), Some(&Data::String("2023/24".to_string())));
    assert_eq!(all.get_value((3, 6)), Some(&Data::Float(-1552.0)));
}

#[test]
fn test_map_and_exports_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let report = status_report();
    let aoi = Aoi::from_wkt(
        "POLYGON ((1000000 500000, 1001000 500000, 1001000 501000, 1000000 501000, 1000000 500000))",
        &Crs::BC_ALBERS,
        "site",
    )
    .unwrap();

    let map_path = dir.path().join("status.html");
    status_map(&report, &aoi, &[500.0], MapConfig::default())
        .unwrap()
        .save(&map_path)
        .unwrap();
    let html = std::fs::read_to_string(&map_path).unwrap();
    assert!(html.contains("L.control.layers"));
    assert!(html.contains("1414465"));

    let layers = status_layers(&report).unwrap();
    let geojson_path = dir.path().join("status.geojson");
    write_geojson(&layers, &geojson_path).unwrap();
    let text = std::fs::read_to_string(&geojson_path).unwrap();
    assert!(text.parse::<geojson::GeoJson>().is_ok());

    let kml_path = dir.path().join("status.kml");
    write_kml(&layers, "site", &kml_path).unwrap();
    let kml = std::fs::read_to_string(&kml_path).unwrap();
    assert!(kml.contains("<Placemark>"));
}

#[test]
fn test_totals_row_written_below_data() {
    let mut table = Table::new(["FILE", "AREA_HA"]);
    for (file, area) in [("0001", 1.5), ("0002", 2.5)] {
        table
            .push_row(vec![Value::text(file), Value::Number(area)])
            .unwrap();
    }
    let mut workbook = ReportWorkbook::new();
    workbook.add_sheet("Areas", table);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("areas.xlsx");
    workbook.save(&path).unwrap();

    let mut reader: Xlsx<_> = open_workbook(&path).unwrap();
    let formulas: Vec<(usize, String)> = reader
        .worksheet_formula("Areas")
        .unwrap()
        .used_cells()
        .map(|(row, _, f)| (row, f.to_uppercase()))
        .collect();
    // totals sit on the row after the two data rows
    assert!(formulas.iter().any(|(row, f)| *row == 3 && f.contains("SUBTOTAL(109")));
    assert!(formulas.iter().any(|(row, f)| *row == 3 && f.contains("SUBTOTAL(103")));
}
