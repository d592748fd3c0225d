//! Output for status runs: workbook, map layers and spatial export

use crate::workbook::{run_facts, ReportWorkbook};
use crate::{FeatureLayer, LeafletMap, MapConfig, Result};
use landstat_domain::{OverlayTag, Value};
use landstat_geo::{Aoi, Crs, Feature, Transformer};
use landstat_overlay::{RuleOutcome, StatusReport, OVERLAP_HA_COLUMN, OVERLAP_PCT_COLUMN, RESULT_COLUMN};

/// Summary sheet followed by one sheet per rule
pub fn status_workbook(report: &StatusReport) -> ReportWorkbook {
    let summary = run_facts(&report.run_id.to_string(), report.generated_at)
        .fact("AOI", report.aoi_label.as_str())
        .fact("AOI_AREA_HA", report.aoi_area_ha)
        .fact("RULES", report.outcomes.len() as i64)
        .fact("TOTAL_CONFLICTS", report.total_conflicts() as i64)
        .fact("FAILED_RULES", report.failed() as i64)
        .with_table(report.summary_table());

    let mut workbook = ReportWorkbook::new().with_summary(summary);
    for (name, table) in report.tables() {
        workbook.add_sheet(name, table.clone());
    }
    workbook
}

fn outcome_layer(outcome: &RuleOutcome, to_wgs84: &Transformer) -> Result<FeatureLayer> {
    let features = outcome
        .hits
        .iter()
        .map(|hit| {
            let mut attributes = hit.feature.attributes.clone();
            attributes.push((RESULT_COLUMN.to_string(), Value::Text(hit.tag.to_string())));
            attributes.push((OVERLAP_HA_COLUMN.to_string(), hit.overlap_ha.into()));
            attributes.push((OVERLAP_PCT_COLUMN.to_string(), hit.overlap_pct.into()));
            Ok(Feature {
                attributes,
                geometry: to_wgs84.apply(&hit.feature.geometry)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureLayer {
        name: outcome.name.clone(),
        label_column: outcome.label_field.clone(),
        features,
    })
}

/// One WGS84 layer per rule that found features
pub fn status_layers(report: &StatusReport) -> Result<Vec<FeatureLayer>> {
    let to_wgs84 = Crs::BC_ALBERS.transformer(&Crs::WGS84)?;
    report
        .outcomes
        .iter()
        .filter(|o| !o.hits.is_empty())
        .map(|o| outcome_layer(o, &to_wgs84))
        .collect()
}

/// Map with the AOI, one ring per distinct buffer radius and the result layers
pub fn status_map(report: &StatusReport, aoi: &Aoi, buffers: &[f64], config: MapConfig) -> Result<LeafletMap> {
    let mut map = LeafletMap::new(config)?;
    map.set_aoi(aoi.label(), aoi.to_crs(&Crs::WGS84)?);

    let mut radii: Vec<f64> = buffers.iter().copied().filter(|b| *b > 0.0).collect();
    radii.sort_by(f64::total_cmp);
    radii.dedup();
    for radius in radii {
        let ring = geo::Geometry::MultiPolygon(aoi.buffer_ring(radius));
        let name = OverlayTag::Within(radius).to_string().replacen("WITHIN", "Buffer", 1);
        map.add_ring(name, Crs::BC_ALBERS.transform(&ring, &Crs::WGS84)?);
    }

    for layer in status_layers(report)? {
        map.add_layer(layer);
    }
    Ok(map)
}
