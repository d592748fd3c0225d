//! Overlay runner implementation

use crate::types::{
    rule_columns, RuleOutcome, StatusReport, OVERLAP_HA_COLUMN, OVERLAP_PCT_COLUMN, RESULT_COLUMN,
};
use crate::{OverlayConfig, OverlayError, Result, RuleSheet};
use landstat_domain::{OverlayTag, Rule, RunId, SpatialDatabase, Table, Target, Value, NO_OVERLAPS_FOUND};
use landstat_geo::{overlap, overlay_features, parse_wkt, read_vector, to_wkt, Aoi, Crs, Feature, Hit};
use landstat_store::{
    DefinitionQuery, Identifier, SpatialQueryBuilder, StoreError, TableName, GEOMETRY_WKT_COLUMN,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Scratch column carrying the tag while intersect and buffer rows are merged
const TAG_COLUMN: &str = "LANDSTAT_TAG";

/// Evaluates rule sheets against an AOI
///
/// Table rules run as spatial SQL through the database; file rules run as a
/// local overlay. A database is only needed when the sheet has table rules.
pub struct OverlayRunner<D> {
    config: OverlayConfig,
    database: Option<D>,
    builder: SpatialQueryBuilder,
    sql_crs: Crs,
    file_crs: Crs,
    geometry_columns: HashMap<TableName, Identifier>,
}

impl<D> OverlayRunner<D>
where
    D: SpatialDatabase<Error = StoreError>,
{
    /// Create a runner without a database
    pub fn new(config: OverlayConfig) -> Result<Self> {
        config.validate().map_err(OverlayError::Config)?;
        Ok(Self {
            builder: SpatialQueryBuilder::new(config.srid),
            sql_crs: Crs::from_epsg(config.srid)?,
            file_crs: Crs::from_epsg(config.file_crs_epsg)?,
            config,
            database: None,
            geometry_columns: HashMap::new(),
        })
    }

    /// Attach the database used for table rules
    pub fn with_database(mut self, database: D) -> Self {
        self.database = Some(database);
        self
    }

    /// The attached database
    pub fn database(&self) -> Option<&D> {
        self.database.as_ref()
    }

    /// Configuration in use
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Evaluate every rule in the sheet
    ///
    /// Failing rules become placeholder rows with an `ERROR` column unless
    /// `fail_fast` is set. Rejected sheet rows are reported after the rules.
    pub fn run(&mut self, aoi: &Aoi, sheet: &RuleSheet) -> Result<StatusReport> {
        let run_id = RunId::new();
        info!(%run_id, aoi = aoi.label(), area_ha = aoi.area_ha(), rules = sheet.len(), "starting status run");

        let mut outcomes = Vec::with_capacity(sheet.len());
        for rule in &sheet.rules {
            match self.evaluate(aoi, rule) {
                Ok(outcome) => {
                    info!(rule = %rule.name, conflicts = outcome.conflict_count, "evaluated rule");
                    outcomes.push(outcome);
                }
                Err(e) if self.config.fail_fast => {
                    return Err(OverlayError::RuleFailed {
                        rule: rule.name.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(rule = %rule.name, target = %rule.target, error = %e, "rule failed");
                    outcomes.push(RuleOutcome::failed(
                        &rule.category,
                        &rule.name,
                        &rule.target.to_string(),
                        e.to_string(),
                    ));
                }
            }
        }

        for rejected in &sheet.rejected {
            if self.config.fail_fast {
                return Err(OverlayError::RuleFailed {
                    rule: format!("row {}", rejected.row),
                    message: rejected.reason.clone(),
                });
            }
            outcomes.push(RuleOutcome::failed(
                &rejected.category,
                &rejected.name,
                &rejected.datasource,
                format!("row {}: {}", rejected.row, rejected.reason),
            ));
        }

        let report = StatusReport {
            run_id,
            aoi_label: aoi.label().to_string(),
            aoi_area_ha: aoi.area_ha(),
            generated_at: chrono::Local::now().naive_local(),
            outcomes,
        };
        info!(
            %run_id,
            conflicts = report.total_conflicts(),
            failed = report.failed(),
            "status run complete"
        );
        Ok(report)
    }

    /// Evaluate one rule, propagating any failure
    pub fn evaluate(&mut self, aoi: &Aoi, rule: &Rule) -> Result<RuleOutcome> {
        let hits = match &rule.target {
            Target::Table { .. } => self.table_hits(aoi, rule)?,
            Target::File(path) => self.file_hits(aoi, rule, path)?,
        };
        let table = self.result_table(rule, &hits)?;
        Ok(RuleOutcome::found(rule, table, hits))
    }

    fn wanted_fields(&self, rule: &Rule) -> Vec<String> {
        let mut fields = rule.fields.clone();
        if self.config.select_label_field {
            if let Some(label) = &rule.label_field {
                if !fields.iter().any(|f| f.eq_ignore_ascii_case(label)) {
                    fields.push(label.clone());
                }
            }
        }
        fields
    }

    fn geometry_column(&mut self, rule: &Rule, table: &TableName) -> Result<Identifier> {
        if let Some(column) = self.geometry_columns.get(table) {
            return Ok(column.clone());
        }

        let database = self
            .database
            .as_mut()
            .ok_or_else(|| OverlayError::NoDatabase(rule.name.clone()))?;
        let rows = database.fetch(&self.builder.geometry_column(table))?;
        let name = rows
            .get(0, "GEOM_NAME")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::NoGeometryColumn(table.to_string()))?;

        let column = Identifier::new(name)?;
        debug!(table = %table, column = %column, "resolved geometry column");
        self.geometry_columns.insert(table.clone(), column.clone());
        Ok(column)
    }

    fn table_hits(&mut self, aoi: &Aoi, rule: &Rule) -> Result<Vec<Hit>> {
        if self.database.is_none() {
            return Err(OverlayError::NoDatabase(rule.name.clone()));
        }

        let table = TableName::from_target(&rule.target)?;
        let fields = self
            .wanted_fields(rule)
            .iter()
            .map(|f| Identifier::new(f))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let filter = rule
            .definition_query
            .as_deref()
            .map(DefinitionQuery::parse)
            .transpose()?;
        let geometry = self.geometry_column(rule, &table)?;
        let aoi_wkt = to_wkt(&aoi.to_crs(&self.sql_crs)?);

        let database = self
            .database
            .as_mut()
            .ok_or_else(|| OverlayError::NoDatabase(rule.name.clone()))?;

        let statement = self
            .builder
            .intersect(&table, &geometry, &fields, filter.as_ref(), &aoi_wkt);
        let mut rows = database.fetch(&statement)?;
        rows.add_constant_column(TAG_COLUMN, Value::text(OverlayTag::Intersect.to_string()))?;

        let ring = match rule.effective_buffer() {
            Some(radius) => {
                let statement = self.builder.within_distance(
                    &table,
                    &geometry,
                    &fields,
                    filter.as_ref(),
                    &aoi_wkt,
                    radius,
                );
                let mut within = database.fetch(&statement)?;
                within.add_constant_column(TAG_COLUMN, Value::text(OverlayTag::Within(radius).to_string()))?;
                rows.append(within);
                Some(aoi.buffer_ring(radius))
            }
            None => None,
        };

        // SDO_WITHIN_DISTANCE also returns intersecting rows; the first copy
        // (tagged INTERSECT) is kept
        let key: Vec<String> = rows
            .columns()
            .iter()
            .filter(|c| c.as_str() != TAG_COLUMN)
            .cloned()
            .collect();
        let key: Vec<&str> = key.iter().map(String::as_str).collect();
        let removed = rows.dedup_by_columns(&key);
        debug!(rule = %rule.name, rows = rows.len(), duplicates = removed, "merged overlay rows");

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let tag = row
                .get(TAG_COLUMN)
                .and_then(Value::as_str)
                .and_then(OverlayTag::parse)
                .unwrap_or(OverlayTag::Intersect);

            let wkt = row
                .get(GEOMETRY_WKT_COLUMN)
                .and_then(Value::as_str)
                .ok_or_else(|| OverlayError::BadGeometry {
                    dataset: table.to_string(),
                    reason: format!("row has no {}", GEOMETRY_WKT_COLUMN),
                })?;
            let geometry = parse_wkt(wkt).map_err(|e| OverlayError::BadGeometry {
                dataset: table.to_string(),
                reason: e.to_string(),
            })?;
            let geometry = self.sql_crs.transform(&geometry, &Crs::BC_ALBERS)?;

            let attributes = rows
                .columns()
                .iter()
                .zip(row.values())
                .filter(|(c, _)| c.as_str() != TAG_COLUMN && c.as_str() != GEOMETRY_WKT_COLUMN)
                .map(|(c, v)| (c.clone(), v.clone()))
                .collect();

            let region = match (&tag, &ring) {
                (OverlayTag::Within(_), Some(ring)) => ring,
                _ => aoi.shape(),
            };
            hits.push(clip_hit(Feature { attributes, geometry }, tag, region));
        }
        Ok(hits)
    }

    fn file_hits(&self, aoi: &Aoi, rule: &Rule, path: &Path) -> Result<Vec<Hit>> {
        if rule.definition_query.is_some() {
            return Err(OverlayError::UnsupportedFilter(path.display().to_string()));
        }

        let set = read_vector(path, &self.file_crs)?.reproject(&Crs::BC_ALBERS)?;
        let mut hits = overlay_features(aoi, &set.features, rule.effective_buffer());

        let wanted = self.wanted_fields(rule);
        if !wanted.is_empty() {
            if !set.features.is_empty() {
                if let Some(missing) = wanted
                    .iter()
                    .find(|w| set.features.iter().all(|f| f.attribute(w).is_none()))
                {
                    return Err(OverlayError::FieldNotFound {
                        field: missing.clone(),
                        dataset: path.display().to_string(),
                    });
                }
            }
            for hit in &mut hits {
                hit.feature
                    .attributes
                    .retain(|(k, _)| wanted.iter().any(|w| w.eq_ignore_ascii_case(k)));
            }
        }

        debug!(rule = %rule.name, features = set.features.len(), hits = hits.len(), "local overlay");
        Ok(hits)
    }

    /// Rule columns, attributes, then `RESULT` and overlap columns
    fn result_table(&self, rule: &Rule, hits: &[Hit]) -> Result<Table> {
        let mut attributes: Vec<String> = self.wanted_fields(rule);
        for hit in hits {
            for (name, _) in &hit.feature.attributes {
                if !attributes.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                    attributes.push(name.clone());
                }
            }
        }

        let mut columns: Vec<String> = rule_columns().iter().map(|c| c.to_string()).collect();
        columns.extend(attributes.iter().cloned());
        columns.extend([RESULT_COLUMN, OVERLAP_HA_COLUMN, OVERLAP_PCT_COLUMN].map(String::from));
        if self.config.include_geometry {
            columns.push(GEOMETRY_WKT_COLUMN.to_string());
        }
        let mut table = Table::new(columns);

        let rule_cells = [
            Value::text(rule.category.as_str()),
            Value::text(rule.name.as_str()),
            Value::text(rule.target.to_string()),
        ];

        if hits.is_empty() {
            let mut row = rule_cells.to_vec();
            row.extend(attributes.iter().map(|_| Value::Null));
            row.extend([Value::text(NO_OVERLAPS_FOUND), Value::Null, Value::Null]);
            if self.config.include_geometry {
                row.push(Value::Null);
            }
            table.push_row(row)?;
            return Ok(table);
        }

        for hit in hits {
            let mut row = rule_cells.to_vec();
            row.extend(
                attributes
                    .iter()
                    .map(|a| hit.feature.attribute(a).cloned().unwrap_or_default()),
            );
            row.push(Value::text(hit.tag.to_string()));
            row.push(hit.overlap_ha.into());
            row.push(hit.overlap_pct.into());
            if self.config.include_geometry {
                row.push(Value::text(to_wkt(&hit.feature.geometry)));
            }
            table.push_row(row)?;
        }
        Ok(table)
    }
}

/// Clip a database feature to the region it was matched against
///
/// Oracle's tolerance can match features the local test misses; those keep
/// their full geometry and get no overlap figures.
fn clip_hit(feature: Feature, tag: OverlayTag, region: &geo::MultiPolygon<f64>) -> Hit {
    match overlap(&feature.geometry, region) {
        Some(found) => Hit {
            feature: Feature {
                attributes: feature.attributes,
                geometry: found.geometry,
            },
            tag,
            overlap_ha: found.area_ha,
            overlap_pct: found.percent,
        },
        None => Hit {
            feature,
            tag,
            overlap_ha: None,
            overlap_pct: None,
        },
    }
}
