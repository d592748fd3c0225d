//! Status command implementation.

use super::{file_stem, open_database, output_path};
use crate::cli::StatusArgs;
use crate::commands::query::load_catalog;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use landstat_domain::SpatialDatabase;
use landstat_geo::{Aoi, Crs};
use landstat_overlay::{tenure_aoi, OverlayConfig, OverlayRunner, RuleSheet, StatusReport, TenureKey};
use landstat_report::{
    status_layers, status_map, status_workbook, write_geojson, write_kml, write_shapefiles,
    MapConfig,
};
use landstat_store::StoreError;
use std::path::PathBuf;
use tracing::info;

/// Execute the status command.
pub fn execute_status(args: StatusArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let sheet = RuleSheet::load(&args.rules, args.sheet.as_deref())?;
    for rejected in &sheet.rejected {
        println!(
            "{}",
            formatter.warning(&format!("Rule row {} ({}) skipped: {}", rejected.row, rejected.name, rejected.reason))
        );
    }

    let overlay_config = overlay_config(&args, config)?;
    let mut database = if sheet.needs_database() || args.file_nbr.is_some() {
        Some(open_database(config, args.password.clone())?)
    } else {
        None
    };

    let aoi = load_aoi(&args, database.as_mut(), config)?;
    let report = run_overlay(&aoi, &sheet, overlay_config, database)?;
    let output = formatter.format_status(&report)?;
    if !output.is_empty() {
        println!("{}", output);
    }

    for (what, path) in write_outputs(&report, &aoi, &sheet, &args, config)? {
        println!("{}", formatter.written(what, &path));
    }
    Ok(())
}

/// Overlay options: file (or defaults) with command-line overrides
pub fn overlay_config(args: &StatusArgs, config: &Config) -> Result<OverlayConfig> {
    let mut overlay = match &args.overlay_config {
        Some(path) => OverlayConfig::from_toml(&std::fs::read_to_string(path)?).map_err(CliError::Config)?,
        None => OverlayConfig {
            srid: config.settings.srid,
            ..OverlayConfig::default()
        },
    };
    overlay.fail_fast |= args.fail_fast;
    overlay.include_geometry |= args.include_geometry;
    overlay.validate().map_err(CliError::Config)?;
    Ok(overlay)
}

/// AOI from a file, WKT or a tenure in the database
pub fn load_aoi<D>(args: &StatusArgs, database: Option<&mut D>, config: &Config) -> Result<Aoi>
where
    D: SpatialDatabase<Error = StoreError>,
{
    let crs = Crs::from_epsg(args.aoi_epsg)?;
    if let Some(path) = &args.aoi {
        return Ok(Aoi::from_file(path, &crs)?);
    }
    if let Some(wkt) = &args.aoi_wkt {
        return Ok(Aoi::from_wkt(wkt, &crs, args.name.as_deref().unwrap_or("AOI"))?);
    }
    if let Some(file_nbr) = &args.file_nbr {
        let key = match (args.disp_id, args.parcel_id) {
            (Some(disp_id), Some(parcel_id)) => TenureKey::parcel(file_nbr.as_str(), disp_id, parcel_id),
            _ => TenureKey::file(file_nbr.as_str()),
        };
        let database = database.ok_or_else(|| CliError::Config("--file-nbr needs a database profile".to_string()))?;
        let catalog = load_catalog(config, None)?;
        let storage_crs = Crs::from_epsg(config.settings.srid)?;
        return Ok(tenure_aoi(database, &catalog, &key, &storage_crs)?);
    }
    Err(CliError::InvalidInput(
        "an AOI is required: --aoi, --aoi-wkt or --file-nbr".to_string(),
    ))
}

/// Evaluate every rule against the AOI
pub fn run_overlay<D>(aoi: &Aoi, sheet: &RuleSheet, config: OverlayConfig, database: Option<D>) -> Result<StatusReport>
where
    D: SpatialDatabase<Error = StoreError>,
{
    let mut runner = OverlayRunner::new(config)?;
    if let Some(database) = database {
        runner = runner.with_database(database);
    }
    Ok(runner.run(aoi, sheet)?)
}

/// Write the workbook and, unless disabled, the map and spatial exports
pub fn write_outputs(
    report: &StatusReport,
    aoi: &Aoi,
    sheet: &RuleSheet,
    args: &StatusArgs,
    config: &Config,
) -> Result<Vec<(&'static str, PathBuf)>> {
    let dir = args.output_dir.clone().unwrap_or_else(|| config.output_dir());
    let stem = file_stem(&args.name.clone().unwrap_or_else(|| {
        format!("{}_status_{}", aoi.label(), report.generated_at.format("%Y%m%d"))
    }));
    let mut written = Vec::new();

    let workbook_path = output_path(&dir, &stem, "xlsx")?;
    status_workbook(report).save(&workbook_path)?;
    written.push(("Workbook", workbook_path));

    if !args.no_map {
        let mut map_config = match &args.map_config {
            Some(path) => MapConfig::from_toml(&std::fs::read_to_string(path)?).map_err(CliError::Config)?,
            None => MapConfig {
                title: format!("{} status", aoi.label()),
                ..MapConfig::default()
            },
        };
        if map_config.label_column.is_none() {
            map_config.label_column = config.settings.label_column.clone();
        }
        let buffers: Vec<f64> = sheet.rules.iter().filter_map(|r| r.effective_buffer()).collect();
        let map_path = output_path(&dir, &stem, "html")?;
        status_map(report, aoi, &buffers, map_config)?.save(&map_path)?;
        written.push(("Map", map_path));
    }

    if args.geojson || args.kml || args.shp {
        let layers = status_layers(report)?;
        if args.geojson {
            let path = output_path(&dir, &stem, "geojson")?;
            write_geojson(&layers, &path)?;
            written.push(("GeoJSON", path));
        }
        if args.kml {
            let path = output_path(&dir, &stem, "kml")?;
            write_kml(&layers, aoi.label(), &path)?;
            written.push(("KML", path));
        }
        if args.shp {
            std::fs::create_dir_all(&dir)?;
            for path in write_shapefiles(&layers, &dir, &stem)? {
                written.push(("Shapefile", path));
            }
        }
    }

    info!(run_id = %report.run_id, files = written.len(), "status report written");
    Ok(written)
}
