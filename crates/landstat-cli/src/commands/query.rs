//! Query command implementation.

use super::{file_stem, open_database, output_path};
use crate::cli::QueryArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use chrono::Local;
use landstat_domain::{Bind, BindValue, RunId, SpatialDatabase, Table};
use landstat_geo::Crs;
use landstat_report::{add_area_ha, run_facts, FeatureLayer, LeafletMap, MapConfig, ReportWorkbook};
use landstat_store::{NamedQuery, QueryCatalog, StoreError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Execute the query command.
pub fn execute_query(args: QueryArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let catalog = load_catalog(config, args.catalog.as_deref())?;
    if args.list {
        println!("{}", formatter.format_catalog(&catalog)?);
        return Ok(());
    }

    let name = args
        .name
        .clone()
        .ok_or_else(|| CliError::InvalidInput("a query name is required".to_string()))?;
    let query = catalog
        .get(&name)
        .ok_or_else(|| StoreError::UnknownQuery(name.clone()))?;
    if (args.area || args.map) && query.geometry_column.is_none() {
        return Err(CliError::InvalidInput(format!(
            "query '{}' returns no geometry; --area and --map need one",
            name
        )));
    }

    let mut database = open_database(config, args.password.clone())?;
    let mut table = run_query(&mut database, &catalog, &name, &args.idents, &args.params)?;
    let crs = Crs::from_epsg(config.settings.srid)?;
    if args.area {
        if let Some(column) = &query.geometry_column {
            add_area_ha(&mut table, column, &crs)?;
        }
    }

    let output = formatter.format_table(&without_geometry(&table, query), args.limit)?;
    println!("{}", output);

    for (what, path) in write_query_outputs(&table, query, &args, config, &crs)? {
        println!("{}", formatter.written(what, &path));
    }
    Ok(())
}

/// Built-in catalog merged with the configured and command-line ones
pub fn load_catalog(config: &Config, extra: Option<&Path>) -> Result<QueryCatalog> {
    let mut catalog = QueryCatalog::builtin()?;
    for path in config.settings.catalog.as_deref().into_iter().chain(extra) {
        catalog.merge(QueryCatalog::load(path)?);
    }
    Ok(catalog)
}

/// Render a named query and fetch its rows
pub fn run_query<D>(
    database: &mut D,
    catalog: &QueryCatalog,
    name: &str,
    idents: &[(String, String)],
    params: &[(String, String)],
) -> Result<Table>
where
    D: SpatialDatabase<Error = StoreError>,
{
    let slots: BTreeMap<String, String> = idents.iter().cloned().collect();
    let binds = params
        .iter()
        .map(|(name, value)| Bind {
            name: name.clone(),
            value: BindValue::Text(value.clone()),
        })
        .collect();

    let statement = catalog.render(name, &slots, binds)?;
    let table = database.fetch(&statement)?;
    info!(query = name, rows = table.len(), "query complete");
    Ok(table)
}

/// Write the result workbook and, when asked, the map
pub fn write_query_outputs(
    table: &Table,
    query: &NamedQuery,
    args: &QueryArgs,
    config: &Config,
    crs: &Crs,
) -> Result<Vec<(&'static str, PathBuf)>> {
    let now = Local::now().naive_local();
    let workbook_path = match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            path.clone()
        }
        None => output_path(
            &config.output_dir(),
            &file_stem(&format!("{}_{}", query.name, now.format("%Y%m%d"))),
            "xlsx",
        )?,
    };

    let summary = run_facts(&RunId::new().to_string(), now)
        .fact("QUERY", query.name.as_str())
        .fact("ROWS", table.len() as i64);
    let mut workbook = ReportWorkbook::new().with_summary(summary);
    workbook.add_sheet(&query.name, without_geometry(table, query));
    workbook.save(&workbook_path)?;
    let mut written = vec![("Workbook", workbook_path.clone())];

    if args.map {
        if let Some(column) = &query.geometry_column {
            let layer = FeatureLayer::from_table(query.name.as_str(), table, column, crs)?
                .with_label_column(config.settings.label_column.clone());
            let mut map = LeafletMap::new(MapConfig {
                title: query.name.clone(),
                label_column: config.settings.label_column.clone(),
                ..MapConfig::default()
            })?;
            map.add_layer(layer);
            let map_path = workbook_path.with_extension("html");
            map.save(&map_path)?;
            written.push(("Map", map_path));
        }
    }
    Ok(written)
}

fn without_geometry(table: &Table, query: &NamedQuery) -> Table {
    let mut table = table.clone();
    if let Some(column) = &query.geometry_column {
        table.drop_column(column);
    }
    table
}
