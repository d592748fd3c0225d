//! CLI command definitions and argument parsing.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Landstat - spatial status, query and tenure reports from BCGW.
#[derive(Debug, Parser)]
#[command(name = "landstat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LANDSTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Profile to use
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (file paths only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a rule sheet against an area of interest
    Status(StatusArgs),

    /// Run a named catalog query and export the result
    Query(QueryArgs),

    /// Build a tenure report from a TITAN/ATS extract
    Tenure(TenureArgs),

    /// Manage database profiles
    Profile(ProfileArgs),
}

/// Arguments for the status command.
#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Rule sheet (.xlsx or .csv)
    #[arg(short, long)]
    pub rules: PathBuf,

    /// Worksheet holding the rules (first sheet when omitted)
    #[arg(long)]
    pub sheet: Option<String>,

    /// AOI from a shapefile or GeoJSON file
    #[arg(long, conflicts_with_all = ["aoi_wkt", "file_nbr"])]
    pub aoi: Option<PathBuf>,

    /// AOI as WKT
    #[arg(long, conflicts_with = "file_nbr")]
    pub aoi_wkt: Option<String>,

    /// EPSG code of WKT input, or of AOI files without a projection
    #[arg(long, default_value = "3005")]
    pub aoi_epsg: u32,

    /// AOI from the parcels of a Crown Lands file
    #[arg(long)]
    pub file_nbr: Option<String>,

    /// Disposition transaction id (with --file-nbr)
    #[arg(long, requires_all = ["file_nbr", "parcel_id"])]
    pub disp_id: Option<i64>,

    /// Parcel id (with --file-nbr and --disp-id)
    #[arg(long, requires_all = ["file_nbr", "disp_id"])]
    pub parcel_id: Option<i64>,

    /// Report name used for output files
    #[arg(short, long)]
    pub name: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Stop at the first failing rule
    #[arg(long)]
    pub fail_fast: bool,

    /// Keep result geometry as WKT in the workbook
    #[arg(long)]
    pub include_geometry: bool,

    /// Skip the HTML map
    #[arg(long)]
    pub no_map: bool,

    /// Also write result features as GeoJSON
    #[arg(long)]
    pub geojson: bool,

    /// Also write result features as KML
    #[arg(long)]
    pub kml: bool,

    /// Also write result features as shapefiles, one per geometry type
    #[arg(long)]
    pub shp: bool,

    /// Overlay options (TOML)
    #[arg(long)]
    pub overlay_config: Option<PathBuf>,

    /// Map options (TOML)
    #[arg(long)]
    pub map_config: Option<PathBuf>,

    /// Database password
    #[arg(long)]
    pub password: Option<String>,
}

/// Arguments for the query command.
#[derive(Debug, Parser)]
pub struct QueryArgs {
    /// Query name from the catalog
    #[arg(required_unless_present = "list")]
    pub name: Option<String>,

    /// List catalog queries
    #[arg(short, long)]
    pub list: bool,

    /// Identifier substitution for a {slot} (repeatable)
    #[arg(short, long = "ident", value_name = "SLOT=NAME", value_parser = parse_key_value)]
    pub idents: Vec<(String, String)>,

    /// Bind value for a :param (repeatable)
    #[arg(short = 'P', long = "param", value_name = "PARAM=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Extra catalog file merged over the built-in one
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Add AREA_HA computed from the query's geometry column
    #[arg(long)]
    pub area: bool,

    /// Also write an HTML map of the query's geometry
    #[arg(long)]
    pub map: bool,

    /// Workbook path (defaults to <output dir>/<name>_<date>.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rows shown on screen
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// Database password
    #[arg(long)]
    pub password: Option<String>,
}

/// Arguments for the tenure command.
#[derive(Debug, Parser)]
pub struct TenureArgs {
    /// Extract file (.xlsx or .csv)
    pub input: PathBuf,

    /// Worksheet to read (first sheet when omitted)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Date the day counts are measured from (YYYY-MM-DD, default today)
    #[arg(long, value_parser = parse_date)]
    pub as_of: Option<chrono::NaiveDate>,

    /// Column aliases (TOML)
    #[arg(long)]
    pub tenure_config: Option<PathBuf>,

    /// Workbook path (defaults to <output dir>/tenure_report_<date>.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for profile management.
#[derive(Debug, Parser)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileAction,
}

/// Profile management actions.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List,

    /// Show active profile
    Show,

    /// Switch to a different profile
    Switch {
        /// Profile name
        name: String,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        name: String,
        /// Host name or full connect string
        #[arg(long)]
        host: String,
        /// Listener port
        #[arg(long, default_value = "1521")]
        port: u16,
        /// Service name
        #[arg(short, long)]
        service: Option<String>,
        /// Database user
        #[arg(short, long)]
        user: String,
        /// Default schema
        #[arg(long)]
        schema: Option<String>,
    },

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
    },

    /// Import profiles from a legacy db_config.json
    Import {
        /// Legacy JSON file
        path: PathBuf,
        /// Replace profiles that already exist
        #[arg(long)]
        overwrite: bool,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

/// Parse `key=value`
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_date(s: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_command() {
        let cli = Cli::parse_from([
            "landstat",
            "status",
            "--rules",
            "rules.xlsx",
            "--aoi",
            "site.shp",
            "--fail-fast",
            "--shp",
        ]);
        match cli.command {
            Command::Status(args) => {
                assert_eq!(args.rules, PathBuf::from("rules.xlsx"));
                assert!(args.fail_fast);
                assert!(args.shp);
                assert!(!args.kml);
                assert_eq!(args.aoi_epsg, 3005);
            }
            _ => panic!("Expected Status command"),
        }
    }

    #[test]
    fn test_status_aoi_sources_conflict() {
        let result = Cli::try_parse_from([
            "landstat", "status", "--rules", "r.csv", "--aoi", "site.shp", "--file-nbr", "1414465",
        ]);
        assert!(result.is_err());

        let partial = Cli::try_parse_from([
            "landstat", "status", "--rules", "r.csv", "--file-nbr", "1414465", "--disp-id", "1",
        ]);
        assert!(partial.is_err());
    }

    #[test]
    fn test_query_command() {
        let cli = Cli::parse_from([
            "landstat",
            "-v",
            "query",
            "layer_sample",
            "--ident",
            "table=WHSE_TANTALIS.TA_CROWN_TENURES_SVW",
            "--ident",
            "geometry=SHAPE",
            "-P",
            "max_rows=10",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.name.as_deref(), Some("layer_sample"));
                assert_eq!(args.idents.len(), 2);
                assert_eq!(args.params, vec![("max_rows".to_string(), "10".to_string())]);
            }
            _ => panic!("Expected Query command"),
        }
    }

    #[test]
    fn test_query_list_needs_no_name() {
        assert!(Cli::try_parse_from(["landstat", "query", "--list"]).is_ok());
        assert!(Cli::try_parse_from(["landstat", "query"]).is_err());
    }

    #[test]
    fn test_tenure_as_of() {
        let cli = Cli::parse_from(["landstat", "tenure", "extract.xlsx", "--as-of", "2024-04-01"]);
        match cli.command {
            Command::Tenure(args) => {
                assert_eq!(args.as_of, chrono::NaiveDate::from_ymd_opt(2024, 4, 1));
            }
            _ => panic!("Expected Tenure command"),
        }
        assert!(Cli::try_parse_from(["landstat", "tenure", "x.csv", "--as-of", "April"]).is_err());
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("a = b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
