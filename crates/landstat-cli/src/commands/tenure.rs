//! Tenure command implementation.

use super::{file_stem, output_path};
use crate::cli::TenureArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use chrono::{Local, NaiveDate};
use landstat_report::tenure::{tenure_workbook, TenureConfig};
use landstat_store::read_table;
use std::path::PathBuf;

/// Execute the tenure command.
pub fn execute_tenure(args: TenureArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let path = build_tenure_report(&args, config, as_of)?;
    println!("{}", formatter.written("Tenure report", &path));
    Ok(())
}

/// Read the extract, derive the tenure columns and save the workbook
pub fn build_tenure_report(args: &TenureArgs, config: &Config, as_of: NaiveDate) -> Result<PathBuf> {
    let tenure_config = match &args.tenure_config {
        Some(path) => TenureConfig::from_toml(&std::fs::read_to_string(path)?).map_err(CliError::Config)?,
        None => TenureConfig::default(),
    };

    let table = read_table(&args.input, args.sheet.as_deref())?;
    if table.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "{} has no data rows",
            args.input.display()
        )));
    }

    let source = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.display().to_string());
    let workbook = tenure_workbook(table, as_of, &source, &tenure_config)?;

    let path = match &args.output {
        Some(path) => path.clone(),
        None => output_path(
            &config.output_dir(),
            &file_stem(&format!("tenure_report_{}", as_of.format("%Y%m%d"))),
            "xlsx",
        )?,
    };
    workbook.save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn tenure_args(argv: &[&str]) -> TenureArgs {
        let mut full = vec!["landstat", "tenure"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Tenure(args) => args,
            _ => panic!("Expected Tenure command"),
        }
    }

    #[test]
    fn test_default_output_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("extract.csv");
        std::fs::write(
            &input,
            "File Number,Status,Received Date\n1414465,OFFERED,2024-01-10\n1414466,ACCEPTED,2024-02-01\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.settings.output_dir = Some(dir.path().join("reports"));
        let args = tenure_args(&[input.to_str().unwrap()]);
        let as_of = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();

        let path = build_tenure_report(&args, &config, as_of).unwrap();
        assert_eq!(path, dir.path().join("reports").join("tenure_report_20240401.xlsx"));
        assert!(path.is_file());
    }

    #[test]
    fn test_empty_extract_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("extract.csv");
        std::fs::write(&input, "File Number,Status\n").unwrap();

        let args = tenure_args(&[input.to_str().unwrap()]);
        let as_of = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let err = build_tenure_report(&args, &Config::default(), as_of).unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(_)));
    }
}
