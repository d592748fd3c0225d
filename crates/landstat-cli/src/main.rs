//! Landstat CLI - spatial status, query and tenure reports from BCGW.

use clap::Parser;
use landstat_cli::commands;
use landstat_cli::logging::init_logging;
use landstat_cli::{Cli, Command, Config, Formatter};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> landstat_cli::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Profile override applies to this run only
    if let Some(profile_name) = cli.profile {
        config.switch_profile(profile_name)?;
    }

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Status(args) => commands::execute_status(args, &config, &formatter),
        Command::Query(args) => commands::execute_query(args, &config, &formatter),
        Command::Tenure(args) => commands::execute_tenure(args, &config, &formatter),
        Command::Profile(args) => commands::execute_profile(args, &mut config, &formatter),
    }
}
