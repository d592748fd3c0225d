//! Profile command implementation.

use crate::cli::{ProfileAction, ProfileArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use landstat_store::{load_legacy_profiles, DbProfile};
use std::path::Path;

/// Execute the profile command.
pub fn execute_profile(args: ProfileArgs, config: &mut Config, formatter: &Formatter) -> Result<()> {
    match args.action {
        ProfileAction::List => list_profiles(config, formatter),
        ProfileAction::Show => show_active_profile(config, formatter),
        ProfileAction::Switch { name } => {
            switch_profile(config, name, formatter)?;
            config.save()
        }
        ProfileAction::Set {
            name,
            host,
            port,
            service,
            user,
            schema,
        } => {
            let profile = DbProfile {
                hostname: host,
                port,
                service_name: service,
                username: user,
                password: None,
                schema,
            };
            set_profile(config, name, profile, formatter)?;
            config.save()
        }
        ProfileAction::Delete { name } => {
            if delete_profile(config, name, formatter)? {
                config.save()?;
            }
            Ok(())
        }
        ProfileAction::Import { path, overwrite } => {
            if import_profiles(config, &path, overwrite, formatter)? > 0 {
                config.save()?;
            }
            Ok(())
        }
    }
}

/// List all profiles.
fn list_profiles(config: &Config, formatter: &Formatter) -> Result<()> {
    if config.profiles.is_empty() {
        println!("{}", formatter.info("No profiles configured"));
        return Ok(());
    }

    println!("Available profiles:");
    for (name, profile) in &config.profiles {
        if name == &config.active_profile {
            println!("* {}", formatter.success(name));
        } else {
            println!("  {}", name);
        }
        print_profile(profile, "    ");
    }

    Ok(())
}

/// Show the active profile.
fn show_active_profile(config: &Config, formatter: &Formatter) -> Result<()> {
    let profile = config.get_active_profile()?;
    println!("Active profile: {}", formatter.success(&config.active_profile));
    print_profile(profile, "  ");
    Ok(())
}

fn print_profile(profile: &DbProfile, indent: &str) {
    println!("{}Connect: {}", indent, profile.connect_string());
    if !profile.username.is_empty() {
        println!("{}User: {}", indent, profile.username);
    }
    if let Some(schema) = &profile.schema {
        println!("{}Schema: {}", indent, schema);
    }
    if profile.password.is_some() {
        println!("{}Password: (stored)", indent);
    }
}

/// Switch to a different profile.
fn switch_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<()> {
    config.switch_profile(name.clone())?;
    println!("{}", formatter.success(&format!("Switched to profile '{}'", name)));
    Ok(())
}

/// Create or update a profile.
fn set_profile(config: &mut Config, name: String, profile: DbProfile, formatter: &Formatter) -> Result<()> {
    if profile.hostname.trim().is_empty() {
        return Err(CliError::InvalidInput("host must not be empty".to_string()));
    }

    let action = if config.profiles.contains_key(&name) {
        "Updated"
    } else {
        "Created"
    };
    config.set_profile(name.clone(), profile);
    println!("{}", formatter.success(&format!("{} profile '{}'", action, name)));
    Ok(())
}

/// Delete a profile, returning whether one was removed.
fn delete_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<bool> {
    if name == config.active_profile {
        return Err(CliError::NotPermitted("Cannot delete the active profile".to_string()));
    }

    if config.profiles.remove(&name).is_some() {
        println!("{}", formatter.success(&format!("Deleted profile '{}'", name)));
        Ok(true)
    } else {
        println!("{}", formatter.warning(&format!("Profile '{}' does not exist", name)));
        Ok(false)
    }
}

/// Merge profiles from a legacy JSON file, returning how many were added.
fn import_profiles(config: &mut Config, path: &Path, overwrite: bool, formatter: &Formatter) -> Result<usize> {
    let mut imported = 0;
    for (name, profile) in load_legacy_profiles(path)? {
        if config.profiles.contains_key(&name) && !overwrite {
            println!(
                "{}",
                formatter.warning(&format!("Profile '{}' exists, skipped (use --overwrite)", name))
            );
            continue;
        }
        config.set_profile(name.clone(), profile);
        imported += 1;
        println!("{}", formatter.success(&format!("Imported profile '{}'", name)));
    }
    Ok(imported)
}
