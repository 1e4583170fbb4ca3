//! Configuration command handlers
//!
//! Handles the `configure` subcommand for creating and inspecting the
//! pobdata config file.

use crate::config::Config;
use anyhow::{bail, Result};
use std::path::Path;

/// Handle the configure command
///
/// # Arguments
/// * `config_path` - Explicit config file, or the default location
/// * `init` - Write the default configuration
/// * `force` - Allow `init` to replace an existing file
/// * `show` - Show the effective configuration
pub fn handle(config_path: Option<&Path>, init: bool, force: bool, show: bool) -> Result<()> {
    let path = Config::resolve_path(config_path)?;

    if init {
        init_config(&path, force)?;
    }

    if show {
        show_config(&path)?;
    } else if !init {
        show_usage();
    }

    Ok(())
}

/// Write the default configuration to `path`
fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists at {} (use --force to replace it)",
            path.display()
        );
    }

    Config::default().save_to(path)?;
    println!("Config saved to: {}", path.display());
    Ok(())
}

/// Display the effective configuration
fn show_config(path: &Path) -> Result<()> {
    let config = Config::load_from(path)?;

    if path.exists() {
        println!("Config file: {}", path.display());
    } else {
        println!("Config file: {} (not found, using defaults)", path.display());
    }
    println!();
    print!("{}", config.to_toml()?);

    Ok(())
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: pobdata configure --init [--force]");
    println!("   or: pobdata configure --show");
    println!();
    println!("Note: --config <path> or POBDATA_CONFIG selects another config file.");
}
