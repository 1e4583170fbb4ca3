//! Stat translation command handler

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Render one stat and print the text
pub fn handle(
    config_path: Option<&Path>,
    table: Option<PathBuf>,
    id: &str,
    args: &[i64],
) -> Result<()> {
    let text = render(config_path, table, id, args)?;
    println!("{}", text);
    Ok(())
}

fn render(
    config_path: Option<&Path>,
    table: Option<PathBuf>,
    id: &str,
    args: &[i64],
) -> Result<String> {
    let table = match table {
        Some(table) => table,
        None => Config::load(config_path)?.stat_table.context(
            "No stat table configured. Pass --table or set stat_table in the config file",
        )?,
    };
    tracing::debug!(table = %table.display(), id, "resolving stat");

    pobdata::resolve_stat(&table, id, args)
        .with_context(|| format!("Failed to render {} with {:?}", id, args))
}
