//! Unique item command handler

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Handle the uniques command
pub fn handle(
    config_path: Option<&Path>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut pipeline = Config::load(config_path)?.pipeline;
    if let Some(input) = input {
        pipeline.uniques.input = input;
    }
    if let Some(output) = output {
        pipeline.uniques.output = output;
    }
    tracing::info!(
        input = %pipeline.uniques.input.display(),
        output = %pipeline.uniques.output.display(),
        "reconciling unique variants"
    );

    let summary = pobdata::run_uniques(&pipeline).with_context(|| {
        format!(
            "Failed to reconcile uniques from {}",
            pipeline.uniques.input.display()
        )
    })?;

    println!("Families: {}", summary.families);
    println!("Records:  {}", summary.records);
    println!();
    println!("Wrote {} ({} bytes)", summary.artifact.path.display(), summary.artifact.bytes);
    println!("SHA-256: {}", summary.artifact.sha256);
    Ok(())
}
