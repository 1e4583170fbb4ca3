//! Item table command handler

use anyhow::{Context, Result};
use pobdata::{ItemsSummary, PipelineConfig};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Apply command-line overrides to the configured item paths
pub fn pipeline_config(
    config: Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> PipelineConfig {
    let mut pipeline = config.pipeline;
    if let Some(input) = input {
        pipeline.items.input = input;
    }
    if let Some(output) = output {
        pipeline.items.output = output;
    }
    pipeline
}

/// Handle the items command
pub fn handle(
    config_path: Option<&Path>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let pipeline = pipeline_config(Config::load(config_path)?, input, output);
    tracing::info!(
        input = %pipeline.items.input.display(),
        output = %pipeline.items.output.display(),
        "normalizing item table"
    );

    let summary = pobdata::run_items(&pipeline).with_context(|| {
        format!(
            "Failed to normalize item table {}",
            pipeline.items.input.display()
        )
    })?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &ItemsSummary) {
    println!("Items:    {}", summary.items);
    println!("Excluded: {}", summary.excluded.len());
    for excluded in &summary.excluded {
        println!("  {} ({})", excluded.id, excluded.item_type);
    }
    if !summary.collisions.is_empty() {
        println!("Id collisions: {}", summary.collisions.len());
        for collision in &summary.collisions {
            println!(
                "  {} kept {}, dropped {}",
                collision.id, collision.kept, collision.dropped
            );
        }
    }
    println!();
    println!("Wrote {} ({} bytes)", summary.artifact.path.display(), summary.artifact.bytes);
    println!("SHA-256: {}", summary.artifact.sha256);
}
