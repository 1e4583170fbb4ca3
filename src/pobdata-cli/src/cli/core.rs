//! Core CLI definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pobdata")]
#[command(about = "Build canonical item and unique tables from raw game data", long_about = None)]
pub struct Cli {
    /// Config file (defaults to <config dir>/pobdata/config.toml)
    #[arg(long, global = true, env = "POBDATA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize the item-base table into the canonical item artifact
    #[command(visible_alias = "i")]
    Items {
        /// Raw item-base JSON (overrides the configured input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Artifact path (overrides the configured output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile unique item text into the canonical unique artifact
    #[command(visible_alias = "u")]
    Uniques {
        /// Directory of <family>.txt files, or a JSON file of family -> blocks
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Artifact path (overrides the configured output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a stat through the translation table
    #[command(visible_alias = "s")]
    Stat {
        /// Stat translation table (uses configured table if not provided)
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Stat identifier (e.g. "base_maximum_life")
        id: String,

        /// Stat values
        #[arg(allow_negative_numbers = true)]
        args: Vec<i64>,
    },

    /// Create or show the configuration file
    #[command(visible_alias = "c")]
    Configure {
        /// Write a config file with the default tables
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,

        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
}
