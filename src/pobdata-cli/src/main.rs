mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pobdata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Items { input, output } => {
            commands::items::handle(config_path, input, output)?;
        }

        Commands::Uniques { input, output } => {
            commands::uniques::handle(config_path, input, output)?;
        }

        Commands::Stat { table, id, args } => {
            commands::stat::handle(config_path, table, &id, &args)?;
        }

        Commands::Configure { init, force, show } => {
            commands::configure::handle(config_path, init, force, show)?;
        }
    }

    Ok(())
}
