use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ste_cli::commands::{concurrency, enabled, estimate};
use ste_cli::{Cli, Commands, Config};
use ste_core::Configuration;

/// Load the layered configuration and apply command-line overrides on top.
fn load_configuration(
    config_path: Option<&Path>,
    overrides: impl FnOnce(&mut Configuration),
) -> Result<Configuration> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    let mut estimation = config.estimation;
    overrides(&mut estimation);
    tracing::debug!(?estimation, "loaded configuration");
    Ok(estimation)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    match &cli.command {
        Some(Commands::Estimate {
            input,
            output,
            args,
        }) => {
            let config = load_configuration(cli.config.as_deref(), |config| args.apply(config))?;
            estimate::run(&mut writer, input, output, &config)?;
        }
        Some(Commands::Concurrency {
            input,
            json,
            mining,
        }) => {
            let config =
                load_configuration(cli.config.as_deref(), |config| mining.apply(config))?;
            concurrency::run(&mut writer, input, *json, &config)?;
        }
        Some(Commands::Enabled {
            input,
            output,
            unknown_as_trace_start,
            mining,
        }) => {
            let config =
                load_configuration(cli.config.as_deref(), |config| mining.apply(config))?;
            enabled::run(&mut writer, input, output, *unknown_as_trace_start, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(writer)?;
        }
    }

    Ok(())
}
