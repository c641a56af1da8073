//! scancache - cached vulnerability scans for local images
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use scancache::cli::args::{ConfigAction, ConfigArgs};
use scancache::cli::{Cli, Commands};
use scancache::config::{Config, ConfigManager};
use scancache::error::ScanCacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ScanCacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Init must work even when the existing file no longer parses
    let config = match cli.command {
        Commands::Config(ConfigArgs {
            action: Some(ConfigAction::Init { .. }),
        }) => Config::default(),
        _ => config_manager.load().await?,
    };

    // Logging: 0 = info, 1 = debug, 2+ = trace; RUST_LOG wins when set
    let verbosity = if config.general.verbose {
        cli.verbose.max(1)
    } else {
        cli.verbose
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbosity {
        0 => EnvFilter::new("scancache=info"),
        1 => EnvFilter::new("scancache=debug"),
        _ => EnvFilter::new("scancache=trace"),
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    debug!("Using config file {}", config_manager.path().display());

    match cli.command {
        Commands::Serve(args) => scancache::cli::commands::serve(args, &config).await,
        Commands::Config(args) => {
            scancache::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
