//! arnav CLI - Command-line interface
//!
//! Geodesy helper, headless scenario replay and configuration management for
//! the arnav library.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use arnav::config::ConfigFile;
use arnav::logging::init_logging;

use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "arnav", version, about = "AR walking navigation toolkit")]
struct Cli {
    /// Log filter (overrides logging.level from the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Distance, bearing and local offset between two coordinates
    Geo(commands::geo::GeoArgs),

    /// Replay a recorded scenario through the full navigation stack
    Simulate(commands::simulate::SimulateArgs),

    /// View and modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Config(command) => commands::config::run(command),
        Commands::Geo(args) => commands::geo::run(&args),
        Commands::Simulate(args) => {
            let mut config = ConfigFile::load()?;
            if let Some(level) = cli.log_level {
                config.logging.level = level;
            }
            let _guard = init_logging(&config.logging)?;
            commands::simulate::run(&args, &config)
        }
    }
}
