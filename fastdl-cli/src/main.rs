//! FastDL CLI - segmented HTTP downloads from the command line.

mod commands;
mod error;
mod logging;
mod progress;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use fastdl::config::ConfigFile;
use tracing::debug;

use commands::config::ConfigCommands;
use commands::get::GetArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "fastdl", version, about = "Segmented, concurrent HTTP(S) downloader")]
struct Cli {
    /// Configuration file (defaults to the per-user config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "fastdl=trace"
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download one or more files
    Get(GetArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;

    let filter = logging::resolve_filter(
        cli.log_level.as_deref(),
        config.logging.level.as_deref(),
    )?;
    let log_file = cli.log_file.or_else(|| config.logging.file.clone());
    // Flushes the file writer on drop.
    let _guard = logging::init(filter, log_file.as_deref())?;
    debug!(version = env!("CARGO_PKG_VERSION"), "fastdl starting");

    match cli.command {
        Commands::Get(args) => commands::get::run(args, &config),
        Commands::Config(command) => commands::config::run(command),
    }
}

/// An explicit `--config` must exist; the default location is optional.
fn load_config(path: Option<&std::path::Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load(path)?),
        None => match ConfigFile::default_path() {
            Some(path) => Ok(ConfigFile::load_or_default(&path)?),
            None => Ok(ConfigFile::default()),
        },
    }
}
