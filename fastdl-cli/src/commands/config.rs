//! Configuration CLI commands.

use clap::Subcommand;
use fastdl::config::ConfigFile;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the default configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
    }
}

fn run_path() -> Result<(), CliError> {
    let path = ConfigFile::default_path()
        .ok_or_else(|| CliError::Config("no configuration directory on this system".into()))?;
    println!("{}", path.display());
    Ok(())
}
