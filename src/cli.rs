//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// irr - Relocate the container images of Helm charts to another registry
#[derive(Parser, Debug)]
#[command(name = "irr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        env = "IRR_LOG_LEVEL"
    )]
    log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a values override that points every image at a target registry
    #[command(name = "override")]
    Override(commands::overrides::OverrideArgs),

    /// List the images found in values files without rewriting them
    Inspect(commands::inspect::InspectArgs),

    /// Scan several values files in parallel and report the registries they use
    Scan(commands::scan::ScanArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // RUST_LOG, when set, refines the level given on the command line.
        let _ = env_logger::Builder::new()
            .filter_level(self.log_level)
            .parse_default_env()
            .format_timestamp(None)
            .try_init();

        match self.command {
            Commands::Override(args) => commands::overrides::execute(args, &self.color),
            Commands::Inspect(args) => commands::inspect::execute(args, &self.color),
            Commands::Scan(args) => commands::scan::execute(args, &self.color),
        }
    }
}
