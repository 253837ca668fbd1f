//! # irr CLI
//!
//! This is the binary entry point for the `irr` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Translating errors into a message on stderr and an exit code from
//!   [`irr::exit_codes`].
//!
//! The core logic lives in the `irr` library crate; the binary is a thin
//! wrapper around it.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use irr::exit_codes;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<irr::error::Error>())
                .map(exit_codes::for_error)
                .unwrap_or(exit_codes::GENERAL_ERROR);
            ExitCode::from(code)
        }
    }
}
