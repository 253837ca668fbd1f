//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `irr`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the global
//!   `--color` flag and performs the command's logic by calling into the
//!   `irr` library.
//!
//! Machine-readable results go to stdout (or the requested file); progress
//! and summaries go to stderr.

pub mod inspect;
pub mod overrides;
pub mod scan;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Write `content` to `path`, or to stdout when no path is given.
pub(crate) fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}
