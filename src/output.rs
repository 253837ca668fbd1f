//! # Output Configuration
//!
//! Controls how the CLI decorates its human-readable output: status markers
//! and colored counts. Machine-readable output (the override itself, inspect
//! reports) is never decorated.
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and the `--color` flag.
    ///
    /// `always` and `never` win over the environment; anything else detects.
    /// Status output goes to stderr, so that is the terminal inspected.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stderr().features().colors_supported()
    }

    /// The emoji when decorating, the plain marker otherwise.
    pub fn marker<'a>(&self, emoji: &'a str, plain: &'a str) -> &'a str {
        if self.use_color {
            emoji
        } else {
            plain
        }
    }

    /// A count rendered green when it is the whole, yellow otherwise.
    pub fn ratio(&self, part: usize, whole: usize) -> String {
        let text = format!("{}/{}", part, whole);
        if !self.use_color {
            return text;
        }
        if part == whole {
            style(text).green().force_styling(true).to_string()
        } else {
            style(text).yellow().force_styling(true).to_string()
        }
    }

    /// Text rendered red when decorating.
    pub fn failure(&self, text: &str) -> String {
        if self.use_color {
            style(text).red().bold().force_styling(true).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
