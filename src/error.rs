//! # Error Handling
//!
//! This module defines the centralized error type for the `irr` library. It
//! uses `thiserror` to build a single `Error` enum covering every failure the
//! detection and rewrite engine can report, plus the I/O and serialization
//! errors raised at its edges.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants carry the context needed to explain
//!   the failure (the offending path, glob, strategy name, counters).
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Per-image parse failures are *not* errors at this level. They are reported
//! as [`SkipRecord`](crate::detector::SkipRecord)s and only become fatal when
//! strict mode or the success threshold says so. In those two cases the
//! error carries the partially assembled [`OverrideResult`] so callers can
//! still report what was rewritten.

use thiserror::Error;

use crate::detector::SkipReason;
use crate::generator::OverrideResult;

/// Main error type for irr operations
#[derive(Error, Debug)]
pub enum Error {
    /// The detector configuration is invalid (bad glob, bad path, bad threshold).
    ///
    /// Raised before any traversal happens.
    #[error("Detector configuration error: {message}")]
    DetectorConfig { message: String },

    /// Strict mode is enabled and an image could not be rewritten.
    #[error("Strict mode violation at '{path}': {reason}")]
    StrictModeViolation {
        path: String,
        reason: SkipReason,
        /// Everything generated before the violation was hit
        partial: Box<OverrideResult>,
    },

    /// The share of successfully rewritten images fell below the threshold.
    #[error("Success rate {percentage}% is below the required threshold of {threshold}% ({succeeded}/{processed} images rewritten)")]
    ThresholdExceeded {
        percentage: u8,
        threshold: u8,
        processed: usize,
        succeeded: usize,
        partial: Box<OverrideResult>,
    },

    /// No path strategy is registered under the requested name.
    #[error("Unknown path strategy '{name}' (available: {available})")]
    UnknownStrategy { name: String, available: String },

    /// An error occurred while parsing a registry mapping file.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A value could not be written into the override tree.
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// Every target handed to a multi-target scan failed.
    #[error("All {failed} scan targets failed; first error: {first}")]
    AllTargetsFailed { failed: usize, first: String },

    /// The worker pool for a parallel scan could not be started.
    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The partially generated override carried by policy failures.
    ///
    /// Only [`Error::StrictModeViolation`] and [`Error::ThresholdExceeded`]
    /// carry one.
    pub fn partial_result(&self) -> Option<&OverrideResult> {
        match self {
            Error::StrictModeViolation { partial, .. } => Some(&**partial),
            Error::ThresholdExceeded { partial, .. } => Some(&**partial),
            _ => None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
