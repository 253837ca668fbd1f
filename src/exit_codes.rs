//! Process exit codes
//!
//! | Code | Meaning                                     |
//! |------|---------------------------------------------|
//! | 0    | Success                                     |
//! | 1    | General error                               |
//! | 2    | Invalid configuration or command-line usage |
//! | 3    | Unknown path strategy                       |
//! | 4    | Input file not found                        |
//! | 10   | Values or mapping file could not be parsed  |
//! | 12   | Strict mode violation                       |
//! | 13   | Success threshold not met                   |
//! | 21   | Other I/O error                             |

use std::io::ErrorKind;

use crate::error::Error;

pub const SUCCESS: u8 = 0;
pub const GENERAL_ERROR: u8 = 1;
pub const INPUT_CONFIGURATION: u8 = 2;
pub const INVALID_STRATEGY: u8 = 3;
pub const INPUT_NOT_FOUND: u8 = 4;
pub const PARSE_ERROR: u8 = 10;
pub const STRICT_MODE_VIOLATION: u8 = 12;
pub const THRESHOLD_NOT_MET: u8 = 13;
pub const IO_ERROR: u8 = 21;

/// The exit code for a library error.
pub fn for_error(err: &Error) -> u8 {
    match err {
        Error::DetectorConfig { .. } | Error::ConfigParse { .. } => INPUT_CONFIGURATION,
        Error::UnknownStrategy { .. } => INVALID_STRATEGY,
        Error::StrictModeViolation { .. } => STRICT_MODE_VIOLATION,
        Error::ThresholdExceeded { .. } => THRESHOLD_NOT_MET,
        Error::Yaml(_) | Error::Json(_) => PARSE_ERROR,
        Error::Io(io) if io.kind() == ErrorKind::NotFound => INPUT_NOT_FOUND,
        Error::Io(_) => IO_ERROR,
        Error::Path { .. } | Error::AllTargetsFailed { .. } | Error::WorkerPool { .. } => {
            GENERAL_ERROR
        }
    }
}
