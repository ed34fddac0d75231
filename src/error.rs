//! Unified error handling for the coachco2 library.
//!
//! Almost every operation in this crate is total: malformed modes degrade to
//! `UNKNOWN`, missing numbers read as zero and incomplete query parameters
//! produce a disabled descriptor. The variants below cover the few places
//! where failing loudly is the only correct answer.

use thiserror::Error;

/// Unified error type for coachco2 operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoachError {
    /// A goal helper was used without its feature-flag configuration
    #[error("Flag \"{flag}\" must be used: missing or empty `{field}`")]
    MissingConfiguration { flag: String, field: String },

    /// A document could not be parsed into the expected shape
    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },

    /// A date string could not be parsed as RFC 3339
    #[error("Invalid date '{value}'")]
    InvalidDate { value: String },
}

impl From<serde_json::Error> for CoachError {
    fn from(e: serde_json::Error) -> Self {
        CoachError::InvalidDocument {
            message: e.to_string(),
        }
    }
}

/// Result type alias for coachco2 operations.
pub type Result<T> = std::result::Result<T, CoachError>;

/// Extension trait for converting Option to CoachError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a missing configuration error.
    fn ok_or_missing_config(self, flag: &str, field: &str) -> Result<T>;

    /// Convert Option to Result with an invalid date error.
    fn ok_or_invalid_date(self, value: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing_config(self, flag: &str, field: &str) -> Result<T> {
        self.ok_or_else(|| CoachError::MissingConfiguration {
            flag: flag.to_string(),
            field: field.to_string(),
        })
    }

    fn ok_or_invalid_date(self, value: &str) -> Result<T> {
        self.ok_or_else(|| CoachError::InvalidDate {
            value: value.to_string(),
        })
    }
}
