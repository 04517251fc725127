//! Unified error handling for the run-efforts library.
//!
//! Absent efforts are not errors: a target the activity never reached is an
//! `EffortResult` without a window. The variants here cover caller mistakes
//! (unknown targets, bad parameters) and unusable input.

use thiserror::Error;

/// Unified error type for run-efforts operations.
#[derive(Debug, Error)]
pub enum EffortError {
    /// Series has too few samples for processing
    #[error("series has {count} samples, minimum {minimum} required")]
    InsufficientSamples { count: usize, minimum: usize },

    /// Elapsed time does not strictly increase
    #[error("elapsed time is not strictly increasing at sample {index} ({previous}s -> {current}s)")]
    NonIncreasingTime {
        index: usize,
        previous: f64,
        current: f64,
    },

    /// Named effort is not part of the configured target set
    #[error("unknown effort target '{0}'")]
    UnknownTarget(String),

    /// Effort exists in the target set but the activity never reached it
    #[error("effort '{0}' was not achieved in this activity")]
    EffortUnavailable(String),

    /// Invalid argument passed to an operation
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Decoder collaborator failed on a file
    #[error("failed to decode '{path}': {message}")]
    Decode { path: String, message: String },

    /// Filesystem error while listing or reading
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for EffortError {
    fn from(err: serde_json::Error) -> Self {
        EffortError::Config(err.to_string())
    }
}

/// Result type alias for run-efforts operations.
pub type Result<T> = std::result::Result<T, EffortError>;

/// Extension trait for converting Option to EffortError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an effort-unavailable error.
    fn ok_or_unavailable(self, target_name: &str) -> Result<T>;

    /// Convert Option to Result with an unknown-target error.
    fn ok_or_unknown_target(self, target_name: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unavailable(self, target_name: &str) -> Result<T> {
        self.ok_or_else(|| EffortError::EffortUnavailable(target_name.to_string()))
    }

    fn ok_or_unknown_target(self, target_name: &str) -> Result<T> {
        self.ok_or_else(|| EffortError::UnknownTarget(target_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EffortError::InsufficientSamples {
            count: 1,
            minimum: 2,
        };
        assert!(err.to_string().contains("1 samples"));

        let err = EffortError::UnknownTarget("3km".to_string());
        assert_eq!(err.to_string(), "unknown effort target '3km'");
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_unavailable("5km"),
            Err(EffortError::EffortUnavailable(name)) if name == "5km"
        ));
        assert!(matches!(
            none.ok_or_unknown_target("5km"),
            Err(EffortError::UnknownTarget(_))
        ));
        assert_eq!(Some(3).ok_or_unavailable("5km").unwrap(), 3);
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let err: EffortError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, EffortError::Config(_)));
    }
}
