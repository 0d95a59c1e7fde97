//! Result and error types for Todoprobe.

use thiserror::Error;

/// Result type for Todoprobe operations
pub type ConformanceResult<T> = Result<T, ConformanceError>;

/// Errors that can occur in Todoprobe
#[derive(Debug, Error)]
pub enum ConformanceError {
    /// An action referenced an item that does not exist
    #[error("Index {index} out of range for a list of {len} visible items")]
    IndexOutOfRange {
        /// Index requested by the action
        index: usize,
        /// Number of visible items at the time
        len: usize,
    },

    /// Observed state kept changing past the stabilization timeout
    #[error("State did not stabilize within {ms}ms")]
    StabilizationTimeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Observed state settled on something other than the expectation
    #[error("Assertion mismatch on {field}: expected {expected}, observed {observed}")]
    AssertionMismatch {
        /// Projection field that differed
        field: String,
        /// Expected value
        expected: String,
        /// Observed value
        observed: String,
    },

    /// The harness adapter's underlying driver call failed
    #[error("Driver error: {message}")]
    DriverError {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Scenario definition is invalid
    #[error("Invalid scenario: {message}")]
    Scenario {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ConformanceError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::DriverError {
            message: message.into(),
        }
    }

    /// Create a scenario error
    #[must_use]
    pub fn scenario(message: impl Into<String>) -> Self {
        Self::Scenario {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_out_of_range_display() {
        let err = ConformanceError::IndexOutOfRange { index: 4, len: 3 };
        assert_eq!(
            err.to_string(),
            "Index 4 out of range for a list of 3 visible items"
        );
    }

    #[test]
    fn test_driver_error_helper() {
        let err = ConformanceError::driver("element not found: .new-todo");
        assert!(err.to_string().starts_with("Driver error"));
        assert!(err.to_string().contains(".new-todo"));
    }

    #[test]
    fn test_json_error_from() {
        let json_err = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        let err: ConformanceError = json_err.into();
        assert!(matches!(err, ConformanceError::Json(_)));
    }
}
