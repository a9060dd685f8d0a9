//! Driver error types
//!
//! Error codes:
//! - AERO_EXECUTION_FAILED
//!
//! Driver errors surface while results are pulled and are never retried.

use thiserror::Error;

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors raised by the underlying driver while executing a pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    /// The driver could not run the pipeline or produce the next document
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The pipeline contains a stage the driver cannot evaluate
    #[error("Unsupported stage '{0}'")]
    UnsupportedStage(String),

    /// A stage body or operator argument is malformed
    #[error("Malformed stage '{stage}': {reason}")]
    MalformedStage { stage: String, reason: String },
}

impl DriverError {
    /// Create an execution failed error
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        DriverError::ExecutionFailed(reason.into())
    }

    /// Create a malformed stage error
    pub fn malformed(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        DriverError::MalformedStage {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        "AERO_EXECUTION_FAILED"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            DriverError::execution_failed("socket closed").code(),
            "AERO_EXECUTION_FAILED"
        );
        assert_eq!(
            DriverError::UnsupportedStage("$group".into()).code(),
            "AERO_EXECUTION_FAILED"
        );
    }

    #[test]
    fn test_error_display() {
        let err = DriverError::malformed("$limit", "expected a non-negative integer");
        assert_eq!(
            err.to_string(),
            "Malformed stage '$limit': expected a non-negative integer"
        );
    }
}
