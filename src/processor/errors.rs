//! Processor error types
//!
//! Error codes:
//! - AERO_PROCESSOR_FAILED
//!
//! A processor error aborts the enumeration it was raised in.

use thiserror::Error;

/// Result type for entity processors
pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Error returned by an entity processor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Processor '{processor}' failed: {reason}")]
pub struct ProcessorError {
    processor: String,
    reason: String,
}

impl ProcessorError {
    /// Create a processor failure
    pub fn failed(processor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            reason: reason.into(),
        }
    }

    /// Name of the failing processor
    pub fn processor(&self) -> &str {
        &self.processor
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        "AERO_PROCESSOR_FAILED"
    }
}
