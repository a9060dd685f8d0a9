//! Query error types
//!
//! Error codes:
//! - AERO_TRANSLATION_* (compile time, see translation errors)
//! - AERO_EXECUTION_FAILED
//! - AERO_PROCESSOR_FAILED
//! - AERO_MATERIALIZATION_FAILED
//! - AERO_PROCESSOR_CHAIN_SEALED
//!
//! Every error is fatal to the current compile-and-execute cycle.

use thiserror::Error;

use crate::driver::DriverError;
use crate::processor::ProcessorError;
use crate::translation::TranslationError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors surfaced by queries
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The operation chain could not be compiled
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// The driver failed to run the pipeline or produce a result
    #[error(transparent)]
    Execution(#[from] DriverError),

    /// An entity processor failed
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    /// A result document could not be decoded into the entity type
    #[error("Cannot materialize {entity_type}: {reason}")]
    Materialization { entity_type: String, reason: String },

    /// A processor was registered after enumeration started
    #[error("Entity processor chain is sealed: enumeration has already started")]
    ProcessorChainSealed,
}

impl QueryError {
    /// Create a materialization error
    pub fn materialization(entity_type: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::Materialization {
            entity_type: entity_type.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Translation(err) => err.code(),
            QueryError::Execution(err) => err.code(),
            QueryError::Processor(err) => err.code(),
            QueryError::Materialization { .. } => "AERO_MATERIALIZATION_FAILED",
            QueryError::ProcessorChainSealed => "AERO_PROCESSOR_CHAIN_SEALED",
        }
    }

    /// Returns true if the error was raised before anything reached the driver
    pub fn is_compile_time(&self) -> bool {
        matches!(self, QueryError::Translation(_))
    }
}
