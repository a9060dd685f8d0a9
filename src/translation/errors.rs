//! Translation error types
//!
//! Error codes:
//! - AERO_TRANSLATION_UNSUPPORTED_EXPRESSION
//! - AERO_TRANSLATION_UNKNOWN_FIELD
//! - AERO_TRANSLATION_INVALID_ARGUMENT
//!
//! All translation errors are raised at compile time, before anything is
//! sent to the driver.

use thiserror::Error;

/// Result type for translation operations
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Errors raised while lowering an operation chain into a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// Expression shape outside the supported grammar
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Member access that the field mapping cannot resolve
    #[error("Unknown field '{member}' on '{owner}'")]
    UnknownField { owner: String, member: String },

    /// Skip/take count that is not a non-negative integer constant
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl TranslationError {
    /// Create an unsupported expression error
    pub fn unsupported(construct: impl Into<String>) -> Self {
        TranslationError::UnsupportedExpression(construct.into())
    }

    /// Create an unknown field error
    pub fn unknown_field(owner: impl Into<String>, member: impl Into<String>) -> Self {
        TranslationError::UnknownField {
            owner: owner.into(),
            member: member.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        TranslationError::InvalidArgument(reason.into())
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TranslationError::UnsupportedExpression(_) => "AERO_TRANSLATION_UNSUPPORTED_EXPRESSION",
            TranslationError::UnknownField { .. } => "AERO_TRANSLATION_UNKNOWN_FIELD",
            TranslationError::InvalidArgument(_) => "AERO_TRANSLATION_INVALID_ARGUMENT",
        }
    }
}
