//! Observability events for aeroquery
//!
//! Every event the query layer can emit is listed here.
//! Events are explicit and typed.

use std::fmt;

/// Observable events in the query lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Compilation
    /// Operation chain compiled into a pipeline
    PipelineCompiled,
    /// Operation chain rejected by a translator
    TranslationFailed,

    // Execution
    /// Compiled pipeline handed to the driver
    QueryExecuted,
    /// Driver failed while producing results
    ExecutionFailed,
    /// Result sequence drained
    EnumerationComplete,

    // Entity processors
    /// Entity processor registered on a chain
    ProcessorRegistered,
    /// Entity processor returned an error
    ProcessorFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::PipelineCompiled => "PIPELINE_COMPILED",
            Event::TranslationFailed => "TRANSLATION_FAILED",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::ExecutionFailed => "EXECUTION_FAILED",
            Event::EnumerationComplete => "ENUMERATION_COMPLETE",
            Event::ProcessorRegistered => "PROCESSOR_REGISTERED",
            Event::ProcessorFailed => "PROCESSOR_FAILED",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::TranslationFailed | Event::ExecutionFailed | Event::ProcessorFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
