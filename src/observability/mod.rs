//! Observability subsystem for aeroquery
//!
//! Structured logging of the compile and enumeration lifecycle.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Logging never fails a query
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! The minimum severity is process-wide state. It starts at `WARN`, is
//! raised or lowered with [`init`], and returns to the default with [`reset`].
//!
//! ```ignore
//! use aeroquery::observability::{self, Severity};
//!
//! observability::init(Severity::Trace);
//! // ... compile and enumerate queries ...
//! observability::reset();
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Sets the process-wide minimum log severity
pub fn init(min_severity: Severity) {
    Logger::set_min_severity(min_severity);
}

/// Restores the default minimum log severity
pub fn reset() {
    Logger::set_min_severity(logger::DEFAULT_MIN_SEVERITY);
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields.
///
/// Failure events are logged at WARN, everything else at TRACE.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Warn
    } else {
        Severity::Trace
    };
    Logger::log(severity, event.as_str(), fields);
}
