//! Observability for the binding engine
//!
//! - Structured logging (JSON lines on stderr)
//! - Lock-free counters
//! - Typed lifecycle events
//!
//! Observability is read-only: nothing here changes a binding result.
//!
//! ```ignore
//! use fieldbind::observability::{log_event_with_fields, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Info);
//! log_event_with_fields(Event::BindComplete, &[("class", "Signup")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{BindingMetrics, MetricsSnapshot};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Error
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
