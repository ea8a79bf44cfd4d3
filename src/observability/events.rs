//! Observable binding lifecycle events

use std::fmt;

/// Events emitted by the engine and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Binding configuration loaded
    ConfigLoaded,
    /// Class declarations loaded
    SpecsLoaded,
    /// A class was resolved into a field table
    ClassResolved,
    /// A resolution was served from the cache
    ResolutionCacheHit,
    /// Binding produced an instance
    BindComplete,
    /// Binding produced field errors
    BindRejected,
    /// Validator errors on an optional field were suppressed
    FieldErrorsIgnored,
    /// A declaration or configuration error aborted binding
    ConfigurationRejected,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SpecsLoaded => "SPECS_LOADED",
            Event::ClassResolved => "CLASS_RESOLVED",
            Event::ResolutionCacheHit => "RESOLUTION_CACHE_HIT",
            Event::BindComplete => "BIND_COMPLETE",
            Event::BindRejected => "BIND_REJECTED",
            Event::FieldErrorsIgnored => "FIELD_ERRORS_IGNORED",
            Event::ConfigurationRejected => "CONFIGURATION_REJECTED",
        }
    }

    /// Returns true if this event aborts the operation
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::ConfigurationRejected)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
