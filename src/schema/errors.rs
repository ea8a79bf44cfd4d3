//! Configuration errors
//!
//! Error codes:
//! - BIND_CONFIG_UNKNOWN_VALIDATOR
//! - BIND_CONFIG_DUPLICATE_VALIDATOR
//! - BIND_CONFIG_INVALID_FORMAT
//! - BIND_CONFIG_INVALID_OPTION
//! - BIND_CONFIG_INVALID_DEFAULT
//! - BIND_CONFIG_INVALID_PATTERN
//! - BIND_CONFIG_INVALID_TYPE
//! - BIND_CONFIG_DUPLICATE_FIELD
//! - BIND_CONFIG_INHERITANCE_CYCLE
//! - BIND_CONFIG_UNKNOWN_CLASS
//! - BIND_CONFIG_DUPLICATE_CLASS
//! - BIND_CONFIG_MALFORMED_DECLARATION
//! - BIND_CONFIG_TARGET_MISMATCH
//!
//! A configuration error is a declaration mistake, never bad input. It
//! aborts the whole binding call and is never aggregated with field errors.

use thiserror::Error;

/// Result type for declaration and resolution operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Fatal declaration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Validator symbol not present in the registry
    #[error("Validator symbol '{symbol}' is not registered")]
    UnknownValidator { symbol: String },

    /// Validator symbol registered twice
    #[error("Validator symbol '{symbol}' is already registered")]
    DuplicateValidator { symbol: String },

    /// Date/datetime format string cannot be parsed
    #[error("Field '{class}.{field}': invalid format '{format}'")]
    InvalidFormat {
        class: String,
        field: String,
        format: String,
    },

    /// Binder option has the wrong type or an unknown value
    #[error("Field '{class}.{field}': invalid binder option '{option}': {reason}")]
    InvalidOption {
        class: String,
        field: String,
        option: String,
        reason: String,
    },

    /// Declared default does not bind to the declared type
    #[error("Field '{class}.{field}': invalid default: {reason}")]
    InvalidDefault {
        class: String,
        field: String,
        reason: String,
    },

    /// Regular expression in a pattern validator does not compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Composite type declared with no alternatives, slots or members
    #[error("Field '{class}.{field}': invalid type: {reason}")]
    InvalidType {
        class: String,
        field: String,
        reason: String,
    },

    /// Same field declared twice within one class
    #[error("Class '{class}' declares field '{field}' more than once")]
    DuplicateField { class: String, field: String },

    /// Class inherits (directly or through nesting) from itself
    #[error("Class '{class}' participates in a reference cycle")]
    InheritanceCycle { class: String },

    /// Parent or nested class name not declared
    #[error("Class '{name}' is not declared")]
    UnknownClass { name: String },

    /// Two declarations share a class name
    #[error("Class '{name}' is declared more than once")]
    DuplicateClass { name: String },

    /// Declaration file unreadable or not valid JSON
    #[error("Malformed declaration '{path}': {reason}")]
    MalformedDeclaration { path: String, reason: String },

    /// Bound object does not fit the requested target type
    #[error("Target '{class}' expects field '{field}' of type {expected}")]
    TargetMismatch {
        class: String,
        field: String,
        expected: String,
    },
}

impl ConfigurationError {
    pub fn unknown_validator(symbol: impl Into<String>) -> Self {
        Self::UnknownValidator {
            symbol: symbol.into(),
        }
    }

    pub fn duplicate_validator(symbol: impl Into<String>) -> Self {
        Self::DuplicateValidator {
            symbol: symbol.into(),
        }
    }

    pub fn invalid_format(
        class: impl Into<String>,
        field: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self::InvalidFormat {
            class: class.into(),
            field: field.into(),
            format: format.into(),
        }
    }

    pub fn invalid_option(
        class: impl Into<String>,
        field: impl Into<String>,
        option: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            class: class.into(),
            field: field.into(),
            option: option.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_default(
        class: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidDefault {
            class: class.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_type(
        class: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            class: class.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate_field(class: impl Into<String>, field: impl Into<String>) -> Self {
        Self::DuplicateField {
            class: class.into(),
            field: field.into(),
        }
    }

    pub fn inheritance_cycle(class: impl Into<String>) -> Self {
        Self::InheritanceCycle {
            class: class.into(),
        }
    }

    pub fn unknown_class(name: impl Into<String>) -> Self {
        Self::UnknownClass { name: name.into() }
    }

    pub fn duplicate_class(name: impl Into<String>) -> Self {
        Self::DuplicateClass { name: name.into() }
    }

    pub fn malformed_declaration(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDeclaration {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn target_mismatch(
        class: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::TargetMismatch {
            class: class.into(),
            field: field.into(),
            expected: expected.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownValidator { .. } => "BIND_CONFIG_UNKNOWN_VALIDATOR",
            Self::DuplicateValidator { .. } => "BIND_CONFIG_DUPLICATE_VALIDATOR",
            Self::InvalidFormat { .. } => "BIND_CONFIG_INVALID_FORMAT",
            Self::InvalidOption { .. } => "BIND_CONFIG_INVALID_OPTION",
            Self::InvalidDefault { .. } => "BIND_CONFIG_INVALID_DEFAULT",
            Self::InvalidPattern { .. } => "BIND_CONFIG_INVALID_PATTERN",
            Self::InvalidType { .. } => "BIND_CONFIG_INVALID_TYPE",
            Self::DuplicateField { .. } => "BIND_CONFIG_DUPLICATE_FIELD",
            Self::InheritanceCycle { .. } => "BIND_CONFIG_INHERITANCE_CYCLE",
            Self::UnknownClass { .. } => "BIND_CONFIG_UNKNOWN_CLASS",
            Self::DuplicateClass { .. } => "BIND_CONFIG_DUPLICATE_CLASS",
            Self::MalformedDeclaration { .. } => "BIND_CONFIG_MALFORMED_DECLARATION",
            Self::TargetMismatch { .. } => "BIND_CONFIG_TARGET_MISMATCH",
        }
    }

    /// Configuration errors always abort the binding call
    pub fn is_fatal(&self) -> bool {
        true
    }
}
