//! Error codes and per-field validation errors
//!
//! Error codes are stable symbolic identifiers. Display text is produced by
//! callers (message catalogs, locales); this crate only emits codes plus an
//! optional inline message declared on the field.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable symbolic error identifier (e.g. `email.invalid`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(Cow<'static, str>);

impl ErrorCode {
    /// Required field has no raw value and no default
    pub const MISSING_REQUIRED: ErrorCode = ErrorCode::from_static("field.missing_required");
    /// Raw text could not be parsed into the declared type
    pub const INVALID_FORMAT: ErrorCode = ErrorCode::from_static("field.invalid_format");
    /// Raw value has the wrong shape for the declared type
    pub const INVALID_TYPE: ErrorCode = ErrorCode::from_static("field.invalid_type");
    /// Raw value matches no member of the declared enum
    pub const INVALID_CHOICE: ErrorCode = ErrorCode::from_static("field.invalid_choice");
    /// Value is empty or whitespace-only
    pub const BLANK: ErrorCode = ErrorCode::from_static("field.blank");

    pub const EMAIL_INVALID: ErrorCode = ErrorCode::from_static("email.invalid");
    pub const PASSWORD_TOO_SHORT: ErrorCode = ErrorCode::from_static("password.too_short");
    pub const PASSWORD_TOO_WEAK: ErrorCode = ErrorCode::from_static("password.too_weak");
    pub const RANGE_TOO_LOW: ErrorCode = ErrorCode::from_static("range.too_low");
    pub const RANGE_TOO_HIGH: ErrorCode = ErrorCode::from_static("range.too_high");
    pub const LENGTH_TOO_SHORT: ErrorCode = ErrorCode::from_static("length.too_short");
    pub const LENGTH_TOO_LONG: ErrorCode = ErrorCode::from_static("length.too_long");
    pub const PATTERN_MISMATCH: ErrorCode = ErrorCode::from_static("pattern.mismatch");
    pub const CHOICE_INVALID: ErrorCode = ErrorCode::from_static("choice.invalid");

    /// Creates a code from a static string.
    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    /// Creates a code from any string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(Cow::Owned(code.into()))
    }

    /// Returns the code string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&'static str> for ErrorCode {
    fn from(code: &'static str) -> Self {
        Self::from_static(code)
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

/// A recoverable, per-field failure.
///
/// Never raised as control flow; collected into a `BindingResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Symbolic code
    pub code: ErrorCode,
    /// Field path (e.g. `address.city`, `tags[2]`)
    pub field: String,
    /// Inline override message declared on the field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            code,
            field: field.into(),
            message: None,
        }
    }

    /// Attaches an inline message.
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': {}", self.field, self.code)?;
        if let Some(ref message) = self.message {
            write!(f, " ({})", message)?;
        }
        Ok(())
    }
}

/// Creates a field path from prefix and field name.
pub(crate) fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else if field.starts_with('[') {
        format!("{}{}", prefix, field)
    } else {
        format!("{}.{}", prefix, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_codes_are_stable() {
        assert_eq!(ErrorCode::MISSING_REQUIRED.as_str(), "field.missing_required");
        assert_eq!(ErrorCode::INVALID_FORMAT.as_str(), "field.invalid_format");
        assert_eq!(ErrorCode::EMAIL_INVALID.as_str(), "email.invalid");
        assert_eq!(ErrorCode::RANGE_TOO_LOW.as_str(), "range.too_low");
    }

    #[test]
    fn test_owned_and_static_codes_compare_equal() {
        assert_eq!(ErrorCode::new("email.invalid"), ErrorCode::EMAIL_INVALID);
    }

    #[test]
    fn test_error_serializes_without_empty_message() {
        let err = ValidationError::new("email", ErrorCode::EMAIL_INVALID);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!({"code": "email.invalid", "field": "email"}));
    }

    #[test]
    fn test_paths() {
        assert_eq!(make_path("", "email"), "email");
        assert_eq!(make_path("address", "city"), "address.city");
        assert_eq!(make_path("tags", "[1]"), "tags[1]");
        assert_eq!(make_path("people[0]", "name"), "people[0].name");
    }

    #[test]
    fn test_display_includes_message() {
        let err = ValidationError::new("age", ErrorCode::RANGE_TOO_LOW)
            .with_message(Some("must be an adult".into()));
        let display = format!("{}", err);
        assert!(display.contains("age"));
        assert!(display.contains("range.too_low"));
        assert!(display.contains("must be an adult"));
    }
}
