//! Validators
//!
//! A validator is any value implementing [`Validator`]: one pure check over
//! one coerced value. Built-ins carry their configuration from construction
//! and are reusable across fields and classes.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::errors::ErrorCode;
use crate::binding::Value;
use crate::schema::{ConfigResult, ConfigurationError};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex")
});

/// Result of evaluating one validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail(ErrorCode),
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }

    fn check(ok: bool, code: ErrorCode) -> Self {
        if ok {
            Outcome::Pass
        } else {
            Outcome::Fail(code)
        }
    }
}

/// A stateless predicate over a coerced value.
pub trait Validator: Send + Sync {
    /// Key used for per-field error code and message overrides
    fn name(&self) -> &str;

    fn evaluate(&self, value: &Value) -> Outcome;
}

impl fmt::Debug for dyn Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator({})", self.name())
    }
}

/// Syntactic e-mail check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl Validator for Email {
    fn name(&self) -> &str {
        "email"
    }

    fn evaluate(&self, value: &Value) -> Outcome {
        match value.as_str() {
            Some(s) => Outcome::check(EMAIL_RE.is_match(s), ErrorCode::EMAIL_INVALID),
            None => Outcome::Fail(ErrorCode::INVALID_TYPE),
        }
    }
}

/// Minimum length plus at least one letter and one digit.
#[derive(Debug, Clone, Copy)]
pub struct Password {
    pub min_length: usize,
}

impl Default for Password {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl Password {
    pub fn with_min_length(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl Validator for Password {
    fn name(&self) -> &str {
        "password"
    }

    fn evaluate(&self, value: &Value) -> Outcome {
        let Some(s) = value.as_str() else {
            return Outcome::Fail(ErrorCode::INVALID_TYPE);
        };
        if s.chars().count() < self.min_length {
            return Outcome::Fail(ErrorCode::PASSWORD_TOO_SHORT);
        }
        let has_letter = s.chars().any(char::is_alphabetic);
        let has_digit = s.chars().any(|c| c.is_ascii_digit());
        Outcome::check(has_letter && has_digit, ErrorCode::PASSWORD_TOO_WEAK)
    }
}

/// Numeric bounds. Any combination of bounds may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Range {
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
}

impl Range {
    /// Strictly greater than `bound`
    pub fn gt(bound: f64) -> Self {
        Self {
            gt: Some(bound),
            ..Self::default()
        }
    }

    /// Greater than or equal to `bound`
    pub fn ge(bound: f64) -> Self {
        Self {
            ge: Some(bound),
            ..Self::default()
        }
    }

    /// Inclusive on both ends
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            ge: Some(min),
            le: Some(max),
            ..Self::default()
        }
    }

    pub fn and_lt(mut self, bound: f64) -> Self {
        self.lt = Some(bound);
        self
    }

    pub fn and_le(mut self, bound: f64) -> Self {
        self.le = Some(bound);
        self
    }
}

impl Validator for Range {
    fn name(&self) -> &str {
        "range"
    }

    fn evaluate(&self, value: &Value) -> Outcome {
        let Some(n) = value.as_f64() else {
            return Outcome::Fail(ErrorCode::INVALID_TYPE);
        };
        let too_low = self.gt.is_some_and(|b| n <= b) || self.ge.is_some_and(|b| n < b);
        if too_low {
            return Outcome::Fail(ErrorCode::RANGE_TOO_LOW);
        }
        let too_high = self.lt.is_some_and(|b| n >= b) || self.le.is_some_and(|b| n > b);
        Outcome::check(!too_high, ErrorCode::RANGE_TOO_HIGH)
    }
}

/// Length bounds for strings (in characters) and lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Length {
    pub fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self { min, max }
    }
}

impl Validator for Length {
    fn name(&self) -> &str {
        "length"
    }

    fn evaluate(&self, value: &Value) -> Outcome {
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::List(items) => items.len(),
            _ => return Outcome::Fail(ErrorCode::INVALID_TYPE),
        };
        if self.min.is_some_and(|min| len < min) {
            return Outcome::Fail(ErrorCode::LENGTH_TOO_SHORT);
        }
        Outcome::check(
            !self.max.is_some_and(|max| len > max),
            ErrorCode::LENGTH_TOO_LONG,
        )
    }
}

/// Regular-expression match over string values.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compiles the pattern; a bad expression is a declaration mistake.
    pub fn new(pattern: &str) -> ConfigResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| ConfigurationError::invalid_pattern(pattern, e.to_string()))?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl Validator for Pattern {
    fn name(&self) -> &str {
        "pattern"
    }

    fn evaluate(&self, value: &Value) -> Outcome {
        match value.as_str() {
            Some(s) => Outcome::check(self.regex.is_match(s), ErrorCode::PATTERN_MISMATCH),
            None => Outcome::Fail(ErrorCode::INVALID_TYPE),
        }
    }
}

/// Rejects empty or whitespace-only strings and empty lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotBlank;

impl Validator for NotBlank {
    fn name(&self) -> &str {
        "not_blank"
    }

    fn evaluate(&self, value: &Value) -> Outcome {
        let blank = match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        };
        Outcome::check(!blank, ErrorCode::BLANK)
    }
}

/// Value must equal one of a fixed set of choices.
#[derive(Debug, Clone, PartialEq)]
pub struct OneOf {
    choices: Vec<Value>,
}

impl OneOf {
    pub fn new(choices: Vec<Value>) -> Self {
        Self { choices }
    }

    pub fn strings<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            choices
                .into_iter()
                .map(|s| Value::String(s.into()))
                .collect(),
        )
    }
}

impl Validator for OneOf {
    fn name(&self) -> &str {
        "one_of"
    }

    fn evaluate(&self, value: &Value) -> Outcome {
        Outcome::check(self.choices.contains(value), ErrorCode::CHOICE_INVALID)
    }
}

type Predicate = dyn Fn(&Value) -> bool + Send + Sync;

/// Closure-backed validator with a fixed name and failure code.
pub struct FnValidator {
    name: String,
    code: ErrorCode,
    predicate: Box<Predicate>,
}

impl Validator for FnValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, value: &Value) -> Outcome {
        Outcome::check((self.predicate)(value), self.code.clone())
    }
}

/// Builds a validator from a predicate.
pub fn validator_fn<F>(
    name: impl Into<String>,
    code: impl Into<ErrorCode>,
    predicate: F,
) -> FnValidator
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    FnValidator {
        name: name.into(),
        code: code.into(),
        predicate: Box::new(predicate),
    }
}

/// Inline built-in validator as written in a class declaration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum BuiltinDecl {
    Email,
    Password {
        #[serde(default = "default_password_length")]
        min_length: usize,
    },
    Range {
        #[serde(default)]
        gt: Option<f64>,
        #[serde(default)]
        ge: Option<f64>,
        #[serde(default)]
        lt: Option<f64>,
        #[serde(default)]
        le: Option<f64>,
    },
    Length {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    Pattern {
        regex: String,
    },
    NotBlank,
    OneOf {
        choices: Vec<serde_json::Value>,
    },
}

fn default_password_length() -> usize {
    Password::default().min_length
}

impl BuiltinDecl {
    /// Instantiates the declared validator.
    pub fn build(&self) -> ConfigResult<Arc<dyn Validator>> {
        let validator: Arc<dyn Validator> = match self {
            BuiltinDecl::Email => Arc::new(Email),
            BuiltinDecl::Password { min_length } => {
                Arc::new(Password::with_min_length(*min_length))
            }
            BuiltinDecl::Range { gt, ge, lt, le } => Arc::new(Range {
                gt: *gt,
                ge: *ge,
                lt: *lt,
                le: *le,
            }),
            BuiltinDecl::Length { min, max } => Arc::new(Length::new(*min, *max)),
            BuiltinDecl::Pattern { regex } => Arc::new(Pattern::new(regex)?),
            BuiltinDecl::NotBlank => Arc::new(NotBlank),
            BuiltinDecl::OneOf { choices } => {
                Arc::new(OneOf::new(choices.iter().map(choice_value).collect()))
            }
        };
        Ok(validator)
    }
}

/// Maps a declared JSON choice onto the coerced value it must equal.
fn choice_value(raw: &serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        other => Value::Raw(other.clone()),
    }
}
