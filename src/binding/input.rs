//! Raw input mappings
//!
//! Every source (JSON body, form data, query string) is reduced to a
//! `RawInput` before binding. Source-specific decoding happens upstream.

use serde_json::{Map, Value as Json};
use thiserror::Error;

/// Input adapter failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Top-level JSON value is not an object
    #[error("Expected a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

/// Field name → raw value mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInput {
    values: Map<String, Json>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an input from a JSON document.
    pub fn from_json(value: Json) -> Result<Self, InputError> {
        match value {
            Json::Object(values) => Ok(Self { values }),
            other => Err(InputError::NotAnObject {
                found: json_type_name(&other),
            }),
        }
    }

    /// Builds an input from form-style string pairs.
    ///
    /// A key seen more than once becomes a list, in arrival order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values: Map<String, Json> = Map::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = Json::String(value.into());
            match values.get_mut(&key) {
                None => {
                    values.insert(key, value);
                }
                Some(Json::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Json::Array(vec![first, value]);
                }
            }
        }
        Self { values }
    }

    /// Sets a raw value.
    pub fn insert(&mut self, key: impl Into<String>, value: Json) -> &mut Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Json> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn as_map(&self) -> &Map<String, Json> {
        &self.values
    }
}

impl From<Map<String, Json>> for RawInput {
    fn from(values: Map<String, Json>) -> Self {
        Self { values }
    }
}

impl TryFrom<Json> for RawInput {
    type Error = InputError;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

/// Returns the JSON type name for error messages.
pub(crate) fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
