//! Coerced values and bound objects
//!
//! A `Value` is what a binder produces from one raw input value. A
//! `BoundObject` is the populated instance: coerced values in field
//! declaration order.

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::schema::{ConfigResult, ConfigurationError};

/// A typed value produced by a binder.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Optional field with no value
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Object(BoundObject),
    /// Untyped passthrough for `any` fields
    Raw(serde_json::Value),
}

impl Value {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Raw(_) => "any",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BoundObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

/// A populated instance of a class.
///
/// Only ever constructed when every field bound and validated cleanly.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundObject {
    class: String,
    fields: Vec<(String, Value)>,
}

impl BoundObject {
    pub(crate) fn new(class: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            class: class.into(),
            fields,
        }
    }

    /// Returns the name of the class this object was bound against.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Returns a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterates fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn field(&self, name: &str, expected: &'static str) -> ConfigResult<&Value> {
        self.get(name)
            .ok_or_else(|| ConfigurationError::target_mismatch(&self.class, name, expected))
    }

    /// Reads a required string field for a typed target.
    pub fn string(&self, name: &str) -> ConfigResult<String> {
        self.field(name, "string")?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ConfigurationError::target_mismatch(&self.class, name, "string"))
    }

    /// Reads an optional string field for a typed target.
    pub fn opt_string(&self, name: &str) -> ConfigResult<Option<String>> {
        match self.field(name, "string")? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            _ => Err(ConfigurationError::target_mismatch(&self.class, name, "string")),
        }
    }

    pub fn int(&self, name: &str) -> ConfigResult<i64> {
        self.field(name, "int")?
            .as_i64()
            .ok_or_else(|| ConfigurationError::target_mismatch(&self.class, name, "int"))
    }

    pub fn opt_int(&self, name: &str) -> ConfigResult<Option<i64>> {
        match self.field(name, "int")? {
            Value::Null => Ok(None),
            Value::Int(i) => Ok(Some(*i)),
            _ => Err(ConfigurationError::target_mismatch(&self.class, name, "int")),
        }
    }

    pub fn float(&self, name: &str) -> ConfigResult<f64> {
        self.field(name, "float")?
            .as_f64()
            .ok_or_else(|| ConfigurationError::target_mismatch(&self.class, name, "float"))
    }

    pub fn bool(&self, name: &str) -> ConfigResult<bool> {
        self.field(name, "bool")?
            .as_bool()
            .ok_or_else(|| ConfigurationError::target_mismatch(&self.class, name, "bool"))
    }

    pub fn date(&self, name: &str) -> ConfigResult<NaiveDate> {
        self.field(name, "date")?
            .as_date()
            .ok_or_else(|| ConfigurationError::target_mismatch(&self.class, name, "date"))
    }

    pub fn opt_date(&self, name: &str) -> ConfigResult<Option<NaiveDate>> {
        match self.field(name, "date")? {
            Value::Null => Ok(None),
            Value::Date(d) => Ok(Some(*d)),
            _ => Err(ConfigurationError::target_mismatch(&self.class, name, "date")),
        }
    }

    pub fn datetime(&self, name: &str) -> ConfigResult<NaiveDateTime> {
        self.field(name, "datetime")?
            .as_datetime()
            .ok_or_else(|| ConfigurationError::target_mismatch(&self.class, name, "datetime"))
    }

    /// Reads a nested object field and converts it.
    pub fn object<T: FromBound>(&self, name: &str) -> ConfigResult<T> {
        let obj = self
            .field(name, "object")?
            .as_object()
            .ok_or_else(|| ConfigurationError::target_mismatch(&self.class, name, "object"))?;
        T::from_bound(obj)
    }
}

impl Serialize for BoundObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Conversion from a bound object into a typed target.
///
/// A mismatch between the declaration and the target type is a
/// programming mistake and surfaces as a `ConfigurationError`.
pub trait FromBound: Sized {
    fn from_bound(obj: &BoundObject) -> ConfigResult<Self>;
}

impl FromBound for BoundObject {
    fn from_bound(obj: &BoundObject) -> ConfigResult<Self> {
        Ok(obj.clone())
    }
}
