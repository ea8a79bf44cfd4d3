//! Binder: raw value → coerced value
//!
//! Raw states are kept distinct:
//! - absent: key not present (JSON `null` counts as absent)
//! - empty: present, zero-length string
//! - blank: present, whitespace-only string
//! - present: anything else
//!
//! Empty and blank are ordinary present values unless the field collapses
//! them to absent. A coercion failure skips the field's validators.
//!
//! Inside lists and tuples a missing or `null` element is absent: it binds
//! to null in a `nullable` slot and is `field.missing_required` otherwise.
//! Element errors carry index paths (`point[1]`).

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value as Json};

use super::value::{BoundObject, Value};
use crate::schema::{
    ClassSpec, ResolvedField, TypeTag, KEY_CHOICE, KEY_FORMAT, KEY_REQUIRED, KEY_TYPE,
};
use crate::validation::{make_path, ErrorCode, ValidationError};

/// Classified raw input for one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawState<'a> {
    Absent,
    Empty,
    Blank(&'a str),
    Present(&'a Json),
}

impl<'a> RawState<'a> {
    pub fn classify(raw: Option<&'a Json>) -> Self {
        match raw {
            None | Some(Json::Null) => RawState::Absent,
            Some(Json::String(s)) if s.is_empty() => RawState::Empty,
            Some(Json::String(s)) if s.trim().is_empty() => RawState::Blank(s),
            Some(value) => RawState::Present(value),
        }
    }
}

/// Why a raw value could not be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindErrorKind {
    MissingRequired,
    InvalidFormat,
    InvalidType,
    InvalidChoice,
}

impl BindErrorKind {
    /// Default error code
    pub fn code(&self) -> ErrorCode {
        match self {
            BindErrorKind::MissingRequired => ErrorCode::MISSING_REQUIRED,
            BindErrorKind::InvalidFormat => ErrorCode::INVALID_FORMAT,
            BindErrorKind::InvalidType => ErrorCode::INVALID_TYPE,
            BindErrorKind::InvalidChoice => ErrorCode::INVALID_CHOICE,
        }
    }

    /// Override key in a field's `error_codes`
    pub fn key(&self) -> &'static str {
        match self {
            BindErrorKind::MissingRequired => KEY_REQUIRED,
            BindErrorKind::InvalidFormat => KEY_FORMAT,
            BindErrorKind::InvalidType => KEY_TYPE,
            BindErrorKind::InvalidChoice => KEY_CHOICE,
        }
    }
}

/// Result of binding one field
#[derive(Debug, Clone, PartialEq)]
pub enum BindOutcome {
    /// Coerced from a present raw value; validators run
    Bound(Value),
    /// Absent and allowed to be; validators run only if requested
    Defaulted(Value),
    /// Binding failed; errors carry full paths
    Failed(Vec<ValidationError>),
}

/// Binds nested mappings against another class.
///
/// Implemented by the binding session, which owns resolution state.
pub trait NestedBinder {
    fn bind_nested(
        &self,
        class: &ClassSpec,
        raw: &Map<String, Json>,
        path: &str,
    ) -> Result<BoundObject, Vec<ValidationError>>;
}

/// Binds raw values for resolved fields.
pub struct Binder<'a> {
    nested: &'a dyn NestedBinder,
}

impl<'a> Binder<'a> {
    pub fn new(nested: &'a dyn NestedBinder) -> Self {
        Self { nested }
    }

    /// Binds the raw value of one field.
    pub fn bind(&self, raw: Option<&Json>, field: &ResolvedField, path: &str) -> BindOutcome {
        let raw = match (RawState::classify(raw), raw) {
            (RawState::Empty | RawState::Blank(_), Some(raw)) if !field.collapse_blank() => raw,
            (RawState::Present(raw), _) => raw,
            _ => {
                return if field.is_optional() {
                    BindOutcome::Defaulted(field.absent_value())
                } else {
                    let kind = BindErrorKind::MissingRequired;
                    BindOutcome::Failed(vec![field.error(path, kind.key(), kind.code())])
                };
            }
        };

        let mut errors = Vec::new();
        match self.bind_value(raw, field.declared_type(), field, path, &mut errors) {
            Some(value) if errors.is_empty() => BindOutcome::Bound(value),
            _ => BindOutcome::Failed(errors),
        }
    }

    fn bind_value(
        &self,
        raw: &Json,
        ty: &TypeTag,
        field: &ResolvedField,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<Value> {
        match ty {
            TypeTag::Object(class) => match raw {
                Json::Object(map) => match self.nested.bind_nested(class, map, path) {
                    Ok(obj) => Some(Value::Object(obj)),
                    Err(nested) => {
                        errors.extend(nested);
                        None
                    }
                },
                _ => {
                    push_kind(errors, field, path, BindErrorKind::InvalidType);
                    None
                }
            },
            TypeTag::List(element) => {
                let items: Vec<&Json> = match raw {
                    Json::Array(items) => items.iter().collect(),
                    Json::Object(_) => {
                        push_kind(errors, field, path, BindErrorKind::InvalidType);
                        return None;
                    }
                    scalar => vec![scalar],
                };
                Some(self.bind_items(items, element, field, path, errors))
            }
            TypeTag::TupleOf(element) => match raw {
                Json::Array(items) => Some(self.bind_items(items, element, field, path, errors)),
                _ => {
                    push_kind(errors, field, path, BindErrorKind::InvalidType);
                    None
                }
            },
            TypeTag::Tuple(slots) => match raw {
                Json::Array(items) => {
                    let mut values = Vec::with_capacity(slots.len());
                    for (i, slot) in slots.iter().enumerate() {
                        let slot_path = make_path(path, &format!("[{}]", i));
                        let item = items.get(i);
                        let bound = self.bind_element(item, slot, field, &slot_path, errors);
                        if let Some(value) = bound {
                            values.push(value);
                        }
                    }
                    Some(Value::List(values))
                }
                _ => {
                    push_kind(errors, field, path, BindErrorKind::InvalidType);
                    None
                }
            },
            TypeTag::Union(alternatives) => {
                let bound = alternatives.iter().find_map(|alternative| {
                    let mut attempt = Vec::new();
                    self.bind_value(raw, alternative, field, path, &mut attempt)
                        .filter(|_| attempt.is_empty())
                });
                if bound.is_none() {
                    push_kind(errors, field, path, union_failure(raw));
                }
                bound
            }
            TypeTag::Nullable(inner) => match raw {
                Json::Null => Some(Value::Null),
                _ => self.bind_value(raw, inner, field, path, errors),
            },
            scalar => match coerce(raw, scalar, field.format()) {
                Ok(value) => Some(value),
                Err(kind) => {
                    push_kind(errors, field, path, kind);
                    None
                }
            },
        }
    }

    fn bind_items<'j>(
        &self,
        items: impl IntoIterator<Item = &'j Json>,
        element: &TypeTag,
        field: &ResolvedField,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Value {
        let mut values = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let item_path = make_path(path, &format!("[{}]", i));
            if let Some(value) = self.bind_element(Some(item), element, field, &item_path, errors) {
                values.push(value);
            }
        }
        Value::List(values)
    }

    /// Binds one list element or tuple slot.
    fn bind_element(
        &self,
        raw: Option<&Json>,
        ty: &TypeTag,
        field: &ResolvedField,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<Value> {
        match raw {
            None | Some(Json::Null) if matches!(ty, TypeTag::Nullable(_)) => Some(Value::Null),
            None | Some(Json::Null) => {
                push_kind(errors, field, path, BindErrorKind::MissingRequired);
                None
            }
            Some(raw) => self.bind_value(raw, ty, field, path, errors),
        }
    }
}

/// Text that fits no alternative is a format error; anything else a type error.
fn union_failure(raw: &Json) -> BindErrorKind {
    if raw.is_string() {
        BindErrorKind::InvalidFormat
    } else {
        BindErrorKind::InvalidType
    }
}

fn push_kind(
    errors: &mut Vec<ValidationError>,
    field: &ResolvedField,
    path: &str,
    kind: BindErrorKind,
) {
    errors.push(field.error(path, kind.key(), kind.code()));
}

/// Coerces a raw value to a type containing no nested class.
///
/// Used for scalar field values and for declared defaults.
pub fn coerce(
    raw: &Json,
    ty: &TypeTag,
    format: Option<&str>,
) -> Result<Value, BindErrorKind> {
    match ty {
        TypeTag::String => match raw {
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Number(n) => Ok(Value::String(n.to_string())),
            Json::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(BindErrorKind::InvalidType),
        },
        TypeTag::Int => match raw {
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else {
                    match n.as_f64() {
                        Some(f)
                            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
                        {
                            Ok(Value::Int(f as i64))
                        }
                        _ => Err(BindErrorKind::InvalidFormat),
                    }
                }
            }
            Json::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| BindErrorKind::InvalidFormat),
            _ => Err(BindErrorKind::InvalidType),
        },
        TypeTag::Float => match raw {
            Json::Number(n) => n.as_f64().map(Value::Float).ok_or(BindErrorKind::InvalidFormat),
            Json::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(f)),
                _ => Err(BindErrorKind::InvalidFormat),
            },
            _ => Err(BindErrorKind::InvalidType),
        },
        TypeTag::Bool => match raw {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(BindErrorKind::InvalidFormat),
            },
            Json::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(BindErrorKind::InvalidFormat),
            },
            _ => Err(BindErrorKind::InvalidType),
        },
        TypeTag::Date => match raw {
            Json::String(s) => NaiveDate::parse_from_str(s, format.unwrap_or("%Y-%m-%d"))
                .map(Value::Date)
                .map_err(|_| BindErrorKind::InvalidFormat),
            _ => Err(BindErrorKind::InvalidType),
        },
        TypeTag::DateTime => match raw {
            Json::String(s) => {
                NaiveDateTime::parse_from_str(s, format.unwrap_or("%Y-%m-%dT%H:%M:%S"))
                    .map(Value::DateTime)
                    .map_err(|_| BindErrorKind::InvalidFormat)
            }
            _ => Err(BindErrorKind::InvalidType),
        },
        TypeTag::Any => Ok(Value::Raw(raw.clone())),
        TypeTag::Enum(spec) => match raw {
            Json::String(_) | Json::Number(_) | Json::Bool(_) => spec
                .select(raw)
                .map(|member| Value::String(member.to_string()))
                .ok_or(BindErrorKind::InvalidChoice),
            _ => Err(BindErrorKind::InvalidType),
        },
        TypeTag::List(element) | TypeTag::TupleOf(element) => match raw {
            Json::Array(items) => items
                .iter()
                .map(|item| coerce(item, element, format))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            _ => Err(BindErrorKind::InvalidType),
        },
        TypeTag::Tuple(slots) => match raw {
            Json::Array(items) => slots
                .iter()
                .enumerate()
                .map(|(i, slot)| match (items.get(i), slot) {
                    (None | Some(Json::Null), TypeTag::Nullable(_)) => Ok(Value::Null),
                    (None | Some(Json::Null), _) => Err(BindErrorKind::MissingRequired),
                    (Some(item), _) => coerce(item, slot, format),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            _ => Err(BindErrorKind::InvalidType),
        },
        TypeTag::Union(alternatives) => alternatives
            .iter()
            .find_map(|alternative| coerce(raw, alternative, format).ok())
            .ok_or_else(|| union_failure(raw)),
        TypeTag::Nullable(inner) => match raw {
            Json::Null => Ok(Value::Null),
            _ => coerce(raw, inner, format),
        },
        TypeTag::Object(_) => Err(BindErrorKind::InvalidType),
    }
}
