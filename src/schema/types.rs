//! Class and field declarations
//!
//! Supported types:
//! - string, int, float, bool
//! - date, datetime (parsed with a strftime format)
//! - any: raw passthrough
//! - list: homogeneous list with element type
//! - tuple: fixed slots, each with its own type
//! - tuple_of: variable-length homogeneous tuple
//! - union: first alternative that binds wins
//! - nullable: element slot that may be missing or null
//! - enum: one of a fixed set of named members
//! - object: nested class

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value as Json;

use super::errors::{ConfigResult, ConfigurationError};
use crate::validation::{ErrorCode, Validator};

/// Binder option: strftime format for date and datetime fields
pub const OPT_FORMAT: &str = "format";
/// Binder option: collapse empty/blank strings to absent
pub const OPT_COLLAPSE_BLANK: &str = "collapse_blank";
/// Binder option: suppress validator errors on optional or defaulted fields
pub const OPT_IGNORE_ERRORS: &str = "ignore_errors";
/// Binder option: run validators against an applied default
pub const OPT_VALIDATE_DEFAULT: &str = "validate_default";

/// Every binder option a field may carry
pub const BINDER_OPTIONS: [&str; 4] = [
    OPT_FORMAT,
    OPT_COLLAPSE_BLANK,
    OPT_IGNORE_ERRORS,
    OPT_VALIDATE_DEFAULT,
];

/// Error-code override key for a missing required value
pub const KEY_REQUIRED: &str = "required";
/// Error-code override key for unparseable text
pub const KEY_FORMAT: &str = "format";
/// Error-code override key for a wrongly shaped raw value
pub const KEY_TYPE: &str = "type";
/// Error-code override key for a value matching no enum member
pub const KEY_CHOICE: &str = "choice";

/// Declared field type
#[derive(Debug, Clone)]
pub enum TypeTag {
    String,
    Int,
    Float,
    Bool,
    Date,
    DateTime,
    /// Raw passthrough
    Any,
    /// Homogeneous list with element type
    List(Box<TypeTag>),
    /// Fixed slots; missing trailing slots bind as absent
    Tuple(Vec<TypeTag>),
    /// Variable-length homogeneous tuple
    TupleOf(Box<TypeTag>),
    /// Alternatives tried in declaration order
    Union(Vec<TypeTag>),
    /// Slot that binds `null` or a missing value to null
    Nullable(Box<TypeTag>),
    /// Named members with scalar values
    Enum(Arc<EnumSpec>),
    /// Nested class
    Object(Arc<ClassSpec>),
}

impl TypeTag {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::Date => "date",
            TypeTag::DateTime => "datetime",
            TypeTag::Any => "any",
            TypeTag::List(_) => "list",
            TypeTag::Tuple(_) => "tuple",
            TypeTag::TupleOf(_) => "tuple_of",
            TypeTag::Union(_) => "union",
            TypeTag::Nullable(_) => "nullable",
            TypeTag::Enum(_) => "enum",
            TypeTag::Object(_) => "object",
        }
    }

    pub fn list_of(element: TypeTag) -> Self {
        TypeTag::List(Box::new(element))
    }

    pub fn tuple_of(element: TypeTag) -> Self {
        TypeTag::TupleOf(Box::new(element))
    }

    pub fn nullable(inner: TypeTag) -> Self {
        TypeTag::Nullable(Box::new(inner))
    }

    /// Child types, in declaration order
    pub fn children(&self) -> Vec<&TypeTag> {
        match self {
            TypeTag::List(inner) | TypeTag::TupleOf(inner) | TypeTag::Nullable(inner) => {
                vec![inner.as_ref()]
            }
            TypeTag::Tuple(slots) => slots.iter().collect(),
            TypeTag::Union(alternatives) => alternatives.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// First date or datetime tag reachable without entering a nested class
    pub fn temporal(&self) -> Option<&TypeTag> {
        match self {
            TypeTag::Date | TypeTag::DateTime => Some(self),
            other => other.children().into_iter().find_map(TypeTag::temporal),
        }
    }

    /// Whether values of this type are parsed with a strftime format
    pub fn uses_format(&self) -> bool {
        self.temporal().is_some()
    }

    /// Nested classes reachable from this type, in declaration order
    pub fn nested_classes(&self) -> Vec<&Arc<ClassSpec>> {
        match self {
            TypeTag::Object(class) => vec![class],
            other => other
                .children()
                .into_iter()
                .flat_map(TypeTag::nested_classes)
                .collect(),
        }
    }

    /// Checks composite types for empty alternatives and malformed members.
    pub fn validate(&self, class: &str, field: &str) -> ConfigResult<()> {
        let invalid = |reason: &str| ConfigurationError::invalid_type(class, field, reason);
        match self {
            TypeTag::Tuple(slots) if slots.is_empty() => return Err(invalid("tuple has no slots")),
            TypeTag::Union(alternatives) if alternatives.is_empty() => {
                return Err(invalid("union has no alternatives"))
            }
            TypeTag::Enum(spec) => spec.validate().map_err(|reason| invalid(&reason))?,
            _ => {}
        }
        for child in self.children() {
            child.validate(class, field)?;
        }
        Ok(())
    }
}

/// Enum declaration: members in declaration order
///
/// A raw value selects the member whose value has the same text form, so
/// `"1"` and `1` both select a member declared with value `1`. The bound
/// value is the member name.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSpec {
    name: String,
    members: Vec<(String, Json)>,
}

impl EnumSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Adds a member with its raw value.
    pub fn member(mut self, name: impl Into<String>, value: impl Into<Json>) -> Self {
        self.members.push((name.into(), value.into()));
        self
    }

    pub fn into_type(self) -> TypeTag {
        TypeTag::Enum(Arc::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[(String, Json)] {
        &self.members
    }

    /// Name of the member selected by `raw`
    pub fn select(&self, raw: &Json) -> Option<&str> {
        let text = scalar_text(raw)?;
        self.members
            .iter()
            .find(|(_, value)| scalar_text(value).as_deref() == Some(text.as_str()))
            .map(|(name, _)| name.as_str())
    }

    fn validate(&self) -> Result<(), String> {
        if self.members.is_empty() {
            return Err(format!("enum '{}' has no members", self.name));
        }
        let mut names = HashSet::new();
        let mut values = HashSet::new();
        for (name, value) in &self.members {
            let Some(text) = scalar_text(value) else {
                return Err(format!("enum member '{}' must have a scalar value", name));
            };
            if !names.insert(name.as_str()) || !values.insert(text) {
                return Err(format!("enum '{}' repeats member '{}'", self.name, name));
            }
        }
        Ok(())
    }
}

/// Text form of a scalar JSON value, trimmed for strings
fn scalar_text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.trim().to_string()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reference to a validator: an instance, or a symbol resolved at bind time.
#[derive(Clone)]
pub enum ValidatorRef {
    Inline(Arc<dyn Validator>),
    Symbol(String),
}

impl ValidatorRef {
    pub fn inline<V: Validator + 'static>(validator: V) -> Self {
        ValidatorRef::Inline(Arc::new(validator))
    }

    pub fn symbol(symbol: impl Into<String>) -> Self {
        ValidatorRef::Symbol(symbol.into())
    }

    /// Key used for error-code and message overrides
    pub fn key(&self) -> &str {
        match self {
            ValidatorRef::Inline(v) => v.name(),
            ValidatorRef::Symbol(s) => s,
        }
    }
}

impl fmt::Debug for ValidatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorRef::Inline(v) => write!(f, "Inline({})", v.name()),
            ValidatorRef::Symbol(s) => write!(f, "Symbol({})", s),
        }
    }
}

impl From<&str> for ValidatorRef {
    fn from(symbol: &str) -> Self {
        ValidatorRef::symbol(symbol)
    }
}

/// Field declaration
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub declared_type: TypeTag,
    /// Whether a value must be present (or defaulted)
    pub required: bool,
    /// Raw default, coerced at resolution time
    pub default: Option<Json>,
    pub binder_options: BTreeMap<String, Json>,
    /// Validators in evaluation order
    pub validators: Vec<ValidatorRef>,
    /// Code overrides keyed by validator key or `required`/`format`/`type`
    pub error_codes: HashMap<String, ErrorCode>,
    /// Inline messages keyed like `error_codes`
    pub messages: HashMap<String, String>,
}

impl FieldSpec {
    /// Create a required field
    pub fn required(name: impl Into<String>, declared_type: TypeTag) -> Self {
        Self {
            name: name.into(),
            declared_type,
            required: true,
            default: None,
            binder_options: BTreeMap::new(),
            validators: Vec::new(),
            error_codes: HashMap::new(),
            messages: HashMap::new(),
        }
    }

    /// Create an optional field
    pub fn optional(name: impl Into<String>, declared_type: TypeTag) -> Self {
        Self {
            required: false,
            ..Self::required(name, declared_type)
        }
    }

    /// Create a required string field
    pub fn required_string(name: impl Into<String>) -> Self {
        Self::required(name, TypeTag::String)
    }

    /// Create an optional string field
    pub fn optional_string(name: impl Into<String>) -> Self {
        Self::optional(name, TypeTag::String)
    }

    /// Create a required int field
    pub fn required_int(name: impl Into<String>) -> Self {
        Self::required(name, TypeTag::Int)
    }

    /// Create an optional int field
    pub fn optional_int(name: impl Into<String>) -> Self {
        Self::optional(name, TypeTag::Int)
    }

    /// Create a required date field
    pub fn required_date(name: impl Into<String>) -> Self {
        Self::required(name, TypeTag::Date)
    }

    pub fn with_default(mut self, default: Json) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Json) -> Self {
        self.binder_options.insert(key.into(), value);
        self
    }

    /// Sets the `format` binder option.
    pub fn with_format(self, format: impl Into<String>) -> Self {
        self.with_option(OPT_FORMAT, Json::String(format.into()))
    }

    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(ValidatorRef::inline(validator));
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.validators.push(ValidatorRef::symbol(symbol));
        self
    }

    pub fn with_error_code(mut self, key: impl Into<String>, code: impl Into<ErrorCode>) -> Self {
        self.error_codes.insert(key.into(), code.into());
        self
    }

    pub fn with_message(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(key.into(), message.into());
        self
    }

    /// Whether an absent value is acceptable
    pub fn is_optional(&self) -> bool {
        !self.required || self.default.is_some()
    }
}

/// Class declaration
///
/// A child declaration replaces, never merges, a parent field of the same name.
///
/// Every builder step assigns a fresh `id`, so two specs share an id only
/// if one is an unmodified clone of the other.
#[derive(Debug, Clone)]
pub struct ClassSpec {
    id: u64,
    name: String,
    fields: Vec<FieldSpec>,
    parent: Option<Arc<ClassSpec>>,
}

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

fn next_class_id() -> u64 {
    NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed)
}

impl ClassSpec {
    /// Create an empty class
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: next_class_id(),
            name: name.into(),
            fields: Vec::new(),
            parent: None,
        }
    }

    /// Adds a field declaration.
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self.id = next_class_id();
        self
    }

    /// Sets the parent class.
    pub fn extends(mut self, parent: Arc<ClassSpec>) -> Self {
        self.parent = Some(parent);
        self.id = next_class_id();
        self
    }

    /// Identity of this declaration
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields declared directly on this class, in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn parent(&self) -> Option<&Arc<ClassSpec>> {
        self.parent.as_ref()
    }

    /// Returns the inheritance chain from the root ancestor down to this class.
    pub fn lineage(&self) -> Vec<&ClassSpec> {
        let mut chain = vec![self];
        let mut current = self.parent.as_deref();
        while let Some(class) = current {
            chain.push(class);
            current = class.parent.as_deref();
        }
        chain.reverse();
        chain
    }

    /// Validates the declaration itself (not an input).
    pub fn validate_structure(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigurationError::duplicate_field(&self.name, &field.name));
            }
            field.declared_type.validate(&self.name, &field.name)?;
            for key in field.binder_options.keys() {
                if !BINDER_OPTIONS.contains(&key.as_str()) {
                    return Err(ConfigurationError::invalid_option(
                        &self.name,
                        &field.name,
                        key,
                        "unknown binder option",
                    ));
                }
            }
        }
        Ok(())
    }
}
