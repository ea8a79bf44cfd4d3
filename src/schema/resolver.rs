//! Class configuration resolver
//!
//! Flattens a class and its ancestors into one field table:
//! - Ancestor fields are inherited verbatim
//! - A redeclared field replaces the ancestor's declaration in place
//! - Global defaults fill binder options a field leaves unset
//! - Defaults are coerced and formats checked once, here
//!
//! Resolution is a pure function of the declaration and the configuration,
//! so the cache can be populated by whichever concurrent caller finishes
//! first. Entries are keyed by configuration, then by class identity
//! (`ClassSpec::id`), never by class name.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value as Json;

use super::errors::{ConfigResult, ConfigurationError};
use super::types::{
    ClassSpec, FieldSpec, TypeTag, OPT_COLLAPSE_BLANK, OPT_FORMAT, OPT_IGNORE_ERRORS,
    OPT_VALIDATE_DEFAULT,
};
use crate::binding::{binder, is_valid_format, BindingConfig, Value};
use crate::observability::{BindingMetrics, Event, Logger};
use crate::validation::{ErrorCode, ValidationError};

/// A field with every option settled.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    spec: FieldSpec,
    format: Option<String>,
    default: Option<Value>,
    collapse_blank: bool,
    ignore_errors: bool,
    validate_default: bool,
}

impl ResolvedField {
    /// The effective declaration (after inheritance)
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn declared_type(&self) -> &TypeTag {
        &self.spec.declared_type
    }

    /// Effective strftime format for date/datetime values
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Coerced default
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn collapse_blank(&self) -> bool {
        self.collapse_blank
    }

    pub fn ignore_errors(&self) -> bool {
        self.ignore_errors
    }

    pub fn validate_default(&self) -> bool {
        self.validate_default
    }

    pub fn is_optional(&self) -> bool {
        self.spec.is_optional()
    }

    /// Value used when the field is absent and allowed to be
    pub fn absent_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    /// Builds a field error, applying declared code and message overrides.
    pub fn error(&self, path: &str, key: &str, code: ErrorCode) -> ValidationError {
        let code = self.spec.error_codes.get(key).cloned().unwrap_or(code);
        ValidationError::new(path, code).with_message(self.spec.messages.get(key).cloned())
    }
}

/// Flat, precomputed field table of one class
#[derive(Debug, Clone)]
pub struct ResolvedClass {
    name: String,
    fields: Vec<ResolvedField>,
}

impl ResolvedClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(ResolvedField::name).collect()
    }
}

type ClassCache = HashMap<u64, Arc<ResolvedClass>>;

/// Resolves classes and caches the result per declaration and configuration.
#[derive(Debug, Default)]
pub struct ClassResolver {
    cache: RwLock<HashMap<BindingConfig, ClassCache>>,
    metrics: Arc<BindingMetrics>,
}

impl ClassResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver reporting into shared metrics.
    pub fn with_metrics(metrics: Arc<BindingMetrics>) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Resolves a class against the given configuration.
    pub fn resolve(
        &self,
        class: &ClassSpec,
        config: &BindingConfig,
    ) -> ConfigResult<Arc<ResolvedClass>> {
        if config.cache_class_specs {
            let cached = self
                .cache
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .get(config)
                .and_then(|classes| classes.get(&class.id()))
                .cloned();
            if let Some(resolved) = cached {
                self.metrics.increment_cache_hits();
                Logger::trace(Event::ResolutionCacheHit.as_str(), &[("class", class.name())]);
                return Ok(resolved);
            }
        }

        let resolved = Arc::new(resolve_uncached(class, config)?);
        self.metrics.increment_resolutions();
        let field_count = resolved.fields.len().to_string();
        Logger::trace(
            Event::ClassResolved.as_str(),
            &[("class", class.name()), ("fields", &field_count)],
        );

        if !config.cache_class_specs {
            return Ok(resolved);
        }
        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(cache
            .entry(config.clone())
            .or_default()
            .entry(class.id())
            .or_insert(resolved)
            .clone())
    }

    /// Returns the number of cached resolutions across configurations.
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Drops every cached resolution.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

fn resolve_uncached(class: &ClassSpec, config: &BindingConfig) -> ConfigResult<ResolvedClass> {
    let mut effective: Vec<&FieldSpec> = Vec::new();
    for ancestor in class.lineage() {
        ancestor.validate_structure()?;
        for field in ancestor.fields() {
            match effective.iter().position(|f| f.name == field.name) {
                Some(i) => effective[i] = field,
                None => effective.push(field),
            }
        }
    }

    let fields = effective
        .into_iter()
        .map(|field| resolve_field(class.name(), field, config))
        .collect::<ConfigResult<Vec<_>>>()?;

    Ok(ResolvedClass {
        name: class.name().to_string(),
        fields,
    })
}

fn resolve_field(
    class: &str,
    spec: &FieldSpec,
    config: &BindingConfig,
) -> ConfigResult<ResolvedField> {
    let format = if spec.declared_type.uses_format() {
        let format = match spec.binder_options.get(OPT_FORMAT) {
            Some(Json::String(f)) => f.clone(),
            Some(_) => {
                return Err(ConfigurationError::invalid_option(
                    class,
                    &spec.name,
                    OPT_FORMAT,
                    "expected a string",
                ))
            }
            None => match spec.declared_type.temporal() {
                Some(TypeTag::DateTime) => config.default_datetime_format.clone(),
                _ => config.default_date_format.clone(),
            },
        };
        if !is_valid_format(&format) {
            return Err(ConfigurationError::invalid_format(class, &spec.name, format));
        }
        Some(format)
    } else {
        None
    };

    let collapse_blank =
        bool_option(class, spec, OPT_COLLAPSE_BLANK, config.collapse_blank_to_absent)?;
    let ignore_errors =
        bool_option(class, spec, OPT_IGNORE_ERRORS, config.ignore_errors_when_optional)?;
    let validate_default = bool_option(class, spec, OPT_VALIDATE_DEFAULT, false)?;

    let default = match &spec.default {
        None => None,
        Some(raw) => {
            if !spec.declared_type.nested_classes().is_empty() {
                return Err(ConfigurationError::invalid_default(
                    class,
                    &spec.name,
                    "defaults are not supported for object fields",
                ));
            }
            let value = binder::coerce(raw, &spec.declared_type, format.as_deref());
            let value = value.map_err(|kind| {
                ConfigurationError::invalid_default(
                    class,
                    &spec.name,
                    format!("{} for {}", kind.code(), spec.declared_type.type_name()),
                )
            })?;
            Some(value)
        }
    };

    Ok(ResolvedField {
        spec: spec.clone(),
        format,
        default,
        collapse_blank,
        ignore_errors,
        validate_default,
    })
}

fn bool_option(class: &str, spec: &FieldSpec, key: &str, fallback: bool) -> ConfigResult<bool> {
    match spec.binder_options.get(key) {
        None => Ok(fallback),
        Some(Json::Bool(b)) => Ok(*b),
        Some(_) => Err(ConfigurationError::invalid_option(
            class,
            &spec.name,
            key,
            "expected a boolean",
        )),
    }
}
