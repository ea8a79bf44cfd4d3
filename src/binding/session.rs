//! Binding session
//!
//! One execution of the pipeline for one input against one class:
//! 1. Resolve the class (and nested classes) and every validator symbol
//! 2. Bind each field in declaration order
//! 3. Run the full validator chain on every bound field
//! 4. Aggregate into an instance or a complete error map
//!
//! Configuration errors abort before any field is bound. Field errors are
//! always collected, never raised.

use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value as Json};

use super::binder::{BindOutcome, Binder, NestedBinder};
use super::config::BindingConfig;
use super::input::RawInput;
use super::value::{BoundObject, FromBound, Value};
use crate::observability::{Event, Logger};
use crate::schema::{
    ClassResolver, ClassSpec, ConfigResult, ResolvedClass, ResolvedField, ValidatorRef,
};
use crate::validation::{make_path, Outcome, ValidationError, Validator, ValidatorRegistry};

/// Everything one binding call reads. Read-only during execution.
#[derive(Debug, Clone, Copy)]
pub struct BindingContext<'a> {
    raw_input: &'a RawInput,
    class_spec: &'a ClassSpec,
    config: &'a BindingConfig,
    registry: Option<&'a ValidatorRegistry>,
}

impl<'a> BindingContext<'a> {
    pub fn new(
        raw_input: &'a RawInput,
        class_spec: &'a ClassSpec,
        config: &'a BindingConfig,
    ) -> Self {
        Self {
            raw_input,
            class_spec,
            config,
            registry: None,
        }
    }

    /// Uses `registry` instead of the process-wide default.
    pub fn with_registry(mut self, registry: &'a ValidatorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn raw_input(&self) -> &'a RawInput {
        self.raw_input
    }

    pub fn class_spec(&self) -> &'a ClassSpec {
        self.class_spec
    }

    pub fn config(&self) -> &'a BindingConfig {
        self.config
    }

    /// The override registry, or the process-wide default
    pub fn registry(&self) -> &'a ValidatorRegistry {
        match self.registry {
            Some(registry) => registry,
            None => ValidatorRegistry::global(),
        }
    }
}

/// Outcome for one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResult {
    pub name: String,
    pub value: Option<Value>,
    pub errors: Vec<ValidationError>,
}

impl FieldResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Errors grouped by field path, in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors {
    entries: Vec<(String, Vec<ValidationError>)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error under its own path.
    pub fn push(&mut self, error: ValidationError) {
        match self.entries.iter_mut().find(|(path, _)| *path == error.field) {
            Some((_, errors)) => errors.push(error),
            None => self.entries.push((error.field.clone(), vec![error])),
        }
    }

    pub fn get(&self, path: &str) -> Option<&[ValidationError]> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, errors)| errors.as_slice())
    }

    /// Error codes recorded for `path`, in order
    pub fn codes(&self, path: &str) -> Vec<&str> {
        self.get(path)
            .map(|errors| errors.iter().map(|e| e.code.as_str()).collect())
            .unwrap_or_default()
    }

    /// Paths with errors, in order
    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|(p, _)| p.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ValidationError])> {
        self.entries.iter().map(|(p, e)| (p.as_str(), e.as_slice()))
    }

    /// Number of paths with errors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total number of errors across all paths
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, e)| e.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ValidationError> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        let mut errors = FieldErrors::new();
        for error in iter {
            errors.push(error);
        }
        errors
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, errors) in &self.entries {
            map.serialize_entry(path, errors)?;
        }
        map.end()
    }
}

/// Whole-object result: a populated instance, or every field error.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingResult<T = BoundObject> {
    instance: Option<T>,
    errors: FieldErrors,
}

impl<T> BindingResult<T> {
    /// The instance; present iff there are no errors
    pub fn instance(&self) -> Option<&T> {
        self.instance.as_ref()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.instance.is_some()
    }

    pub fn into_result(self) -> Result<T, FieldErrors> {
        match self.instance {
            Some(instance) => Ok(instance),
            None => Err(self.errors),
        }
    }
}

impl BindingResult<BoundObject> {
    fn from_fields(class: &str, fields: Vec<FieldResult>) -> Self {
        let errors: FieldErrors = fields
            .iter()
            .flat_map(|f| f.errors.iter().cloned())
            .collect();
        if !errors.is_empty() {
            return Self {
                instance: None,
                errors,
            };
        }
        let values = fields
            .into_iter()
            .map(|f| (f.name, f.value.unwrap_or(Value::Null)))
            .collect();
        Self {
            instance: Some(BoundObject::new(class, values)),
            errors,
        }
    }

    /// Converts the instance into a typed target.
    pub fn into_target<T: FromBound>(self) -> ConfigResult<BindingResult<T>> {
        let instance = match self.instance {
            Some(ref obj) => Some(T::from_bound(obj)?),
            None => None,
        };
        Ok(BindingResult {
            instance,
            errors: self.errors,
        })
    }
}

type Chain = Vec<(String, Arc<dyn Validator>)>;

/// Resolved class plus its resolved validator chains
struct ClassPlan {
    resolved: Arc<ResolvedClass>,
    chains: Vec<Chain>,
}

/// Executes binding calls against a shared resolver.
pub struct BindingSession<'a> {
    resolver: &'a ClassResolver,
}

impl<'a> BindingSession<'a> {
    pub fn new(resolver: &'a ClassResolver) -> Self {
        Self { resolver }
    }

    /// Runs the pipeline for one context.
    pub fn execute(&self, ctx: &BindingContext<'_>) -> ConfigResult<BindingResult> {
        let mut plans = HashMap::new();
        self.prepare(ctx.class_spec(), ctx, &mut plans)?;

        let run = Run { plans: &plans };
        let class = ctx.class_spec();
        let fields = run.bind_class(class, ctx.raw_input().as_map(), "");
        Ok(BindingResult::from_fields(class.name(), fields))
    }

    /// Resolves the class, its nested classes and all validator symbols.
    fn prepare(
        &self,
        class: &ClassSpec,
        ctx: &BindingContext<'_>,
        plans: &mut HashMap<u64, ClassPlan>,
    ) -> ConfigResult<()> {
        if plans.contains_key(&class.id()) {
            return Ok(());
        }
        let resolved = self.resolver.resolve(class, ctx.config())?;
        let registry = ctx.registry();

        let mut chains = Vec::with_capacity(resolved.fields().len());
        let mut nested = Vec::new();
        for field in resolved.fields() {
            let chain = field
                .spec()
                .validators
                .iter()
                .map(|v| match v {
                    ValidatorRef::Inline(validator) => Ok((v.key().to_string(), validator.clone())),
                    ValidatorRef::Symbol(symbol) => {
                        registry.resolve(symbol).map(|validator| (symbol.clone(), validator))
                    }
                })
                .collect::<ConfigResult<Chain>>()?;
            chains.push(chain);
            nested.extend(field.declared_type().nested_classes().into_iter().cloned());
        }

        plans.insert(class.id(), ClassPlan { resolved, chains });
        for nested_class in nested {
            self.prepare(&nested_class, ctx, plans)?;
        }
        Ok(())
    }
}

/// Field-level execution over prepared plans, keyed by `ClassSpec::id`
struct Run<'p> {
    plans: &'p HashMap<u64, ClassPlan>,
}

impl Run<'_> {
    fn bind_class(
        &self,
        class: &ClassSpec,
        raw: &Map<String, Json>,
        prefix: &str,
    ) -> Vec<FieldResult> {
        // prepare() planned every class reachable from the root
        let plan = &self.plans[&class.id()];
        let binder = Binder::new(self);
        plan.resolved
            .fields()
            .iter()
            .zip(&plan.chains)
            .map(|(field, chain)| bind_field(&binder, field, chain, raw, prefix))
            .collect()
    }
}

impl NestedBinder for Run<'_> {
    fn bind_nested(
        &self,
        class: &ClassSpec,
        raw: &Map<String, Json>,
        path: &str,
    ) -> Result<BoundObject, Vec<ValidationError>> {
        let fields = self.bind_class(class, raw, path);
        match BindingResult::from_fields(class.name(), fields) {
            BindingResult {
                instance: Some(obj),
                ..
            } => Ok(obj),
            BindingResult { errors, .. } => Err(errors
                .iter()
                .flat_map(|(_, errors)| errors.iter().cloned())
                .collect()),
        }
    }
}

fn bind_field(
    binder: &Binder<'_>,
    field: &ResolvedField,
    chain: &Chain,
    raw: &Map<String, Json>,
    prefix: &str,
) -> FieldResult {
    let path = make_path(prefix, field.name());
    let value = match binder.bind(raw.get(field.name()), field, &path) {
        BindOutcome::Failed(errors) => {
            return FieldResult {
                name: field.name().to_string(),
                value: None,
                errors,
            };
        }
        BindOutcome::Defaulted(value)
            if !(field.validate_default() && field.default().is_some()) =>
        {
            return FieldResult {
                name: field.name().to_string(),
                value: Some(value),
                errors: Vec::new(),
            };
        }
        BindOutcome::Defaulted(value) | BindOutcome::Bound(value) => value,
    };

    let errors: Vec<ValidationError> = chain
        .iter()
        .filter_map(|(key, validator)| match validator.evaluate(&value) {
            Outcome::Pass => None,
            Outcome::Fail(code) => Some(field.error(&path, key, code)),
        })
        .collect();

    if !errors.is_empty() && field.ignore_errors() && field.is_optional() {
        let count = errors.len().to_string();
        Logger::trace(
            Event::FieldErrorsIgnored.as_str(),
            &[("errors", &count), ("field", &path)],
        );
        return FieldResult {
            name: field.name().to_string(),
            value: Some(field.absent_value()),
            errors: Vec::new(),
        };
    }

    FieldResult {
        name: field.name().to_string(),
        value: Some(value),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, TypeTag, OPT_IGNORE_ERRORS, OPT_VALIDATE_DEFAULT};
    use crate::validation::{validator_fn, Email, ErrorCode, Length, NotBlank, Range};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn input(value: Json) -> RawInput {
        RawInput::from_json(value).unwrap()
    }

    fn execute(class: &ClassSpec, raw: &RawInput, config: &BindingConfig) -> BindingResult {
        let resolver = ClassResolver::new();
        BindingSession::new(&resolver)
            .execute(&BindingContext::new(raw, class, config))
            .unwrap()
    }

    #[test]
    fn test_email_scenario() {
        let class = ClassSpec::new("Signup")
            .field(FieldSpec::required_string("email").with_validator(Email));
        let raw = input(json!({"email": "not-an-email"}));
        let result = execute(&class, &raw, &BindingConfig::default());

        assert!(result.instance().is_none());
        assert_eq!(result.errors().paths(), vec!["email"]);
        assert_eq!(result.errors().codes("email"), vec!["email.invalid"]);
    }

    #[test]
    fn test_all_validators_run() {
        let class = ClassSpec::new("Signup").field(
            FieldSpec::required_string("email")
                .with_validator(Length::new(Some(20), None))
                .with_validator(Email),
        );
        let result = execute(&class, &input(json!({"email": "nope"})), &BindingConfig::default());
        assert_eq!(result.errors().codes("email"), vec!["length.too_short", "email.invalid"]);
    }

    #[test]
    fn test_coercion_failure_skips_validators() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let counting = validator_fn("counting", "never.used", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        let class = ClassSpec::new("Order")
            .field(FieldSpec::required_int("quantity").with_validator(counting));

        let raw = input(json!({"quantity": "many"}));
        let result = execute(&class, &raw, &BindingConfig::default());
        assert_eq!(result.errors().codes("quantity"), vec!["field.invalid_format"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fields_proceed_independently() {
        let class = ClassSpec::new("Order")
            .field(FieldSpec::required_int("quantity"))
            .field(FieldSpec::required_string("sku").with_validator(NotBlank));
        let raw = input(json!({"quantity": "x", "sku": " "}));
        let result = execute(&class, &raw, &BindingConfig::default());
        assert_eq!(result.errors().paths(), vec!["quantity", "sku"]);
        assert_eq!(result.errors().codes("sku"), vec!["field.blank"]);
    }

    #[test]
    fn test_valid_input_builds_instance() {
        let class = ClassSpec::new("Order")
            .field(FieldSpec::required_int("quantity").with_validator(Range::gt(0.0)))
            .field(FieldSpec::optional_string("note"));
        let result = execute(&class, &input(json!({"quantity": "3"})), &BindingConfig::default());

        let obj = result.instance().unwrap();
        assert_eq!(obj.class(), "Order");
        assert_eq!(obj.get("quantity"), Some(&Value::Int(3)));
        assert_eq!(obj.get("note"), Some(&Value::Null));
        assert!(result.errors().is_empty());
    }

    #[test]
    fn test_unknown_symbol_is_fatal() {
        let class = ClassSpec::new("Signup")
            .field(FieldSpec::required_string("email").with_symbol("no_such_validator"));
        let raw = input(json!({"email": "a@b.io"}));
        let config = BindingConfig::default();
        let resolver = ClassResolver::new();
        let err = BindingSession::new(&resolver)
            .execute(&BindingContext::new(&raw, &class, &config))
            .unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_UNKNOWN_VALIDATOR");
    }

    #[test]
    fn test_registry_override() {
        let registry = ValidatorRegistry::new();
        registry.register("adult", Range::ge(18.0)).unwrap();

        let class =
            ClassSpec::new("Profile").field(FieldSpec::required_int("age").with_symbol("adult"));
        let raw = input(json!({"age": 12}));
        let config = BindingConfig::default();
        let resolver = ClassResolver::new();
        let ctx = BindingContext::new(&raw, &class, &config).with_registry(&registry);
        let result = BindingSession::new(&resolver).execute(&ctx).unwrap();
        assert_eq!(result.errors().codes("age"), vec!["range.too_low"]);

        // Not in the global registry
        let ctx = BindingContext::new(&raw, &class, &config);
        assert!(BindingSession::new(&resolver).execute(&ctx).is_err());
    }

    #[test]
    fn test_ignore_errors_for_optional_field() {
        let class = ClassSpec::new("Profile").field(
            FieldSpec::optional_string("website")
                .with_validator(Length::new(None, Some(5)))
                .with_option(OPT_IGNORE_ERRORS, json!(true)),
        );
        let raw = input(json!({"website": "https://example.com"}));
        let result = execute(&class, &raw, &BindingConfig::default());
        assert!(result.is_valid());
        assert_eq!(result.instance().unwrap().get("website"), Some(&Value::Null));
    }

    #[test]
    fn test_ignore_errors_never_hides_binder_failures() {
        let class = ClassSpec::new("Profile").field(FieldSpec::optional("birthday", TypeTag::Date));
        let config = BindingConfig::default().with_ignore_errors_when_optional(true);
        let result = execute(&class, &input(json!({"birthday": "yesterday"})), &config);
        assert_eq!(result.errors().codes("birthday"), vec!["field.invalid_format"]);
    }

    #[test]
    fn test_ignore_errors_requires_optional() {
        let class = ClassSpec::new("Signup")
            .field(FieldSpec::required_string("email").with_validator(Email));
        let config = BindingConfig::default().with_ignore_errors_when_optional(true);
        let result = execute(&class, &input(json!({"email": "x"})), &config);
        assert_eq!(result.errors().codes("email"), vec!["email.invalid"]);
    }

    #[test]
    fn test_default_not_validated_unless_requested() {
        let field = FieldSpec::optional_int("page")
            .with_default(json!(0))
            .with_validator(Range::gt(0.0));
        let class = ClassSpec::new("Search").field(field.clone());
        let result = execute(&class, &input(json!({})), &BindingConfig::default());
        assert_eq!(result.instance().unwrap().get("page"), Some(&Value::Int(0)));

        let class = ClassSpec::new("StrictSearch")
            .field(field.with_option(OPT_VALIDATE_DEFAULT, json!(true)));
        let result = execute(&class, &input(json!({})), &BindingConfig::default());
        assert_eq!(result.errors().codes("page"), vec!["range.too_low"]);
    }

    #[test]
    fn test_nested_object_paths() {
        let address = ClassSpec::new("Address")
            .field(FieldSpec::required_string("city").with_validator(NotBlank))
            .field(FieldSpec::required_string("zip"))
            .into_shared();
        let class = ClassSpec::new("Customer")
            .field(FieldSpec::required_string("name"))
            .field(FieldSpec::required("address", TypeTag::Object(address)));

        let result = execute(
            &class,
            &input(json!({"name": "Ada", "address": {"city": ""}})),
            &BindingConfig::default(),
        );
        assert_eq!(result.errors().paths(), vec!["address.city", "address.zip"]);
        assert_eq!(result.errors().codes("address.zip"), vec!["field.missing_required"]);

        let result = execute(
            &class,
            &input(json!({"name": "Ada", "address": {"city": "Paris", "zip": "75001"}})),
            &BindingConfig::default(),
        );
        let address = result.instance().unwrap().get("address").unwrap().as_object().unwrap();
        assert_eq!(address.string("city").unwrap(), "Paris");
    }

    #[test]
    fn test_list_of_objects() {
        let item = ClassSpec::new("Item")
            .field(FieldSpec::required_int("qty").with_validator(Range::gt(0.0)))
            .into_shared();
        let class = ClassSpec::new("Cart")
            .field(FieldSpec::required("items", TypeTag::list_of(TypeTag::Object(item))));

        let result = execute(
            &class,
            &input(json!({"items": [{"qty": 1}, {"qty": 0}]})),
            &BindingConfig::default(),
        );
        assert_eq!(result.errors().paths(), vec!["items[1].qty"]);
        assert_eq!(result.errors().codes("items[1].qty"), vec!["range.too_low"]);
    }

    #[test]
    fn test_same_named_nested_classes_planned_separately() {
        let home = ClassSpec::new("Address")
            .field(FieldSpec::required_string("city"))
            .into_shared();
        let work = ClassSpec::new("Address")
            .field(FieldSpec::required_string("office"))
            .into_shared();
        let class = ClassSpec::new("Employee")
            .field(FieldSpec::required("home", TypeTag::Object(home)))
            .field(FieldSpec::required("work", TypeTag::Object(work)));

        let result = execute(
            &class,
            &input(json!({"home": {"city": "Oslo"}, "work": {"office": "B2"}})),
            &BindingConfig::default(),
        );
        assert!(result.is_valid());
        let work = result.instance().unwrap().get("work").unwrap().as_object().unwrap();
        assert_eq!(work.string("office").unwrap(), "B2");

        let raw = input(json!({"home": {}, "work": {}}));
        let result = execute(&class, &raw, &BindingConfig::default());
        assert_eq!(result.errors().paths(), vec!["home.city", "work.office"]);
    }

    #[test]
    fn test_custom_code_and_message() {
        let class = ClassSpec::new("Signup").field(
            FieldSpec::required_string("email")
                .with_validator(Email)
                .with_error_code("email", "signup.email")
                .with_message("email", "use your work address"),
        );
        let result = execute(&class, &input(json!({"email": "x"})), &BindingConfig::default());
        let errors = result.errors().get("email").unwrap();
        assert_eq!(errors[0].code, ErrorCode::new("signup.email"));
        assert_eq!(errors[0].message.as_deref(), Some("use your work address"));
    }

    #[test]
    fn test_errors_serialize_as_map() {
        let class = ClassSpec::new("Signup")
            .field(FieldSpec::required_string("email"))
            .field(FieldSpec::required_string("password"));
        let result = execute(&class, &input(json!({})), &BindingConfig::default());
        let json = serde_json::to_value(result.errors()).unwrap();
        assert_eq!(
            json,
            json!({
                "email": [{"code": "field.missing_required", "field": "email"}],
                "password": [{"code": "field.missing_required", "field": "password"}]
            })
        );
    }
}
