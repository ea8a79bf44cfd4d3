//! Binding engine
//!
//! Owns the long-lived pieces (configuration, resolution cache, metrics,
//! optional validator registry) and runs one session per call. Safe to
//! share across threads.

use std::sync::Arc;

use super::config::BindingConfig;
use super::input::RawInput;
use super::session::{BindingContext, BindingResult, BindingSession};
use super::value::FromBound;
use crate::observability::{log_event_with_fields, BindingMetrics, Event, MetricsSnapshot};
use crate::schema::{ClassResolver, ClassSpec, ConfigResult, ConfigurationError, ResolvedClass};
use crate::validation::ValidatorRegistry;

#[derive(Debug)]
pub struct BindingEngine {
    config: BindingConfig,
    resolver: ClassResolver,
    registry: Option<Arc<ValidatorRegistry>>,
    metrics: Arc<BindingMetrics>,
}

impl BindingEngine {
    /// Creates an engine after validating the configuration.
    pub fn new(config: BindingConfig) -> ConfigResult<Self> {
        config.validate()?;
        let metrics = Arc::new(BindingMetrics::new());
        Ok(Self {
            config,
            resolver: ClassResolver::with_metrics(metrics.clone()),
            registry: None,
            metrics,
        })
    }

    /// Resolves symbols against `registry` instead of the global one.
    pub fn with_registry(mut self, registry: Arc<ValidatorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        match &self.registry {
            Some(registry) => registry,
            None => ValidatorRegistry::global(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Resolves a class without binding anything.
    pub fn resolve(&self, class: &ClassSpec) -> ConfigResult<Arc<ResolvedClass>> {
        self.resolver
            .resolve(class, &self.config)
            .map_err(|err| self.reject(class, err))
    }

    /// Binds `input` against `class`.
    ///
    /// Field errors are returned inside the result. `Err` means the
    /// declarations or configuration are broken.
    pub fn bind(&self, class: &ClassSpec, input: &RawInput) -> ConfigResult<BindingResult> {
        let mut ctx = BindingContext::new(input, class, &self.config);
        if let Some(registry) = &self.registry {
            ctx = ctx.with_registry(registry);
        }

        let result = match BindingSession::new(&self.resolver).execute(&ctx) {
            Ok(result) => result,
            Err(err) => return Err(self.reject(class, err)),
        };

        if result.is_valid() {
            self.metrics.increment_binds_executed();
            log_event_with_fields(Event::BindComplete, &[("class", class.name())]);
        } else {
            let total = result.errors().total();
            self.metrics.increment_binds_rejected();
            self.metrics.add_field_errors(total as u64);
            log_event_with_fields(
                Event::BindRejected,
                &[("class", class.name()), ("errors", &total.to_string())],
            );
        }
        Ok(result)
    }

    /// Binds and converts the instance into a typed target.
    pub fn bind_as<T: FromBound>(
        &self,
        class: &ClassSpec,
        input: &RawInput,
    ) -> ConfigResult<BindingResult<T>> {
        self.bind(class, input)?.into_target()
    }

    fn reject(&self, class: &ClassSpec, err: ConfigurationError) -> ConfigurationError {
        self.metrics.increment_configuration_failures();
        log_event_with_fields(
            Event::ConfigurationRejected,
            &[("class", class.name()), ("code", err.code()), ("message", &err.to_string())],
        );
        err
    }
}

impl Default for BindingEngine {
    fn default() -> Self {
        let metrics = Arc::new(BindingMetrics::new());
        Self {
            config: BindingConfig::default(),
            resolver: ClassResolver::with_metrics(metrics.clone()),
            registry: None,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BoundObject;
    use crate::schema::FieldSpec;
    use crate::validation::{Email, Password};
    use serde_json::json;

    struct Signup {
        email: String,
        password: String,
    }

    impl FromBound for Signup {
        fn from_bound(obj: &BoundObject) -> ConfigResult<Self> {
            Ok(Self {
                email: obj.string("email")?,
                password: obj.string("password")?,
            })
        }
    }

    fn signup() -> ClassSpec {
        ClassSpec::new("Signup")
            .field(FieldSpec::required_string("email").with_validator(Email))
            .field(FieldSpec::required_string("password").with_validator(Password::default()))
    }

    fn input(value: serde_json::Value) -> RawInput {
        RawInput::from_json(value).unwrap()
    }

    #[test]
    fn test_bind_as_typed_target() {
        let engine = BindingEngine::default();
        let result = engine
            .bind_as::<Signup>(
                &signup(),
                &input(json!({"email": "a@b.io", "password": "hunter22"})),
            )
            .unwrap();
        let signup = result.into_result().ok().unwrap();
        assert_eq!(signup.email, "a@b.io");
        assert_eq!(signup.password, "hunter22");
    }

    #[test]
    fn test_metrics_track_outcomes() {
        let engine = BindingEngine::default();
        let class = signup();
        engine
            .bind(&class, &input(json!({"email": "a@b.io", "password": "hunter22"})))
            .unwrap();
        engine.bind(&class, &input(json!({"email": "nope"}))).unwrap();

        let metrics = engine.metrics();
        assert_eq!(metrics.binds_executed, 1);
        assert_eq!(metrics.binds_rejected, 1);
        assert_eq!(metrics.field_errors, 2);
        assert_eq!(metrics.resolutions, 1);
        assert_eq!(metrics.cache_hits, 1);
    }

    #[test]
    fn test_configuration_failure_counted() {
        let engine = BindingEngine::default();
        let class = ClassSpec::new("Broken")
            .field(FieldSpec::required_string("x").with_symbol("missing_symbol"));
        let err = engine.bind(&class, &input(json!({"x": "y"}))).unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_UNKNOWN_VALIDATOR");
        assert_eq!(engine.metrics().configuration_failures, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BindingConfig {
            default_date_format: "%Q".into(),
            ..BindingConfig::default()
        };
        assert!(BindingEngine::new(config).is_err());
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BindingEngine>();
    }
}
