//! Validator registry
//!
//! Maps symbols to validator instances so declarations can name a
//! validator instead of constructing one. A process-wide default registry
//! is available; a binding context may supply its own instance instead.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use super::validator::{Email, NotBlank, Password, Validator};
use crate::schema::{ConfigResult, ConfigurationError};

static GLOBAL: Lazy<ValidatorRegistry> = Lazy::new(ValidatorRegistry::with_builtins);

/// Symbol → validator table.
///
/// Read-mostly: registration takes the write lock, resolution the read lock.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: RwLock<HashMap<String, Arc<dyn Validator>>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding `email`, `password` and `not_blank`.
    pub fn with_builtins() -> Self {
        let mut validators: HashMap<String, Arc<dyn Validator>> = HashMap::new();
        validators.insert("email".into(), Arc::new(Email));
        validators.insert("password".into(), Arc::new(Password::default()));
        validators.insert("not_blank".into(), Arc::new(NotBlank));
        Self {
            validators: RwLock::new(validators),
        }
    }

    /// Returns the process-wide default registry.
    pub fn global() -> &'static ValidatorRegistry {
        &GLOBAL
    }

    /// Registers a validator under `symbol`.
    ///
    /// A symbol must resolve to exactly one validator, so registering an
    /// existing symbol again fails.
    pub fn register<V>(&self, symbol: impl Into<String>, validator: V) -> ConfigResult<()>
    where
        V: Validator + 'static,
    {
        self.register_arc(symbol, Arc::new(validator))
    }

    /// Registers an already shared validator.
    pub fn register_arc(
        &self,
        symbol: impl Into<String>,
        validator: Arc<dyn Validator>,
    ) -> ConfigResult<()> {
        let symbol = symbol.into();
        let mut validators = self
            .validators
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if validators.contains_key(&symbol) {
            return Err(ConfigurationError::duplicate_validator(symbol));
        }
        validators.insert(symbol, validator);
        Ok(())
    }

    /// Resolves a symbol.
    pub fn resolve(&self, symbol: &str) -> ConfigResult<Arc<dyn Validator>> {
        self.validators
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(symbol)
            .cloned()
            .ok_or_else(|| ConfigurationError::unknown_validator(symbol))
    }

    /// Checks if a symbol is registered.
    pub fn contains(&self, symbol: &str) -> bool {
        self.validators
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(symbol)
    }

    /// Returns all registered symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .validators
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        symbols.sort();
        symbols
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("symbols", &self.symbols())
            .finish()
    }
}
