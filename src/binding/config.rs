//! Global binding configuration
//!
//! Recognized options (JSON file or programmatic):
//! - `default_date_format` (default `%Y-%m-%d`)
//! - `default_datetime_format` (default `%Y-%m-%dT%H:%M:%S`)
//! - `cache_class_specs` (default true)
//! - `collapse_blank_to_absent` (default false)
//! - `ignore_errors_when_optional` (default false)
//!
//! Per-field binder options override these where applicable.

use std::fs;
use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::schema::{ConfigResult, ConfigurationError};

/// Global configuration shared by every binding call of an engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingConfig {
    /// Format for date fields without a `format` option
    #[serde(default = "default_date_format")]
    pub default_date_format: String,

    /// Format for datetime fields without a `format` option
    #[serde(default = "default_datetime_format")]
    pub default_datetime_format: String,

    /// Whether resolved classes are cached
    #[serde(default = "default_cache_class_specs")]
    pub cache_class_specs: bool,

    /// Whether empty and whitespace-only strings count as absent
    #[serde(default)]
    pub collapse_blank_to_absent: bool,

    /// Whether validator errors on optional/defaulted fields are dropped
    #[serde(default)]
    pub ignore_errors_when_optional: bool,
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_datetime_format() -> String {
    "%Y-%m-%dT%H:%M:%S".to_string()
}

fn default_cache_class_specs() -> bool {
    true
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            default_date_format: default_date_format(),
            default_datetime_format: default_datetime_format(),
            cache_class_specs: default_cache_class_specs(),
            collapse_blank_to_absent: false,
            ignore_errors_when_optional: false,
        }
    }
}

impl BindingConfig {
    /// Loads and validates a JSON configuration file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigurationError::malformed_declaration(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;
        Self::from_json(&content).map_err(|e| match e {
            ConfigurationError::MalformedDeclaration { reason, .. } => {
                ConfigurationError::malformed_declaration(path.display().to_string(), reason)
            }
            other => other,
        })
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: BindingConfig = serde_json::from_str(content).map_err(|e| {
            ConfigurationError::malformed_declaration("<config>", format!("Invalid JSON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that both default formats parse.
    pub fn validate(&self) -> ConfigResult<()> {
        for (option, format) in [
            ("default_date_format", &self.default_date_format),
            ("default_datetime_format", &self.default_datetime_format),
        ] {
            if !is_valid_format(format) {
                return Err(ConfigurationError::invalid_format("<config>", option, format));
            }
        }
        Ok(())
    }

    /// Disables the resolution cache.
    pub fn without_cache(mut self) -> Self {
        self.cache_class_specs = false;
        self
    }

    pub fn with_collapse_blank(mut self, collapse: bool) -> Self {
        self.collapse_blank_to_absent = collapse;
        self
    }

    pub fn with_ignore_errors_when_optional(mut self, ignore: bool) -> Self {
        self.ignore_errors_when_optional = ignore;
        self
    }
}

/// Returns whether a strftime format string parses.
pub(crate) fn is_valid_format(format: &str) -> bool {
    !format.is_empty() && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}
