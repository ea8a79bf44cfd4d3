//! CLI command implementations
//!
//! Each command loads declarations and configuration, does one unit of
//! work, and writes exactly one JSON line to stdout. On failure the error
//! envelope is written before the process exits non-zero.

use std::path::Path;

use serde_json::{json, Value};

use crate::binding::{BindingConfig, BindingEngine, RawInput};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::schema::ClassSpecLoader;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_json, write_response};

/// Main CLI entry point
///
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let result = Severity::parse(&cli.log_level)
        .ok_or_else(|| {
            CliError::invalid_argument(format!("Unknown log level: '{}'", cli.log_level))
        })
        .and_then(|severity| {
            Logger::set_min_severity(severity);
            run_command(cli.command)
        });

    if let Err(ref e) = result {
        let _ = write_error(e.code_str(), e.message());
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Bind {
            specs,
            class,
            config,
        } => bind(&specs, &class, config.as_deref()),
        Command::Check { specs, config } => check(&specs, config.as_deref()),
    }
}

/// Bind one stdin object against `class`
pub fn bind(specs: &Path, class: &str, config: Option<&Path>) -> CliResult<()> {
    let engine = build_engine(config)?;
    let loader = load_specs(specs)?;
    let request = read_request()?;
    let response = bind_request(&engine, &loader, class, request)?;
    write_json(&response)
}

/// Builds the response envelope for one bind request.
///
/// Field errors are a normal outcome (`"status": "invalid"`); only
/// configuration and input problems are returned as `Err`.
pub fn bind_request(
    engine: &BindingEngine,
    loader: &ClassSpecLoader,
    class: &str,
    request: Value,
) -> CliResult<Value> {
    let class = loader.require(class)?;
    let input = RawInput::from_json(request)?;
    let response = match engine.bind(&class, &input)?.into_result() {
        Ok(instance) => json!({
            "status": "ok",
            "data": serde_json::to_value(&instance)?,
        }),
        Err(errors) => json!({
            "status": "invalid",
            "errors": serde_json::to_value(&errors)?,
        }),
    };
    Ok(response)
}

/// Load and resolve every declared class
pub fn check(specs: &Path, config: Option<&Path>) -> CliResult<()> {
    let engine = build_engine(config)?;
    let loader = load_specs(specs)?;
    write_response(check_specs(&engine, &loader)?)
}

/// Resolves every class; the first configuration error wins.
pub fn check_specs(engine: &BindingEngine, loader: &ClassSpecLoader) -> CliResult<Value> {
    let mut classes = Vec::with_capacity(loader.class_count());
    for name in loader.class_names() {
        let class = loader.require(name)?;
        let resolved = engine.resolve(&class)?;
        classes.push(json!({
            "name": name,
            "fields": resolved.field_names(),
        }));
    }
    Ok(json!({
        "count": classes.len(),
        "classes": classes,
    }))
}

fn build_engine(config: Option<&Path>) -> CliResult<BindingEngine> {
    let config = match config {
        Some(path) => {
            let config = BindingConfig::from_file(path)?;
            log_event_with_fields(Event::ConfigLoaded, &[("path", &path.display().to_string())]);
            config
        }
        None => BindingConfig::default(),
    };
    Ok(BindingEngine::new(config)?)
}

fn load_specs(dir: &Path) -> CliResult<ClassSpecLoader> {
    let mut loader = ClassSpecLoader::new(dir);
    let count = loader.load_all()?;
    log_event_with_fields(
        Event::SpecsLoaded,
        &[("classes", &count.to_string()), ("dir", &dir.display().to_string())],
    );
    Ok(loader)
}
