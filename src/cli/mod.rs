//! CLI module for fieldbind
//!
//! Provides command-line interface for:
//! - bind: bind one JSON object against a declared class
//! - check: load and resolve every declaration

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{bind, bind_request, check, check_specs, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_json, write_response};
