//! fieldbind CLI entry point
//!
//! Parses arguments and dispatches via `cli::run`; the error envelope has
//! already been written to stdout when `run` fails.

use fieldbind::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
