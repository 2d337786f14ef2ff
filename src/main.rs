//! # deptools CLI
//!
//! This is the binary entry point for the `deptools` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Reporting errors as one `<progname>: error: <message>` line on stderr
//!   with a non-zero exit status. Hints follow as `info` messages.
//!
//! The core application logic is defined in the `lib.rs` library crate, so
//! the binary stays a thin wrapper around it.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use log::info;

use deptools::suggestions;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: error: {:#}", cli::program_name(), err);
            for hint in suggestions::hints_of(&err) {
                info!("hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}
