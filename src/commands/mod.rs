//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `deptools` command-line tool.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `deptools` library.
//!
//! The manifest commands (`list`, `extract`, `dump`, ...) differ only in the
//! operation they run and share one implementation in [`run`].

pub mod completions;
pub mod formats;
pub mod plugin;
pub mod run;
