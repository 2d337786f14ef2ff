//! # Formats Command Implementation
//!
//! This module implements the `formats` subcommand, which lists the
//! repository formats the built-in plugin registry knows about. Any of these
//! names can appear as the `format` of a manifest entry or as the first
//! argument of `deptools plugin`.
//!
//! ## Example
//!
//! ```bash
//! $ deptools formats
//! git: git repository manager
//! hg: mercurial repository manager
//! ...
//! ```

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;

use deptools::plugins::registry::PluginRegistry;

/// List the registered repository formats
#[derive(Args, Debug)]
pub struct FormatsArgs {
    /// Print format names only
    #[arg(long)]
    pub names_only: bool,
}

/// Execute the `formats` command.
pub fn execute(args: FormatsArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_formats(&PluginRegistry::with_builtins(), args.names_only, &mut out)?;
    Ok(())
}

fn write_formats(registry: &PluginRegistry, names_only: bool, out: &mut impl Write) -> io::Result<()> {
    for registration in registry.iter() {
        if names_only {
            writeln!(out, "{}", registration.format)?;
        } else {
            writeln!(out, "{}: {}", registration.format, registration.description)?;
        }
    }
    out.flush()
}
