//! # Plugin Command Implementation
//!
//! This module implements the `plugin` subcommand, which drives a single
//! component of a given format without any manifest. The component state is
//! kept in a session file between invocations.
//!
//! ## Usage
//!
//! ```bash
//! # Create the session from a params file
//! deptools plugin git zlib.session new zlib.yaml
//!
//! # Run commands against it
//! deptools plugin git zlib.session extract
//! deptools plugin git zlib.session commit -m "fix build"
//! deptools plugin git zlib.session dump_actual
//! ```
//!
//! `dump`, `dump_actual` and `dump_head` print the component description.
//! An unknown command is reported and ignored.

use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use clap::Args;
use log::{info, warn};

use deptools::plugins::registry::PluginRegistry;
use deptools::plugins::{OpArgs, Operation};
use deptools::session::Session;
use deptools::suggestions;

use crate::cli::GlobalArgs;
use crate::commands::run::workspace;

/// Drive a single component from a session file
#[derive(Args, Debug)]
pub struct PluginArgs {
    /// Repository format of the component
    #[arg(value_name = "FORMAT")]
    pub format: String,

    /// Session file holding the component state
    #[arg(value_name = "SESSION")]
    pub session: PathBuf,

    /// 'new', or the command to run on the component
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Params file for 'new', extra arguments otherwise
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Execute the `plugin` command.
pub fn execute(args: PluginArgs, global: &GlobalArgs) -> Result<()> {
    let registry = PluginRegistry::with_builtins();
    if !registry.contains(&args.format) {
        return Err(suggestions::unknown_format(&args.format, &registry));
    }
    let workspace = workspace(global)?;

    if args.command == "new" {
        let Some(params) = args.args.first() else {
            bail!("'new' requires a params file");
        };
        let session = Session::create(
            &args.session,
            &args.format,
            &PathBuf::from(params),
            &registry,
            &workspace,
        )?;
        session.store()?;
        info!(
            "created {} session {}",
            args.format,
            args.session.display()
        );
        return Ok(());
    }

    let op = match Operation::from_str(&args.command) {
        Ok(op) => op,
        Err(_) => {
            warn!("unexpected command, ignored: {}", args.command);
            return Ok(());
        }
    };

    let session = Session::restore(&args.session, &args.format, &registry, &workspace)?;
    let op_args = OpArgs {
        force: op == Operation::Extract && args.args.iter().any(|a| a == "--force"),
        args: args.args,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    session
        .run(op, &op_args, &mut out)
        .map_err(|e| suggestions::explain(e, None, &global.configuration))?;
    out.flush()?;
    Ok(())
}
