//! # Manifest Command Implementation
//!
//! This module implements every subcommand that operates on the components
//! of a configuration: `list`, `extract`, `update`, `extract_or_updt`,
//! `commit`, `rebase`, `deliver`, `execute`, `dump`, `dump_actual` and
//! `dump_head`.
//!
//! ## Functionality
//!
//! - **Loading**: Reads the manifest (`-f`, or standard input with `-f -`)
//!   and resolves the active configuration (`-c`). Validation errors abort
//!   before any backend runs.
//! - **Selection**: `-n/--component` restricts the run to named components,
//!   which must belong to the configuration.
//! - **Failure policy**: The first failing component stops the run unless
//!   `-k/--keep-going` is given.
//!
//! ## Example
//!
//! ```bash
//! deptools -c release extract
//! deptools update -n zlib -n openssl
//! deptools execute -- git status --short
//! deptools dump_actual > DEPENDENCIES.lock
//! ```

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use clap::Args;
use log::debug;

use deptools::defaults::STDIN_MANIFEST;
use deptools::manifest::Manifest;
use deptools::orchestrator::{Dependencies, RunOptions};
use deptools::plugins::registry::PluginRegistry;
use deptools::plugins::{OpArgs, Operation};
use deptools::suggestions;
use deptools::workspace::{Tools, Workspace};

use crate::cli::GlobalArgs;

/// Component selection shared by the manifest commands
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Only operate on this component (repeatable)
    #[arg(short = 'n', long = "component", value_name = "NAME")]
    pub components: Vec<String>,

    /// Attempt every component even after a failure
    #[arg(short = 'k', long)]
    pub keep_going: bool,
}

/// Arguments of `extract`
#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Replace local copies that already exist
    #[arg(long)]
    pub force: bool,
}

/// Arguments of `commit` and `deliver`
#[derive(Args, Debug, Clone)]
pub struct PassArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Extra arguments passed to the underlying tool
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Arguments of `execute`
#[derive(Args, Debug, Clone)]
pub struct ExecuteArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Command to run in each component directory
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

/// What a manifest command runs with, whichever subcommand parsed it.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub select: SelectArgs,
    pub args: OpArgs,
}

impl From<SelectArgs> for Request {
    fn from(select: SelectArgs) -> Self {
        Self {
            select,
            args: OpArgs::default(),
        }
    }
}

impl From<ExtractArgs> for Request {
    fn from(extract: ExtractArgs) -> Self {
        Self {
            select: extract.select,
            args: OpArgs {
                force: extract.force,
                ..OpArgs::default()
            },
        }
    }
}

impl From<PassArgs> for Request {
    fn from(pass: PassArgs) -> Self {
        Self {
            select: pass.select,
            args: OpArgs::with_args(pass.args),
        }
    }
}

impl From<ExecuteArgs> for Request {
    fn from(execute: ExecuteArgs) -> Self {
        Self {
            select: execute.select,
            args: OpArgs::with_args(execute.command),
        }
    }
}

/// Build the workspace selected by the global options.
pub fn workspace(global: &GlobalArgs) -> Result<Workspace> {
    Ok(Workspace::new(global.workdir()?).with_tools(Tools::from_env()))
}

/// Load the manifest named by `-f`. Relative paths are taken from the
/// workspace root.
fn load_manifest(global: &GlobalArgs, workspace: &Workspace) -> Result<Manifest> {
    if global.file == STDIN_MANIFEST {
        return Manifest::load(STDIN_MANIFEST)
            .map_err(|e| suggestions::explain(e, None, &global.configuration));
    }
    let path = workspace.resolve(Path::new(&global.file));
    if !path.exists() {
        return Err(suggestions::manifest_not_found(&path));
    }
    Manifest::load(&path.to_string_lossy())
        .map_err(|e| suggestions::explain(e, None, &global.configuration))
}

/// Execute one manifest command.
pub fn execute(op: Operation, request: Request, global: &GlobalArgs) -> Result<()> {
    let workspace = workspace(global)?;
    let registry = PluginRegistry::with_builtins();
    let manifest = load_manifest(global, &workspace)?;

    let dependencies = Dependencies::new(
        manifest.clone(),
        &global.configuration,
        &registry,
        &workspace,
    )
    .map_err(|e| suggestions::explain(e, Some(&manifest), &global.configuration))?;

    let options = RunOptions {
        filter: request.select.components,
        args: request.args,
        keep_going: request.select.keep_going,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = dependencies
        .exec(op, &options, &mut out)
        .map_err(|e| suggestions::explain(e, Some(&manifest), &global.configuration))?;
    out.flush()?;

    debug!(
        "{}: {} executed, {} skipped",
        op,
        summary.executed.len(),
        summary.skipped.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_request_carries_force() {
        let request: Request = ExtractArgs {
            select: SelectArgs::default(),
            force: true,
        }
        .into();
        assert!(request.args.force);
        assert!(request.args.args.is_empty());
    }

    #[test]
    fn test_execute_request_carries_command() {
        let request: Request = ExecuteArgs {
            select: SelectArgs {
                components: vec!["zlib".to_string()],
                keep_going: true,
            },
            command: vec!["make".to_string(), "-j4".to_string()],
        }
        .into();
        assert_eq!(request.args.args, vec!["make", "-j4"]);
        assert_eq!(request.select.components, vec!["zlib"]);
        assert!(request.select.keep_going);
    }
}
