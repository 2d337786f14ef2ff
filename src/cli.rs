//! CLI argument parsing and command dispatch

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use deptools::defaults::{DEFAULT_CONFIGURATION, DEFAULT_MANIFEST_FILENAME};
use deptools::plugins::Operation;

use crate::commands;

/// deptools - Extract, update and synchronize source dependencies
#[derive(Parser, Debug)]
#[command(name = "deptools")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Manifest file, or '-' for standard input
    #[arg(
        short = 'f',
        long = "file",
        global = true,
        value_name = "FILE",
        env = "DEPTOOLS_FILE",
        default_value = DEFAULT_MANIFEST_FILENAME
    )]
    pub file: String,

    /// Configuration to operate on
    #[arg(
        short = 'c',
        long,
        global = true,
        value_name = "CONFIGURATION",
        env = "DEPTOOLS_CONFIGURATION",
        default_value = DEFAULT_CONFIGURATION
    )]
    pub configuration: String,

    /// Workspace directory components are extracted into (default: current directory)
    #[arg(
        short = 'C',
        long,
        global = true,
        value_name = "WORKDIR",
        env = "DEPTOOLS_WORKDIR"
    )]
    pub workdir: Option<PathBuf>,

    /// Set log level
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace", "off"]
    )]
    pub log_level: String,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// The workspace root, made absolute.
    pub fn workdir(&self) -> Result<PathBuf> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        Ok(match &self.workdir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd,
        })
    }

    fn level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            self.log_level.parse().unwrap_or(LevelFilter::Info)
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one line per component: format, label/revision, repository
    List(commands::run::SelectArgs),

    /// Extract components that are not present yet
    Extract(commands::run::ExtractArgs),

    /// Update extracted components
    Update(commands::run::SelectArgs),

    /// Extract missing components and update present ones
    #[command(name = "extract_or_updt", alias = "extract-or-update")]
    ExtractOrUpdt(commands::run::SelectArgs),

    /// Commit local changes in each component
    Commit(commands::run::PassArgs),

    /// Rebase local changes onto the upstream label
    Rebase(commands::run::SelectArgs),

    /// Deliver local changes upstream
    Deliver(commands::run::PassArgs),

    /// Run a command in each component directory
    Execute(commands::run::ExecuteArgs),

    /// Print the manifest
    Dump(commands::run::SelectArgs),

    /// Print the manifest with revisions pinned to the local copies
    #[command(name = "dump_actual", alias = "dump-actual")]
    DumpActual(commands::run::SelectArgs),

    /// Print the manifest with revisions pinned to the upstream heads
    #[command(name = "dump_head", alias = "dump-head")]
    DumpHead(commands::run::SelectArgs),

    /// List the registered repository formats
    Formats(commands::formats::FormatsArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),

    /// Drive a single component from a session file
    Plugin(commands::plugin::PluginArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(self.global.level());

        let global = &self.global;
        match self.command {
            Commands::List(args) => commands::run::execute(Operation::List, args.into(), global),
            Commands::Extract(args) => commands::run::execute(Operation::Extract, args.into(), global),
            Commands::Update(args) => commands::run::execute(Operation::Update, args.into(), global),
            Commands::ExtractOrUpdt(args) => {
                commands::run::execute(Operation::ExtractOrUpdate, args.into(), global)
            }
            Commands::Commit(args) => commands::run::execute(Operation::Commit, args.into(), global),
            Commands::Rebase(args) => commands::run::execute(Operation::Rebase, args.into(), global),
            Commands::Deliver(args) => commands::run::execute(Operation::Deliver, args.into(), global),
            Commands::Execute(args) => commands::run::execute(Operation::Execute, args.into(), global),
            Commands::Dump(args) => commands::run::execute(Operation::Dump, args.into(), global),
            Commands::DumpActual(args) => {
                commands::run::execute(Operation::DumpActual, args.into(), global)
            }
            Commands::DumpHead(args) => commands::run::execute(Operation::DumpHead, args.into(), global),
            Commands::Formats(args) => commands::formats::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
            Commands::Plugin(args) => commands::plugin::execute(args, global),
        }
    }
}

/// Base name of the running executable, `deptools` when unknown.
pub fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_ref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "deptools".to_string())
}

/// Messages go to stderr as `<progname>: <level>: <message>`. `RUST_LOG`
/// overrides the level selected on the command line.
fn init_logging(level: LevelFilter) {
    let program = program_name();
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(move |buf, record| {
            writeln!(
                buf,
                "{}: {}: {}",
                program,
                record.level().as_str().to_lowercase(),
                record.args()
            )
        })
        .try_init();
}
