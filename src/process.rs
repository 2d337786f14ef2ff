//! External tool invocation
//!
//! Backends never change the process working directory. Every subprocess is
//! described by a [`ToolCommand`] (program plus argument vector) and run with
//! an explicit working directory, so there is nothing to restore when a
//! command fails.
//!
//! This uses the system tools (`git`, `hg`, `svn`, `tar`, `curl`, `scp`,
//! `unzip`) directly, which picks up whatever authentication the user has
//! configured for them (SSH keys, credential helpers, `.netrc`, ...).

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use log::debug;

use crate::error::{Error, Result};

/// An external command line, built up before it is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    ignore_status: bool,
}

impl ToolCommand {
    /// Start a command line for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            ignore_status: false,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Do not treat a non-zero exit status as an error.
    pub fn ignore_status(mut self, ignore: bool) -> Self {
        self.ignore_status = ignore;
        self
    }

    /// The program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument vector, without the program name.
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Quoted rendering of the full command line, used in logs and errors.
    ///
    /// ```
    /// use deptools::process::ToolCommand;
    ///
    /// let cmd = ToolCommand::new("git").args(["fetch", "origin"]);
    /// assert_eq!(cmd.display(), "'git' 'fetch' 'origin'");
    /// ```
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .map(|a| format!("'{}'", a))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self, cwd: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(cwd);
        command
    }

    /// Run the command in `cwd` with inherited standard streams.
    ///
    /// `component` names the component the command runs for and is used to
    /// attribute errors.
    pub fn run(&self, component: &str, cwd: &Path) -> Result<()> {
        debug!("{}: running {} in {}", component, self.display(), cwd.display());
        let status = self
            .command(cwd)
            .status()
            .map_err(|e| self.spawn_error(component, e))?;
        self.check_status(component, status)
    }

    /// Run the command in `cwd` and return its standard output.
    ///
    /// Standard error is inherited so tool diagnostics stay visible.
    pub fn output(&self, component: &str, cwd: &Path) -> Result<String> {
        debug!("{}: running {} in {}", component, self.display(), cwd.display());
        let output = self
            .command(cwd)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| self.spawn_error(component, e))?;
        self.check_status(component, output.status)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn_error(&self, component: &str, error: std::io::Error) -> Error {
        Error::backend(
            component,
            format!("cannot run {}: {}", self.display(), error),
        )
    }

    fn check_status(&self, component: &str, status: ExitStatus) -> Result<()> {
        if status.success() || self.ignore_status {
            return Ok(());
        }
        let message = match status.code() {
            Some(code) => format!(
                "command returned non-zero status {}: {}",
                code,
                self.display()
            ),
            None => format!("command terminated by signal: {}", self.display()),
        };
        Err(Error::backend(component, message))
    }
}
