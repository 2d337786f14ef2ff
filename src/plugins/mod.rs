//! # Source backends
//!
//! Each supported `format` tag is handled by a backend implementing
//! [`SourceManager`]. Backends are created through the [`registry`] from a
//! component name, its [`RepositoryDescriptor`] and the [`Workspace`].
//!
//! ## Operations
//!
//! | Operation         | Effect                                                |
//! |-------------------|-------------------------------------------------------|
//! | `list`            | print a one-line summary of the component             |
//! | `extract`         | create the local copy (no-op if it exists)            |
//! | `update`          | bring an existing local copy up to date               |
//! | `extract_or_updt` | `update` if the copy exists, `extract` otherwise      |
//! | `commit`          | record local changes                                  |
//! | `rebase`          | rebase local changes on the upstream label            |
//! | `deliver`         | push local changes upstream                           |
//! | `execute`         | run an arbitrary command inside the local copy        |
//! | `dump`            | print the component description                       |
//! | `dump_actual`     | same, with the actual local revision                  |
//! | `dump_head`       | same, with the upstream head revision                 |
//!
//! A backend declares which optional operations it implements through
//! [`Capabilities`]. The orchestrator checks them with
//! [`Capabilities::supports`] before dispatching, and skips unsupported
//! operations with a warning.

pub mod git;
pub mod hg;
pub mod path;
pub mod registry;
pub mod svn;
pub mod tar;

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use log::{info, warn};

use crate::defaults::HEAD_REVISION;
use crate::error::{Error, Result};
use crate::manifest::RepositoryDescriptor;
use crate::process::ToolCommand;

/// A lifecycle or manifest operation that can be applied to components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Extract,
    Update,
    ExtractOrUpdate,
    Commit,
    Rebase,
    Deliver,
    Execute,
    Dump,
    DumpActual,
    DumpHead,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::List,
        Operation::Extract,
        Operation::Update,
        Operation::ExtractOrUpdate,
        Operation::Commit,
        Operation::Rebase,
        Operation::Deliver,
        Operation::Execute,
        Operation::Dump,
        Operation::DumpActual,
        Operation::DumpHead,
    ];

    /// The command name as typed on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Extract => "extract",
            Operation::Update => "update",
            Operation::ExtractOrUpdate => "extract_or_updt",
            Operation::Commit => "commit",
            Operation::Rebase => "rebase",
            Operation::Deliver => "deliver",
            Operation::Execute => "execute",
            Operation::Dump => "dump",
            Operation::DumpActual => "dump_actual",
            Operation::DumpHead => "dump_head",
        }
    }

    /// Manifest-level operations run once over the whole manifest instead of
    /// once per component.
    pub fn is_manifest_level(self) -> bool {
        matches!(
            self,
            Operation::Dump | Operation::DumpActual | Operation::DumpHead
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace('-', "_");
        let normalized = match normalized.as_str() {
            "extract_or_update" => "extract_or_updt",
            other => other,
        };
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == normalized)
            .ok_or_else(|| Error::validation(format!("unknown command: {}", s)))
    }
}

/// Optional operations a backend implements.
///
/// `list` and `dump` are always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub extract: bool,
    pub update: bool,
    pub commit: bool,
    pub rebase: bool,
    pub deliver: bool,
    pub execute: bool,
    pub actual_revision: bool,
    pub head_revision: bool,
}

impl Capabilities {
    pub const ALL: Capabilities = Capabilities {
        extract: true,
        update: true,
        commit: true,
        rebase: true,
        deliver: true,
        execute: true,
        actual_revision: true,
        head_revision: true,
    };

    pub fn supports(&self, op: Operation) -> bool {
        match op {
            Operation::List | Operation::Dump => true,
            Operation::Extract => self.extract,
            Operation::Update => self.update,
            Operation::ExtractOrUpdate => self.extract && self.update,
            Operation::Commit => self.commit,
            Operation::Rebase => self.rebase,
            Operation::Deliver => self.deliver,
            Operation::Execute => self.execute,
            Operation::DumpActual => self.actual_revision,
            Operation::DumpHead => self.head_revision,
        }
    }
}

/// Per-invocation arguments of a lifecycle operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpArgs {
    /// Extra arguments passed through to the underlying tool (`commit`,
    /// `deliver`) or the command to run (`execute`).
    pub args: Vec<String>,
    /// Replace an existing local copy on `extract`.
    pub force: bool,
}

impl OpArgs {
    pub fn with_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            force: false,
        }
    }
}

/// The contract every backend implements.
///
/// Lifecycle operations that a backend does not support return
/// [`Error::UnsupportedOperation`]; callers should consult
/// [`SourceManager::capabilities`] first.
pub trait SourceManager: fmt::Debug {
    /// Component name, as declared in the manifest.
    fn name(&self) -> &str;

    /// Backend format tag.
    fn format(&self) -> &'static str;

    /// The descriptor this component was built from.
    fn descriptor(&self) -> &RepositoryDescriptor;

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    /// Absolute path of the local copy.
    fn local_path(&self) -> &Path;

    /// Whether the local copy exists.
    fn is_present(&self) -> bool {
        self.local_path().exists()
    }

    fn extract(&self, args: &OpArgs) -> Result<()>;

    fn update(&self, args: &OpArgs) -> Result<()>;

    fn extract_or_update(&self, args: &OpArgs) -> Result<()> {
        if self.is_present() {
            self.update(args)
        } else {
            self.extract(args)
        }
    }

    fn commit(&self, _args: &OpArgs) -> Result<()> {
        Err(self.unsupported(Operation::Commit))
    }

    fn rebase(&self, _args: &OpArgs) -> Result<()> {
        Err(self.unsupported(Operation::Rebase))
    }

    fn deliver(&self, _args: &OpArgs) -> Result<()> {
        Err(self.unsupported(Operation::Deliver))
    }

    fn execute(&self, args: &OpArgs) -> Result<()>;

    /// The revision of the local copy.
    fn get_actual_revision(&self) -> Result<String>;

    /// The upstream head revision.
    fn get_head_revision(&self) -> Result<String> {
        Ok(HEAD_REVISION.to_string())
    }

    /// One-line summary, comma separated, starting with the format tag.
    fn list(&self) -> String;

    /// The serializable state of the backend, used for session files.
    fn record(&self) -> Result<serde_yaml::Value>;

    /// The component description as a one-entry YAML map.
    fn dump(&self) -> Result<String> {
        dump_descriptor(self.name(), self.descriptor())
    }

    fn dump_actual(&self) -> Result<String> {
        let revision = self.get_actual_revision()?;
        dump_descriptor(self.name(), &self.descriptor().with_revision(revision))
    }

    fn dump_head(&self) -> Result<String> {
        let revision = self.get_head_revision()?;
        dump_descriptor(self.name(), &self.descriptor().with_revision(revision))
    }

    fn unsupported(&self, op: Operation) -> Error {
        Error::UnsupportedOperation {
            format: self.format().to_string(),
            operation: op.name().to_string(),
            component: self.name().to_string(),
        }
    }
}

fn dump_descriptor(name: &str, descriptor: &RepositoryDescriptor) -> Result<String> {
    let mut map = serde_yaml::Mapping::new();
    map.insert(
        serde_yaml::Value::String(name.to_string()),
        serde_yaml::to_value(descriptor)?,
    );
    Ok(serde_yaml::to_string(&map)?)
}

/// Apply `op` to one component, writing any textual output to `out`.
///
/// Returns `false` when the backend does not implement the operation, in
/// which case a warning is logged and nothing is done.
pub fn dispatch(
    manager: &dyn SourceManager,
    op: Operation,
    args: &OpArgs,
    out: &mut dyn Write,
) -> Result<bool> {
    if !manager.capabilities().supports(op) {
        warn!(
            "{}: {} format does not implement {}, skipped",
            manager.name(),
            manager.format(),
            op
        );
        return Ok(false);
    }
    match op {
        Operation::List => writeln!(out, "{}", manager.list())?,
        Operation::Extract => manager.extract(args)?,
        Operation::Update => manager.update(args)?,
        Operation::ExtractOrUpdate => manager.extract_or_update(args)?,
        Operation::Commit => manager.commit(args)?,
        Operation::Rebase => manager.rebase(args)?,
        Operation::Deliver => manager.deliver(args)?,
        Operation::Execute => manager.execute(args)?,
        Operation::Dump => out.write_all(manager.dump()?.as_bytes())?,
        Operation::DumpActual => out.write_all(manager.dump_actual()?.as_bytes())?,
        Operation::DumpHead => out.write_all(manager.dump_head()?.as_bytes())?,
    }
    Ok(true)
}

/// Last path segment of a URL or path, ignoring trailing slashes.
pub(crate) fn basename(repos: &str) -> &str {
    let trimmed = repos.trim_end_matches('/');
    trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed)
}

/// Fail unless the local copy of `name` exists.
pub(crate) fn require_present(name: &str, path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::backend(
            name,
            format!("local copy not found: {}", path.display()),
        ))
    }
}

/// Prepare `path` for extraction.
///
/// Returns `false` when the path already exists and `force` is not set, in
/// which case there is nothing to extract. With `force`, an existing path is
/// removed first.
pub(crate) fn prepare_destination(name: &str, path: &Path, force: bool) -> Result<bool> {
    if fs::symlink_metadata(path).is_err() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        return Ok(true);
    }
    if !force {
        info!("{}: Skipping extraction of existing {}", name, path.display());
        return Ok(false);
    }
    info!("{}: removing existing {}", name, path.display());
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

/// Run a user command inside the local copy of a component.
pub(crate) fn execute_in(name: &str, path: &Path, args: &OpArgs) -> Result<()> {
    require_present(name, path)?;
    let (program, rest) = args
        .args
        .split_first()
        .ok_or_else(|| Error::config(format!("no command given to execute in component {}", name)))?;
    ToolCommand::new(program.as_str()).args(rest).run(name, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn test_operation_aliases() {
        assert_eq!(
            "extract_or_update".parse::<Operation>().unwrap(),
            Operation::ExtractOrUpdate
        );
        assert_eq!("dump-head".parse::<Operation>().unwrap(), Operation::DumpHead);
        assert!("frobnicate".parse::<Operation>().is_err());
    }

    #[test]
    fn test_manifest_level_operations() {
        let manifest_level: Vec<_> = Operation::ALL
            .into_iter()
            .filter(|op| op.is_manifest_level())
            .collect();
        assert_eq!(
            manifest_level,
            vec![Operation::Dump, Operation::DumpActual, Operation::DumpHead]
        );
    }

    #[test]
    fn test_capabilities_supports() {
        let caps = Capabilities {
            rebase: false,
            ..Capabilities::ALL
        };
        assert!(caps.supports(Operation::List));
        assert!(caps.supports(Operation::Update));
        assert!(!caps.supports(Operation::Rebase));

        let read_only = Capabilities {
            update: false,
            ..Capabilities::ALL
        };
        assert!(!read_only.supports(Operation::ExtractOrUpdate));
        assert!(read_only.supports(Operation::Dump));
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("https://example.org/a/tools.git"), "tools.git");
        assert_eq!(basename("https://example.org/a/tools/"), "tools");
        assert_eq!(basename("git@host:tools.git"), "tools.git");
        assert_eq!(basename("/opt/zlib"), "zlib");
        assert_eq!(basename("plain"), "plain");
    }

    #[test]
    fn test_prepare_destination() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("a/b");

        assert!(prepare_destination("c", &dest, false).unwrap());
        assert!(dest.parent().unwrap().is_dir());

        fs::create_dir(&dest).unwrap();
        assert!(!prepare_destination("c", &dest, false).unwrap());
        assert!(dest.exists());

        assert!(prepare_destination("c", &dest, true).unwrap());
        assert!(!dest.exists());
    }

    #[test]
    fn test_execute_requires_command() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = execute_in("c", temp.path(), &OpArgs::default()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("no command given"));
    }
}
