//! # Dependency orchestration
//!
//! [`Dependencies`] binds a manifest, the active configuration and the
//! resolved components, and runs commands over them:
//!
//! - `dump`, `dump_actual` and `dump_head` run once over the manifest;
//! - every other command runs per component, in declaration order.
//!
//! Components whose backend does not implement a command are skipped with a
//! warning. By default the first failing component stops the run; with
//! `keep_going` every component is attempted and the failures are reported
//! together as [`Error::ComponentsFailed`].

use std::io::Write;

use log::{debug, error};

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::plugins::registry::PluginRegistry;
use crate::plugins::{dispatch, OpArgs, Operation, SourceManager};
use crate::workspace::Workspace;

/// Options of one orchestrator run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Restrict the run to these components. Empty means the whole
    /// configuration.
    pub filter: Vec<String>,
    pub args: OpArgs,
    /// Attempt every component even after a failure.
    pub keep_going: bool,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// The resolved dependencies of one configuration.
#[derive(Debug)]
pub struct Dependencies {
    manifest: Manifest,
    configuration: String,
    components: Vec<Box<dyn SourceManager>>,
}

impl Dependencies {
    /// Validate `manifest` and resolve `configuration`.
    pub fn new(
        manifest: Manifest,
        configuration: &str,
        registry: &PluginRegistry,
        workspace: &Workspace,
    ) -> Result<Self> {
        let components = manifest.resolve(configuration, registry, workspace)?;
        debug!(
            "configuration '{}' resolved to {} components",
            configuration,
            components.len()
        );
        Ok(Self {
            manifest,
            configuration: configuration.to_string(),
            components,
        })
    }

    /// Load the manifest at `source` (`-` for standard input) and resolve
    /// `configuration`.
    pub fn load(
        source: &str,
        configuration: &str,
        registry: &PluginRegistry,
        workspace: &Workspace,
    ) -> Result<Self> {
        Self::new(Manifest::load(source)?, configuration, registry, workspace)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    pub fn components(&self) -> &[Box<dyn SourceManager>] {
        &self.components
    }

    /// The components selected by `filter`, in declaration order.
    ///
    /// Every filtered name must belong to the active configuration.
    pub fn select(&self, filter: &[String]) -> Result<Vec<&dyn SourceManager>> {
        if let Some(unknown) = filter
            .iter()
            .find(|name| !self.components.iter().any(|c| c.name() == name.as_str()))
        {
            return Err(Error::validation(format!(
                "component {} is not in configuration {}",
                unknown, self.configuration
            )));
        }
        Ok(self
            .components
            .iter()
            .filter(|c| filter.is_empty() || filter.iter().any(|n| n == c.name()))
            .map(|c| c.as_ref())
            .collect())
    }

    /// Run `op` and write any textual output to `out`.
    pub fn exec(&self, op: Operation, options: &RunOptions, out: &mut dyn Write) -> Result<RunSummary> {
        let selected = self.select(&options.filter)?;

        if op.is_manifest_level() {
            match op {
                Operation::DumpActual => self.manifest.dump_actual(&selected, out)?,
                Operation::DumpHead => self.manifest.dump_head(&selected, out)?,
                _ => self.manifest.dump(out)?,
            }
            return Ok(RunSummary {
                executed: selected.iter().map(|c| c.name().to_string()).collect(),
                ..RunSummary::default()
            });
        }

        let mut summary = RunSummary::default();
        for component in selected {
            let name = component.name().to_string();
            debug!("{}: {}", name, op);
            match dispatch(component, op, &options.args, out) {
                Ok(true) => summary.executed.push(name),
                Ok(false) => summary.skipped.push(name),
                Err(err) => {
                    let err = attribute(&name, err);
                    if !options.keep_going {
                        return Err(err);
                    }
                    error!("{}", err);
                    summary.failed.push(name);
                }
            }
        }

        if !summary.failed.is_empty() {
            return Err(Error::ComponentsFailed {
                command: op.name().to_string(),
                components: summary.failed,
            });
        }
        Ok(summary)
    }
}

/// Make sure an error names the component it happened in.
fn attribute(component: &str, err: Error) -> Error {
    match err {
        Error::Io(e) => Error::backend(component, e.to_string()),
        Error::Yaml(e) => Error::backend(component, e.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dirs: TempDir,
        a: String,
        b: String,
    }

    fn fixture() -> Fixture {
        let dirs = TempDir::new().unwrap();
        let a = dirs.path().join("a");
        let b = dirs.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("f"), "1").unwrap();
        fs::write(b.join("g"), "22").unwrap();
        Fixture {
            a: a.to_string_lossy().into_owned(),
            b: b.to_string_lossy().into_owned(),
            _dirs: dirs,
        }
    }

    fn dependencies(yaml: &str) -> Dependencies {
        let manifest = Manifest::parse(yaml, "test").unwrap();
        Dependencies::new(
            manifest,
            "default",
            &PluginRegistry::with_builtins(),
            &Workspace::new("/work"),
        )
        .unwrap()
    }

    fn two_paths(f: &Fixture, b_revision: &str) -> String {
        format!(
            "configurations:\n  default: [a, b]\n  only_b: [b]\nrepositories:\n  a:\n    format: path\n    repos: {}\n  b:\n    format: path\n    repos: {}\n    revision: {}\n",
            f.a, f.b, b_revision
        )
    }

    fn run(deps: &Dependencies, op: Operation, options: &RunOptions) -> (Result<RunSummary>, String) {
        let mut out = Vec::new();
        let result = deps.exec(op, options, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_list_in_declaration_order() {
        let f = fixture();
        let deps = dependencies(&two_paths(&f, "HEAD"));
        let (result, out) = run(&deps, Operation::List, &RunOptions::default());
        let summary = result.unwrap();
        assert_eq!(summary.executed, vec!["a", "b"]);
        assert_eq!(out, format!("path,HEAD,{}\npath,HEAD,{}\n", f.a, f.b));
    }

    #[test]
    fn test_filter() {
        let f = fixture();
        let deps = dependencies(&two_paths(&f, "HEAD"));
        let options = RunOptions {
            filter: vec!["b".to_string()],
            ..RunOptions::default()
        };
        let (result, out) = run(&deps, Operation::List, &options);
        assert_eq!(result.unwrap().executed, vec!["b"]);
        assert_eq!(out, format!("path,HEAD,{}\n", f.b));
    }

    #[test]
    fn test_unknown_filter_name() {
        let f = fixture();
        let deps = dependencies(&two_paths(&f, "HEAD"));
        let options = RunOptions {
            filter: vec!["ghost".to_string()],
            ..RunOptions::default()
        };
        let (result, _) = run(&deps, Operation::List, &options);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_fail_fast_stops_at_first_failure() {
        let f = fixture();
        let yaml = format!(
            "configurations:\n  default: [bad, a]\nrepositories:\n  bad:\n    format: path\n    repos: {}\n    revision: deadbeef\n  a:\n    format: path\n    repos: {}\n",
            f.b, f.a
        );
        let deps = dependencies(&yaml);
        let (result, _) = run(&deps, Operation::Extract, &RunOptions::default());
        assert!(matches!(result, Err(Error::RevisionMismatch { .. })));
    }

    #[test]
    fn test_keep_going_reports_all_failures() {
        let f = fixture();
        let deps = dependencies(&two_paths(&f, "deadbeef"));
        let options = RunOptions {
            keep_going: true,
            ..RunOptions::default()
        };
        let (result, _) = run(&deps, Operation::Extract, &options);
        match result {
            Err(Error::ComponentsFailed {
                command,
                components,
            }) => {
                assert_eq!(command, "extract");
                assert_eq!(components, vec!["b"]);
            }
            other => panic!("expected ComponentsFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_dump_is_manifest_level() {
        let f = fixture();
        let yaml = two_paths(&f, "HEAD");
        let deps = dependencies(&yaml);
        let (result, out) = run(&deps, Operation::Dump, &RunOptions::default());
        result.unwrap();
        let dumped = Manifest::parse(&out, "dump").unwrap();
        assert_eq!(&dumped, deps.manifest());
    }

    #[test]
    fn test_dump_actual_only_touches_selected() {
        let f = fixture();
        let deps = dependencies(&two_paths(&f, "HEAD"));
        let options = RunOptions {
            filter: vec!["a".to_string()],
            ..RunOptions::default()
        };
        let (result, out) = run(&deps, Operation::DumpActual, &options);
        result.unwrap();

        let dumped = Manifest::parse(&out, "dump").unwrap();
        let a_revision = dumped.descriptor("a").unwrap().revision().to_string();
        assert_eq!(a_revision.len(), 40);
        assert_eq!(dumped.descriptor("b").unwrap().revision(), "HEAD");
    }

    #[test]
    fn test_dump_head() {
        let f = fixture();
        let deps = dependencies(&two_paths(&f, "abc"));
        let (result, out) = run(&deps, Operation::DumpHead, &RunOptions::default());
        result.unwrap();
        let dumped = Manifest::parse(&out, "dump").unwrap();
        assert_eq!(dumped.descriptor("b").unwrap().revision(), "HEAD");
    }

    #[test]
    fn test_validation_failure_constructs_nothing() {
        let manifest = Manifest::parse(
            "configurations: {default: [a, ghost]}\nrepositories: {a: {format: path, repos: /x}}",
            "test",
        )
        .unwrap();
        let result = Dependencies::new(
            manifest,
            "default",
            &PluginRegistry::with_builtins(),
            &Workspace::new("/work"),
        );
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_unsupported_operation_is_skipped() {
        let yaml = "configurations: {default: [lib]}\nrepositories: {lib: {format: hg, repos: https://hg.example.org/lib}}";
        let deps = dependencies(yaml);
        let (result, _) = run(&deps, Operation::Rebase, &RunOptions::default());
        let summary = result.unwrap();
        assert_eq!(summary.skipped, vec!["lib"]);
        assert!(summary.executed.is_empty());
    }
}
