//! Local path backend
//!
//! A path component references an existing file or directory on the local
//! filesystem. Nothing is fetched: `extract` computes the content digest of
//! the path and checks it against a pinned revision.
//!
//! ```yaml
//! sysroot:
//!   format: path
//!   repos: file:///opt/sysroot     # or /opt/sysroot
//!   revision: 5b1c0e...            # optional digest pin, HEAD by default
//!   digest_content: true           # hash file contents, not only sizes
//!   ignore_status: false           # tolerate unreadable entries
//! ```

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::registry::PluginRegistration;
use super::{execute_in, OpArgs, SourceManager};
use crate::defaults::HEAD_REVISION;
use crate::digest::Digester;
use crate::error::{Error, Result};
use crate::manifest::RepositoryDescriptor;
use crate::workspace::Workspace;

pub const FORMAT: &str = "path";

pub fn registration() -> PluginRegistration {
    PluginRegistration {
        format: FORMAT,
        description: "path reference manager",
        construct,
        restore,
    }
}

fn construct(
    name: &str,
    descriptor: &RepositoryDescriptor,
    _workspace: &Workspace,
) -> Result<Box<dyn SourceManager>> {
    Ok(Box::new(PathManager::new(name, descriptor)?))
}

fn restore(record: serde_yaml::Value, _workspace: &Workspace) -> Result<Box<dyn SourceManager>> {
    let component: PathComponent = serde_yaml::from_value(record)?;
    Ok(Box::new(PathManager { component }))
}

/// Persistent state of a path component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathComponent {
    pub name: String,
    pub descriptor: RepositoryDescriptor,
    pub path: PathBuf,
    pub digest_content: bool,
    pub ignore_status: bool,
}

#[derive(Debug, Clone)]
pub struct PathManager {
    component: PathComponent,
}

impl PathManager {
    pub fn new(name: &str, descriptor: &RepositoryDescriptor) -> Result<Self> {
        let repos = descriptor.require_repos(name)?;
        let path = if repos.starts_with('/') {
            PathBuf::from(repos)
        } else if let Some(rest) = repos.strip_prefix("file://").filter(|p| p.starts_with('/')) {
            PathBuf::from(rest)
        } else {
            return Err(Error::config(format!(
                "path component {} must be an absolute path or a file:// URI: {}",
                name, repos
            )));
        };

        Ok(Self {
            component: PathComponent {
                name: name.to_string(),
                descriptor: descriptor.clone(),
                path,
                digest_content: descriptor
                    .bool_field(name, "digest_content")?
                    .unwrap_or(false),
                ignore_status: descriptor
                    .bool_field(name, "ignore_status")?
                    .unwrap_or(false),
            },
        })
    }

    pub fn component(&self) -> &PathComponent {
        &self.component
    }

    /// The directory commands run in: the path itself, or its parent for a
    /// file.
    fn dirname(&self) -> &Path {
        let path = &self.component.path;
        if path.is_dir() {
            path
        } else {
            path.parent().unwrap_or(path)
        }
    }

    fn check_path(&self) -> Result<()> {
        if self.component.path.exists() {
            Ok(())
        } else {
            Err(Error::backend(
                &self.component.name,
                format!(
                    "cannot access component path: {}",
                    self.component.path.display()
                ),
            ))
        }
    }

    /// Digest of the referenced path and the number of skipped entries.
    fn digest(&self) -> Result<(String, usize)> {
        let path = &self.component.path;
        let digester = Digester::new()
            .digest_content(self.component.digest_content)
            .ignore_errors(self.component.ignore_status);

        let (base, entry) = if path.is_dir() {
            (path.as_path(), ".".to_string())
        } else {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::backend(
                        &self.component.name,
                        format!("invalid component path: {}", path.display()),
                    )
                })?;
            (self.dirname(), file_name)
        };

        let (digest, report) = digester
            .digest_paths(base, &[entry.as_str()])
            .map_err(|e| {
                Error::backend(
                    &self.component.name,
                    format!("cannot compute digest for {}: {}", path.display(), e),
                )
            })?;
        Ok((digest, report.skipped.len()))
    }

    fn nothing_to_do(&self, what: &str) -> Result<()> {
        info!(
            "{} {}: nothing to do for path",
            what,
            self.component.path.display()
        );
        Ok(())
    }
}

impl SourceManager for PathManager {
    fn name(&self) -> &str {
        &self.component.name
    }

    fn format(&self) -> &'static str {
        FORMAT
    }

    fn descriptor(&self) -> &RepositoryDescriptor {
        &self.component.descriptor
    }

    fn local_path(&self) -> &Path {
        &self.component.path
    }

    fn extract(&self, _args: &OpArgs) -> Result<()> {
        self.check_path()?;
        let (digest, skipped) = self.digest()?;
        let expected = self.component.descriptor.revision();

        if expected != HEAD_REVISION {
            if skipped > 0 {
                warn!(
                    "{}: {} unreadable entries left out of the digest, the revision check is not reliable",
                    self.component.name, skipped
                );
            }
            if digest != expected {
                return Err(Error::RevisionMismatch {
                    component: self.component.name.clone(),
                    expected: expected.to_string(),
                    actual: digest,
                });
            }
        }
        info!(
            "{}: {} digest is {}",
            self.component.name,
            self.component.path.display(),
            digest
        );
        Ok(())
    }

    fn update(&self, _args: &OpArgs) -> Result<()> {
        self.nothing_to_do("Update")
    }

    /// Always re-checks the digest, there is no separate update step.
    fn extract_or_update(&self, args: &OpArgs) -> Result<()> {
        self.extract(args)
    }

    fn commit(&self, _args: &OpArgs) -> Result<()> {
        self.nothing_to_do("Commit")
    }

    fn rebase(&self, _args: &OpArgs) -> Result<()> {
        self.nothing_to_do("Rebase")
    }

    fn deliver(&self, _args: &OpArgs) -> Result<()> {
        self.nothing_to_do("Deliver")
    }

    fn execute(&self, args: &OpArgs) -> Result<()> {
        self.check_path()?;
        execute_in(&self.component.name, self.dirname(), args)
    }

    fn get_actual_revision(&self) -> Result<String> {
        self.check_path()
            .and_then(|_| self.digest())
            .map(|(digest, _)| digest)
            .map_err(|e| {
                Error::backend(
                    &self.component.name,
                    format!("cannot get actual revision: {}", e),
                )
            })
    }

    fn list(&self) -> String {
        format!(
            "{},{},{}",
            FORMAT,
            self.component.descriptor.revision(),
            self.component.descriptor.repos.as_deref().unwrap_or_default()
        )
    }

    fn record(&self) -> Result<serde_yaml::Value> {
        Ok(serde_yaml::to_value(&self.component)?)
    }
}
