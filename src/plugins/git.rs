//! Git backend
//!
//! Every git component is cloned with `--reference` to a bare mirror kept in
//! the workspace cache, so several workspaces or components sharing a
//! repository only download objects once:
//!
//! ```text
//! .deptools/cache/plugins/git/<aa>/<rest-of-sha1(repos)>/<basename>.git
//! ```
//!
//! The local copy is named after `alias`, or the repository basename without
//! its `.git` suffix. The checked out commit is the pinned `revision`, or the
//! head of `label` (default `master`) when the revision is `HEAD`.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use super::registry::PluginRegistration;
use super::{basename, execute_in, prepare_destination, require_present, OpArgs, SourceManager};
use crate::defaults::HEAD_REVISION;
use crate::error::Result;
use crate::manifest::RepositoryDescriptor;
use crate::process::ToolCommand;
use crate::workspace::Workspace;

pub const FORMAT: &str = "git";
pub const DEFAULT_LABEL: &str = "master";

pub fn registration() -> PluginRegistration {
    PluginRegistration {
        format: FORMAT,
        description: "git repository manager",
        construct,
        restore,
    }
}

fn construct(
    name: &str,
    descriptor: &RepositoryDescriptor,
    workspace: &Workspace,
) -> Result<Box<dyn SourceManager>> {
    Ok(Box::new(GitManager::new(name, descriptor, workspace)?))
}

fn restore(record: serde_yaml::Value, workspace: &Workspace) -> Result<Box<dyn SourceManager>> {
    Ok(Box::new(GitManager {
        component: serde_yaml::from_value(record)?,
        workspace: workspace.clone(),
    }))
}

/// Persistent state of a git component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitComponent {
    pub name: String,
    pub descriptor: RepositoryDescriptor,
    pub repos: String,
    pub label: String,
    pub revision: String,
    pub local_path: PathBuf,
    pub mirror: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GitManager {
    component: GitComponent,
    workspace: Workspace,
}

impl GitManager {
    pub fn new(name: &str, descriptor: &RepositoryDescriptor, workspace: &Workspace) -> Result<Self> {
        let repos = descriptor.require_repos(name)?.to_string();
        let repo_basename = basename(&repos).to_string();
        let dir = match &descriptor.alias {
            Some(alias) => alias.clone(),
            None => repo_basename
                .strip_suffix(".git")
                .unwrap_or(&repo_basename)
                .to_string(),
        };
        let label = descriptor
            .label
            .clone()
            .unwrap_or_else(|| DEFAULT_LABEL.to_string());
        let revision = descriptor.revision().to_string();
        let mirror_name = if repo_basename.ends_with(".git") {
            repo_basename.clone()
        } else {
            format!("{}.git", repo_basename)
        };
        let mirror = workspace.cache().entry(FORMAT, &repos, &mirror_name);

        Ok(Self {
            component: GitComponent {
                name: name.to_string(),
                descriptor: descriptor.clone(),
                local_path: workspace.resolve(&dir),
                repos,
                label,
                revision,
                mirror,
            },
            workspace: workspace.clone(),
        })
    }

    pub fn component(&self) -> &GitComponent {
        &self.component
    }

    fn git(&self) -> ToolCommand {
        ToolCommand::new(self.workspace.tools().git.as_str())
    }

    fn run_local(&self, cmd: ToolCommand) -> Result<()> {
        cmd.run(&self.component.name, &self.component.local_path)
    }

    fn tracking(&self) -> String {
        format!("origin/{}", self.component.label)
    }

    /// The pinned revision, or the upstream head of the label.
    fn reset_target(&self) -> String {
        if self.component.revision == HEAD_REVISION {
            self.tracking()
        } else {
            self.component.revision.clone()
        }
    }

    /// Create the bare mirror, or fetch into it when it already exists.
    fn refresh_mirror(&self) -> Result<()> {
        let name = &self.component.name;
        let mirror = &self.component.mirror;
        if mirror.exists() {
            info!("{}: fetching into mirror {}", name, mirror.display());
            return self.git().args(["fetch", "--prune"]).run(name, mirror);
        }
        self.workspace.cache().prepare_entry(mirror)?;
        info!("{}: creating mirror {}", name, mirror.display());
        self.git()
            .args(["clone", "--mirror", "--quiet"])
            .arg(&self.component.repos)
            .arg(mirror)
            .run(name, self.workspace.root())
    }
}

impl SourceManager for GitManager {
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
        &self.component.local_path
    }

    fn extract(&self, args: &OpArgs) -> Result<()> {
        let name = &self.component.name;
        let dest = &self.component.local_path;
        if !prepare_destination(name, dest, args.force)? {
            return Ok(());
        }
        self.refresh_mirror()?;

        info!("{}: cloning {} into {}", name, self.component.repos, dest.display());
        let cloned = self
            .git()
            .args(["clone", "-n", "--quiet", "--reference"])
            .arg(&self.component.mirror)
            .arg(&self.component.repos)
            .arg(dest)
            .run(name, self.workspace.root());
        if let Err(err) = cloned {
            // Leave no partial clone behind
            let _ = fs::remove_dir_all(dest);
            return Err(err);
        }

        self.run_local(self.git().args(["checkout", "--quiet", self.component.label.as_str()]))?;
        self.run_local(
            self.git()
                .args(["reset", "--quiet", "--hard"])
                .arg(self.reset_target()),
        )
    }

    fn update(&self, _args: &OpArgs) -> Result<()> {
        require_present(&self.component.name, &self.component.local_path)?;
        self.refresh_mirror()?;
        self.run_local(self.git().args(["fetch", "origin"]))?;
        self.run_local(
            self.git()
                .args(["merge", "--ff-only"])
                .arg(self.tracking()),
        )
    }

    fn commit(&self, args: &OpArgs) -> Result<()> {
        require_present(&self.component.name, &self.component.local_path)?;
        self.run_local(self.git().arg("commit").args(&args.args))
    }

    fn rebase(&self, _args: &OpArgs) -> Result<()> {
        require_present(&self.component.name, &self.component.local_path)?;
        self.run_local(self.git().args(["fetch", "origin"]))?;
        self.run_local(self.git().arg("rebase").arg(self.tracking()))
    }

    fn deliver(&self, args: &OpArgs) -> Result<()> {
        require_present(&self.component.name, &self.component.local_path)?;
        self.run_local(
            self.git()
                .args(["-c", "push.default=upstream", "push"])
                .args(&args.args),
        )
    }

    fn execute(&self, args: &OpArgs) -> Result<()> {
        execute_in(&self.component.name, &self.component.local_path, args)
    }

    fn get_actual_revision(&self) -> Result<String> {
        require_present(&self.component.name, &self.component.local_path)?;
        let output = self
            .git()
            .args(["rev-parse", "HEAD"])
            .output(&self.component.name, &self.component.local_path)?;
        Ok(output.trim().to_string())
    }

    fn list(&self) -> String {
        vcs_list_line(FORMAT, &self.component.label, &self.component.revision, &self.component.descriptor)
    }

    fn record(&self) -> Result<serde_yaml::Value> {
        Ok(serde_yaml::to_value(&self.component)?)
    }
}

/// `format,label@revision,repos[,alias]`, alias only when declared.
pub(crate) fn vcs_list_line(
    format: &str,
    label: &str,
    revision: &str,
    descriptor: &RepositoryDescriptor,
) -> String {
    let mut line = format!(
        "{},{}@{},{}",
        format,
        label,
        revision,
        descriptor.repos.as_deref().unwrap_or_default()
    );
    if let Some(alias) = &descriptor.alias {
        line.push(',');
        line.push_str(alias);
    }
    line
}
