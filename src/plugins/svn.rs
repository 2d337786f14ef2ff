//! Subversion backend
//!
//! The checked out URL is `<repos>/trunk` when `label` is `trunk` (the
//! default) and `<repos>/branches/<label>` otherwise. `revision` must be a
//! revision number or `HEAD`. Rebase and deliver have no meaning for a
//! centralized repository and fail.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use super::git::vcs_list_line;
use super::registry::PluginRegistration;
use super::{basename, execute_in, prepare_destination, require_present, OpArgs, SourceManager};
use crate::defaults::HEAD_REVISION;
use crate::error::{Error, Result};
use crate::manifest::RepositoryDescriptor;
use crate::process::ToolCommand;
use crate::workspace::Workspace;

pub const FORMAT: &str = "svn";
pub const DEFAULT_LABEL: &str = "trunk";

pub fn registration() -> PluginRegistration {
    PluginRegistration {
        format: FORMAT,
        description: "subversion repository manager",
        construct,
        restore,
    }
}

fn construct(
    name: &str,
    descriptor: &RepositoryDescriptor,
    workspace: &Workspace,
) -> Result<Box<dyn SourceManager>> {
    Ok(Box::new(SvnManager::new(name, descriptor, workspace)?))
}

fn restore(record: serde_yaml::Value, workspace: &Workspace) -> Result<Box<dyn SourceManager>> {
    Ok(Box::new(SvnManager {
        component: serde_yaml::from_value(record)?,
        workspace: workspace.clone(),
    }))
}

/// Persistent state of a subversion component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvnComponent {
    pub name: String,
    pub descriptor: RepositoryDescriptor,
    pub repos: String,
    pub label: String,
    pub branch: String,
    pub revision: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SvnManager {
    component: SvnComponent,
    workspace: Workspace,
}

impl SvnManager {
    pub fn new(name: &str, descriptor: &RepositoryDescriptor, workspace: &Workspace) -> Result<Self> {
        let repos = descriptor.require_repos(name)?.to_string();
        let revision = descriptor.revision().to_string();
        if revision != HEAD_REVISION && revision.parse::<u64>().is_err() {
            return Err(Error::config(format!(
                "svn revision must be a number or HEAD in component {}: {}",
                name, revision
            )));
        }
        let label = descriptor
            .label
            .clone()
            .unwrap_or_else(|| DEFAULT_LABEL.to_string());
        let branch = if label == DEFAULT_LABEL {
            label.clone()
        } else {
            format!("branches/{}", label)
        };
        let dir = descriptor
            .alias
            .clone()
            .unwrap_or_else(|| basename(&repos).to_string());

        Ok(Self {
            component: SvnComponent {
                name: name.to_string(),
                descriptor: descriptor.clone(),
                repos,
                label,
                branch,
                revision,
                local_path: workspace.resolve(&dir),
            },
            workspace: workspace.clone(),
        })
    }

    pub fn component(&self) -> &SvnComponent {
        &self.component
    }

    /// URL of the tracked branch.
    pub fn branch_url(&self) -> String {
        format!(
            "{}/{}",
            self.component.repos.trim_end_matches('/'),
            self.component.branch
        )
    }

    fn svn(&self) -> ToolCommand {
        ToolCommand::new(self.workspace.tools().svn.as_str())
    }

    fn run_local(&self, cmd: ToolCommand) -> Result<()> {
        cmd.run(&self.component.name, &self.component.local_path)
    }
}

impl SourceManager for SvnManager {
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
        let url = self.branch_url();
        info!("{}: checking out {} into {}", name, url, dest.display());
        let checked_out = self
            .svn()
            .args(["checkout", "--quiet", "-r", self.component.revision.as_str()])
            .arg(&url)
            .arg(dest)
            .run(name, self.workspace.root());
        if let Err(err) = checked_out {
            let _ = fs::remove_dir_all(dest);
            return Err(err);
        }
        Ok(())
    }

    fn update(&self, _args: &OpArgs) -> Result<()> {
        require_present(&self.component.name, &self.component.local_path)?;
        self.run_local(
            self.svn()
                .args(["update", "-r", self.component.revision.as_str()]),
        )
    }

    fn commit(&self, args: &OpArgs) -> Result<()> {
        require_present(&self.component.name, &self.component.local_path)?;
        self.run_local(self.svn().arg("commit").args(&args.args))
    }

    fn execute(&self, args: &OpArgs) -> Result<()> {
        execute_in(&self.component.name, &self.component.local_path, args)
    }

    fn get_actual_revision(&self) -> Result<String> {
        require_present(&self.component.name, &self.component.local_path)?;
        let output = self
            .svn()
            .args(["info", "--show-item", "revision"])
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
