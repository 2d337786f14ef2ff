//! Mercurial backend
//!
//! Clones without a working copy, then updates to the pinned revision or to
//! the `label` branch (default `default`). There is no mirror cache and no
//! rebase support.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use super::git::vcs_list_line;
use super::registry::PluginRegistration;
use super::{
    basename, execute_in, prepare_destination, require_present, Capabilities, OpArgs,
    SourceManager,
};
use crate::defaults::HEAD_REVISION;
use crate::error::Result;
use crate::manifest::RepositoryDescriptor;
use crate::process::ToolCommand;
use crate::workspace::Workspace;

pub const FORMAT: &str = "hg";
pub const DEFAULT_LABEL: &str = "default";

pub fn registration() -> PluginRegistration {
    PluginRegistration {
        format: FORMAT,
        description: "mercurial repository manager",
        construct,
        restore,
    }
}

fn construct(
    name: &str,
    descriptor: &RepositoryDescriptor,
    workspace: &Workspace,
) -> Result<Box<dyn SourceManager>> {
    Ok(Box::new(HgManager::new(name, descriptor, workspace)?))
}

fn restore(record: serde_yaml::Value, workspace: &Workspace) -> Result<Box<dyn SourceManager>> {
    Ok(Box::new(HgManager {
        component: serde_yaml::from_value(record)?,
        workspace: workspace.clone(),
    }))
}

/// Persistent state of a mercurial component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HgComponent {
    pub name: String,
    pub descriptor: RepositoryDescriptor,
    pub repos: String,
    pub label: String,
    pub revision: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct HgManager {
    component: HgComponent,
    workspace: Workspace,
}

impl HgManager {
    pub fn new(name: &str, descriptor: &RepositoryDescriptor, workspace: &Workspace) -> Result<Self> {
        let repos = descriptor.require_repos(name)?.to_string();
        let dir = descriptor
            .alias
            .clone()
            .unwrap_or_else(|| basename(&repos).to_string());
        Ok(Self {
            component: HgComponent {
                name: name.to_string(),
                descriptor: descriptor.clone(),
                label: descriptor
                    .label
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LABEL.to_string()),
                revision: descriptor.revision().to_string(),
                local_path: workspace.resolve(&dir),
                repos,
            },
            workspace: workspace.clone(),
        })
    }

    pub fn component(&self) -> &HgComponent {
        &self.component
    }

    fn hg(&self) -> ToolCommand {
        ToolCommand::new(self.workspace.tools().hg.as_str())
    }

    fn run_local(&self, cmd: ToolCommand) -> Result<()> {
        cmd.run(&self.component.name, &self.component.local_path)
    }

    /// Revision to update to: the pinned one, or the label head.
    fn update_target(&self) -> &str {
        if self.component.revision == HEAD_REVISION {
            &self.component.label
        } else {
            &self.component.revision
        }
    }
}

impl SourceManager for HgManager {
    fn name(&self) -> &str {
        &self.component.name
    }

    fn format(&self) -> &'static str {
        FORMAT
    }

    fn descriptor(&self) -> &RepositoryDescriptor {
        &self.component.descriptor
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            rebase: false,
            ..Capabilities::ALL
        }
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
        info!("{}: cloning {} into {}", name, self.component.repos, dest.display());
        let cloned = self
            .hg()
            .args(["clone", "-U", "--quiet"])
            .arg(&self.component.repos)
            .arg(dest)
            .run(name, self.workspace.root());
        if let Err(err) = cloned {
            let _ = fs::remove_dir_all(dest);
            return Err(err);
        }
        self.run_local(self.hg().args(["update", "-r", self.update_target()]))
    }

    fn update(&self, _args: &OpArgs) -> Result<()> {
        require_present(&self.component.name, &self.component.local_path)?;
        self.run_local(self.hg().arg("pull"))?;
        self.run_local(self.hg().args(["update", "-r", self.component.label.as_str()]))
    }

    fn commit(&self, args: &OpArgs) -> Result<()> {
        require_present(&self.component.name, &self.component.local_path)?;
        self.run_local(self.hg().arg("commit").args(&args.args))
    }

    fn deliver(&self, args: &OpArgs) -> Result<()> {
        require_present(&self.component.name, &self.component.local_path)?;
        self.run_local(self.hg().arg("push").args(&args.args))
    }

    fn execute(&self, args: &OpArgs) -> Result<()> {
        execute_in(&self.component.name, &self.component.local_path, args)
    }

    fn get_actual_revision(&self) -> Result<String> {
        require_present(&self.component.name, &self.component.local_path)?;
        let output = self
            .hg()
            .args(["log", "-r", ".", "--template", "{node}"])
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::plugins::Operation;

    fn manager() -> HgManager {
        HgManager::new(
            "lib",
            &RepositoryDescriptor::new(FORMAT, "https://hg.example.org/lib"),
            &Workspace::new("/work"),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let hg = manager();
        assert_eq!(hg.local_path(), Path::new("/work/lib"));
        assert_eq!(hg.component().label, "default");
        assert_eq!(hg.update_target(), "default");
        assert_eq!(hg.list(), "hg,default@HEAD,https://hg.example.org/lib");
    }

    #[test]
    fn test_pinned_revision_is_update_target() {
        let mut descriptor = RepositoryDescriptor::new(FORMAT, "https://hg.example.org/lib");
        descriptor.revision = Some("4f2a".to_string());
        let hg = HgManager::new("lib", &descriptor, &Workspace::new("/work")).unwrap();
        assert_eq!(hg.update_target(), "4f2a");
    }

    #[test]
    fn test_rebase_not_advertised() {
        let hg = manager();
        assert!(!hg.capabilities().supports(Operation::Rebase));
        assert!(hg.capabilities().supports(Operation::Deliver));

        match hg.rebase(&OpArgs::default()) {
            Err(Error::UnsupportedOperation {
                format, operation, ..
            }) => {
                assert_eq!(format, "hg");
                assert_eq!(operation, "rebase");
            }
            other => panic!("expected UnsupportedOperation, got {:?}", other),
        }
    }
}
