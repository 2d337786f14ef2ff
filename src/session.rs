//! Single-component sessions
//!
//! A session drives one component outside of any manifest, keeping its state
//! in a YAML file between invocations:
//!
//! ```text
//! deptools plugin git tools.session new params.yaml
//! deptools plugin git tools.session extract
//! deptools plugin git tools.session list
//! ```
//!
//! The params file holds the component name and its description:
//!
//! ```yaml
//! name: tools
//! component:
//!   repos: https://example.org/tools.git
//!   label: stable
//! ```
//!
//! The session file holds the format, the name and the backend record, and is
//! rewritten after every command.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::manifest::RepositoryDescriptor;
use crate::plugins::registry::PluginRegistry;
use crate::plugins::{dispatch, OpArgs, Operation, SourceManager};
use crate::workspace::Workspace;

/// Content of a params file given to `new`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionParams {
    pub name: String,
    pub component: Value,
}

/// Content of a session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    pub format: String,
    pub name: String,
    pub component: Value,
}

/// A component bound to its session file.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    format: String,
    manager: Box<dyn SourceManager>,
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::config(format!("cannot open {}: {}", path.display(), e)))?;
    serde_yaml::from_str(&content).map_err(|e| Error::Parse {
        source_name: path.display().to_string(),
        message: e.to_string(),
    })
}

impl Session {
    /// Build a component of `format` from a params file.
    pub fn create(
        path: impl Into<PathBuf>,
        format: &str,
        params: &Path,
        registry: &PluginRegistry,
        workspace: &Workspace,
    ) -> Result<Self> {
        let registration = registry.resolve(format)?;
        let params: SessionParams = read_yaml(params)?;

        let mut component = params.component;
        if let Value::Mapping(map) = &mut component {
            let format_key = Value::String("format".to_string());
            if !map.contains_key(&format_key) {
                map.insert(format_key, Value::String(format.to_string()));
            }
        }
        let descriptor: RepositoryDescriptor = serde_yaml::from_value(component).map_err(|e| {
            Error::config(format!(
                "invalid description for component {}: {}",
                params.name, e
            ))
        })?;
        if descriptor.format != format {
            return Err(Error::config(format!(
                "component {} is of format {}, not {}",
                params.name, descriptor.format, format
            )));
        }

        let manager = (registration.construct)(&params.name, &descriptor, workspace)?;
        Ok(Self {
            path: path.into(),
            format: format.to_string(),
            manager,
        })
    }

    /// Rebuild the component saved in the session file at `path`.
    pub fn restore(
        path: impl Into<PathBuf>,
        format: &str,
        registry: &PluginRegistry,
        workspace: &Workspace,
    ) -> Result<Self> {
        let path = path.into();
        let file: SessionFile = read_yaml(&path)?;
        if file.format != format {
            return Err(Error::config(format!(
                "session {} holds a {} component, not {}",
                path.display(),
                file.format,
                format
            )));
        }
        let registration = registry.resolve(format)?;
        let manager = (registration.restore)(file.component, workspace)?;
        debug!("restored {} session for {}", format, file.name);
        Ok(Self {
            path,
            format: file.format,
            manager,
        })
    }

    pub fn manager(&self) -> &dyn SourceManager {
        self.manager.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the session file.
    pub fn store(&self) -> Result<()> {
        let file = SessionFile {
            format: self.format.clone(),
            name: self.manager.name().to_string(),
            component: self.manager.record()?,
        };
        fs::write(&self.path, serde_yaml::to_string(&file)?).map_err(|e| {
            Error::config(format!("cannot write {}: {}", self.path.display(), e))
        })
    }

    /// Run one command on the component, then rewrite the session file.
    ///
    /// Returns `false` when the backend does not implement the command.
    pub fn run(&self, op: Operation, args: &OpArgs, out: &mut dyn Write) -> Result<bool> {
        let ran = dispatch(self.manager(), op, args, out)?;
        self.store()?;
        Ok(ran)
    }
}
