//! Backend registry
//!
//! Maps `format` tags to backend constructors. The built-in backends are
//! registered explicitly by [`PluginRegistry::with_builtins`]; there is no
//! directory scanning. Registering a format twice replaces the earlier entry.

use std::collections::BTreeMap;

use log::debug;

use super::{git, hg, path, svn, tar, SourceManager};
use crate::error::{Error, Result};
use crate::manifest::RepositoryDescriptor;
use crate::workspace::Workspace;

/// Build a backend from a manifest entry.
pub type Constructor =
    fn(&str, &RepositoryDescriptor, &Workspace) -> Result<Box<dyn SourceManager>>;

/// Rebuild a backend from the state saved in a session file.
pub type Restorer = fn(serde_yaml::Value, &Workspace) -> Result<Box<dyn SourceManager>>;

/// One registered backend.
#[derive(Debug, Clone, Copy)]
pub struct PluginRegistration {
    pub format: &'static str,
    pub description: &'static str,
    pub construct: Constructor,
    pub restore: Restorer,
}

/// Registry of available backends, keyed by format tag.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, PluginRegistration>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `git`, `hg`, `svn`, `tar` and `path`
    /// backends.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for registration in [
            git::registration(),
            hg::registration(),
            svn::registration(),
            tar::registration(),
            path::registration(),
        ] {
            registry.register(registration);
        }
        registry
    }

    /// Register a backend. A later registration of the same format wins.
    pub fn register(&mut self, registration: PluginRegistration) {
        if self
            .plugins
            .insert(registration.format.to_string(), registration)
            .is_some()
        {
            debug!("plugin for format '{}' replaced", registration.format);
        }
    }

    pub fn get(&self, format: &str) -> Option<&PluginRegistration> {
        self.plugins.get(format)
    }

    pub fn contains(&self, format: &str) -> bool {
        self.plugins.contains_key(format)
    }

    /// Look up a format, failing with [`Error::PluginNotFound`].
    pub fn resolve(&self, format: &str) -> Result<&PluginRegistration> {
        self.get(format).ok_or_else(|| Error::PluginNotFound {
            format: format.to_string(),
        })
    }

    /// Registered format tags, sorted.
    pub fn formats(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginRegistration> {
        self.plugins.values()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
