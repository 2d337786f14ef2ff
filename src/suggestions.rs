//! # Error Suggestions
//!
//! Helpers turning library errors into user-facing errors with hints. Errors
//! should tell users what went wrong and how to fix it.
//!
//! The error message stays on one line; the hints are carried alongside it in
//! a [`Suggestion`] and reported separately by the binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use deptools::suggestions;
//!
//! let deps = Dependencies::new(manifest, "default", &registry, &workspace)
//!     .map_err(|e| suggestions::explain(e, None, "default"))?;
//! ```

use std::fmt;
use std::path::Path;

use crate::error::Error;
use crate::manifest::Manifest;
use crate::plugins::registry::PluginRegistry;

/// An error message with hints on how to fix it.
#[derive(Debug)]
pub struct Suggestion {
    message: String,
    hints: Vec<String>,
}

impl Suggestion {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hints: Vec::new(),
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Suggestion {}

/// The hints attached to `error`, if any.
pub fn hints_of(error: &anyhow::Error) -> &[String] {
    error
        .downcast_ref::<Suggestion>()
        .map(Suggestion::hints)
        .unwrap_or_default()
}

/// Error for a manifest file that does not exist.
pub fn manifest_not_found(path: &Path) -> anyhow::Error {
    Suggestion::new(format!("manifest file not found: {}", path.display()))
        .hint("Create a DEPENDENCIES file with 'repositories' and 'configurations' maps")
        .hint("Use -f/--file to specify a different path, or '-' for standard input")
        .hint("Set the DEPTOOLS_FILE environment variable")
        .into()
}

/// Error for a configuration name missing from the manifest.
pub fn unknown_configuration(name: &str, available: &[String]) -> anyhow::Error {
    let first = if available.is_empty() {
        "The manifest declares no configuration".to_string()
    } else {
        format!("Available configurations: {}", available.join(", "))
    };
    Suggestion::new(format!("missing configuration: {}", name))
        .hint(first)
        .hint("Use -c/--configuration to select one")
        .into()
}

/// Error for a format tag with no registered backend.
pub fn unknown_format(format: &str, registry: &PluginRegistry) -> anyhow::Error {
    Suggestion::new(format!("no plugin found for format '{}'", format))
        .hint(format!("Supported formats: {}", registry.formats().join(", ")))
        .hint("Run 'deptools formats' to list them")
        .into()
}

/// Wrap a library error, adding hints when one applies.
///
/// `manifest` is used to list the available configurations.
pub fn explain(error: Error, manifest: Option<&Manifest>, configuration: &str) -> anyhow::Error {
    match error {
        Error::PluginNotFound { format } => {
            unknown_format(&format, &PluginRegistry::with_builtins())
        }
        Error::Validation { message } if message.starts_with("missing configuration:") => {
            let available = manifest
                .and_then(|m| m.configuration_names().ok())
                .unwrap_or_default();
            unknown_configuration(configuration, &available)
        }
        Error::UnsupportedOperation { .. } => Suggestion::new(error.to_string())
            .hint("Use -n/--component to exclude the component from this command")
            .into(),
        other => anyhow::Error::new(other),
    }
}
