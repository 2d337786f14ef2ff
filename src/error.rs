//! # Error Handling
//!
//! This module defines the centralized error type for `deptools`. It uses the
//! `thiserror` library to build a single `Error` enum that covers every
//! failure mode of manifest handling and backend operations.
//!
//! ## Error kinds
//!
//! - **`Config`**: a component descriptor is missing a mandatory field or an
//!   optional field has the wrong type.
//! - **`Parse`**: the manifest (or a session file) is not valid YAML.
//! - **`Validation`**: the manifest parses but violates a structural
//!   invariant (missing configuration, unknown component, non-string value).
//! - **`PluginNotFound`**: no backend is registered for a `format` tag.
//! - **`Backend`**: an external tool, a digest walk or a file move failed.
//! - **`RevisionMismatch`**: fetched or computed content does not match the
//!   pinned revision.
//! - **`UnsupportedOperation`**: the operation has no meaning for a backend.
//! - **`ComponentsFailed`**: one or more components failed during a
//!   keep-going orchestrator run.
//!
//! Parse and validation errors are raised before any backend is constructed,
//! so nothing is partially extracted when they occur.

use thiserror::Error;

/// Main error type for deptools operations
#[derive(Error, Debug)]
pub enum Error {
    /// A component descriptor is malformed.
    #[error("{message}")]
    Config { message: String },

    /// A YAML document could not be parsed.
    ///
    /// `source_name` is the manifest path, `-` for standard input, or the
    /// session file path.
    #[error("cannot parse {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// The manifest is structurally valid YAML but violates an invariant.
    #[error("{message}")]
    Validation { message: String },

    /// No backend is registered for the requested format.
    #[error("no plugin found for format '{format}'")]
    PluginNotFound { format: String },

    /// An underlying operation failed for a component.
    #[error("{component}: {message}")]
    Backend { component: String, message: String },

    /// Content does not match a pinned revision.
    #[error("{component}: revision mismatch, expected {expected}, actual {actual}")]
    RevisionMismatch {
        component: String,
        expected: String,
        actual: String,
    },

    /// The operation is not supported by this backend.
    #[error("{format} format does not support {operation} for component {component}")]
    UnsupportedOperation {
        format: String,
        operation: String,
        component: String,
    },

    /// Some components failed while the orchestrator kept going.
    #[error("command '{command}' failed for components: {}", components.join(", "))]
    ComponentsFailed {
        command: String,
        components: Vec<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML serialization error, wrapped from `serde_yaml::Error`.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Shorthand for a `Config` error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Shorthand for a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a `Backend` error attributed to a component.
    pub fn backend(component: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backend {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let error = Error::config("missing 'repos' field in component");
        assert_eq!(error.to_string(), "missing 'repos' field in component");
    }

    #[test]
    fn test_error_display_parse() {
        let error = Error::Parse {
            source_name: "DEPENDENCIES".to_string(),
            message: "did not find expected key".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("cannot parse DEPENDENCIES"));
        assert!(display.contains("did not find expected key"));
    }

    #[test]
    fn test_error_display_plugin_not_found() {
        let error = Error::PluginNotFound {
            format: "cvs".to_string(),
        };
        assert_eq!(error.to_string(), "no plugin found for format 'cvs'");
    }

    #[test]
    fn test_error_display_backend() {
        let error = Error::backend("libfoo", "command returned non-zero status 128: 'git' 'fetch'");
        let display = format!("{}", error);
        assert!(display.starts_with("libfoo: "));
        assert!(display.contains("non-zero status 128"));
    }

    #[test]
    fn test_error_display_revision_mismatch() {
        let error = Error::RevisionMismatch {
            component: "zlib".to_string(),
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("zlib"));
        assert!(display.contains("expected abc"));
        assert!(display.contains("actual def"));
    }

    #[test]
    fn test_error_display_unsupported() {
        let error = Error::UnsupportedOperation {
            format: "svn".to_string(),
            operation: "rebase".to_string(),
            component: "tools".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "svn format does not support rebase for component tools"
        );
    }

    #[test]
    fn test_error_display_components_failed() {
        let error = Error::ComponentsFailed {
            command: "update".to_string(),
            components: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "command 'update' failed for components: a, b"
        );
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(error.to_string().contains("YAML error"));
    }
}
