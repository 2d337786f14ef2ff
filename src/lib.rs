//! # deptools
//!
//! This library extracts, updates and synchronizes source dependencies
//! declared in a YAML manifest. It is used by the `deptools` command-line
//! tool but can be embedded in other build tooling.
//!
//! ## Quick Example
//!
//! ```
//! use deptools::manifest::Manifest;
//! use deptools::plugins::registry::PluginRegistry;
//! use deptools::workspace::Workspace;
//!
//! let yaml = r#"
//! configurations:
//!   default: [a]
//! repositories:
//!   a:
//!     format: path
//!     repos: /tmp/x
//! "#;
//!
//! let manifest = Manifest::parse(yaml, "DEPENDENCIES").unwrap();
//! let registry = PluginRegistry::with_builtins();
//! let components = manifest
//!     .resolve("default", &registry, &Workspace::new("/work"))
//!     .unwrap();
//!
//! assert_eq!(components.len(), 1);
//! assert_eq!(components[0].name(), "a");
//! assert_eq!(components[0].list(), "path,HEAD,/tmp/x");
//! ```
//!
//! ## Core Concepts
//!
//! - **Manifest (`manifest`)**: the `repositories` and `configurations` maps,
//!   their validation, and the round trip back to YAML.
//! - **Backends (`plugins`)**: one [`plugins::SourceManager`] per format
//!   (`git`, `hg`, `svn`, `tar`, `path`), created through the
//!   [`plugins::registry::PluginRegistry`].
//! - **Orchestration (`orchestrator`)**: applies a command to every component
//!   of a configuration, in declaration order.
//! - **Digests (`digest`)**: deterministic content fingerprints used as
//!   revisions of path components.
//! - **Workspace (`workspace`, `cache`, `process`)**: the directory components
//!   live in, the `.deptools` cache under it, and external tool invocation
//!   with an explicit working directory.
//! - **Sessions (`session`)**: drive a single component from a state file.

pub mod cache;
pub mod defaults;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod plugins;
pub mod process;
pub mod session;
pub mod suggestions;
pub mod workspace;

#[cfg(test)]
mod manifest_proptest;
