//! Default values for deptools configuration.
//!
//! This module provides centralized default values used across commands and
//! backends, ensuring consistency and avoiding duplication.

/// Default manifest file name, looked up in the current directory.
pub const DEFAULT_MANIFEST_FILENAME: &str = "DEPENDENCIES";

/// Manifest path designating standard input.
pub const STDIN_MANIFEST: &str = "-";

/// Default configuration name selected from the `configurations` map.
pub const DEFAULT_CONFIGURATION: &str = "default";

/// Revision placeholder meaning "whatever the tracked label points to".
pub const HEAD_REVISION: &str = "HEAD";

/// Name of the per-workspace state directory holding caches and scratch space.
pub const STATE_DIR: &str = ".deptools";

/// Default external tool names, overridable through the environment.
pub mod tools {
    pub const GIT: &str = "git";
    pub const HG: &str = "hg";
    pub const SVN: &str = "svn";
    pub const TAR: &str = "tar";
    pub const CURL: &str = "curl";
    pub const SCP: &str = "scp";
    pub const UNZIP: &str = "unzip";
}
