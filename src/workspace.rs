//! # Workspace and tool configuration
//!
//! A [`Workspace`] is the directory every component path is relative to,
//! together with the names of the external tools the backends invoke. It is
//! passed explicitly to each backend so no code depends on the process
//! current directory.
//!
//! Tool names default to the plain program names and can be overridden with
//! environment variables:
//!
//! | Variable         | Default |
//! |------------------|---------|
//! | `DEPTOOLS_GIT`   | `git`   |
//! | `DEPTOOLS_HG`    | `hg`    |
//! | `DEPTOOLS_SVN`   | `svn`   |
//! | `DEPTOOLS_TAR`   | `tar`   |
//! | `DEPTOOLS_CURL`  | `curl`  |
//! | `DEPTOOLS_SCP`   | `scp`   |
//! | `DEPTOOLS_UNZIP` | `unzip` |

use std::env;
use std::path::{Path, PathBuf};

use crate::cache::CacheLayout;
use crate::defaults::{tools, STATE_DIR};

/// Names of the external programs used by the backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub git: String,
    pub hg: String,
    pub svn: String,
    pub tar: String,
    pub curl: String,
    pub scp: String,
    pub unzip: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            git: tools::GIT.to_string(),
            hg: tools::HG.to_string(),
            svn: tools::SVN.to_string(),
            tar: tools::TAR.to_string(),
            curl: tools::CURL.to_string(),
            scp: tools::SCP.to_string(),
            unzip: tools::UNZIP.to_string(),
        }
    }
}

impl Tools {
    /// Defaults overridden by any `DEPTOOLS_<TOOL>` variable that is set and
    /// non-empty.
    pub fn from_env() -> Self {
        fn pick(var: &str, default: &str) -> String {
            env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        }

        Self {
            git: pick("DEPTOOLS_GIT", tools::GIT),
            hg: pick("DEPTOOLS_HG", tools::HG),
            svn: pick("DEPTOOLS_SVN", tools::SVN),
            tar: pick("DEPTOOLS_TAR", tools::TAR),
            curl: pick("DEPTOOLS_CURL", tools::CURL),
            scp: pick("DEPTOOLS_SCP", tools::SCP),
            unzip: pick("DEPTOOLS_UNZIP", tools::UNZIP),
        }
    }
}

/// The directory components are extracted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    tools: Tools,
}

impl Workspace {
    /// Create a workspace rooted at `root` using default tool names.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tools: Tools::default(),
        }
    }

    /// Replace the tool names.
    pub fn with_tools(mut self, tools: Tools) -> Self {
        self.tools = tools;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tools(&self) -> &Tools {
        &self.tools
    }

    /// Resolve a manifest-relative path (alias, local directory) against the
    /// workspace root. Absolute paths are returned unchanged.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// The `.deptools` state directory of this workspace.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    /// Cache and scratch layout under the state directory.
    pub fn cache(&self) -> CacheLayout {
        CacheLayout::new(self.state_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let ws = Workspace::new("/work");
        assert_eq!(ws.resolve("libfoo"), PathBuf::from("/work/libfoo"));
        assert_eq!(ws.resolve("/opt/x"), PathBuf::from("/opt/x"));
    }

    #[test]
    fn test_state_dir() {
        let ws = Workspace::new("/work");
        assert_eq!(ws.state_dir(), PathBuf::from("/work/.deptools"));
    }

    #[test]
    #[serial]
    fn test_tools_from_env_overrides() {
        env::set_var("DEPTOOLS_GIT", "/usr/local/bin/git2");
        env::set_var("DEPTOOLS_TAR", "");
        let tools = Tools::from_env();
        env::remove_var("DEPTOOLS_GIT");
        env::remove_var("DEPTOOLS_TAR");

        assert_eq!(tools.git, "/usr/local/bin/git2");
        // Empty values fall back to the default
        assert_eq!(tools.tar, "tar");
        assert_eq!(tools.svn, "svn");
    }

    #[test]
    #[serial]
    fn test_tools_from_env_defaults() {
        env::remove_var("DEPTOOLS_CURL");
        assert_eq!(Tools::from_env().curl, "curl");
    }
}
