//! On-disk download cache and scratch space
//!
//! Backends that fetch remote content (git mirrors, tar archives) keep it
//! under the workspace state directory, keyed by the SHA-1 of the source URL:
//!
//! ```text
//! .deptools/
//!   cache/plugins/<format>/<aa>/<rest-of-sha1>/<basename>
//!   tmp/
//! ```
//!
//! Scratch directories are created under `tmp/` and removed when dropped.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::digest::sha1_hex;
use crate::error::Result;

/// Cache and scratch layout rooted at a state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    state_dir: PathBuf,
}

impl CacheLayout {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Root of the cache tree for one backend format.
    pub fn plugin_dir(&self, format: &str) -> PathBuf {
        self.state_dir.join("cache").join("plugins").join(format)
    }

    /// Cache entry for `url`, named `basename` inside its key directory.
    ///
    /// The entry is not created; only its parent directories are implied.
    pub fn entry(&self, format: &str, url: &str, basename: &str) -> PathBuf {
        let key = sha1_hex(url.as_bytes());
        let (head, tail) = key.split_at(2);
        self.plugin_dir(format).join(head).join(tail).join(basename)
    }

    /// Directory holding scratch space.
    pub fn tmp_dir(&self) -> PathBuf {
        self.state_dir.join("tmp")
    }

    /// Create a fresh scratch directory, removed when the handle is dropped.
    pub fn scratch_dir(&self) -> Result<TempDir> {
        let tmp = self.tmp_dir();
        fs::create_dir_all(&tmp)?;
        Ok(tempfile::Builder::new().prefix("deptools-").tempdir_in(&tmp)?)
    }

    /// Make sure the parent directory of a cache entry exists.
    pub fn prepare_entry(&self, entry: &Path) -> Result<()> {
        if let Some(parent) = entry.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
