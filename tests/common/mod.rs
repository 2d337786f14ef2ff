//! Shared test utilities for the CLI E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_manifest(manifests::SINGLE_PATH);
//!     fixture.command().arg("list").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::env;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::manifests;
    #[allow(unused_imports)]
    pub use super::should_skip_network_tests;
    pub use super::TestFixture;
}

/// Manifest snippets for testing.
#[allow(dead_code)]
pub mod manifests {
    /// One path component pointing at `/tmp/x`.
    pub const SINGLE_PATH: &str = r#"
configurations:
  default: [a]
repositories:
  a:
    format: path
    repos: /tmp/x
"#;

    /// Configuration referencing an undeclared component.
    pub const DANGLING: &str = r#"
configurations:
  default: [a, ghost]
repositories:
  a:
    format: path
    repos: /tmp/x
"#;

    /// A component of a format no plugin handles.
    pub const UNKNOWN_FORMAT: &str = r#"
configurations:
  default: [a]
repositories:
  a:
    format: cvs
    repos: /tmp/x
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "configurations: [unclosed";
}

/// Check if network tests should be skipped.
///
/// Returns `true` if the `SKIP_NETWORK_TESTS` environment variable is set.
#[allow(dead_code)]
pub fn should_skip_network_tests() -> bool {
    env::var("SKIP_NETWORK_TESTS").is_ok()
}

/// A temporary workspace with an optional `DEPENDENCIES` manifest.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write the `DEPENDENCIES` manifest.
    pub fn with_manifest(self, content: &str) -> Self {
        self.temp_dir
            .child("DEPENDENCIES")
            .write_str(content)
            .expect("Failed to write manifest");
        self
    }

    /// Add a file with the given path and content.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of a child of the workspace, as a string for manifests.
    #[allow(dead_code)]
    pub fn abs(&self, path: &str) -> String {
        self.temp_dir.path().join(path).to_string_lossy().into_owned()
    }

    /// Get the path to the manifest.
    #[allow(dead_code)]
    pub fn manifest_path(&self) -> PathBuf {
        self.temp_dir.path().join("DEPENDENCIES")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command running in this fixture's directory, isolated from
    /// `DEPTOOLS_*` variables of the calling environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("deptools");
        cmd.current_dir(self.path());
        for var in [
            "DEPTOOLS_FILE",
            "DEPTOOLS_CONFIGURATION",
            "DEPTOOLS_WORKDIR",
            "RUST_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_manifest() {
        let fixture = TestFixture::new().with_manifest(manifests::SINGLE_PATH);
        assert!(fixture.manifest_path().exists());
    }

    #[test]
    fn test_manifests_are_valid_yaml() {
        for manifest in [
            manifests::SINGLE_PATH,
            manifests::DANGLING,
            manifests::UNKNOWN_FORMAT,
        ] {
            serde_yaml::from_str::<serde_yaml::Value>(manifest).expect("Manifest should be valid YAML");
        }
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(manifests::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
