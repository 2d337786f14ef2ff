//! # Manifest Model and Parsing
//!
//! A manifest (by default the `DEPENDENCIES` file) is a YAML document with two
//! top-level mappings:
//!
//! ```yaml
//! configurations:
//!   default: [zlib, tools]
//!   minimal: [zlib]
//! repositories:
//!   zlib:
//!     format: tar
//!     repos: http://example.org/zlib-1.2.11.tar.gz
//!     revision: 3f1e8a0c...
//!   tools:
//!     format: git
//!     repos: https://example.org/tools.git
//!     label: stable
//! ```
//!
//! Each entry under `repositories` is a [`RepositoryDescriptor`]. The `format`
//! field selects the backend; `repos`, `revision`, `label` and `alias` are
//! common optional fields and any other field is kept for the backend to
//! interpret.
//!
//! ## Validation
//!
//! [`Manifest::validate`] checks the document structure before any backend is
//! constructed:
//!
//! - both top-level maps are present
//! - every key and scalar under `configurations` is a string
//! - every repository entry is a map with a registered `format`
//! - every configuration is a list naming existing repositories
//!
//! ## Round trip
//!
//! The parsed document is kept as a [`serde_yaml::Value`], which preserves key
//! order, so [`Manifest::dump`] writes back an equivalent document.
//! [`Manifest::dump_actual`] and [`Manifest::dump_head`] write the same
//! document with the `revision` of the selected components overwritten.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use log::debug;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

use crate::defaults::{HEAD_REVISION, STDIN_MANIFEST};
use crate::error::{Error, Result};
use crate::plugins::registry::PluginRegistry;
use crate::plugins::SourceManager;
use crate::workspace::Workspace;

/// The description of one component, as written under `repositories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Backend selector.
    pub format: String,

    /// Source location (URL or path).
    #[serde(
        default,
        deserialize_with = "repos_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub repos: Option<String>,

    /// Pinned revision; absent means `HEAD`.
    #[serde(
        default,
        deserialize_with = "revision_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub revision: Option<String>,

    /// Branch or tag name for version-control backends.
    #[serde(
        default,
        deserialize_with = "label_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,

    /// Local directory name, relative to the workspace.
    #[serde(
        default,
        deserialize_with = "alias_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub alias: Option<String>,

    /// Backend-specific fields (`skip_dirs`, `digest_content`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A string field. Other scalars are rejected instead of converted, so
/// `alias: 1.10` cannot silently become `"1.1"`.
///
/// `revision` also accepts integers, for numeric svn revisions.
fn string_field<'de, D: Deserializer<'de>>(
    deserializer: D,
    key: &str,
    allow_integer: bool,
) -> std::result::Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) if allow_integer && (n.is_u64() || n.is_i64()) => {
            Ok(Some(n.to_string()))
        }
        Some(other) => Err(D::Error::custom(format!(
            "'{}' must be a string, found {}",
            key,
            describe(&other)
        ))),
    }
}

fn repos_field<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    string_field(d, "repos", false)
}

fn revision_field<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    string_field(d, "revision", true)
}

fn label_field<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    string_field(d, "label", false)
}

fn alias_field<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    string_field(d, "alias", false)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a map",
        Value::Tagged(_) => "a tagged value",
    }
}

impl RepositoryDescriptor {
    /// A descriptor with only `format` and `repos` set.
    pub fn new(format: impl Into<String>, repos: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            repos: Some(repos.into()),
            revision: None,
            label: None,
            alias: None,
            extra: BTreeMap::new(),
        }
    }

    /// The pinned revision, or `HEAD` when absent.
    pub fn revision(&self) -> &str {
        self.revision.as_deref().unwrap_or(HEAD_REVISION)
    }

    /// The `repos` field, which most backends require.
    pub fn require_repos(&self, component: &str) -> Result<&str> {
        self.repos.as_deref().ok_or_else(|| {
            Error::config(format!(
                "missing 'repos' field in component {} of format {}",
                component, self.format
            ))
        })
    }

    /// A boolean backend field. Only YAML booleans are accepted.
    pub fn bool_field(&self, component: &str, key: &str) -> Result<Option<bool>> {
        match self.extra.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(Error::config(format!(
                "field '{}' must be either 'true' or 'false' in component {}",
                key, component
            ))),
        }
    }

    /// A non-negative integer backend field.
    pub fn uint_field(&self, component: &str, key: &str) -> Result<Option<u64>> {
        match self.extra.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) if n.as_u64().is_some() => Ok(n.as_u64()),
            Some(_) => Err(Error::config(format!(
                "field '{}' must be a non-negative integer in component {}",
                key, component
            ))),
        }
    }

    /// A copy of this descriptor with `revision` replaced.
    pub fn with_revision(&self, revision: impl Into<String>) -> Self {
        Self {
            revision: Some(revision.into()),
            ..self.clone()
        }
    }
}

/// A parsed manifest document.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    document: Value,
}

impl Manifest {
    /// Parse a manifest from YAML text.
    ///
    /// `source_name` is used in error messages. Parsing does not validate the
    /// structure, see [`Manifest::validate`].
    pub fn parse(content: &str, source_name: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(content).map_err(|e| Error::Parse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { document })
    }

    /// Read and parse a manifest from any reader.
    pub fn from_reader<R: Read>(mut reader: R, source_name: &str) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::parse(&content, source_name)
    }

    /// Load a manifest from a file path, or from standard input when `path`
    /// is `-`.
    pub fn load(path: &str) -> Result<Self> {
        if path == STDIN_MANIFEST {
            debug!("reading manifest from standard input");
            return Self::from_reader(io::stdin().lock(), path);
        }
        debug!("reading manifest from {}", path);
        let content = fs::read_to_string(Path::new(path))
            .map_err(|e| Error::Io(io::Error::new(e.kind(), format!("{}: {}", path, e))))?;
        Self::parse(&content, path)
    }

    /// Wrap an already built document.
    pub fn from_value(document: Value) -> Self {
        Self { document }
    }

    /// The underlying document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    fn section(&self, key: &str) -> Result<&Mapping> {
        let root = self
            .document
            .as_mapping()
            .ok_or_else(|| Error::validation("manifest is not a map"))?;
        match root.get(key) {
            Some(Value::Mapping(section)) => Ok(section),
            Some(_) => Err(Error::validation(format!("'{}' is not a map", key))),
            None => Err(Error::validation(format!("missing '{}' map", key))),
        }
    }

    fn repositories(&self) -> Result<&Mapping> {
        self.section("repositories")
    }

    fn configurations(&self) -> Result<&Mapping> {
        self.section("configurations")
    }

    /// Check the structural invariants against the registered formats.
    pub fn validate(&self, registry: &PluginRegistry) -> Result<()> {
        let repositories = self.repositories()?;
        let configurations = self.configurations()?;

        check_strings(&Value::Mapping(configurations.clone()), "configurations")?;

        for (key, value) in repositories {
            let name = key.as_str().ok_or_else(|| {
                Error::validation(format!(
                    "repository name is not a string: {}",
                    render(key)
                ))
            })?;
            let entry = value.as_mapping().ok_or_else(|| {
                Error::validation(format!(
                    "repository description is not a map for component {}",
                    name
                ))
            })?;
            let format = entry
                .get("format")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::validation(format!(
                        "missing format specification for component {}",
                        name
                    ))
                })?;
            registry.resolve(format)?;
        }

        for (key, value) in configurations {
            let configuration = key.as_str().unwrap_or_default();
            let names = value.as_sequence().ok_or_else(|| {
                Error::validation(format!("configuration {} is not a list", configuration))
            })?;
            for name in names {
                let name = name.as_str().unwrap_or_default();
                if !repositories.contains_key(name) {
                    return Err(Error::validation(format!(
                        "missing repository for component {} in configuration {}",
                        name, configuration
                    )));
                }
            }
        }
        Ok(())
    }

    /// Names of all configurations, in document order.
    pub fn configuration_names(&self) -> Result<Vec<String>> {
        Ok(self
            .configurations()?
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect())
    }

    /// Component names of one configuration, in declaration order.
    pub fn configuration(&self, name: &str) -> Result<Vec<String>> {
        let list = self
            .configurations()?
            .get(name)
            .ok_or_else(|| Error::validation(format!("missing configuration: {}", name)))?;
        let names = list
            .as_sequence()
            .ok_or_else(|| Error::validation(format!("configuration {} is not a list", name)))?;
        names
            .iter()
            .map(|n| {
                n.as_str().map(str::to_string).ok_or_else(|| {
                    Error::validation(format!(
                        "value is not a string in configuration {}: {}",
                        name,
                        render(n)
                    ))
                })
            })
            .collect()
    }

    /// The typed descriptor of one repository.
    pub fn descriptor(&self, name: &str) -> Result<RepositoryDescriptor> {
        let value = self
            .repositories()?
            .get(name)
            .ok_or_else(|| Error::validation(format!("missing repository for component {}", name)))?;
        serde_yaml::from_value(value.clone()).map_err(|e| {
            Error::config(format!("invalid description for component {}: {}", name, e))
        })
    }

    /// Validate, then construct one backend per component of `configuration`,
    /// in declaration order.
    ///
    /// All descriptors and formats are checked before the first backend is
    /// constructed.
    pub fn resolve(
        &self,
        configuration: &str,
        registry: &PluginRegistry,
        workspace: &Workspace,
    ) -> Result<Vec<Box<dyn SourceManager>>> {
        self.validate(registry)?;

        let mut planned = Vec::new();
        for name in self.configuration(configuration)? {
            let descriptor = self.descriptor(&name)?;
            let registration = registry.resolve(&descriptor.format)?;
            planned.push((name, descriptor, registration));
        }

        planned
            .into_iter()
            .map(|(name, descriptor, registration)| {
                debug!("{}: using {} plugin", name, registration.format);
                (registration.construct)(&name, &descriptor, workspace)
            })
            .collect()
    }

    /// A copy of this manifest with the `revision` of the named repositories
    /// overwritten. Names that are not in the manifest are ignored.
    pub fn with_revisions<S: AsRef<str>>(&self, revisions: &[(S, S)]) -> Manifest {
        let mut document = self.document.clone();
        for (name, revision) in revisions {
            let entry = document
                .get_mut("repositories")
                .and_then(|r| r.get_mut(name.as_ref()))
                .and_then(Value::as_mapping_mut);
            if let Some(entry) = entry {
                entry.insert(
                    Value::String("revision".to_string()),
                    Value::String(revision.as_ref().to_string()),
                );
            }
        }
        Manifest { document }
    }

    /// Serialize the manifest as YAML text.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.document)?)
    }

    /// Write the manifest as YAML.
    pub fn dump<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        out.write_all(self.to_yaml_string()?.as_bytes())?;
        Ok(())
    }

    /// Write the manifest with the revisions of `components` replaced by
    /// their actual local revisions.
    pub fn dump_actual<W: Write + ?Sized>(&self, components: &[&dyn SourceManager], out: &mut W) -> Result<()> {
        let revisions = components
            .iter()
            .map(|c| Ok((c.name().to_string(), c.get_actual_revision()?)))
            .collect::<Result<Vec<_>>>()?;
        self.with_revisions(&revisions).dump(out)
    }

    /// Write the manifest with the revisions of `components` replaced by the
    /// current upstream head revisions.
    pub fn dump_head<W: Write + ?Sized>(&self, components: &[&dyn SourceManager], out: &mut W) -> Result<()> {
        let revisions = components
            .iter()
            .map(|c| Ok((c.name().to_string(), c.get_head_revision()?)))
            .collect::<Result<Vec<_>>>()?;
        self.with_revisions(&revisions).dump(out)
    }
}

/// Every key and scalar under `value` must be a string.
fn check_strings(value: &Value, path: &str) -> Result<()> {
    match value {
        Value::String(_) => Ok(()),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check_strings(item, &format!("{}[{}]", path, i))),
        Value::Mapping(map) => map.iter().try_for_each(|(k, v)| {
            let key = k.as_str().ok_or_else(|| {
                Error::validation(format!(
                    "value is not a string in {}: {}",
                    path,
                    render(k)
                ))
            })?;
            check_strings(v, &format!("{}.{}", path, key))
        }),
        other => Err(Error::validation(format!(
            "value is not a string in {}: {}",
            path,
            render(other)
        ))),
    }
}

fn render(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| describe(value).to_string())
}
