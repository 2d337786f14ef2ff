//! Archive backend
//!
//! Fetches an archive once into the workspace cache and unpacks it into the
//! component directory.
//!
//! ```yaml
//! zlib:
//!   format: tar
//!   repos: http://example.org/zlib-1.2.11.tar.gz
//!   revision: 3f1e8a0c...   # sha1 of the archive, HEAD to skip the check
//!   alias: zlib             # default: archive file name
//!   skip_dirs: 1            # drop the leading directory of the archive
//!   ignore_status: false    # ignore the extractor exit status
//! ```
//!
//! `repos` is a URI with one of the `file`, `ssh`, `http`, `https` or `ftp`
//! schemes; a bare absolute path is a `file` URI. Local files are copied,
//! `ssh` URIs are fetched with `scp` and everything else with `curl`. The
//! archive type comes from the file name suffix: `.tar`, `.tgz`, `.tar.gz`,
//! `.tar.bz2`, `.tar.xz` or `.zip`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use url::Url;
use walkdir::WalkDir;

use super::registry::PluginRegistration;
use super::{execute_in, prepare_destination, OpArgs, SourceManager};
use crate::defaults::HEAD_REVISION;
use crate::digest::Digester;
use crate::error::{Error, Result};
use crate::manifest::RepositoryDescriptor;
use crate::process::ToolCommand;
use crate::workspace::{Tools, Workspace};

pub const FORMAT: &str = "tar";

pub fn registration() -> PluginRegistration {
    PluginRegistration {
        format: FORMAT,
        description: "tar archive manager",
        construct,
        restore,
    }
}

fn construct(
    name: &str,
    descriptor: &RepositoryDescriptor,
    workspace: &Workspace,
) -> Result<Box<dyn SourceManager>> {
    Ok(Box::new(TarManager::new(name, descriptor, workspace)?))
}

fn restore(record: serde_yaml::Value, workspace: &Workspace) -> Result<Box<dyn SourceManager>> {
    Ok(Box::new(TarManager {
        component: serde_yaml::from_value(record)?,
        workspace: workspace.clone(),
    }))
}

/// Transfer method, from the URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    File,
    Ssh,
    Http,
    Https,
    Ftp,
}

impl Scheme {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "file" => Some(Scheme::File),
            "ssh" => Some(Scheme::Ssh),
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            "ftp" => Some(Scheme::Ftp),
            _ => None,
        }
    }
}

/// Archive type, from the file name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Zip,
}

impl ArchiveKind {
    /// Longer suffixes first so `.tar.gz` wins over `.gz`-less `.tar`.
    const SUFFIXES: [(&'static str, ArchiveKind); 6] = [
        (".tar.bz2", ArchiveKind::TarBz2),
        (".tar.gz", ArchiveKind::TarGz),
        (".tar.xz", ArchiveKind::TarXz),
        (".tgz", ArchiveKind::TarGz),
        (".tar", ArchiveKind::Tar),
        (".zip", ArchiveKind::Zip),
    ];

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| name.len() > suffix.len() && name.ends_with(suffix))
            .map(|(_, kind)| *kind)
    }

    /// Command unpacking `archive` into `dest`.
    pub fn extract_command(self, tools: &Tools, archive: &Path, dest: &Path) -> ToolCommand {
        let tar_flags = match self {
            ArchiveKind::Tar => "xf",
            ArchiveKind::TarGz => "xzf",
            ArchiveKind::TarBz2 => "xjf",
            ArchiveKind::TarXz => "xJf",
            ArchiveKind::Zip => {
                return ToolCommand::new(tools.unzip.as_str())
                    .args(["-q", "-d"])
                    .arg(dest)
                    .arg(archive)
            }
        };
        ToolCommand::new(tools.tar.as_str())
            .arg(tar_flags)
            .arg(archive)
            .arg("-C")
            .arg(dest)
    }
}

/// A parsed archive location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveUri {
    pub uri: String,
    pub scheme: Scheme,
    /// `[user@]host` for remote schemes, empty for `file`.
    pub remote: String,
    pub path: String,
    pub kind: ArchiveKind,
}

impl ArchiveUri {
    pub fn parse(repos: &str) -> Result<Self> {
        let url = if repos.starts_with('/') {
            Url::from_file_path(repos)
                .map_err(|_| Error::config(format!("malformed path in URI: {}", repos)))?
        } else {
            Url::parse(repos)
                .map_err(|e| Error::config(format!("malformed URI {}: {}", repos, e)))?
        };
        let scheme = Scheme::from_name(url.scheme()).ok_or_else(|| {
            Error::config(format!("unsupported scheme in URI: {}", repos))
        })?;

        let path = decoded_path(&url, scheme)
            .ok_or_else(|| Error::config(format!("malformed path in URI: {}", repos)))?;
        let remote = match (url.username(), url.host_str()) {
            (_, None) => String::new(),
            ("", Some(host)) => host.to_string(),
            (user, Some(host)) => format!("{}@{}", user, host),
        };

        let file_name = path.rsplit('/').next().unwrap_or_default();
        if file_name.is_empty() {
            return Err(Error::config(format!("missing archive name in URI: {}", repos)));
        }
        let kind = ArchiveKind::from_file_name(file_name).ok_or_else(|| {
            Error::config(format!("unsupported file type in URI: {}", repos))
        })?;

        Ok(Self {
            uri: url.to_string(),
            scheme,
            remote,
            path,
            kind,
        })
    }

    /// Archive file name, extension included.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }
}

/// The percent-decoded path of `url`.
fn decoded_path(url: &Url, scheme: Scheme) -> Option<String> {
    let path = if scheme == Scheme::File {
        url.to_file_path().ok()?
    } else {
        let mut local = Url::parse("file:///").ok()?;
        local.set_path(url.path());
        local.to_file_path().ok()?
    };
    Some(path.to_string_lossy().into_owned())
}

/// Persistent state of an archive component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TarComponent {
    pub name: String,
    pub descriptor: RepositoryDescriptor,
    pub repos: String,
    pub source: ArchiveUri,
    pub revision: String,
    pub alias: String,
    pub local_path: PathBuf,
    pub cached_archive: PathBuf,
    pub skip_dirs: u64,
    pub ignore_status: bool,
}

#[derive(Debug, Clone)]
pub struct TarManager {
    component: TarComponent,
    workspace: Workspace,
}

impl TarManager {
    pub fn new(name: &str, descriptor: &RepositoryDescriptor, workspace: &Workspace) -> Result<Self> {
        let repos = descriptor.require_repos(name)?.to_string();
        let source = ArchiveUri::parse(&repos)?;
        let alias = descriptor
            .alias
            .clone()
            .unwrap_or_else(|| source.file_name().to_string());
        let cached_archive = workspace
            .cache()
            .entry(FORMAT, &repos, source.file_name());

        Ok(Self {
            component: TarComponent {
                name: name.to_string(),
                descriptor: descriptor.clone(),
                revision: descriptor.revision().to_string(),
                local_path: workspace.resolve(&alias),
                alias,
                cached_archive,
                skip_dirs: descriptor.uint_field(name, "skip_dirs")?.unwrap_or(0),
                ignore_status: descriptor.bool_field(name, "ignore_status")?.unwrap_or(false),
                source,
                repos,
            },
            workspace: workspace.clone(),
        })
    }

    pub fn component(&self) -> &TarComponent {
        &self.component
    }

    fn pinned(&self) -> bool {
        self.component.revision != HEAD_REVISION
    }

    fn archive_sha1(&self) -> Result<String> {
        let archive = &self.component.cached_archive;
        let file = File::open(archive).map_err(|e| {
            Error::backend(
                &self.component.name,
                format!("cannot read archive {}: {}", archive.display(), e),
            )
        })?;
        Ok(Digester::new().digest_reader(file)?)
    }

    /// Download the archive into the cache, unless a cached copy already
    /// matches the pinned revision.
    fn fetch(&self) -> Result<()> {
        let name = &self.component.name;
        let cached = &self.component.cached_archive;
        if self.pinned() && cached.exists() && self.archive_sha1()? == self.component.revision {
            debug!("{}: using cached archive {}", name, cached.display());
            return Ok(());
        }
        self.workspace.cache().prepare_entry(cached)?;
        info!("{}: fetching {}", name, self.component.source.uri);

        let source = &self.component.source;
        let tools = self.workspace.tools();
        let fetched = match source.scheme {
            Scheme::File => fs::copy(&source.path, cached).map(|_| ()).map_err(|e| {
                Error::backend(name, format!("cannot access {}: {}", source.path, e))
            }),
            Scheme::Ssh => ToolCommand::new(tools.scp.as_str())
                .arg(format!("{}:{}", source.remote, source.path))
                .arg(cached)
                .run(name, self.workspace.root()),
            Scheme::Http | Scheme::Https | Scheme::Ftp => ToolCommand::new(tools.curl.as_str())
                .args(["-f", "-L", "-s", "-S", "-o"])
                .arg(cached)
                .arg(&source.uri)
                .run(name, self.workspace.root()),
        };
        if let Err(err) = fetched {
            let _ = fs::remove_file(cached);
            return Err(err);
        }
        Ok(())
    }

    fn check_revision(&self) -> Result<()> {
        if !self.pinned() {
            return Ok(());
        }
        let actual = self.archive_sha1()?;
        if actual != self.component.revision {
            return Err(Error::RevisionMismatch {
                component: self.component.name.clone(),
                expected: self.component.revision.clone(),
                actual,
            });
        }
        Ok(())
    }

    fn unpack(&self) -> Result<()> {
        let scratch = self.workspace.cache().scratch_dir()?;
        self.component
            .source
            .kind
            .extract_command(
                self.workspace.tools(),
                &self.component.cached_archive,
                scratch.path(),
            )
            .ignore_status(self.component.ignore_status)
            .run(&self.component.name, self.workspace.root())?;
        move_tree(
            &self.component.name,
            scratch.path(),
            &self.component.local_path,
            self.component.skip_dirs,
        )
    }

    fn nothing_to_do(&self, what: &str) -> Result<()> {
        info!("{} {}: nothing to do for archive", what, self.component.alias);
        Ok(())
    }
}

impl SourceManager for TarManager {
    fn name(&self) -> &str {
        &self.component.name
    }

    fn format(&self) -> &'static str {
        FORMAT
    }

    fn descriptor(&self) -> &RepositoryDescriptor {
        &self.component.descriptor
    }

    fn local_path(&self) -> &Path {
        &self.component.local_path
    }

    fn extract(&self, args: &OpArgs) -> Result<()> {
        if !prepare_destination(&self.component.name, &self.component.local_path, args.force)? {
            return Ok(());
        }
        self.fetch()?;
        self.check_revision()?;
        if let Err(err) = self.unpack() {
            // Leave no partial tree behind
            if fs::symlink_metadata(&self.component.local_path).is_ok() {
                let _ = fs::remove_dir_all(&self.component.local_path);
            }
            return Err(err);
        }
        Ok(())
    }

    fn update(&self, _args: &OpArgs) -> Result<()> {
        self.nothing_to_do("Update")
    }

    fn commit(&self, _args: &OpArgs) -> Result<()> {
        self.nothing_to_do("Commit")
    }

    fn rebase(&self, _args: &OpArgs) -> Result<()> {
        self.nothing_to_do("Rebase")
    }

    fn deliver(&self, _args: &OpArgs) -> Result<()> {
        self.nothing_to_do("Deliver")
    }

    fn execute(&self, args: &OpArgs) -> Result<()> {
        execute_in(&self.component.name, &self.component.local_path, args)
    }

    fn get_actual_revision(&self) -> Result<String> {
        self.archive_sha1().map_err(|e| {
            Error::backend(
                &self.component.name,
                format!("cannot get actual revision: {}", e),
            )
        })
    }

    fn list(&self) -> String {
        format!(
            "{},{},{},{}",
            FORMAT, self.component.revision, self.component.repos, self.component.alias
        )
    }

    fn record(&self) -> Result<serde_yaml::Value> {
        Ok(serde_yaml::to_value(&self.component)?)
    }
}

/// Sorted entries directly under `dir`.
fn children(dir: &Path) -> Result<Vec<PathBuf>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            entry
                .map(|e| e.into_path())
                .map_err(|e| Error::Io(e.into()))
        })
        .collect()
}

/// Move the content of `src` into the new directory `dst`, dropping
/// `skip_dirs` leading directory levels.
///
/// With `skip_dirs` set to 1, the content of every top-level directory of
/// `src` is moved into `dst` and top-level files are dropped.
pub(crate) fn move_tree(component: &str, src: &Path, dst: &Path, skip_dirs: u64) -> Result<()> {
    if dst.exists() {
        return Err(Error::backend(
            component,
            format!("destination already exists: {}", dst.display()),
        ));
    }

    let mut levels = vec![src.to_path_buf()];
    for _ in 0..skip_dirs {
        let mut next = Vec::new();
        for dir in &levels {
            next.extend(children(dir)?.into_iter().filter(|p| p.is_dir()));
        }
        levels = next;
    }

    fs::create_dir_all(dst)?;
    for dir in &levels {
        for entry in children(dir)? {
            let file_name = entry.file_name().unwrap_or_default();
            let target = dst.join(file_name);
            if fs::symlink_metadata(&target).is_ok() {
                return Err(Error::backend(
                    component,
                    format!("file exists: {}", target.display()),
                ));
            }
            fs::rename(&entry, &target)?;
        }
    }
    Ok(())
}
