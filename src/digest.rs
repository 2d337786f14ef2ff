//! # Content digests
//!
//! Computes a stable SHA-1 over a set of paths. The computation first produces
//! a listing with one line per entry, then hashes the listing text:
//!
//! ```text
//! F <size-or-sha1> <path>      regular file
//! L <len-or-sha1> <path>       symbolic link (of its target string)
//! S [<sha1-of-empty>] <path>   anything else (socket, fifo, device)
//! ```
//!
//! Paths are rendered relative to the base directory, so a directory digested
//! as `.` yields entries like `./src/lib.rs`. Inside a directory, entries are
//! visited in this order: non-directory entries sorted by name, then symbolic
//! links to directories sorted by name (recorded as links, never followed),
//! then real subdirectories sorted by name, recursively.
//!
//! Without `digest_content`, files are identified by their size and links by
//! the length of their target. With it, the SHA-1 of the file content (read
//! in blocks) or of the link target is used instead.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::warn;
use sha1::{Digest, Sha1};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Default read block size for file content.
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Hex SHA-1 of a byte slice.
///
/// ```
/// assert_eq!(
///     deptools::digest::sha1_hex(b""),
///     "da39a3ee5e6b4b0d3255bfef95601890afd80709"
/// );
/// ```
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Outcome of a listing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestReport {
    /// Number of lines written to the listing.
    pub entries: usize,
    /// Entries that could not be read and were left out of the listing.
    pub skipped: Vec<String>,
}

/// Listing and digest computation over a directory tree.
#[derive(Debug, Clone)]
pub struct Digester {
    block_size: usize,
    digest_content: bool,
    ignore_errors: bool,
}

impl Default for Digester {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            digest_content: false,
            ignore_errors: false,
        }
    }
}

impl Digester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash file content and link targets instead of using sizes.
    pub fn digest_content(mut self, enabled: bool) -> Self {
        self.digest_content = enabled;
        self
    }

    /// Log unreadable entries as warnings and leave them out of the listing
    /// instead of failing.
    pub fn ignore_errors(mut self, enabled: bool) -> Self {
        self.ignore_errors = enabled;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size.max(1);
        self
    }

    /// Hex SHA-1 of everything readable from `reader`.
    pub fn digest_reader<R: Read>(&self, mut reader: R) -> io::Result<String> {
        let mut hasher = Sha1::new();
        let mut buf = vec![0u8; self.block_size];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Write the listing of `paths` (relative to `base`) to `out`.
    ///
    /// The paths are processed in sorted order. Every path must exist. An
    /// entry that cannot be read is an error unless errors are ignored, in
    /// which case it is reported in [`DigestReport::skipped`].
    pub fn digest_list<W: Write>(
        &self,
        base: &Path,
        paths: &[&str],
        out: &mut W,
    ) -> Result<DigestReport> {
        let mut sorted: Vec<&str> = paths.to_vec();
        sorted.sort_unstable();

        let mut listing = Listing {
            digester: self,
            base,
            out,
            report: DigestReport::default(),
        };

        for path in sorted {
            let full = base.join(path);
            let meta = fs::symlink_metadata(&full).map_err(|e| {
                Error::backend(path, format!("cannot digest {}: {}", full.display(), e))
            })?;
            if meta.is_dir() {
                listing.directory(Path::new(path))?;
            } else {
                listing.not_directory(Path::new(path))?;
            }
        }

        let report = listing.report;
        if !report.skipped.is_empty() {
            if !self.ignore_errors {
                return Err(Error::backend(
                    base.display().to_string(),
                    format!(
                        "cannot compute digest, {} unreadable entries: {}",
                        report.skipped.len(),
                        report.skipped.join("; ")
                    ),
                ));
            }
            for skipped in &report.skipped {
                warn!("digest: skipped {}", skipped);
            }
        }
        Ok(report)
    }

    /// SHA-1 of the listing of `paths`, with the listing report.
    pub fn digest_paths(&self, base: &Path, paths: &[&str]) -> Result<(String, DigestReport)> {
        let mut listing = Vec::new();
        let report = self.digest_list(base, paths, &mut listing)?;
        Ok((sha1_hex(&listing), report))
    }
}

struct Listing<'a, W: Write> {
    digester: &'a Digester,
    base: &'a Path,
    out: &'a mut W,
    report: DigestReport,
}

enum Kind {
    Dir,
    LinkToDir,
    Other,
}

impl<W: Write> Listing<'_, W> {
    fn line(&mut self, tag: char, value: Option<&str>, path: &Path) -> Result<()> {
        match value {
            Some(value) => writeln!(self.out, "{} {} {}", tag, value, path.display())?,
            None => writeln!(self.out, "{} {}", tag, path.display())?,
        }
        self.report.entries += 1;
        Ok(())
    }

    fn skip(&mut self, what: &str, error: impl std::fmt::Display, path: &Path) {
        self.report
            .skipped
            .push(format!("{}: {}: {}", what, error, path.display()));
    }

    fn directory(&mut self, rel: &Path) -> Result<()> {
        let full = self.base.join(rel);
        let mut entries: Vec<(PathBuf, Kind)> = Vec::new();

        for entry in WalkDir::new(&full)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .and_then(|p| p.strip_prefix(self.base).ok())
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| rel.to_path_buf());
                    self.skip("can't access path", e, &path);
                    continue;
                }
            };
            let kind = if entry.file_type().is_dir() {
                Kind::Dir
            } else if entry.path_is_symlink()
                && fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false)
            {
                Kind::LinkToDir
            } else {
                Kind::Other
            };
            entries.push((rel.join(entry.file_name()), kind));
        }

        for (path, _) in entries.iter().filter(|(_, k)| matches!(k, Kind::Other)) {
            self.not_directory(path)?;
        }
        for (path, _) in entries.iter().filter(|(_, k)| matches!(k, Kind::LinkToDir)) {
            self.link(path)?;
        }
        for (path, _) in entries.iter().filter(|(_, k)| matches!(k, Kind::Dir)) {
            self.directory(path)?;
        }
        Ok(())
    }

    fn not_directory(&mut self, rel: &Path) -> Result<()> {
        let full = self.base.join(rel);
        let meta = match fs::symlink_metadata(&full) {
            Ok(meta) => meta,
            Err(e) => {
                self.skip("can't access path", e, rel);
                return Ok(());
            }
        };
        let file_type = meta.file_type();
        if file_type.is_symlink() {
            self.link(rel)
        } else if file_type.is_file() {
            self.file(rel, meta.len())
        } else {
            let value = self.digester.digest_content.then(|| sha1_hex(b""));
            self.line('S', value.as_deref(), rel)
        }
    }

    fn link(&mut self, rel: &Path) -> Result<()> {
        let target = match fs::read_link(self.base.join(rel)) {
            Ok(target) => target.to_string_lossy().into_owned(),
            Err(e) => {
                self.skip("can't read link", e, rel);
                return Ok(());
            }
        };
        let value = if self.digester.digest_content {
            sha1_hex(target.as_bytes())
        } else {
            target.len().to_string()
        };
        self.line('L', Some(&value), rel)
    }

    fn file(&mut self, rel: &Path, size: u64) -> Result<()> {
        if !self.digester.digest_content {
            return self.line('F', Some(&size.to_string()), rel);
        }
        let digest = File::open(self.base.join(rel))
            .and_then(|f| self.digester.digest_reader(f));
        match digest {
            Ok(digest) => self.line('F', Some(&digest), rel),
            Err(e) => {
                self.skip("can't read file", e, rel);
                Ok(())
            }
        }
    }
}
