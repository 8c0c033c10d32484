//! Read-only access to zip archives.
//!
//! An [`ArchiveHandle`] owns one open archive. It lists member paths from the
//! central directory without decompressing anything, and extracts a single
//! member on request. The handle is closed when it is dropped; callers keep it
//! scoped to one traversal or one content lookup.
//!
//! Member paths are normalized to forward slashes with no leading `/`, no
//! empty or `.` components and no trailing slash, so archives written on
//! Windows address the same way as everything else.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

/// Upper bound on the buffer reserved up front for one member. The declared
/// size comes from the archive and may be anything.
const MAX_PREALLOC: u64 = 8 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("cannot open archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a readable zip archive: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("no entry {entry} in {path}")]
    EntryNotFound { path: PathBuf, entry: String },
    #[error("cannot read {entry} from {path}: {source}")]
    Read {
        path: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// One member of an archive, as listed by the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Normalized internal path (`sub/c.png`).
    pub path: String,
    /// Explicit directory marker (`sub/`) rather than a file.
    pub is_dir: bool,
}

impl ArchiveEntry {
    fn from_raw(raw: &str) -> Option<Self> {
        let path = normalize_entry_path(raw);
        if path.is_empty() {
            return None;
        }
        Some(Self {
            path,
            is_dir: raw.ends_with('/') || raw.ends_with('\\'),
        })
    }

    /// Internal directory holding this entry, `""` for the archive root.
    pub fn parent(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    /// Last path component.
    pub fn name(&self) -> &str {
        self.path
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.path)
    }
}

/// An open zip archive.
pub struct ArchiveHandle {
    path: PathBuf,
    zip: ZipArchive<BufReader<File>>,
}

impl std::fmt::Debug for ArchiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("path", &self.path)
            .field("entries", &self.zip.len())
            .finish()
    }
}

impl ArchiveHandle {
    /// Open an archive and parse its central directory.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let zip = ZipArchive::new(BufReader::new(file)).map_err(|source| ArchiveError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily list members in central-directory order.
    pub fn entries(&self) -> impl Iterator<Item = ArchiveEntry> + '_ {
        (0..self.zip.len())
            .filter_map(|i| self.zip.name_for_index(i))
            .filter_map(ArchiveEntry::from_raw)
    }

    /// Extract one member's decompressed bytes by normalized internal path.
    pub fn read_entry(&mut self, entry: &str) -> Result<Vec<u8>, ArchiveError> {
        let not_found = || ArchiveError::EntryNotFound {
            path: self.path.clone(),
            entry: entry.to_string(),
        };

        let index = (0..self.zip.len())
            .find(|&i| {
                self.zip
                    .name_for_index(i)
                    .and_then(ArchiveEntry::from_raw)
                    .is_some_and(|e| !e.is_dir && e.path == entry)
            })
            .ok_or_else(not_found)?;

        let mut member = self.zip.by_index(index).map_err(|source| ArchiveError::Invalid {
            path: self.path.clone(),
            source,
        })?;
        let mut bytes = Vec::with_capacity(member.size().min(MAX_PREALLOC) as usize);
        member
            .read_to_end(&mut bytes)
            .map_err(|source| ArchiveError::Read {
                path: self.path.clone(),
                entry: entry.to_string(),
                source,
            })?;
        Ok(bytes)
    }

    /// Release the archive. Dropping the handle does the same.
    pub fn close(self) {}
}

/// Normalize a raw member name to `a/b/c` form.
pub fn normalize_entry_path(raw: &str) -> String {
    raw.split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != ".")
        .collect::<Vec<_>>()
        .join("/")
}
