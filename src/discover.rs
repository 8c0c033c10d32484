//! Image discovery for a single root.
//!
//! [`discover`] turns one classified [`Root`] into the images reachable from
//! it. Directories and archives are walked by the same code path through the
//! [`Hierarchy`] trait, so the engine never asks what kind of source it is
//! looking at beyond the root's classification.
//!
//! ## Addresses and groups
//!
//! | Source | Address | Group key |
//! |--------|---------|-----------|
//! | `/g/photo.jpg` | `File { /g/photo.jpg }` | `/g` |
//! | `/g/catA/a.png` (under root `/g/catA`) | `File { /g/catA/a.png }` | `/g/catA` |
//! | `sub/c.png` in `/g/bundle.zip` | `Member { /g/bundle.zip, sub/c.png }` | `/g/bundle.zip:sub` |
//! | `c.png` at the top of `/g/bundle.zip` | `Member { /g/bundle.zip, c.png }` | `/g/bundle.zip:` |
//!
//! Root paths are made absolute and lexically normalized before anything is
//! derived from them, so `./g/../g/catA` and `/abs/g/catA` produce the same
//! addresses and keys. Symlinks are not resolved: an image keeps the path it
//! was found under.
//!
//! ## Failures
//!
//! Nothing in here aborts. Missing roots, broken archives and unreadable
//! directories each become one [`DiscoveryWarning`] and contribute no images.

use crate::archive::{ArchiveError, ArchiveHandle};
use crate::classify::{Classification, Classifier};
use crate::hierarchy::{FsHierarchy, Hierarchy, NodeKind, ZipHierarchy};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// A recoverable problem met during discovery.
#[derive(Error, Debug)]
pub enum DiscoveryWarning {
    #[error("root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("not an image, directory or archive: {0}")]
    Unrecognized(PathBuf),
    #[error(transparent)]
    ArchiveOpen(#[from] ArchiveError),
    #[error("permission denied: {path}")]
    Permission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DiscoveryWarning {
    /// Warning for a root that could not be stat'ed.
    pub fn for_root(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::RootNotFound(path.to_path_buf())
        } else {
            Self::for_entry(path, source)
        }
    }

    /// Warning for an entry that could not be read during traversal.
    pub fn for_entry(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::Permission {
                path: path.to_path_buf(),
                source,
            },
            _ => Self::Unreadable {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// What backs a group: a directory on disk, or a directory inside an archive.
///
/// A directory literally named `bundle.zip:sub` and the `sub` directory of
/// `bundle.zip` share a key string; the kind keeps them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Directory,
    Archive,
}

impl GroupKind {
    fn tag(self) -> &'static [u8] {
        match self {
            GroupKind::Directory => b"directory",
            GroupKind::Archive => b"archive",
        }
    }
}

/// Globally unique location of one image.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Address {
    /// A plain file on disk.
    File { path: PathBuf },
    /// A member of a zip archive on disk.
    Member { archive: PathBuf, entry: String },
}

impl Address {
    /// Stable opaque id, safe to put in a URL.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Address::File { path } => {
                hasher.update(b"file\0");
                hasher.update(path.to_string_lossy().as_bytes());
            }
            Address::Member { archive, entry } => {
                hasher.update(b"member\0");
                hasher.update(archive.to_string_lossy().as_bytes());
                hasher.update(b"\0");
                hasher.update(entry.as_bytes());
            }
        }
        short_hex(hasher.finalize().as_slice())
    }

    /// Basename of the image.
    pub fn name(&self) -> String {
        match self {
            Address::File { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            Address::Member { entry, .. } => entry
                .rsplit_once('/')
                .map(|(_, name)| name)
                .unwrap_or(entry)
                .to_string(),
        }
    }

    /// Key of the group this image belongs to.
    pub fn group_key(&self) -> String {
        match self {
            Address::File { path } => path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Address::Member { archive, entry } => {
                format!("{}:{}", archive.display(), internal_dir(entry))
            }
        }
    }

    pub fn group_kind(&self) -> GroupKind {
        match self {
            Address::File { .. } => GroupKind::Directory,
            Address::Member { .. } => GroupKind::Archive,
        }
    }

    /// Stable opaque id of the group this image belongs to.
    pub fn group_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.group_kind().tag());
        hasher.update(b"\0");
        hasher.update(self.group_key().as_bytes());
        short_hex(hasher.finalize().as_slice())
    }

    /// Human-readable group title.
    pub fn group_title(&self) -> String {
        match self {
            Address::File { .. } => self.group_key(),
            Address::Member { archive, entry } => {
                let dir = internal_dir(entry);
                let dir = if dir.is_empty() { "/" } else { dir };
                format!("{} → {}", archive.display(), dir)
            }
        }
    }

    /// Filesystem location backing the group: the directory, or the archive file.
    pub fn group_location(&self) -> PathBuf {
        match self {
            Address::File { path } => path.parent().map(Path::to_path_buf).unwrap_or_default(),
            Address::Member { archive, .. } => archive.clone(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::File { path } => write!(f, "{}", path.display()),
            Address::Member { archive, entry } => write!(f, "{} → {}", archive.display(), entry),
        }
    }
}

/// One discovered image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageItem {
    pub id: String,
    pub address: Address,
    /// Display name (basename).
    pub name: String,
    pub group_key: String,
}

impl ImageItem {
    pub fn new(address: Address) -> Self {
        Self {
            id: address.id(),
            name: address.name(),
            group_key: address.group_key(),
            address,
        }
    }

    pub fn file(path: PathBuf) -> Self {
        Self::new(Address::File { path })
    }

    pub fn member(archive: PathBuf, entry: String) -> Self {
        Self::new(Address::Member { archive, entry })
    }
}

/// A user-supplied root after classification.
#[derive(Debug, Clone)]
pub struct Root {
    /// Absolute, lexically normalized path.
    pub path: PathBuf,
    pub classification: Classification,
}

impl Root {
    /// Normalize and classify a root path. A root that cannot be stat'ed
    /// comes back as the warning describing why.
    pub fn classify(raw: &Path, classifier: &Classifier) -> Result<Self, DiscoveryWarning> {
        let path = normalize_path(raw).map_err(|e| DiscoveryWarning::for_root(raw, e))?;
        let classification = classifier
            .classify(&path)
            .map_err(|e| DiscoveryWarning::for_root(&path, e))?;
        Ok(Self {
            path,
            classification,
        })
    }
}

/// Images and warnings produced by one root.
#[derive(Debug, Default)]
pub struct Discovery {
    pub items: Vec<ImageItem>,
    pub warnings: Vec<DiscoveryWarning>,
}

impl Discovery {
    pub fn from_warning(warning: DiscoveryWarning) -> Self {
        Self {
            items: Vec::new(),
            warnings: vec![warning],
        }
    }
}

/// Discover every image reachable from `root`.
///
/// Items come out in traversal order: lexicographic by name within each
/// directory, depth first. Duplicate addresses are dropped.
pub fn discover(root: &Root, classifier: &Classifier) -> Discovery {
    let mut discovery = Discovery::default();

    match root.classification {
        Classification::Image => discovery.items.push(ImageItem::file(root.path.clone())),
        Classification::Directory => {
            let mut hierarchy = FsHierarchy::new(root.path.clone());
            walk(&mut hierarchy, classifier, &mut discovery);
        }
        Classification::Archive => discover_archive(&root.path, classifier, &mut discovery),
        Classification::Unrecognized => discovery
            .warnings
            .push(DiscoveryWarning::Unrecognized(root.path.clone())),
    }

    let mut seen = HashSet::new();
    discovery.items.retain(|item| seen.insert(item.address.clone()));

    debug!(
        root = %root.path.display(),
        images = discovery.items.len(),
        warnings = discovery.warnings.len(),
        "root discovered"
    );
    discovery
}

/// Open an archive, snapshot its listing, close it, then walk the listing.
fn discover_archive(path: &Path, classifier: &Classifier, discovery: &mut Discovery) {
    let mut hierarchy = match ArchiveHandle::open(path) {
        Ok(handle) => {
            let hierarchy = ZipHierarchy::from_handle(&handle);
            handle.close();
            hierarchy
        }
        Err(err) => {
            discovery.warnings.push(err.into());
            return;
        }
    };
    walk(&mut hierarchy, classifier, discovery);
}

/// Walk any hierarchy from its root.
pub fn walk<H: Hierarchy>(hierarchy: &mut H, classifier: &Classifier, discovery: &mut Discovery) {
    let root = hierarchy.root();
    walk_dir(hierarchy, &root, classifier, discovery);
}

fn walk_dir<H: Hierarchy>(
    hierarchy: &mut H,
    dir: &H::Location,
    classifier: &Classifier,
    discovery: &mut Discovery,
) {
    for node in hierarchy.children(dir, &mut discovery.warnings) {
        match node.kind {
            NodeKind::Directory => walk_dir(hierarchy, &node.location, classifier, discovery),
            NodeKind::File if classifier.is_image_name(&node.name) => {
                discovery.items.push(hierarchy.image_item(&node.location));
            }
            NodeKind::File => {
                // Archives are expanded one level deep only
                if let Some(path) = hierarchy.container_path(&node.location)
                    && classifier.is_archive_file(&path)
                {
                    discover_archive(&path, classifier, discovery);
                }
            }
        }
    }
}

/// Make a path absolute and fold `.` and `..` components without touching
/// the filesystem.
pub fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

fn internal_dir(entry: &str) -> &str {
    entry.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// First 16 hex chars of a digest. Plenty for one run's worth of ids.
pub(crate) fn short_hex(digest: &[u8]) -> String {
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
