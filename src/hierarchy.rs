//! Directories and archives behind one traversal interface.
//!
//! The discovery engine walks anything that implements [`Hierarchy`]: it asks
//! for the children of a location, recurses into directory-like children and
//! turns image leaves into [`ImageItem`]s. Two implementations exist:
//!
//! - [`FsHierarchy`] lists a real directory tree, following symlinks but never
//!   entering the same physical directory twice.
//! - [`ZipHierarchy`] replays an archive's central directory as a virtual
//!   tree. Intermediate directories implied by member paths (`a/b/c.png`
//!   implies `a` and `a/b`) exist even when the archive has no marker for them.
//!
//! Children always come back sorted by name, which is what makes discovery
//! order reproducible between runs.

use crate::archive::ArchiveHandle;
use crate::classify::is_skipped_name;
use crate::discover::{DiscoveryWarning, ImageItem};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// One child returned by [`Hierarchy::children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<L> {
    pub location: L,
    pub name: String,
    pub kind: NodeKind,
}

/// A tree of directory-like locations with file leaves.
pub trait Hierarchy {
    type Location: Clone;

    /// Location of the top of the tree.
    fn root(&self) -> Self::Location;

    /// Children of a directory-like location, sorted by name.
    ///
    /// Problems with individual children are pushed onto `warnings` and the
    /// child is left out.
    fn children(
        &mut self,
        dir: &Self::Location,
        warnings: &mut Vec<DiscoveryWarning>,
    ) -> Vec<Node<Self::Location>>;

    /// The image item for a file leaf.
    fn image_item(&self, leaf: &Self::Location) -> ImageItem;

    /// Filesystem path of a file leaf that could itself be an archive.
    /// Sources that cannot hold nested containers return `None`.
    fn container_path(&self, _leaf: &Self::Location) -> Option<PathBuf> {
        None
    }
}

// ============================================================================
// Filesystem
// ============================================================================

/// A real directory tree.
#[derive(Debug)]
pub struct FsHierarchy {
    root: PathBuf,
    /// Canonical paths of directories already handed out.
    visited: HashSet<PathBuf>,
}

impl FsHierarchy {
    pub fn new(root: PathBuf) -> Self {
        let mut visited = HashSet::new();
        if let Ok(canonical) = fs::canonicalize(&root) {
            visited.insert(canonical);
        }
        Self { root, visited }
    }
}

impl Hierarchy for FsHierarchy {
    type Location = PathBuf;

    fn root(&self) -> PathBuf {
        self.root.clone()
    }

    fn children(&mut self, dir: &PathBuf, warnings: &mut Vec<DiscoveryWarning>) -> Vec<Node<PathBuf>> {
        let listing = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        let mut nodes = Vec::new();
        for entry in listing {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warnings.push(walk_warning(err, dir));
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if is_skipped_name(&name) {
                continue;
            }

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                let canonical = match fs::canonicalize(entry.path()) {
                    Ok(canonical) => canonical,
                    Err(err) => {
                        warnings.push(DiscoveryWarning::for_entry(entry.path(), err));
                        continue;
                    }
                };
                if !self.visited.insert(canonical) {
                    debug!(path = %entry.path().display(), "directory already walked, skipping");
                    continue;
                }
                NodeKind::Directory
            } else if file_type.is_file() {
                NodeKind::File
            } else {
                continue;
            };

            nodes.push(Node {
                location: entry.into_path(),
                name,
                kind,
            });
        }
        nodes
    }

    fn image_item(&self, leaf: &PathBuf) -> ImageItem {
        ImageItem::file(leaf.clone())
    }

    fn container_path(&self, leaf: &PathBuf) -> Option<PathBuf> {
        Some(leaf.clone())
    }
}

fn walk_warning(err: walkdir::Error, dir: &Path) -> DiscoveryWarning {
    let path = err.path().unwrap_or(dir).to_path_buf();
    let source = match err.into_io_error() {
        Some(io_err) => io_err,
        None => io::Error::other("filesystem loop"),
    };
    DiscoveryWarning::for_entry(&path, source)
}

// ============================================================================
// Zip archive
// ============================================================================

/// An archive's member listing, arranged as a tree.
///
/// Built from an open [`ArchiveHandle`] but owns no file descriptor: the
/// handle can be closed as soon as construction returns.
#[derive(Debug)]
pub struct ZipHierarchy {
    archive: PathBuf,
    /// Internal directory (`""` for the top) → child name → kind.
    tree: BTreeMap<String, BTreeMap<String, NodeKind>>,
}

impl ZipHierarchy {
    pub fn from_handle(handle: &ArchiveHandle) -> Self {
        let mut tree: BTreeMap<String, BTreeMap<String, NodeKind>> = BTreeMap::new();

        for entry in handle.entries() {
            let components: Vec<&str> = entry.path.split('/').collect();
            if components.iter().any(|c| is_skipped_name(c)) {
                continue;
            }

            let mut parent = String::new();
            for (i, component) in components.iter().enumerate() {
                let is_leaf = i + 1 == components.len();
                let kind = if is_leaf && !entry.is_dir {
                    NodeKind::File
                } else {
                    NodeKind::Directory
                };
                let slot = tree
                    .entry(parent.clone())
                    .or_default()
                    .entry((*component).to_string())
                    .or_insert(kind);
                // A path used both as a file and a directory is a directory
                if kind == NodeKind::Directory {
                    *slot = NodeKind::Directory;
                }
                parent = join_internal(&parent, component);
            }
        }

        Self {
            archive: handle.path().to_path_buf(),
            tree,
        }
    }
}

impl Hierarchy for ZipHierarchy {
    type Location = String;

    fn root(&self) -> String {
        String::new()
    }

    fn children(&mut self, dir: &String, _warnings: &mut Vec<DiscoveryWarning>) -> Vec<Node<String>> {
        self.tree
            .get(dir)
            .map(|children| {
                children
                    .iter()
                    .map(|(name, kind)| Node {
                        location: join_internal(dir, name),
                        name: name.clone(),
                        kind: *kind,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn image_item(&self, leaf: &String) -> ImageItem {
        ImageItem::member(self.archive.clone(), leaf.clone())
    }
}

fn join_internal(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{touch, write_zip};
    use tempfile::TempDir;

    fn names<L>(nodes: &[Node<L>]) -> Vec<(&str, NodeKind)> {
        nodes.iter().map(|n| (n.name.as_str(), n.kind)).collect()
    }

    #[test]
    fn fs_children_sorted_with_kinds() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("b.png"));
        touch(&tmp.path().join("a.txt"));
        fs::create_dir(tmp.path().join("c")).unwrap();

        let mut hierarchy = FsHierarchy::new(tmp.path().to_path_buf());
        let mut warnings = Vec::new();
        let root = hierarchy.root();
        let children = hierarchy.children(&root, &mut warnings);

        assert_eq!(
            names(&children),
            vec![
                ("a.txt", NodeKind::File),
                ("b.png", NodeKind::File),
                ("c", NodeKind::Directory),
            ]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn fs_missing_directory_is_a_warning() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("gone");

        let mut hierarchy = FsHierarchy::new(tmp.path().to_path_buf());
        let mut warnings = Vec::new();
        let children = hierarchy.children(&gone, &mut warnings);

        assert!(children.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn zip_tree_invents_intermediate_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.zip");
        write_zip(&path, &[("x/y/deep.png", "d"), ("top.png", "t")]);

        let handle = ArchiveHandle::open(&path).unwrap();
        let mut hierarchy = ZipHierarchy::from_handle(&handle);
        handle.close();

        let mut warnings = Vec::new();
        let top = hierarchy.children(&String::new(), &mut warnings);
        assert_eq!(
            names(&top),
            vec![("top.png", NodeKind::File), ("x", NodeKind::Directory)]
        );

        let x = hierarchy.children(&"x".to_string(), &mut warnings);
        assert_eq!(names(&x), vec![("y", NodeKind::Directory)]);
        assert_eq!(x[0].location, "x/y");

        let y = hierarchy.children(&"x/y".to_string(), &mut warnings);
        assert_eq!(names(&y), vec![("deep.png", NodeKind::File)]);
        assert_eq!(y[0].location, "x/y/deep.png");
    }

    #[test]
    fn zip_directory_markers_are_not_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.zip");
        write_zip(&path, &[("empty.png/", "")]);

        let handle = ArchiveHandle::open(&path).unwrap();
        let mut hierarchy = ZipHierarchy::from_handle(&handle);

        let top = hierarchy.children(&String::new(), &mut Vec::new());
        assert_eq!(names(&top), vec![("empty.png", NodeKind::Directory)]);
    }

    #[test]
    fn zip_leaf_becomes_member_item() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.zip");
        write_zip(&path, &[("sub/c.png", "c")]);

        let handle = ArchiveHandle::open(&path).unwrap();
        let hierarchy = ZipHierarchy::from_handle(&handle);

        let item = hierarchy.image_item(&"sub/c.png".to_string());
        assert_eq!(item.name, "c.png");
        assert_eq!(item.group_key, format!("{}:sub", path.display()));
        assert_eq!(
            item.address,
            crate::discover::Address::Member {
                archive: path.clone(),
                entry: "sub/c.png".into()
            }
        );
        assert_eq!(hierarchy.container_path(&"sub/c.png".to_string()), None);
    }
}
