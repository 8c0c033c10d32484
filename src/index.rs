//! The in-memory group index.
//!
//! [`GroupIndex::build`] classifies every root, discovers each one (in
//! parallel, one rayon task per root), merges the results and freezes them.
//! After `build` returns nothing mutates the index, so the serving layer can
//! share it behind an `Arc` and read it from any number of requests without
//! locking.
//!
//! ## Ordering
//!
//! - Groups are sorted by key, lexicographically.
//! - Images inside a group are sorted by address. Every image in a group
//!   shares a parent, so this is name order, the same order traversal
//!   produces for a single root.
//!
//! Both orders are independent of root order and of which parallel task
//! finished first: the same inputs always produce the same index.
//!
//! ## Deduplication
//!
//! Overlapping roots (`/g` and `/g/catA`, or the same path twice) reach the
//! same files. Images are keyed by [`Address`], so each one is stored once.
//!
//! Groups are keyed by key string and [`GroupKind`]. A directory on disk whose
//! name happens to read like an archive group key never absorbs that
//! archive's images.

use crate::classify::{Classification, Classifier};
use crate::discover::{Address, Discovery, DiscoveryWarning, GroupKind, ImageItem, Root, discover};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("no roots given")]
    NoRoots,
    #[error("none of the {0} roots is an image, a directory or an archive")]
    NoUsableRoots(usize),
}

/// Images sharing one parent directory or archive-internal directory.
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub id: String,
    pub key: String,
    pub kind: GroupKind,
    pub title: String,
    /// The directory, or the archive file, the images live in.
    pub location: PathBuf,
    pub images: Vec<ImageItem>,
}

impl Group {
    fn new(first: &Address) -> Self {
        Self {
            id: first.group_id(),
            key: first.group_key(),
            kind: first.group_kind(),
            title: first.group_title(),
            location: first.group_location(),
            images: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// All groups discovered from one set of roots. Immutable once built.
#[derive(Debug, Default, Serialize)]
pub struct GroupIndex {
    roots: Vec<PathBuf>,
    groups: Vec<Group>,
    #[serde(serialize_with = "warnings_as_strings")]
    warnings: Vec<DiscoveryWarning>,
    #[serde(skip)]
    by_key: HashMap<String, usize>,
    #[serde(skip)]
    by_id: HashMap<String, usize>,
    #[serde(skip)]
    images: HashMap<String, (usize, usize)>,
}

impl GroupIndex {
    /// Discover every root and freeze the result.
    ///
    /// Per-root problems become warnings. The build only fails when there is
    /// nothing to look at: no roots, or no root that classifies as an image,
    /// directory or archive.
    pub fn build<P>(roots: &[P], classifier: &Classifier) -> Result<Self, BuildError>
    where
        P: AsRef<Path>,
    {
        if roots.is_empty() {
            return Err(BuildError::NoRoots);
        }

        let classified: Vec<Result<Root, DiscoveryWarning>> = roots
            .iter()
            .map(|raw| Root::classify(raw.as_ref(), classifier))
            .collect();

        let usable = classified
            .iter()
            .filter(|r| matches!(r, Ok(root) if root.classification != Classification::Unrecognized))
            .count();
        if usable == 0 {
            for warning in classified.iter().filter_map(|r| r.as_ref().err()) {
                warn!("{warning}");
            }
            return Err(BuildError::NoUsableRoots(roots.len()));
        }

        let root_paths = classified
            .iter()
            .zip(roots)
            .map(|(result, raw)| match result {
                Ok(root) => root.path.clone(),
                Err(_) => raw.as_ref().to_path_buf(),
            })
            .collect();

        let discoveries: Vec<Discovery> = classified
            .into_par_iter()
            .map(|result| match result {
                Ok(root) => discover(&root, classifier),
                Err(warning) => Discovery::from_warning(warning),
            })
            .collect();

        let index = Self::from_discoveries(root_paths, discoveries);
        for warning in &index.warnings {
            warn!("{warning}");
        }
        info!(
            groups = index.groups.len(),
            images = index.image_count(),
            warnings = index.warnings.len(),
            "index built"
        );
        Ok(index)
    }

    /// Merge discovery results into a frozen index.
    pub fn from_discoveries(roots: Vec<PathBuf>, discoveries: Vec<Discovery>) -> Self {
        let mut unique: BTreeMap<Address, ImageItem> = BTreeMap::new();
        let mut warnings = Vec::new();
        for discovery in discoveries {
            for item in discovery.items {
                unique.insert(item.address.clone(), item);
            }
            warnings.extend(discovery.warnings);
        }

        let mut grouped: BTreeMap<(String, GroupKind), Group> = BTreeMap::new();
        for (address, item) in unique {
            grouped
                .entry((item.group_key.clone(), address.group_kind()))
                .or_insert_with(|| Group::new(&address))
                .images
                .push(item);
        }

        let groups: Vec<Group> = grouped.into_values().collect();

        let mut by_key = HashMap::with_capacity(groups.len());
        let mut by_id = HashMap::with_capacity(groups.len());
        let mut images = HashMap::new();
        for (g, group) in groups.iter().enumerate() {
            by_key.entry(group.key.clone()).or_insert(g);
            by_id.insert(group.id.clone(), g);
            for (i, image) in group.images.iter().enumerate() {
                images.insert(image.id.clone(), (g, i));
            }
        }

        Self {
            roots,
            groups,
            warnings,
            by_key,
            by_id,
            images,
        }
    }

    /// Groups in key order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Group by key. When a directory and an archive group share a key, the
    /// directory group is returned; both are in [`groups`](Self::groups).
    pub fn lookup(&self, key: &str) -> Option<&Group> {
        self.by_key.get(key).map(|&g| &self.groups[g])
    }

    /// Group by its opaque id.
    pub fn group_by_id(&self, id: &str) -> Option<&Group> {
        self.by_id.get(id).map(|&g| &self.groups[g])
    }

    /// Image by its opaque id, with the group holding it.
    pub fn image(&self, id: &str) -> Option<(&Group, &ImageItem)> {
        self.images.get(id).map(|&(g, i)| {
            let group = &self.groups[g];
            (group, &group.images[i])
        })
    }

    pub fn warnings(&self) -> &[DiscoveryWarning] {
        &self.warnings
    }

    /// True when no root produced an image. A valid state, not an error.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn image_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }
}

fn warnings_as_strings<S: Serializer>(
    warnings: &[DiscoveryWarning],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(warnings.iter().map(ToString::to_string))
}
