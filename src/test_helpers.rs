//! Shared test utilities for the gallery-preview test suite.
//!
//! Provides fixture writers for image trees and zip archives, plus lookup
//! helpers that work with the index data structures (`GroupIndex`, `Group`,
//! `ImageItem`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! touch(&tmp.path().join("catA/a.png"));
//! write_zip(&tmp.path().join("bundle.zip"), &[("sub/c.png", "c")]);
//!
//! let index = GroupIndex::build(&[tmp.path()], &Classifier::default()).unwrap();
//! let group = find_group(&index, &format!("{}/catA", tmp.path().display()));
//! assert_eq!(item_names(&group.images), vec!["a.png"]);
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::discover::ImageItem;
use crate::index::{Group, GroupIndex};

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a small placeholder file, making parent directories as needed.
///
/// Discovery never reads image bytes, so the content does not matter.
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "fake image").unwrap();
}

/// Write a zip archive with the given members.
///
/// Names ending in `/` become explicit directory markers; their content is
/// ignored.
pub fn write_zip<C: AsRef<[u8]>>(path: &Path, entries: &[(&str, C)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_ref()).unwrap();
        }
    }
    zip.finish().unwrap();
}

// =========================================================================
// Index lookups: panic with a clear message on miss
// =========================================================================

/// Find a group by key. Panics if not found.
pub fn find_group<'a>(index: &'a GroupIndex, key: &str) -> &'a Group {
    index.lookup(key).unwrap_or_else(|| {
        let keys = group_keys(index);
        panic!("group '{key}' not found. Available: {keys:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All group keys in index order.
pub fn group_keys(index: &GroupIndex) -> Vec<String> {
    index.groups().iter().map(|g| g.key.clone()).collect()
}

/// Item names in order.
pub fn item_names(items: &[ImageItem]) -> Vec<&str> {
    items.iter().map(|i| i.name.as_str()).collect()
}
