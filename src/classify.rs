//! Path classification.
//!
//! Every root handed to the tool, and every file met while walking a
//! directory, is tagged once with a [`Classification`]. The tag is then
//! threaded through discovery as data instead of being re-derived.
//!
//! ## Rules
//!
//! | Check | Decides | How |
//! |-------|---------|-----|
//! | stat | Directory | always by filesystem metadata |
//! | extension | Image | case-insensitive match against the image set |
//! | extension or content | Archive | depends on [`ArchiveDetection`] |
//!
//! Anything else is [`Classification::Unrecognized`] and gets skipped.
//!
//! With [`ArchiveDetection::Content`] a file is an archive when the zip
//! reader accepts its central directory, whatever its name. This finds
//! renamed archives (`.dat`, `.bin`) at the cost of opening every
//! non-image file in the walked trees.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

/// Image extensions recognized when the config does not override them.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Archive extensions recognized when the config does not override them.
pub const DEFAULT_ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cbz"];

/// How archive files are told apart from other files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveDetection {
    /// Trust the file extension.
    #[default]
    Extension,
    /// Open the file and check for a valid zip container.
    Content,
}

/// What a path turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Image,
    Directory,
    Archive,
    Unrecognized,
}

/// Extension sets plus the archive detection mode.
#[derive(Debug, Clone)]
pub struct Classifier {
    image_extensions: Vec<String>,
    archive_extensions: Vec<String>,
    detection: ArchiveDetection,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_IMAGE_EXTENSIONS,
            DEFAULT_ARCHIVE_EXTENSIONS,
            ArchiveDetection::Extension,
        )
    }
}

impl Classifier {
    /// Build a classifier. Extensions are matched case-insensitively and may
    /// be given with or without the leading dot.
    pub fn new<I, A>(image_extensions: I, archive_extensions: A, detection: ArchiveDetection) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        Self {
            image_extensions: normalize_extensions(image_extensions),
            archive_extensions: normalize_extensions(archive_extensions),
            detection,
        }
    }

    pub fn detection(&self) -> ArchiveDetection {
        self.detection
    }

    /// Same rule set, different archive detection mode.
    pub fn with_detection(mut self, detection: ArchiveDetection) -> Self {
        self.detection = detection;
        self
    }

    /// Classify a root path.
    ///
    /// Fails only when the path cannot be stat'ed (missing, or a parent
    /// directory is unreadable); the caller turns that into a per-root warning.
    pub fn classify(&self, path: &Path) -> io::Result<Classification> {
        let metadata = fs::metadata(path)?;
        if metadata.is_dir() {
            return Ok(Classification::Directory);
        }
        if !metadata.is_file() {
            return Ok(Classification::Unrecognized);
        }
        Ok(self.classify_file(path))
    }

    /// Classify a path already known to be a regular file.
    pub fn classify_file(&self, path: &Path) -> Classification {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if self.is_image_name(&name) {
            Classification::Image
        } else if self.is_archive_file(path) {
            Classification::Archive
        } else {
            Classification::Unrecognized
        }
    }

    /// Whether a file or archive entry name carries an image extension.
    ///
    /// Works on bare names so archive members can reuse the filesystem rule.
    pub fn is_image_name(&self, name: &str) -> bool {
        extension_of(name).is_some_and(|ext| self.image_extensions.contains(&ext))
    }

    /// Whether a regular file counts as an archive under the active mode.
    pub fn is_archive_file(&self, path: &Path) -> bool {
        match self.detection {
            ArchiveDetection::Extension => path
                .file_name()
                .and_then(|n| extension_of(&n.to_string_lossy()))
                .is_some_and(|ext| self.archive_extensions.contains(&ext)),
            ArchiveDetection::Content => sniff_archive(path),
        }
    }
}

/// Whether a name is resource-fork noise that should never be surfaced.
///
/// Covers AppleDouble files (`._photo.jpg`) and the `__MACOSX` directory that
/// macOS writes into zip files.
pub fn is_skipped_name(name: &str) -> bool {
    name.starts_with("._") || name == "__MACOSX"
}

/// Check whether a file is a readable zip container by parsing its
/// central directory.
pub fn sniff_archive(path: &Path) -> bool {
    File::open(path)
        .map(|file| zip::ZipArchive::new(BufReader::new(file)).is_ok())
        .unwrap_or(false)
}

/// Lowercased extension of a name, if it has one. Dotfiles like `.png` have none.
fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

fn normalize_extensions<I>(extensions: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
