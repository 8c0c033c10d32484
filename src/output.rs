//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Each group leads with
//! its positional index and display title; the filesystem location it came
//! from is shown as secondary context via an indented `Source:` line. Images
//! follow as numbered names, in the same order the web interface shows them.
//!
//! # Output Format
//!
//! ```text
//! Groups
//! 001 /photos/catA (2 images)
//!     Source: /photos/catA
//!     001 a.png
//!     002 b.png
//! 002 /photos/bundle.zip → sub (1 image)
//!     Source: /photos/bundle.zip
//!     001 c.png
//!
//! Warnings
//!     root not found: /photos/missing
//!
//! Found 3 images in 2 groups, 1 warning
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::index::GroupIndex;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 image`, `2 images`, `0 groups`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Format a group header: positional index + title + image count.
///
/// ```text
/// 001 /photos/catA (2 images)
/// ```
fn entity_header(index: usize, title: &str, count: usize) -> String {
    format!("{} {} ({})", format_index(index), title, plural(count, "image"))
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the group summary for a built index.
pub fn format_scan_output(index: &GroupIndex) -> Vec<String> {
    let mut lines = Vec::new();

    if index.is_empty() {
        lines.push("No images found".to_string());
    } else {
        lines.push("Groups".to_string());
        for (i, group) in index.groups().iter().enumerate() {
            lines.push(entity_header(i + 1, &group.title, group.len()));
            lines.push(format!("{}Source: {}", indent(1), group.location.display()));
            for (j, image) in group.images.iter().enumerate() {
                lines.push(format!("{}{} {}", indent(1), format_index(j + 1), image.name));
            }
        }
    }

    if !index.warnings().is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for warning in index.warnings() {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }

    lines.push(String::new());
    lines.push(format_totals(index));
    lines
}

/// One-line totals: `Found 3 images in 2 groups, 1 warning`.
pub fn format_totals(index: &GroupIndex) -> String {
    let mut line = format!(
        "Found {} in {}",
        plural(index.image_count(), "image"),
        plural(index.groups().len(), "group")
    );
    if !index.warnings().is_empty() {
        line.push_str(&format!(", {}", plural(index.warnings().len(), "warning")));
    }
    line
}

/// Print scan output to stdout.
pub fn print_scan_output(index: &GroupIndex) {
    for line in format_scan_output(index) {
        println!("{}", line);
    }
}

// ============================================================================
// Serve output
// ============================================================================

/// Lines printed once the server is listening.
///
/// ```text
/// Serving 3 images in 2 groups
///     http://127.0.0.1:5000/
/// ```
pub fn format_serve_banner(index: &GroupIndex, url: &str) -> Vec<String> {
    vec![
        format!(
            "Serving {} in {}",
            plural(index.image_count(), "image"),
            plural(index.groups().len(), "group")
        ),
        format!("{}{}", indent(1), url),
    ]
}

/// Print the serve banner to stdout.
pub fn print_serve_banner(index: &GroupIndex, url: &str) {
    for line in format_serve_banner(index, url) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::discover::{Discovery, DiscoveryWarning, ImageItem};
    use std::path::PathBuf;

    fn index_of(items: Vec<ImageItem>, warnings: Vec<DiscoveryWarning>) -> GroupIndex {
        GroupIndex::from_discoveries(
            vec![PathBuf::from("/photos")],
            vec![Discovery { items, warnings }],
        )
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn plural_counts() {
        assert_eq!(plural(0, "image"), "0 images");
        assert_eq!(plural(1, "image"), "1 image");
        assert_eq!(plural(2, "group"), "2 groups");
    }

    #[test]
    fn entity_header_with_count() {
        assert_eq!(entity_header(3, "/photos/catA", 1), "003 /photos/catA (1 image)");
    }

    // =========================================================================
    // Scan output tests
    // =========================================================================

    #[test]
    fn scan_output_lists_groups_and_images() {
        let index = index_of(
            vec![
                ImageItem::file(PathBuf::from("/photos/catA/b.png")),
                ImageItem::file(PathBuf::from("/photos/catA/a.png")),
                ImageItem::member(PathBuf::from("/photos/bundle.zip"), "sub/c.png".into()),
            ],
            Vec::new(),
        );

        let lines = format_scan_output(&index);
        assert_eq!(
            lines,
            vec![
                "Groups",
                "001 /photos/bundle.zip → sub (1 image)",
                "    Source: /photos/bundle.zip",
                "    001 c.png",
                "002 /photos/catA (2 images)",
                "    Source: /photos/catA",
                "    001 a.png",
                "    002 b.png",
                "",
                "Found 3 images in 2 groups",
            ]
        );
    }

    #[test]
    fn scan_output_shows_warnings() {
        let index = index_of(
            vec![ImageItem::file(PathBuf::from("/photos/a.png"))],
            vec![DiscoveryWarning::RootNotFound(PathBuf::from("/photos/missing"))],
        );

        let lines = format_scan_output(&index);
        assert!(lines.contains(&"Warnings".to_string()));
        assert!(lines.contains(&"    root not found: /photos/missing".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Found 1 image in 1 group, 1 warning"
        );
    }

    #[test]
    fn scan_output_empty_index() {
        let index = index_of(Vec::new(), Vec::new());
        let lines = format_scan_output(&index);
        assert_eq!(lines, vec!["No images found", "", "Found 0 images in 0 groups"]);
    }

    #[test]
    fn scan_output_of_built_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        crate::test_helpers::touch(&tmp.path().join("a.png"));
        let index = GroupIndex::build(&[tmp.path()], &Classifier::default()).unwrap();

        let lines = format_scan_output(&index);
        assert_eq!(lines[0], "Groups");
        assert!(lines[1].ends_with("(1 image)"));
        assert_eq!(lines[3], "    001 a.png");
    }

    // =========================================================================
    // Serve banner tests
    // =========================================================================

    #[test]
    fn serve_banner_shows_url() {
        let index = index_of(
            vec![ImageItem::file(PathBuf::from("/photos/a.png"))],
            Vec::new(),
        );
        assert_eq!(
            format_serve_banner(&index, "http://127.0.0.1:5000/"),
            vec!["Serving 1 image in 1 group", "    http://127.0.0.1:5000/"]
        );
    }
}
