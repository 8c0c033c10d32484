//! Fixture writers shared by the integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Smallest valid PNG signature plus IHDR tag, enough for format sniffing.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// Write a file, making parent directories as needed.
pub fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Write a zip archive with the given members. Names ending in `/` become
/// directory markers.
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
