//! Address → bytes.
//!
//! The serving layer only ever holds [`Address`]es taken from a built
//! [`GroupIndex`](crate::index::GroupIndex). Resolving one opens the file, or
//! reopens the archive and extracts the member, for that single request.
//! No archive handle outlives the call, so a long-running server holds no
//! file descriptors between requests.
//!
//! Plain files can also be handed out unread through [`open_file`], for the
//! serving layer to stream.

use crate::archive::{ArchiveError, ArchiveHandle};
use crate::discover::Address;
use image::ImageFormat;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The address no longer resolves. Every variant maps to "not found" at the
/// presentation boundary.
#[derive(Error, Debug)]
pub enum LocateError {
    #[error("cannot open {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Readable image bytes.
pub type ByteStream = Box<dyn Read + Send>;

/// Leading bytes read to sniff an image format.
const SNIFF_LEN: u64 = 64;

/// A plain image file, opened and sniffed, positioned at its first byte.
#[derive(Debug)]
pub struct OpenedFile {
    pub file: File,
    pub len: u64,
    pub mime: &'static str,
}

/// Open a byte stream for an address.
///
/// Archive members are decompressed into memory before the archive is
/// closed; plain files are streamed from disk.
pub fn resolve(address: &Address) -> Result<ByteStream, LocateError> {
    match address {
        Address::File { path } => {
            let (file, _) = open_regular_file(path)?;
            Ok(Box::new(BufReader::new(file)))
        }
        Address::Member { archive, entry } => {
            let mut handle = ArchiveHandle::open(archive)?;
            let bytes = handle.read_entry(entry)?;
            Ok(Box::new(Cursor::new(bytes)))
        }
    }
}

/// Resolve and read everything.
pub fn read_all(address: &Address) -> Result<Vec<u8>, LocateError> {
    let mut stream = resolve(address)?;
    let mut bytes = Vec::new();
    stream
        .read_to_end(&mut bytes)
        .map_err(|source| LocateError::File {
            path: PathBuf::from(address.to_string()),
            source,
        })?;
    Ok(bytes)
}

/// Open a plain file for streaming. Only the first few bytes are read, to
/// pick the MIME type; `name` is the fallback when sniffing fails.
pub fn open_file(path: &Path, name: &str) -> Result<OpenedFile, LocateError> {
    let read_error = |source: io::Error| LocateError::File {
        path: path.to_path_buf(),
        source,
    };
    let (mut file, len) = open_regular_file(path)?;
    let mut head = Vec::new();
    (&mut file)
        .take(SNIFF_LEN)
        .read_to_end(&mut head)
        .map_err(read_error)?;
    file.seek(SeekFrom::Start(0)).map_err(read_error)?;
    Ok(OpenedFile {
        file,
        len,
        mime: content_type(&head, name),
    })
}

/// MIME type for image bytes: sniffed from the leading bytes, falling back to
/// the name's extension.
pub fn content_type(bytes: &[u8], name: &str) -> &'static str {
    image::guess_format(bytes)
        .or_else(|_| ImageFormat::from_path(name))
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

fn open_regular_file(path: &Path) -> Result<(File, u64), LocateError> {
    let not_found = |source: io::Error| LocateError::File {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(path).map_err(not_found)?;
    if !metadata.is_file() {
        return Err(not_found(io::Error::new(
            io::ErrorKind::NotFound,
            "not a regular file",
        )));
    }
    let file = File::open(path).map_err(not_found)?;
    Ok((file, metadata.len()))
}
