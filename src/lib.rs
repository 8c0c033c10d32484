//! # Gallery Preview
//!
//! Browse the images scattered across directories and zip archives through a
//! local web page. Nothing is copied, converted or written: the tool reads
//! what is already on disk and serves it as-is.
//!
//! # Architecture: Discover, Index, Serve
//!
//! ```text
//! 1. Discover   roots  →  image items + warnings   (one task per root)
//! 2. Index      items  →  GroupIndex               (grouped, sorted, frozen)
//! 3. Serve      index  →  HTTP                     (read-only, shared via Arc)
//! ```
//!
//! The index is rebuilt on every start and held in memory only. Once built it
//! never changes, so serving needs no locks.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`classify`] | Decides whether a path is an image, a directory, an archive, or none of these |
//! | [`archive`] | Read-only zip access: list members, extract one member |
//! | [`hierarchy`] | One traversal interface over real directories and archive contents |
//! | [`discover`] | Walks one root into image items; addresses and group keys |
//! | [`index`] | Merges all roots into the ordered, deduplicated group index |
//! | [`locate`] | Turns an address back into bytes, on demand |
//! | [`config`] | TOML config loading, merging over stock defaults, and validation |
//! | [`pages`] | HTML rendering of the index and gallery pages using Maud |
//! | [`serve`] | HTTP routes over a built index (axum) |
//! | [`output`] | CLI output formatting for scan and serve |
//!
//! # Design Decisions
//!
//! ## Directories and Archives Are the Same Thing
//!
//! A directory on disk and a directory inside a zip file both hold files and
//! other directories. [`hierarchy::Hierarchy`] captures exactly that, and the
//! discovery walk is written once against it. Adding another container format
//! means one more `Hierarchy` implementation, not another walker.
//!
//! ## Addresses, Not Handles
//!
//! An image is identified by a [`discover::Address`]: a file path, or an
//! archive path plus member path. Discovery closes every archive before it
//! returns; serving reopens the one archive a request needs and closes it
//! again. A server left running for days holds no file descriptors, and an
//! archive replaced on disk is picked up (or reported missing) on the next
//! request.
//!
//! ## Deterministic Order
//!
//! Groups are sorted by key and images by address. Root order, parallel
//! completion order and directory listing order all wash out, so the same
//! inputs always render the same pages.
//!
//! ## Warnings, Not Failures
//!
//! A missing root, an unreadable directory or a corrupt archive costs only the
//! images behind it. Each becomes a [`discover::DiscoveryWarning`], shown in
//! the CLI summary and on the index page. Building fails only when no root is
//! usable at all.
//!
//! ## Opaque Ids in URLs
//!
//! Groups and images are addressed in URLs by short SHA-256-derived ids. No
//! filesystem path is ever parsed out of a request, so the server can only
//! hand out files the index already contains.

pub mod archive;
pub mod classify;
pub mod config;
pub mod discover;
pub mod hierarchy;
pub mod index;
pub mod locate;
pub mod output;
pub mod pages;
pub mod serve;

#[cfg(test)]
pub(crate) mod test_helpers;
