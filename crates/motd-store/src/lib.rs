//! Content-addressed object storage for the message-of-the-day history.
//!
//! This crate implements a hash-keyed object store analogous to git's
//! `.git/objects/` directory. Blobs, trees and commits are stored as
//! immutable objects identified by their BLAKE3 hash (domain-separated by
//! object kind).
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content (configuration text, message body)
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- a tree plus at most one parent commit
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- loose objects on disk, one file per object
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Write-then-link: write objects first, then advance a ref to them.
//! 3. Concurrent reads are always safe (objects are immutable).
//! 4. The store never interprets object contents -- it is a pure key-value store.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use hasher::ContentHasher;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
