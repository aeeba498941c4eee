//! Reference management for the message-of-the-day history.
//!
//! A ref is a named, mutable pointer to a commit, analogous to a git ref.
//! Refs are the only mutable state in the history: every other object is
//! immutable and content-addressed. Refs only move through
//! [`RefStore::compare_and_swap`], which replaces the target only if it
//! still equals the caller's expected value.
//!
//! # Modules
//!
//! - [`error`] — Error types for ref operations
//! - [`types`] — [`Ref`] and the [`RefUpdate`] outcome
//! - [`traits`] — The [`RefStore`] trait defining the storage interface
//! - [`names`] — Ref name validation
//! - [`memory`] — In-memory [`InMemoryRefStore`]
//! - [`fs`] — Lock-file based [`FsRefStore`]

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::validate_ref_name;
pub use traits::RefStore;
pub use types::{Ref, RefUpdate};
