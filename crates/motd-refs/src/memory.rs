//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] stores all refs in a `HashMap` protected by a
//! `RwLock`. The compare-and-swap runs entirely under the write lock, which
//! makes it atomic for every caller sharing the same instance.

use std::collections::HashMap;
use std::sync::RwLock;

use motd_types::ObjectId;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::{Ref, RefUpdate};

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<HashMap<String, ObjectId>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let refs = self.refs.read().map_err(|_| RefError::Poisoned)?;
        Ok(refs.get(name).map(|target| Ref::new(name, *target)))
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> Result<RefUpdate> {
        validate_ref_name(name)?;

        let mut refs = self.refs.write().map_err(|_| RefError::Poisoned)?;
        let current = refs.get(name).copied();
        if current != expected {
            debug!(ref_name = name, "ref update rejected: expected value is stale");
            return Ok(RefUpdate::Rejected { current });
        }
        if current == Some(new) {
            return Ok(RefUpdate::NoChange);
        }
        refs.insert(name.to_string(), new);
        Ok(if current.is_none() {
            RefUpdate::New
        } else {
            RefUpdate::FastForward
        })
    }
}
