//! The [`RefStore`] trait defining the reference storage interface.

use motd_types::ObjectId;

use crate::error::Result;
use crate::types::{Ref, RefUpdate};

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`) and make
/// [`compare_and_swap`](RefStore::compare_and_swap) atomic with respect to
/// every other writer of the same backing storage.
pub trait RefStore: Send + Sync {
    /// Read a ref by its canonical name (e.g. "refs/heads/master").
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Point `name` at `new` if and only if it currently holds `expected`
    /// (`None` meaning "the ref must not exist").
    ///
    /// Losing the race is reported as [`RefUpdate::Rejected`] or
    /// [`RefUpdate::LockFailure`], never as an error. Errors are reserved
    /// for storage failures.
    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> Result<RefUpdate>;

    /// Resolve a ref to its target commit.
    fn resolve(&self, name: &str) -> Result<Option<ObjectId>> {
        Ok(self.read_ref(name)?.map(|r| r.target))
    }
}
