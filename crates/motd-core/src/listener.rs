use std::sync::Arc;

use motd_events::{RefUpdateListener, RefUpdatedEvent};
use tracing::{debug, trace};

use crate::cache::SnapshotCache;

/// Invalidates a [`SnapshotCache`] when the ref it caches moves.
///
/// Events for other repositories or other refs are ignored.
#[derive(Debug)]
pub struct ChangeListener {
    repository: String,
    ref_name: String,
    cache: Arc<SnapshotCache>,
}

impl ChangeListener {
    pub fn new(
        repository: impl Into<String>,
        ref_name: impl Into<String>,
        cache: Arc<SnapshotCache>,
    ) -> Self {
        Self {
            repository: repository.into(),
            ref_name: ref_name.into(),
            cache,
        }
    }
}

impl RefUpdateListener for ChangeListener {
    fn on_ref_updated(&self, event: &RefUpdatedEvent) {
        if !event.concerns(&self.repository, &self.ref_name) {
            trace!(%event, "ignoring unrelated ref update");
            return;
        }
        debug!(%event, "tracked ref moved; invalidating snapshot cache");
        self.cache.invalidate_all();
    }
}
