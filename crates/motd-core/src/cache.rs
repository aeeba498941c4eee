//! Single-entry read-through cache of the current [`Snapshot`].
//!
//! The cache holds at most one snapshot. On a miss exactly one caller runs
//! the loader while every other caller waits on a condition variable for
//! its result. [`SnapshotCache::invalidate_all`] bumps a generation counter
//! so a load that was already running when the invalidation arrived is
//! handed to its own caller but never installed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, error, trace};

use crate::error::{MessageStoreError, MessageStoreResult};
use crate::loader::SnapshotLoader;
use crate::snapshot::Snapshot;

#[derive(Debug)]
enum SlotState {
    Empty,
    Loading,
    Ready(Arc<Snapshot>),
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    generation: u64,
}

/// Counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls answered from the cached snapshot.
    pub hits: u64,
    /// Calls that found the slot empty and ran the loader.
    pub misses: u64,
    /// Loader invocations, successful or not.
    pub loads: u64,
    /// Calls to `invalidate_all`, including those that found nothing cached.
    pub invalidations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    invalidations: AtomicU64,
}

/// Read-through cache in front of a [`SnapshotLoader`].
pub struct SnapshotCache {
    loader: Arc<dyn SnapshotLoader>,
    slot: Mutex<Slot>,
    loaded: Condvar,
    counters: Counters,
}

/// Resets the slot if the loader unwinds, so waiters are not stuck behind
/// a load that will never finish.
struct LoadGuard<'a> {
    cache: &'a SnapshotCache,
    armed: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slot = self.cache.lock_slot();
            slot.state = SlotState::Empty;
            self.cache.loaded.notify_all();
        }
    }
}

impl SnapshotCache {
    pub fn new(loader: Arc<dyn SnapshotLoader>) -> Self {
        Self {
            loader,
            slot: Mutex::new(Slot {
                state: SlotState::Empty,
                generation: 0,
            }),
            loaded: Condvar::new(),
            counters: Counters::default(),
        }
    }

    // The slot is never held across user code, so poisoning can only come
    // from a bug in this module. Recover the guard rather than propagate.
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The current snapshot, loading it if needed.
    ///
    /// A failed load is logged and answered with an empty snapshot, which
    /// is not cached.
    pub fn get(&self) -> Arc<Snapshot> {
        match self.try_get() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "failed to load message snapshot; serving empty snapshot");
                Arc::new(Snapshot::empty())
            }
        }
    }

    /// Like [`get`](Self::get), but a failed load is returned to the caller.
    pub fn try_get(&self) -> MessageStoreResult<Arc<Snapshot>> {
        let mut slot = self.lock_slot();
        loop {
            if let SlotState::Ready(snapshot) = &slot.state {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                trace!("snapshot cache hit");
                return Ok(Arc::clone(snapshot));
            }
            if !matches!(slot.state, SlotState::Loading) {
                break;
            }
            slot = self
                .loaded
                .wait(slot)
                .map_err(|_| MessageStoreError::Poisoned)?;
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        slot.state = SlotState::Loading;
        let generation = slot.generation;
        drop(slot);

        let mut guard = LoadGuard {
            cache: self,
            armed: true,
        };
        self.counters.loads.fetch_add(1, Ordering::Relaxed);
        debug!(generation, "loading message snapshot");
        let result = self.loader.load().map(Arc::new);
        guard.armed = false;

        let mut slot = self.lock_slot();
        slot.state = match &result {
            Ok(snapshot) if slot.generation == generation => SlotState::Ready(Arc::clone(snapshot)),
            Ok(_) => {
                debug!(
                    generation,
                    current = slot.generation,
                    "cache invalidated during load; result not installed"
                );
                SlotState::Empty
            }
            Err(_) => SlotState::Empty,
        };
        self.loaded.notify_all();
        result
    }

    /// Drop the cached snapshot. The next read loads a fresh one.
    ///
    /// Idempotent. A load in flight when this is called still completes,
    /// but its result is not kept.
    pub fn invalidate_all(&self) {
        let mut slot = self.lock_slot();
        slot.generation += 1;
        if matches!(slot.state, SlotState::Ready(_)) {
            slot.state = SlotState::Empty;
        }
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(generation = slot.generation, "snapshot cache invalidated");
    }

    /// Returns `true` if a snapshot is cached right now.
    pub fn is_cached(&self) -> bool {
        matches!(self.lock_slot().state, SlotState::Ready(_))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("cached", &self.is_cached())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
