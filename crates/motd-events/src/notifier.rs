//! Synchronous fan-out of ref-update events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use tracing::{debug, trace, warn};

use crate::event::{RefUpdateListener, RefUpdatedEvent};

type ListenerEntry = (u64, Arc<dyn RefUpdateListener>);

/// Process-wide notification bus.
///
/// Listeners are invoked in subscription order on the thread that calls
/// [`fire`](Self::fire). The listener list is copied out before dispatch,
/// so a listener may drop its own [`Subscription`] without deadlocking.
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: RwLock<Vec<ListenerEntry>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `listener`. It stays registered until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(self: &Arc<Self>, listener: Arc<dyn RefUpdateListener>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push((id, listener)),
            Err(poisoned) => poisoned.into_inner().push((id, listener)),
        }
        debug!(subscription = id, "listener subscribed");
        Subscription {
            notifier: Arc::downgrade(self),
            id,
        }
    }

    /// Deliver `event` to every registered listener.
    pub fn fire(&self, event: &RefUpdatedEvent) {
        let listeners: Vec<Arc<dyn RefUpdateListener>> = match self.listeners.read() {
            Ok(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(poisoned) => {
                warn!("listener registry poisoned; dispatching to last known listeners");
                poisoned
                    .into_inner()
                    .iter()
                    .map(|(_, l)| Arc::clone(l))
                    .collect()
            }
        };
        trace!(%event, listeners = listeners.len(), "firing ref update");
        for listener in listeners {
            listener.on_ref_updated(event);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        match self.listeners.read() {
            Ok(listeners) => listeners.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut listeners = match self.listeners.write() {
            Ok(listeners) => listeners,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.retain(|(entry, _)| *entry != id);
        debug!(subscription = id, "listener unsubscribed");
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Registration handle returned by [`ChangeNotifier::subscribe`].
///
/// Dropping it unregisters the listener. It holds only a weak reference,
/// so an outstanding subscription does not keep the notifier alive.
#[derive(Debug)]
#[must_use = "dropping a Subscription immediately unregisters the listener"]
pub struct Subscription {
    notifier: Weak<ChangeNotifier>,
    id: u64,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.unsubscribe(self.id);
        }
    }
}
