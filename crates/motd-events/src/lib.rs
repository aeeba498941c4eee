//! Ref-update notifications.
//!
//! Whenever a ref in any repository advances, the party that advanced it
//! fires a [`RefUpdatedEvent`] on the [`ChangeNotifier`]. Listeners are
//! called synchronously on the firing thread, so a listener that only
//! invalidates a cache needs no queue or executor of its own.
//!
//! [`ChangeNotifier::subscribe`] returns a [`Subscription`]; dropping it
//! removes the listener.

pub mod event;
pub mod notifier;

pub use event::{RefUpdateListener, RefUpdatedEvent};
pub use notifier::{ChangeNotifier, Subscription};
