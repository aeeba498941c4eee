//! Versioned message-of-the-day store.
//!
//! The configuration document and the message body it names are kept as a
//! linear history of commits in an object graph. Readers are served from a
//! [`SnapshotCache`] that loads configuration, content and the commit they
//! came from as one unit. Writers commit on top of the snapshot they read
//! and advance the tracked ref with a compare-and-swap; a writer that
//! loses the race gets [`MessageStoreError::Concurrency`] and may retry.
//!
//! Every successful update is announced on a [`ChangeNotifier`]. Each
//! store subscribes a [`ChangeListener`] that drops its cached snapshot when
//! the tracked ref moves, so all stores sharing the notifier observe each
//! other's writes on their next read.
//!
//! # Modules
//!
//! - [`snapshot`] — the immutable [`Snapshot`]
//! - [`graph`] — [`ObjectGraph`], typed access to objects and refs
//! - [`loader`] — [`SnapshotLoader`] and [`HistoryLoader`]
//! - [`cache`] — the single-entry [`SnapshotCache`]
//! - [`listener`] — [`ChangeListener`]
//! - [`store`] — [`MessageStore`] and its implementations
//! - [`active`] — display-window evaluation
//! - [`settings`] — [`StoreSettings`]
//!
//! [`ChangeNotifier`]: motd_events::ChangeNotifier

pub mod active;
pub mod cache;
pub mod error;
pub mod graph;
pub mod listener;
pub mod loader;
pub mod settings;
pub mod snapshot;
pub mod store;

pub use active::ActiveMessage;
pub use cache::{CacheStats, SnapshotCache};
pub use error::{ErrorKind, MessageStoreError, MessageStoreResult, MISSING_EXPIRY};
pub use graph::ObjectGraph;
pub use listener::ChangeListener;
pub use loader::{HistoryLoader, SnapshotLoader};
pub use settings::{AuthorSettings, Backend, FileSettings, HistorySettings, StoreSettings};
pub use snapshot::Snapshot;
pub use store::{
    open_store, FileMessageStore, HistoryEntry, HistoryMessageStore, MessageStore, WriteReceipt,
    DEFAULT_MESSAGE_ID, UPDATE_COMMIT_MESSAGE,
};
