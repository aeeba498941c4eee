//! The message store interface and its two implementations.

mod file;
mod history;

use std::sync::Arc;

use chrono::NaiveDateTime;
use motd_config::ConfigDocument;
use motd_events::ChangeNotifier;
use motd_types::{ObjectId, PersonIdent};
use serde::Serialize;
use tracing::info;

use crate::active::ActiveMessage;
use crate::error::{MessageStoreError, MessageStoreResult, MISSING_EXPIRY};
use crate::graph::ObjectGraph;
use crate::settings::{Backend, StoreSettings};
use crate::snapshot::Snapshot;

pub use file::FileMessageStore;
pub use history::HistoryMessageStore;

/// Message id used when the configuration does not name one.
pub const DEFAULT_MESSAGE_ID: &str = "default";

/// Commit message recorded for every update.
pub const UPDATE_COMMIT_MESSAGE: &str = "Update message of the day";

/// Result of a successful [`MessageStore::write`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WriteReceipt {
    /// The new commit, `None` for stores without history.
    pub commit: Option<ObjectId>,
    pub parent: Option<ObjectId>,
    pub message_id: String,
}

/// One commit of the store's history, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub commit: ObjectId,
    pub parent: Option<ObjectId>,
    pub author: PersonIdent,
    pub message: String,
    pub timestamp_ms: i64,
}

/// Reads and writes the message of the day.
pub trait MessageStore: Send + Sync {
    /// The current configuration and content. Never fails; an unreadable
    /// backend yields an empty snapshot.
    fn read(&self) -> Arc<Snapshot>;

    /// Replace the message body, optionally setting a new expiry.
    fn write(
        &self,
        content: &str,
        expires_at: Option<NaiveDateTime>,
    ) -> MessageStoreResult<WriteReceipt>;

    /// Up to `limit` past updates, newest first. Empty for stores without
    /// history.
    fn history(&self, limit: usize) -> MessageStoreResult<Vec<HistoryEntry>>;

    /// The message to show at `now`, if any.
    fn active_message(&self, now: NaiveDateTime) -> Option<ActiveMessage> {
        self.read().active_message(now)
    }
}

/// Apply a write request to a copy of `current`.
///
/// Returns the updated document and the message id it names.
pub(crate) fn prepare_update(
    current: &ConfigDocument,
    expires_at: Option<NaiveDateTime>,
) -> MessageStoreResult<(ConfigDocument, String)> {
    let mut config = current.clone();
    match expires_at {
        Some(at) => config.set_expires_at(at),
        None if config.expires_at_raw().is_none() => {
            return Err(MessageStoreError::Validation(MISSING_EXPIRY.to_string()));
        }
        None => {}
    }
    let id = match config.message_id() {
        Some(id) => id.to_string(),
        None => {
            info!("no message id configured; using {DEFAULT_MESSAGE_ID:?}");
            DEFAULT_MESSAGE_ID.to_string()
        }
    };
    config.set_message_id(&id);
    Ok((config, id))
}

/// Build the store selected by `settings.backend`.
///
/// The history backend subscribes to `notifier` for as long as the
/// returned store lives.
pub fn open_store(
    settings: &StoreSettings,
    notifier: &Arc<ChangeNotifier>,
) -> MessageStoreResult<Box<dyn MessageStore>> {
    settings.validate()?;
    match settings.backend {
        Backend::History => {
            let graph = ObjectGraph::open(settings.repository.clone(), &settings.history.root)?;
            let store = HistoryMessageStore::new(Arc::new(graph), settings.clone(), notifier)?;
            Ok(Box::new(store))
        }
        Backend::File => Ok(Box::new(FileMessageStore::new(settings.clone())?)),
    }
}
