//! Building a [`Snapshot`] from the head of a ref.

use std::sync::Arc;

use motd_config::{ConfigDocument, ConfigError};
use tracing::{debug, warn};

use crate::error::MessageStoreResult;
use crate::graph::ObjectGraph;
use crate::settings::StoreSettings;
use crate::snapshot::Snapshot;

/// Produces the current [`Snapshot`] on a cache miss.
///
/// An `Err` means the backend could not be read at all. Anything less
/// (missing or unparsable objects) should come back as a partial or empty
/// snapshot instead.
pub trait SnapshotLoader: Send + Sync {
    fn load(&self) -> MessageStoreResult<Snapshot>;
}

impl<F> SnapshotLoader for F
where
    F: Fn() -> MessageStoreResult<Snapshot> + Send + Sync,
{
    fn load(&self) -> MessageStoreResult<Snapshot> {
        self()
    }
}

/// Reads the configuration and message body from the commit at the head
/// of the tracked ref.
#[derive(Debug, Clone)]
pub struct HistoryLoader {
    graph: Arc<ObjectGraph>,
    ref_name: String,
    config_file: String,
    content_extension: String,
}

impl HistoryLoader {
    pub fn new(graph: Arc<ObjectGraph>, settings: &StoreSettings) -> Self {
        Self {
            graph,
            ref_name: settings.ref_name.clone(),
            config_file: settings.config_file.clone(),
            content_extension: settings.content_extension.clone(),
        }
    }
}

/// Pass backend failures through; log and swallow everything else.
fn degrade<T>(result: MessageStoreResult<Option<T>>, what: &str) -> MessageStoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_backend_failure() => Err(e),
        Err(e) => {
            warn!(error = %e, "unreadable {what}; treating it as absent");
            Ok(None)
        }
    }
}

fn parse_config(bytes: Vec<u8>) -> MessageStoreResult<ConfigDocument> {
    let text = String::from_utf8(bytes).map_err(|e| ConfigError::InvalidEncoding {
        reason: e.to_string(),
    })?;
    Ok(ConfigDocument::parse(&text)?)
}

impl SnapshotLoader for HistoryLoader {
    fn load(&self) -> MessageStoreResult<Snapshot> {
        let Some(head) = degrade(self.graph.resolve_ref(&self.ref_name), "ref")? else {
            debug!(ref_name = %self.ref_name, "ref does not exist yet");
            return Ok(Snapshot::empty());
        };

        let Some(commit) = degrade(self.graph.read_commit(&head), "commit")? else {
            warn!(ref_name = %self.ref_name, commit = %head.short_hex(), "head commit is missing");
            return Ok(Snapshot::empty());
        };

        let config = match degrade(
            self.graph.read_blob(&commit.tree, &self.config_file),
            "configuration blob",
        )? {
            Some(bytes) => match parse_config(bytes) {
                Ok(config) => config,
                Err(e) => {
                    warn!(commit = %head.short_hex(), error = %e, "configuration does not parse");
                    return Ok(Snapshot::new(ConfigDocument::new(), None, Some(head)));
                }
            },
            None => {
                warn!(
                    commit = %head.short_hex(),
                    file = %self.config_file,
                    "commit has no configuration"
                );
                return Ok(Snapshot::new(ConfigDocument::new(), None, Some(head)));
            }
        };

        let Some(id) = config.message_id().map(str::to_string) else {
            return Ok(Snapshot::new(config, None, Some(head)));
        };

        let path = format!("{id}.{}", self.content_extension);
        let content = degrade(self.graph.read_blob(&commit.tree, &path), "message content")?
            .and_then(|bytes| match String::from_utf8(bytes) {
                Ok(text) => Some(text),
                Err(_) => {
                    warn!(commit = %head.short_hex(), %path, "message content is not UTF-8");
                    None
                }
            });
        if content.is_none() {
            warn!(commit = %head.short_hex(), %path, "no content for configured message");
        }

        debug!(commit = %head.short_hex(), message_id = %id, "snapshot loaded");
        Ok(Snapshot::new(config, content, Some(head)))
    }
}
