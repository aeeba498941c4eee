use motd_config::ConfigDocument;
use motd_types::ObjectId;

/// Configuration, message body and provenance, read together.
///
/// A snapshot is never modified after it is built. Readers share it through
/// an `Arc`, and a newer snapshot replaces it wholesale. If `content` is
/// present, it is the body named by `config`'s `message.id`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub config: ConfigDocument,
    pub content: Option<String>,
    /// Commit the snapshot was read from; the expected value for the next
    /// ref update.
    pub base_version: Option<ObjectId>,
}

impl Snapshot {
    /// No configuration, no content, no history.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(config: ConfigDocument, content: Option<String>, base_version: Option<ObjectId>) -> Self {
        Self {
            config,
            content,
            base_version,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_empty() && self.content.is_none() && self.base_version.is_none()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.config.message_id()
    }

    pub fn starts_at_raw(&self) -> Option<&str> {
        self.config.starts_at_raw()
    }

    pub fn expires_at_raw(&self) -> Option<&str> {
        self.config.expires_at_raw()
    }
}
