//! Which message, if any, should be shown right now.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::snapshot::Snapshot;

/// A message inside its display window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMessage {
    pub id: String,
    #[serde(with = "timestamp_format")]
    pub starts_at: NaiveDateTime,
    #[serde(with = "timestamp_format")]
    pub expires_at: NaiveDateTime,
    pub html: String,
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use motd_config::{format_timestamp, parse_timestamp};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(*at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

impl Snapshot {
    /// The message to display at `now`.
    ///
    /// Requires a non-blank id and a parsable `expiresAt`. A missing or
    /// unparsable `startsAt` counts as `now`. The window is inclusive at
    /// both ends, and a message without content is never shown.
    pub fn active_message(&self, now: NaiveDateTime) -> Option<ActiveMessage> {
        let Some(id) = self.message_id() else {
            debug!("no message id configured");
            return None;
        };
        let Some(expires_at) = self.config.expires_at() else {
            warn!(message_id = id, "expiresAt missing or invalid; not showing message");
            return None;
        };
        let starts_at = self.config.starts_at().unwrap_or(now);
        if now < starts_at || now > expires_at {
            debug!(message_id = id, "outside of the display window");
            return None;
        }
        let Some(html) = self.content.as_ref() else {
            warn!(message_id = id, "no content stored for message");
            return None;
        };
        Some(ActiveMessage {
            id: id.to_string(),
            starts_at,
            expires_at,
            html: html.clone(),
        })
    }
}
