//! Typed access to the `[message]` section.

use chrono::NaiveDateTime;

use crate::document::ConfigDocument;
use crate::timestamp::{format_timestamp, parse_timestamp};

pub const SECTION_MESSAGE: &str = "message";
pub const KEY_ID: &str = "id";
pub const KEY_STARTS_AT: &str = "startsAt";
pub const KEY_EXPIRES_AT: &str = "expiresAt";

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl ConfigDocument {
    /// `message.id`, if set to something non-blank.
    pub fn message_id(&self) -> Option<&str> {
        non_empty(self.get(SECTION_MESSAGE, KEY_ID))
    }

    /// Raw `message.startsAt`.
    pub fn starts_at_raw(&self) -> Option<&str> {
        non_empty(self.get(SECTION_MESSAGE, KEY_STARTS_AT))
    }

    /// Raw `message.expiresAt`.
    pub fn expires_at_raw(&self) -> Option<&str> {
        non_empty(self.get(SECTION_MESSAGE, KEY_EXPIRES_AT))
    }

    /// `message.startsAt`, `None` when absent or unparsable.
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        self.starts_at_raw().and_then(|v| parse_timestamp(v).ok())
    }

    /// `message.expiresAt`, `None` when absent or unparsable.
    pub fn expires_at(&self) -> Option<NaiveDateTime> {
        self.expires_at_raw().and_then(|v| parse_timestamp(v).ok())
    }

    pub fn set_message_id(&mut self, id: &str) {
        self.set(SECTION_MESSAGE, KEY_ID, id);
    }

    pub fn set_starts_at(&mut self, at: NaiveDateTime) {
        self.set(SECTION_MESSAGE, KEY_STARTS_AT, format_timestamp(at));
    }

    pub fn set_expires_at(&mut self, at: NaiveDateTime) {
        self.set(SECTION_MESSAGE, KEY_EXPIRES_AT, format_timestamp(at));
    }
}
