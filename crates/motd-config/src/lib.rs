//! The message-of-the-day configuration document.
//!
//! A [`ConfigDocument`] is a small git-config style file:
//!
//! ```text
//! [message]
//! 	id = default
//! 	startsAt = 20240101:0900
//! 	expiresAt = 20991231:2359
//! ```
//!
//! Section and key names compare case-insensitively. The `message`
//! section accessors live in [`message`]; timestamps use the
//! `yyyyMMdd:HHmm` form handled by [`timestamp`].

pub mod document;
pub mod error;
pub mod message;
pub mod timestamp;

pub use document::{ConfigDocument, Section};
pub use error::ConfigError;
pub use message::{KEY_EXPIRES_AT, KEY_ID, KEY_STARTS_AT, SECTION_MESSAGE};
pub use timestamp::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
