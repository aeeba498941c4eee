//! Foundation types for the message-of-the-day store.
//!
//! Every other `motd-*` crate depends on `motd-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content-addressed identifier (BLAKE3 hash)
//! - [`PersonIdent`] — Name and email recorded as commit author/committer

pub mod error;
pub mod identity;
pub mod object;

pub use error::TypeError;
pub use identity::PersonIdent;
pub use object::ObjectId;
