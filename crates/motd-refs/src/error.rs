//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
///
/// A CAS that loses a race is not an error; it is reported through
/// [`RefUpdate`](crate::RefUpdate).
#[derive(Debug, Error)]
pub enum RefError {
    /// The ref name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A ref file exists but does not contain an object id.
    #[error("corrupt ref {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// An internal lock was poisoned by a panicking writer.
    #[error("ref store lock poisoned")]
    Poisoned,

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
