use std::fmt;

use motd_config::ConfigError;
use motd_refs::{RefError, RefUpdate};
use motd_store::StoreError;
use thiserror::Error;

/// Message returned when a write has no expiry and none is configured.
pub const MISSING_EXPIRY: &str =
    "expires_at is not provided for the current request and it is not configured";

/// Errors from message store operations.
#[derive(Debug, Error)]
pub enum MessageStoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// The request is unacceptable as given.
    #[error("{0}")]
    Validation(String),

    /// Another writer advanced the ref first. Re-read and retry.
    #[error("concurrent update of {ref_name}: {outcome}")]
    Concurrency { ref_name: String, outcome: RefUpdate },

    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    /// A stored configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal lock poisoned")]
    Poisoned,
}

/// Coarse classification of a [`MessageStoreError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Concurrency,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::Validation => "validation",
            Self::Concurrency => "concurrency",
            Self::Storage => "storage",
        })
    }
}

impl MessageStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) | Self::Settings(_) => ErrorKind::Validation,
            Self::Concurrency { .. } => ErrorKind::Concurrency,
            Self::Store(_) | Self::Ref(_) | Self::Config(_) | Self::Io(_) | Self::Poisoned => {
                ErrorKind::Storage
            }
        }
    }

    /// Returns `true` when the storage backend itself failed.
    ///
    /// Absent, corrupt or unparsable objects are not backend failures; the
    /// read path degrades around them instead of failing.
    pub fn is_backend_failure(&self) -> bool {
        match self {
            Self::Store(e) => e.is_backend_failure(),
            Self::Ref(e) => matches!(e, RefError::Io(_) | RefError::Poisoned),
            Self::Io(_) | Self::Poisoned => true,
            _ => false,
        }
    }
}

pub type MessageStoreResult<T> = Result<T, MessageStoreError>;
