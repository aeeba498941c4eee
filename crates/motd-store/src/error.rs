use motd_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {id}: computed {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// Attempted to write a null object ID.
    #[error("cannot store object with null ID")]
    NullObjectId,

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Returns `true` when the backend itself failed, as opposed to an
    /// object being absent or undecodable.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Poisoned)
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
