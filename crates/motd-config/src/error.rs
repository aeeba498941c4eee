use thiserror::Error;

/// Errors from parsing configuration text or its values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("line {line}: invalid section header: {reason}")]
    InvalidSection { line: usize, reason: String },

    #[error("line {line}: entry outside of any section")]
    EntryOutsideSection { line: usize },

    #[error("line {line}: invalid key {key:?}")]
    InvalidKey { line: usize, key: String },

    #[error("line {line}: {reason}")]
    InvalidValue { line: usize, reason: String },

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("configuration is not valid UTF-8: {reason}")]
    InvalidEncoding { reason: String },
}
