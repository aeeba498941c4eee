//! Core reference types.

use std::fmt;

use motd_types::ObjectId;
use serde::{Deserialize, Serialize};

/// A named pointer to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    /// Canonical name (e.g. "refs/heads/master").
    pub name: String,
    /// The commit the ref designates.
    pub target: ObjectId,
}

impl Ref {
    pub fn new(name: impl Into<String>, target: ObjectId) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    /// Returns the short name of this ref (without the `refs/heads/` prefix).
    pub fn short_name(&self) -> &str {
        self.name
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.name)
    }
}

/// Outcome of a compare-and-swap ref update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefUpdate {
    /// The ref did not exist and was created.
    New,
    /// The ref moved from the expected value to the new one.
    FastForward,
    /// The ref already pointed at the new value.
    NoChange,
    /// Another writer holds the ref lock right now.
    LockFailure,
    /// The ref no longer holds the expected value.
    Rejected { current: Option<ObjectId> },
}

impl RefUpdate {
    /// Returns `true` if the ref now points at the requested value because
    /// of this update.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::New | Self::FastForward)
    }
}

impl fmt::Display for RefUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::FastForward => write!(f, "fast-forward"),
            Self::NoChange => write!(f, "no change"),
            Self::LockFailure => write!(f, "lock failure"),
            Self::Rejected { current: Some(id) } => {
                write!(f, "rejected (ref is at {})", id.short_hex())
            }
            Self::Rejected { current: None } => write!(f, "rejected (ref is absent)"),
        }
    }
}
