use std::fmt;

use motd_types::ObjectId;
use serde::{Deserialize, Serialize};

/// A ref moved in some repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdatedEvent {
    /// Name of the repository that holds the ref.
    pub repository: String,
    /// Canonical ref name (e.g. "refs/heads/master").
    pub ref_name: String,
    /// Previous target, `None` if the ref was created.
    pub old: Option<ObjectId>,
    /// New target.
    pub new: ObjectId,
}

impl RefUpdatedEvent {
    pub fn new(
        repository: impl Into<String>,
        ref_name: impl Into<String>,
        old: Option<ObjectId>,
        new: ObjectId,
    ) -> Self {
        Self {
            repository: repository.into(),
            ref_name: ref_name.into(),
            old,
            new,
        }
    }

    /// Returns `true` if the event is about `ref_name` in `repository`.
    pub fn concerns(&self, repository: &str, ref_name: &str) -> bool {
        self.repository == repository && self.ref_name == ref_name
    }
}

impl fmt::Display for RefUpdatedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.old {
            Some(old) => write!(
                f,
                "{}:{} {}..{}",
                self.repository,
                self.ref_name,
                old.short_hex(),
                self.new.short_hex()
            ),
            None => write!(
                f,
                "{}:{} (new) {}",
                self.repository,
                self.ref_name,
                self.new.short_hex()
            ),
        }
    }
}

/// Receives every ref update fired on a [`ChangeNotifier`](crate::ChangeNotifier).
///
/// Called on the firing thread; implementations must be quick and must not
/// fire events themselves.
pub trait RefUpdateListener: Send + Sync {
    fn on_ref_updated(&self, event: &RefUpdatedEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concerns_requires_both_repository_and_ref() {
        let event = RefUpdatedEvent::new("motd", "refs/heads/master", None, ObjectId::null());
        assert!(event.concerns("motd", "refs/heads/master"));
        assert!(!event.concerns("other", "refs/heads/master"));
        assert!(!event.concerns("motd", "refs/heads/dev"));
    }

    #[test]
    fn display_shows_transition() {
        let old = ObjectId::from_bytes(b"old");
        let new = ObjectId::from_bytes(b"new");
        let text = RefUpdatedEvent::new("motd", "refs/heads/master", Some(old), new).to_string();
        assert!(text.contains(&old.short_hex()));
        assert!(text.contains(&new.short_hex()));

        let created = RefUpdatedEvent::new("motd", "refs/heads/master", None, new).to_string();
        assert!(created.contains("(new)"));
    }
}
