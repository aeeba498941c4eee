use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Name and email of the party recorded on a commit.
///
/// The store authors every commit with a fixed service identity, so
/// `PersonIdent` carries no timestamp of its own; the commit does.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonIdent {
    pub name: String,
    pub email: String,
}

impl PersonIdent {
    /// Create an identity, rejecting values that would corrupt the
    /// `Name <email>` rendering.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let email = email.into();
        if name.trim().is_empty() {
            return Err(TypeError::InvalidIdentity("name must not be empty".into()));
        }
        if name.contains(['<', '>', '\n']) || email.contains(['<', '>', '\n']) {
            return Err(TypeError::InvalidIdentity(format!(
                "'{name} <{email}>' contains reserved characters"
            )));
        }
        Ok(Self { name, email })
    }

    /// Identity used when nothing else is configured.
    pub fn service() -> Self {
        Self {
            name: "Message of the Day".into(),
            email: "motd@localhost".into(),
        }
    }
}

impl Default for PersonIdent {
    fn default() -> Self {
        Self::service()
    }
}

impl fmt::Display for PersonIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
