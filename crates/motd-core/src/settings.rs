use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use motd_refs::validate_ref_name;
use motd_types::PersonIdent;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MessageStoreError, MessageStoreResult};

/// Which [`MessageStore`](crate::MessageStore) implementation to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Versioned history with a snapshot cache.
    #[default]
    History,
    /// A configuration file and a data directory.
    File,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorSettings {
    pub name: String,
    pub email: String,
}

impl Default for AuthorSettings {
    fn default() -> Self {
        let service = PersonIdent::service();
        Self {
            name: service.name,
            email: service.email,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Directory holding `objects/` and `refs/`.
    pub root: PathBuf,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".motd"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub config: PathBuf,
    pub data_dir: PathBuf,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            config: PathBuf::from("messageoftheday.config"),
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Store configuration, usually read from a TOML file.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: Backend,
    /// Repository name carried on change events.
    pub repository: String,
    /// Ref whose head holds the current configuration.
    pub ref_name: String,
    /// Name of the configuration blob inside each commit.
    pub config_file: String,
    /// Message bodies are stored as `<id>.<content_extension>`.
    pub content_extension: String,
    pub author: AuthorSettings,
    pub history: HistorySettings,
    pub file: FileSettings,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            repository: "motd-config".to_string(),
            ref_name: "refs/heads/master".to_string(),
            config_file: "messageoftheday.config".to_string(),
            content_extension: "html".to_string(),
            author: AuthorSettings::default(),
            history: HistorySettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl StoreSettings {
    pub fn from_toml_str(text: &str) -> MessageStoreResult<Self> {
        let settings: Self =
            toml::from_str(text).map_err(|e| MessageStoreError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> MessageStoreResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file; using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate(&self) -> MessageStoreResult<()> {
        validate_ref_name(&self.ref_name)
            .map_err(|e| MessageStoreError::Settings(e.to_string()))?;
        if self.config_file.is_empty() || self.config_file.contains('/') {
            return Err(MessageStoreError::Settings(format!(
                "config_file must be a plain file name, got {:?}",
                self.config_file
            )));
        }
        if self.content_extension.is_empty() || self.content_extension.contains(['/', '.']) {
            return Err(MessageStoreError::Settings(format!(
                "content_extension must be a bare extension, got {:?}",
                self.content_extension
            )));
        }
        self.identity()?;
        Ok(())
    }

    /// Identity recorded as author and committer of every commit.
    pub fn identity(&self) -> MessageStoreResult<PersonIdent> {
        PersonIdent::new(self.author.name.as_str(), self.author.email.as_str())
            .map_err(|e| MessageStoreError::Settings(e.to_string()))
    }

    /// Name of the blob or file holding the body of message `id`.
    pub fn content_file(&self, id: &str) -> String {
        format!("{id}.{}", self.content_extension)
    }
}
