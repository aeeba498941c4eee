use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use motd_config::ConfigDocument;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::{prepare_update, HistoryEntry, MessageStore, WriteReceipt};
use crate::error::{MessageStoreError, MessageStoreResult};
use crate::settings::StoreSettings;
use crate::snapshot::Snapshot;

/// Message store kept in a configuration file and a data directory.
///
/// There is no history and no cache: every read parses the file again.
/// Writes from one instance are serialized; writers in other processes
/// are not coordinated, and the last one wins.
#[derive(Debug)]
pub struct FileMessageStore {
    config_path: PathBuf,
    data_dir: PathBuf,
    settings: StoreSettings,
    write_lock: Mutex<()>,
}

impl FileMessageStore {
    pub fn new(settings: StoreSettings) -> MessageStoreResult<Self> {
        settings.validate()?;
        fs::create_dir_all(&settings.file.data_dir)?;
        Ok(Self {
            config_path: settings.file.config.clone(),
            data_dir: settings.file.data_dir.clone(),
            settings,
            write_lock: Mutex::new(()),
        })
    }

    fn content_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(self.settings.content_file(id))
    }

    /// The configuration on disk. A missing file is an empty document.
    fn load_config(&self) -> MessageStoreResult<ConfigDocument> {
        match fs::read_to_string(&self.config_path) {
            Ok(text) => Ok(ConfigDocument::parse(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ConfigDocument::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn load_snapshot(&self) -> MessageStoreResult<Snapshot> {
        let config = self.load_config()?;
        let Some(id) = config.message_id() else {
            return Ok(Snapshot::new(config, None, None));
        };
        let path = self.content_path(id);
        let content = match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read message content");
                None
            }
        };
        Ok(Snapshot::new(config, content, None))
    }
}

fn write_atomically(path: &Path, data: &[u8]) -> MessageStoreResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| MessageStoreError::Io(e.error))?;
    Ok(())
}

impl MessageStore for FileMessageStore {
    fn read(&self) -> Arc<Snapshot> {
        match self.load_snapshot() {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                warn!(path = %self.config_path.display(), error = %e, "cannot read message configuration");
                Arc::new(Snapshot::empty())
            }
        }
    }

    fn write(
        &self,
        content: &str,
        expires_at: Option<NaiveDateTime>,
    ) -> MessageStoreResult<WriteReceipt> {
        let _guard = self.write_lock.lock().map_err(|_| MessageStoreError::Poisoned)?;
        let current = self.load_config()?;
        let (config, id) = prepare_update(&current, expires_at)?;

        write_atomically(&self.content_path(&id), content.as_bytes())?;
        write_atomically(&self.config_path, config.to_text().as_bytes())?;
        info!(path = %self.config_path.display(), message_id = %id, "message updated");

        Ok(WriteReceipt {
            commit: None,
            parent: None,
            message_id: id,
        })
    }

    fn history(&self, _limit: usize) -> MessageStoreResult<Vec<HistoryEntry>> {
        Ok(Vec::new())
    }
}
