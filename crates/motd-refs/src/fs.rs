//! Filesystem reference store using git-style lock files.
//!
//! A ref `refs/heads/master` lives at `<root>/refs/heads/master` and holds
//! the hex id of its target followed by a newline. An update first creates
//! `<ref>.lock` with `create_new`, which fails if another writer (in this
//! or any other process) is mid-update. The new value is written into the
//! lock file, which is then renamed over the ref.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use motd_types::ObjectId;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::{Ref, RefUpdate};

/// Filesystem-backed [`RefStore`].
#[derive(Debug, Clone)]
pub struct FsRefStore {
    root: PathBuf,
}

impl FsRefStore {
    /// Open (creating if necessary) a ref store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("refs"))?;
        Ok(Self { root })
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read_target(&self, name: &str, path: &Path) -> Result<Option<ObjectId>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let id = text.parse::<ObjectId>().map_err(|e| RefError::Corrupt {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(id))
    }
}

/// Removes the lock file on drop unless it was renamed into place.
struct LockFile {
    path: PathBuf,
    file: Option<File>,
}

impl LockFile {
    fn acquire(ref_path: &Path) -> Result<Option<Self>> {
        let mut path = ref_path.as_os_str().to_owned();
        path.push(".lock");
        let path = PathBuf::from(path);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Ok(Some(Self {
                path,
                file: Some(file),
            })),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn commit(mut self, target: &Path, id: ObjectId) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            writeln!(file, "{id}")?;
            file.sync_all()?;
        }
        fs::rename(&self.path, target)?;
        self.path = PathBuf::new();
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.file.take();
        if !self.path.as_os_str().is_empty() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl RefStore for FsRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        validate_ref_name(name)?;
        let target = self.read_target(name, &self.ref_path(name))?;
        Ok(target.map(|t| Ref::new(name, t)))
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> Result<RefUpdate> {
        validate_ref_name(name)?;
        let path = self.ref_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let Some(lock) = LockFile::acquire(&path)? else {
            debug!(ref_name = name, "ref is locked by another writer");
            return Ok(RefUpdate::LockFailure);
        };

        let current = self.read_target(name, &path)?;
        if current != expected {
            return Ok(RefUpdate::Rejected { current });
        }
        if current == Some(new) {
            return Ok(RefUpdate::NoChange);
        }

        lock.commit(&path, new)?;
        Ok(if current.is_none() {
            RefUpdate::New
        } else {
            RefUpdate::FastForward
        })
    }
}
