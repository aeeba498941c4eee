//! Loose-object store on the local filesystem.
//!
//! Layout: `<root>/objects/<first 2 hex chars>/<remaining 62 hex chars>`.
//! Each file holds a bincode-encoded [`StoredObject`]. Files are written to
//! a temporary sibling and renamed into place, so a reader never observes a
//! half-written object.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use motd_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Filesystem-backed [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    objects_dir: PathBuf,
}

impl FsObjectStore {
    /// Open (creating if necessary) an object store under `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let objects_dir = root.as_ref().join("objects");
        fs::create_dir_all(&objects_dir)?;
        Ok(Self { objects_dir })
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        let (fanout, rest) = hex.split_at(2);
        self.objects_dir.join(fanout).join(rest)
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let bytes = match fs::read(self.object_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object: StoredObject =
            bincode::deserialize(&bytes).map_err(|e| StoreError::CorruptObject {
                id: *id,
                reason: e.to_string(),
            })?;
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Serialization(format!("no parent for {}", path.display())))?;
        fs::create_dir_all(dir)?;

        let encoded =
            bincode::serialize(object).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(object = %id.short_hex(), kind = %object.kind, bytes = object.size, "object written");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Blob, Commit, ObjectKind};
    use motd_types::PersonIdent;

    #[test]
    fn write_then_read_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let obj = Blob::new(b"<p>maintenance tonight</p>".to_vec()).to_stored_object();
        let id = store.write(&obj).unwrap();

        assert!(store.exists(&id).unwrap());
        assert_eq!(store.read(&id).unwrap().unwrap(), obj);
    }

    #[test]
    fn objects_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let commit = Commit {
            tree: ObjectId::from_bytes(b"tree"),
            parent: None,
            author: PersonIdent::service(),
            committer: PersonIdent::service(),
            message: "init".into(),
            timestamp_ms: 0,
        };
        let id = {
            let store = FsObjectStore::open(dir.path()).unwrap();
            store.write(&commit.to_stored_object().unwrap()).unwrap()
        };

        let reopened = FsObjectStore::open(dir.path()).unwrap();
        let obj = reopened.read(&id).unwrap().unwrap();
        assert_eq!(obj.kind, ObjectKind::Commit);
        assert_eq!(Commit::from_stored_object(&obj).unwrap(), commit);
    }

    #[test]
    fn missing_object_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        assert!(store.read(&ObjectId::from_bytes(b"nope")).unwrap().is_none());
        assert!(!store.exists(&ObjectId::from_bytes(b"nope")).unwrap());
    }

    #[test]
    fn tampered_object_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let id = store.write(&Blob::new(b"original".to_vec()).to_stored_object()).unwrap();

        let forged = bincode::serialize(&Blob::new(b"forged".to_vec()).to_stored_object()).unwrap();
        fs::write(store.object_path(&id), forged).unwrap();

        let err = store.read(&id).unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
        assert!(!err.is_backend_failure());
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let id = store.write(&Blob::new(b"x".to_vec()).to_stored_object()).unwrap();
        fs::write(store.object_path(&id), b"\xff").unwrap();

        assert!(matches!(
            store.read(&id).unwrap_err(),
            StoreError::CorruptObject { .. }
        ));
    }
}
