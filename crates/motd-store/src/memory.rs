use std::collections::HashMap;
use std::sync::RwLock;

use motd_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock` for safe concurrent access. Objects are cloned on read/write.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the bytes stored under `id` without recomputing the id.
    ///
    /// Only useful for simulating on-disk corruption in tests.
    #[doc(hidden)]
    pub fn overwrite_raw(&self, id: ObjectId, object: StoredObject) -> StoreResult<()> {
        let mut map = self.objects.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(id, object);
        Ok(())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self.objects.write().map_err(|_| StoreError::Poisoned)?;
        // Same id always maps to the same content.
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::*;

    fn make_blob(content: &[u8]) -> StoredObject {
        Blob::new(content.to_vec()).to_stored_object()
    }

    #[test]
    fn write_and_read_blob() {
        let store = InMemoryObjectStore::new();
        let obj = make_blob(b"hello world");
        let id = store.write(&obj).unwrap();
        assert!(!id.is_null());

        let read_back = store.read(&id).unwrap().expect("should exist");
        assert_eq!(read_back, obj);
    }

    #[test]
    fn write_and_read_tree() {
        let store = InMemoryObjectStore::new();
        let blob_id = store.write(&make_blob(b"<b>hi</b>")).unwrap();
        let tree = Tree::new(vec![TreeEntry::file("default.html", blob_id)]);
        let id = store.write(&tree.to_stored_object().unwrap()).unwrap();

        let read_back = store.read(&id).unwrap().expect("should exist");
        let decoded = Tree::from_stored_object(&read_back).unwrap();
        assert_eq!(decoded.get("default.html").unwrap().object_id, blob_id);
    }

    #[test]
    fn same_content_produces_same_id() {
        let store = InMemoryObjectStore::new();
        let id1 = store.write(&make_blob(b"identical content")).unwrap();
        let id2 = store.write(&make_blob(b"identical content")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn read_missing_object_returns_none() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from_bytes(b"missing");
        assert!(store.read(&id).unwrap().is_none());
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryObjectStore::new());
        let id = store.write(&make_blob(b"shared data")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let obj = store.read(&id).unwrap().expect("present");
                    assert_eq!(obj.compute_id(), id);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryObjectStore::new();
        store.write(&make_blob(b"x")).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryObjectStore"));
        assert!(debug.contains("object_count"));
    }
}
