//! Typed access to one repository's objects and refs.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use motd_refs::{FsRefStore, InMemoryRefStore, RefStore, RefUpdate};
use motd_store::{
    Blob, Commit, FsObjectStore, InMemoryObjectStore, ObjectStore, StoredObject, Tree, TreeEntry,
};
use motd_types::{ObjectId, PersonIdent};
use tracing::{debug, info, warn};

use crate::error::MessageStoreResult;

/// Façade over an object store and a ref store that belong together.
///
/// Cloning is cheap and every clone sees the same backends.
#[derive(Clone)]
pub struct ObjectGraph {
    repository: String,
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
}

impl ObjectGraph {
    pub fn new(
        repository: impl Into<String>,
        objects: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
    ) -> Self {
        Self {
            repository: repository.into(),
            objects,
            refs,
        }
    }

    /// A graph that lives only as long as the process.
    pub fn in_memory(repository: impl Into<String>) -> Self {
        Self::new(
            repository,
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
        )
    }

    /// Open (creating if necessary) a graph persisted under `root`.
    pub fn open(repository: impl Into<String>, root: impl AsRef<Path>) -> MessageStoreResult<Self> {
        let root = root.as_ref();
        let objects = FsObjectStore::open(root)?;
        let refs = FsRefStore::open(root)?;
        Ok(Self::new(repository, Arc::new(objects), Arc::new(refs)))
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn resolve_ref(&self, name: &str) -> MessageStoreResult<Option<ObjectId>> {
        Ok(self.refs.resolve(name)?)
    }

    fn read_object(&self, id: &ObjectId) -> MessageStoreResult<Option<StoredObject>> {
        Ok(self.objects.read(id)?)
    }

    pub fn read_commit(&self, id: &ObjectId) -> MessageStoreResult<Option<Commit>> {
        match self.read_object(id)? {
            Some(obj) => Ok(Some(Commit::from_stored_object(&obj)?)),
            None => Ok(None),
        }
    }

    pub fn read_tree(&self, id: &ObjectId) -> MessageStoreResult<Option<Tree>> {
        match self.read_object(id)? {
            Some(obj) => Ok(Some(Tree::from_stored_object(&obj)?)),
            None => Ok(None),
        }
    }

    /// Read the blob stored at `path` in `tree`.
    ///
    /// `None` if the tree or the entry or the blob is missing.
    pub fn read_blob(&self, tree: &ObjectId, path: &str) -> MessageStoreResult<Option<Vec<u8>>> {
        let Some(tree) = self.read_tree(tree)? else {
            return Ok(None);
        };
        let Some(entry) = tree.get(path) else {
            return Ok(None);
        };
        match self.read_object(&entry.object_id)? {
            Some(obj) => Ok(Some(Blob::from_stored_object(&obj)?.data)),
            None => Ok(None),
        }
    }

    pub fn write_blob(&self, data: &[u8]) -> MessageStoreResult<ObjectId> {
        Ok(self.objects.write(&Blob::new(data.to_vec()).to_stored_object())?)
    }

    pub fn write_tree(&self, entries: Vec<TreeEntry>) -> MessageStoreResult<ObjectId> {
        let tree = Tree::new(entries);
        Ok(self.objects.write(&tree.to_stored_object()?)?)
    }

    /// Write a commit of `tree` on top of `parent`, authored and committed
    /// by `author`.
    pub fn write_commit(
        &self,
        parent: Option<ObjectId>,
        tree: ObjectId,
        author: &PersonIdent,
        message: &str,
    ) -> MessageStoreResult<ObjectId> {
        let commit = Commit {
            tree,
            parent,
            author: author.clone(),
            committer: author.clone(),
            message: message.to_string(),
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        let id = self.objects.write(&commit.to_stored_object()?)?;
        debug!(commit = %id.short_hex(), root = parent.is_none(), "commit written");
        Ok(id)
    }

    pub fn cas_update_ref(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> MessageStoreResult<RefUpdate> {
        let outcome = self.refs.compare_and_swap(name, expected, new)?;
        if outcome.is_success() {
            info!(
                repository = %self.repository,
                ref_name = name,
                commit = %new.short_hex(),
                %outcome,
                "ref advanced"
            );
        } else {
            debug!(repository = %self.repository, ref_name = name, %outcome, "ref not advanced");
        }
        Ok(outcome)
    }

    /// Up to `limit` commits reachable from `ref_name`, newest first.
    ///
    /// The walk stops early at a commit that is missing from the store.
    pub fn history(&self, ref_name: &str, limit: usize) -> MessageStoreResult<Vec<(ObjectId, Commit)>> {
        let mut out = Vec::new();
        let mut next = self.resolve_ref(ref_name)?;
        while let Some(id) = next {
            if out.len() >= limit {
                break;
            }
            let Some(commit) = self.read_commit(&id)? else {
                warn!(commit = %id.short_hex(), "history ends at missing commit");
                break;
            };
            next = commit.parent;
            out.push((id, commit));
        }
        Ok(out)
    }
}

impl std::fmt::Debug for ObjectGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectGraph")
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "refs/heads/master";

    fn commit_on(graph: &ObjectGraph, parent: Option<ObjectId>, body: &str) -> ObjectId {
        let blob = graph.write_blob(body.as_bytes()).unwrap();
        let tree = graph.write_tree(vec![TreeEntry::file("default.html", blob)]).unwrap();
        let id = graph
            .write_commit(parent, tree, &PersonIdent::service(), "Update message")
            .unwrap();
        assert!(graph.cas_update_ref(MASTER, parent, id).unwrap().is_success());
        id
    }

    #[test]
    fn read_blob_by_path() {
        let graph = ObjectGraph::in_memory("motd");
        let head = commit_on(&graph, None, "hello");
        let commit = graph.read_commit(&head).unwrap().unwrap();

        assert_eq!(
            graph.read_blob(&commit.tree, "default.html").unwrap(),
            Some(b"hello".to_vec())
        );
        assert_eq!(graph.read_blob(&commit.tree, "other.html").unwrap(), None);
        assert_eq!(
            graph.read_blob(&ObjectId::from_bytes(b"no tree"), "default.html").unwrap(),
            None
        );
    }

    #[test]
    fn commit_records_identity_and_parent() {
        let graph = ObjectGraph::in_memory("motd");
        let first = commit_on(&graph, None, "one");
        let second = commit_on(&graph, Some(first), "two");

        let commit = graph.read_commit(&second).unwrap().unwrap();
        assert_eq!(commit.parent, Some(first));
        assert_eq!(commit.author, PersonIdent::service());
        assert_eq!(commit.committer, PersonIdent::service());
        assert!(graph.read_commit(&first).unwrap().unwrap().is_root());
    }

    #[test]
    fn history_walks_first_parents_newest_first() {
        let graph = ObjectGraph::in_memory("motd");
        let a = commit_on(&graph, None, "a");
        let b = commit_on(&graph, Some(a), "b");
        let c = commit_on(&graph, Some(b), "c");

        let ids: Vec<ObjectId> = graph.history(MASTER, 10).unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![c, b, a]);
        assert_eq!(graph.history(MASTER, 2).unwrap().len(), 2);
        assert!(graph.history("refs/heads/none", 10).unwrap().is_empty());
    }

    #[test]
    fn reading_a_tree_as_commit_is_an_error() {
        let graph = ObjectGraph::in_memory("motd");
        let tree = graph.write_tree(vec![]).unwrap();
        let err = graph.read_commit(&tree).unwrap_err();
        assert!(!err.is_backend_failure());
    }

    #[test]
    fn persisted_graph_is_shared_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let a = ObjectGraph::open("motd", dir.path()).unwrap();
        let head = commit_on(&a, None, "persisted");

        let b = ObjectGraph::open("motd", dir.path()).unwrap();
        assert_eq!(b.resolve_ref(MASTER).unwrap(), Some(head));
        assert!(b.read_commit(&head).unwrap().is_some());
    }
}
