use std::sync::Arc;

use chrono::NaiveDateTime;
use motd_events::{ChangeNotifier, RefUpdatedEvent, Subscription};
use motd_refs::RefUpdate;
use motd_store::TreeEntry;
use motd_types::PersonIdent;
use tracing::{info, warn};

use super::{prepare_update, HistoryEntry, MessageStore, WriteReceipt, UPDATE_COMMIT_MESSAGE};
use crate::cache::{CacheStats, SnapshotCache};
use crate::error::{MessageStoreError, MessageStoreResult};
use crate::graph::ObjectGraph;
use crate::listener::ChangeListener;
use crate::loader::HistoryLoader;
use crate::settings::StoreSettings;
use crate::snapshot::Snapshot;

/// Message store backed by a linear commit history.
///
/// Reads go through a [`SnapshotCache`]. Writes commit on top of the
/// snapshot they read and advance the ref with a compare-and-swap, so of
/// two writers starting from the same snapshot only one succeeds. The
/// cache is invalidated by this store's own writes, won or lost, and by
/// ref-update events fired by anyone else on the shared notifier.
pub struct HistoryMessageStore {
    graph: Arc<ObjectGraph>,
    settings: StoreSettings,
    identity: PersonIdent,
    cache: Arc<SnapshotCache>,
    notifier: Arc<ChangeNotifier>,
    _subscription: Subscription,
}

impl HistoryMessageStore {
    pub fn new(
        graph: Arc<ObjectGraph>,
        settings: StoreSettings,
        notifier: &Arc<ChangeNotifier>,
    ) -> MessageStoreResult<Self> {
        settings.validate()?;
        let identity = settings.identity()?;
        let loader = HistoryLoader::new(Arc::clone(&graph), &settings);
        let cache = Arc::new(SnapshotCache::new(Arc::new(loader)));
        let listener = ChangeListener::new(
            graph.repository(),
            settings.ref_name.as_str(),
            Arc::clone(&cache),
        );
        let subscription = notifier.subscribe(Arc::new(listener));
        Ok(Self {
            graph,
            settings,
            identity,
            cache,
            notifier: Arc::clone(notifier),
            _subscription: subscription,
        })
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop the cached snapshot.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

impl MessageStore for HistoryMessageStore {
    fn read(&self) -> Arc<Snapshot> {
        self.cache.get()
    }

    fn write(
        &self,
        content: &str,
        expires_at: Option<NaiveDateTime>,
    ) -> MessageStoreResult<WriteReceipt> {
        let current = self.cache.try_get()?;
        let (config, id) = prepare_update(&current.config, expires_at)?;
        let base = current.base_version;

        let config_blob = self.graph.write_blob(config.to_text().as_bytes())?;
        let content_blob = self.graph.write_blob(content.as_bytes())?;
        let tree = self.graph.write_tree(vec![
            TreeEntry::file(self.settings.config_file.as_str(), config_blob),
            TreeEntry::file(self.settings.content_file(&id), content_blob),
        ])?;
        let commit = self
            .graph
            .write_commit(base, tree, &self.identity, UPDATE_COMMIT_MESSAGE)?;

        let ref_name = self.settings.ref_name.as_str();
        match self.graph.cas_update_ref(ref_name, base, commit)? {
            RefUpdate::New | RefUpdate::FastForward => {
                self.cache.invalidate_all();
                self.notifier.fire(&RefUpdatedEvent::new(
                    self.graph.repository(),
                    ref_name,
                    base,
                    commit,
                ));
                info!(
                    ref_name,
                    commit = %commit.short_hex(),
                    message_id = %id,
                    "message updated"
                );
                Ok(WriteReceipt {
                    commit: Some(commit),
                    parent: base,
                    message_id: id,
                })
            }
            outcome => {
                // The cached base is stale; the next read must see the winner.
                self.cache.invalidate_all();
                warn!(ref_name, %outcome, "message update lost a concurrent race");
                Err(MessageStoreError::Concurrency {
                    ref_name: ref_name.to_string(),
                    outcome,
                })
            }
        }
    }

    fn history(&self, limit: usize) -> MessageStoreResult<Vec<HistoryEntry>> {
        let commits = self.graph.history(&self.settings.ref_name, limit)?;
        Ok(commits
            .into_iter()
            .map(|(id, commit)| HistoryEntry {
                commit: id,
                parent: commit.parent,
                author: commit.author,
                message: commit.message,
                timestamp_ms: commit.timestamp_ms,
            })
            .collect())
    }
}

impl std::fmt::Debug for HistoryMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryMessageStore")
            .field("graph", &self.graph)
            .field("ref_name", &self.settings.ref_name)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, MISSING_EXPIRY};
    use chrono::NaiveDate;
    use motd_events::RefUpdateListener;
    use motd_store::{InMemoryObjectStore, ObjectStore};
    use motd_refs::{InMemoryRefStore, RefStore};
    use motd_types::ObjectId;
    use std::sync::{Barrier, Mutex};
    use std::thread;

    const MASTER: &str = "refs/heads/master";

    fn expiry() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2099, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap()
    }

    struct Backends {
        objects: Arc<InMemoryObjectStore>,
        refs: Arc<InMemoryRefStore>,
        notifier: Arc<ChangeNotifier>,
    }

    impl Backends {
        fn new() -> Self {
            Self {
                objects: Arc::new(InMemoryObjectStore::new()),
                refs: Arc::new(InMemoryRefStore::new()),
                notifier: ChangeNotifier::new(),
            }
        }

        fn graph(&self) -> Arc<ObjectGraph> {
            Arc::new(ObjectGraph::new(
                "motd-config",
                self.objects.clone(),
                self.refs.clone(),
            ))
        }

        fn store(&self) -> HistoryMessageStore {
            self.store_on(&self.notifier)
        }

        /// A store sharing the backends but not the bus, like another process.
        fn detached_store(&self) -> HistoryMessageStore {
            self.store_on(&ChangeNotifier::new())
        }

        fn store_on(&self, notifier: &Arc<ChangeNotifier>) -> HistoryMessageStore {
            HistoryMessageStore::new(self.graph(), StoreSettings::default(), notifier).unwrap()
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<RefUpdatedEvent>>);

    impl RefUpdateListener for Recorder {
        fn on_ref_updated(&self, event: &RefUpdatedEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn bootstrap_creates_root_commit_with_two_files() {
        let backends = Backends::new();
        let store = backends.store();
        assert!(store.read().is_empty());

        let receipt = store.write("<p>hello</p>", Some(expiry())).unwrap();
        assert_eq!(receipt.parent, None);
        assert_eq!(receipt.message_id, "default");

        let head = backends.refs.resolve(MASTER).unwrap().unwrap();
        assert_eq!(receipt.commit, Some(head));
        let commit = store.graph().read_commit(&head).unwrap().unwrap();
        assert!(commit.is_root());
        assert_eq!(commit.author, PersonIdent::service());
        assert_eq!(commit.committer, PersonIdent::service());

        let tree = store.graph().read_tree(&commit.tree).unwrap().unwrap();
        let names: Vec<&str> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["default.html", "messageoftheday.config"]);

        let config = String::from_utf8(
            store
                .graph()
                .read_blob(&commit.tree, "messageoftheday.config")
                .unwrap()
                .unwrap(),
        )
        .unwrap();
        assert!(config.contains("expiresAt = 20991231:2359"));
        assert!(config.contains("id = default"));
    }

    #[test]
    fn read_your_writes() {
        let backends = Backends::new();
        let store = backends.store();
        store.write("<p>one</p>", Some(expiry())).unwrap();
        let after_first = store.read();
        assert_eq!(after_first.content.as_deref(), Some("<p>one</p>"));

        let receipt = store.write("<p>two</p>", None).unwrap();
        assert_eq!(receipt.parent, after_first.base_version);
        let after_second = store.read();
        assert_eq!(after_second.content.as_deref(), Some("<p>two</p>"));
        assert_eq!(after_second.base_version, receipt.commit);
        assert_eq!(after_second.expires_at_raw(), Some("20991231:2359"));
    }

    #[test]
    fn missing_expiry_is_rejected_before_anything_is_written() {
        let backends = Backends::new();
        let store = backends.store();
        let err = store.write("<p>hello</p>", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), MISSING_EXPIRY);
        assert!(backends.objects.is_empty());
        assert!(backends.refs.resolve(MASTER).unwrap().is_none());
    }

    #[test]
    fn configured_id_names_the_content_blob() {
        let backends = Backends::new();
        let graph = backends.graph();
        let config = graph
            .write_blob(b"[message]\n\tid = outage\n\texpiresAt = 20991231:2359\n")
            .unwrap();
        let tree = graph
            .write_tree(vec![TreeEntry::file("messageoftheday.config", config)])
            .unwrap();
        let root = graph
            .write_commit(None, tree, &PersonIdent::service(), "seed")
            .unwrap();
        graph.cas_update_ref(MASTER, None, root).unwrap();

        let store = backends.store();
        let receipt = store.write("<p>down</p>", None).unwrap();
        assert_eq!(receipt.message_id, "outage");
        assert_eq!(receipt.parent, Some(root));
        assert_eq!(store.read().content.as_deref(), Some("<p>down</p>"));
        let head = store.graph().read_commit(&receipt.commit.unwrap()).unwrap().unwrap();
        assert!(store.graph().read_blob(&head.tree, "outage.html").unwrap().is_some());
    }

    #[test]
    fn stale_writer_gets_concurrency_error() {
        let backends = Backends::new();
        let a = backends.store();
        let b = backends.store();
        a.write("<p>base</p>", Some(expiry())).unwrap();

        let base = a.read().base_version;
        assert_eq!(b.read().base_version, base);

        // Advance the ref behind the bus's back so B keeps its old snapshot.
        let graph = backends.graph();
        let tree = graph.write_tree(vec![]).unwrap();
        let foreign = graph
            .write_commit(base, tree, &PersonIdent::service(), "foreign")
            .unwrap();
        assert_eq!(graph.cas_update_ref(MASTER, base, foreign).unwrap(), RefUpdate::FastForward);
        let err = b.write("<p>late</p>", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Concurrency);
        assert_eq!(backends.refs.resolve(MASTER).unwrap(), Some(foreign));

        assert_eq!(b.read().base_version, Some(foreign));
        let receipt = b.write("<p>late</p>", Some(expiry())).unwrap();
        assert_eq!(receipt.parent, Some(foreign));
        assert_eq!(backends.refs.resolve(MASTER).unwrap(), receipt.commit);
    }

    #[test]
    fn losing_writer_recovers_without_an_event() {
        let backends = Backends::new();
        let a = backends.detached_store();
        let b = backends.detached_store();
        a.write("<p>seed</p>", Some(expiry())).unwrap();
        assert_eq!(b.read().content.as_deref(), Some("<p>seed</p>"));

        let won = a.write("<p>from a</p>", None).unwrap();
        let err = b.write("<p>from b</p>", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Concurrency);

        let fresh = b.read();
        assert_eq!(fresh.content.as_deref(), Some("<p>from a</p>"));
        assert_eq!(fresh.base_version, won.commit);

        let retried = b.write("<p>from b</p>", None).unwrap();
        assert_eq!(retried.parent, won.commit);
        assert_eq!(backends.refs.resolve(MASTER).unwrap(), retried.commit);
    }

    #[test]
    fn concurrent_writers_from_same_base_exactly_one_wins() {
        let backends = Backends::new();
        backends.store().write("<p>base</p>", Some(expiry())).unwrap();
        let base = backends.store().read().base_version;

        // Separate buses, so neither writer's cache is refreshed by the other.
        let stores: Vec<Arc<HistoryMessageStore>> =
            (0..2).map(|_| Arc::new(backends.detached_store())).collect();
        for store in &stores {
            assert_eq!(store.read().base_version, base);
        }

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = stores
            .iter()
            .enumerate()
            .map(|(i, store)| {
                let store = Arc::clone(store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.write(&format!("<p>{i}</p>"), None)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners: Vec<usize> = (0..2).filter(|&i| results[i].is_ok()).collect();
        assert_eq!(winners.len(), 1);
        let winner = winners[0];
        let loser = 1 - winner;
        let won = results[winner].as_ref().unwrap();
        assert_eq!(won.parent, base);
        assert_eq!(
            results[loser].as_ref().unwrap_err().kind(),
            ErrorKind::Concurrency
        );
        assert_eq!(backends.refs.resolve(MASTER).unwrap(), won.commit);

        let fresh = stores[loser].read();
        assert_eq!(fresh.base_version, won.commit);
        assert_eq!(fresh.content, Some(format!("<p>{winner}</p>")));
        let retried = stores[loser].write(&format!("<p>{loser}</p>"), None).unwrap();
        assert_eq!(retried.parent, won.commit);
        assert_eq!(backends.refs.resolve(MASTER).unwrap(), retried.commit);
    }

    #[test]
    fn sequential_writers_see_each_other() {
        let backends = Backends::new();
        let a = backends.store();
        let b = backends.store();
        a.write("<p>base</p>", Some(expiry())).unwrap();
        let base = b.read().base_version;

        // B hears about A's commit on the bus and builds on top of it.
        let won = a.write("<p>a</p>", None).unwrap();
        assert_eq!(won.parent, base);
        let also = b.write("<p>b</p>", None).unwrap();
        assert_eq!(also.parent, won.commit);
    }

    #[test]
    fn successful_write_fires_one_event() {
        let backends = Backends::new();
        let recorder = Arc::new(Recorder::default());
        let _sub = backends.notifier.subscribe(recorder.clone());
        let store = backends.store();

        let first = store.write("<p>1</p>", Some(expiry())).unwrap();
        let second = store.write("<p>2</p>", None).unwrap();

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].old, None);
        assert_eq!(Some(events[0].new), first.commit);
        assert_eq!(events[1].old, first.commit);
        assert_eq!(Some(events[1].new), second.commit);
        assert!(events.iter().all(|e| e.concerns("motd-config", MASTER)));
    }

    #[test]
    fn external_event_invalidates_cache() {
        let backends = Backends::new();
        let store = backends.store();
        store.write("<p>1</p>", Some(expiry())).unwrap();
        store.read();
        let loads = store.cache_stats().loads;

        backends.notifier.fire(&RefUpdatedEvent::new(
            "motd-config",
            MASTER,
            None,
            ObjectId::from_bytes(b"x"),
        ));
        store.read();
        assert_eq!(store.cache_stats().loads, loads + 1);

        backends.notifier.fire(&RefUpdatedEvent::new(
            "elsewhere",
            MASTER,
            None,
            ObjectId::from_bytes(b"x"),
        ));
        store.read();
        assert_eq!(store.cache_stats().loads, loads + 1);
    }

    #[test]
    fn repeated_reads_without_updates_hit_the_cache() {
        let backends = Backends::new();
        let store = backends.store();
        store.write("<p>1</p>", Some(expiry())).unwrap();
        let first = store.read();
        let second = store.read();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn dropping_store_unsubscribes() {
        let backends = Backends::new();
        let store = backends.store();
        assert_eq!(backends.notifier.listener_count(), 1);
        drop(store);
        assert_eq!(backends.notifier.listener_count(), 0);
    }

    #[test]
    fn history_lists_updates_newest_first() {
        let backends = Backends::new();
        let store = backends.store();
        let first = store.write("<p>1</p>", Some(expiry())).unwrap();
        let second = store.write("<p>2</p>", None).unwrap();

        let log = store.history(10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(Some(log[0].commit), second.commit);
        assert_eq!(log[0].parent, first.commit);
        assert_eq!(log[1].message, UPDATE_COMMIT_MESSAGE);
    }

    struct FailingObjects;

    impl ObjectStore for FailingObjects {
        fn read(&self, _id: &ObjectId) -> motd_store::StoreResult<Option<motd_store::StoredObject>> {
            Err(motd_store::StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk unplugged",
            )))
        }

        fn write(&self, _object: &motd_store::StoredObject) -> motd_store::StoreResult<ObjectId> {
            Err(motd_store::StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk unplugged",
            )))
        }
    }

    #[test]
    fn backend_failure_degrades_reads_but_fails_writes() {
        let refs = Arc::new(InMemoryRefStore::new());
        refs.compare_and_swap(MASTER, None, ObjectId::from_bytes(b"head")).unwrap();
        let graph = Arc::new(ObjectGraph::new("motd-config", Arc::new(FailingObjects), refs));
        let store =
            HistoryMessageStore::new(graph, StoreSettings::default(), &ChangeNotifier::new()).unwrap();

        assert!(store.read().is_empty());
        assert_eq!(store.cache_stats().loads, 1);
        assert!(store.read().is_empty());
        assert_eq!(store.cache_stats().loads, 2);

        let err = store.write("<p>x</p>", Some(expiry())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
