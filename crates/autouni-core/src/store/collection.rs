// ── Generic reactive entity collection ──
//
// Concurrent map with O(1) lookups and push-based change notification via
// a `watch` channel carrying full snapshots.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// Snapshot handed to subscribers.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A reactive collection for a single entity type.
///
/// Every mutation that changes contents rebuilds the snapshot that
/// subscribers receive. Entities are stored behind `Arc` so snapshots are
/// cheap; in-place updates clone-on-write.
pub(crate) struct EntityCollection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    by_key: DashMap<K, Arc<T>>,
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_key: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or overwrite. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: K, entity: T) -> bool {
        let is_new = self.by_key.insert(key, Arc::new(entity)).is_none();
        self.rebuild_snapshot();
        is_new
    }

    /// Mutate an existing entity in place. Returns `false` (and publishes
    /// nothing) when the key is absent.
    pub(crate) fn update(&self, key: &K, f: impl FnOnce(&mut T)) -> bool {
        {
            let Some(mut entry) = self.by_key.get_mut(key) else {
                return false;
            };
            f(Arc::make_mut(entry.value_mut()));
        } // shard guard released before the snapshot walk
        self.rebuild_snapshot();
        true
    }

    /// Remove by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &K) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    /// Make the collection hold exactly `entries`: upsert each, then prune
    /// keys that were not in the batch. One snapshot is published.
    pub(crate) fn replace_all(&self, entries: impl IntoIterator<Item = (K, T)>) {
        let mut fresh = std::collections::HashSet::new();
        for (key, entity) in entries {
            fresh.insert(key.clone());
            self.by_key.insert(key, Arc::new(entity));
        }
        self.by_key.retain(|key, _| fresh.contains(key));
        self.rebuild_snapshot();
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn rebuild_snapshot(&self) {
        let values: Vec<Arc<T>> = self.by_key.iter().map(|r| Arc::clone(r.value())).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
