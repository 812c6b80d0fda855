// In-memory entity cache.
// Holds the last-fetched value per query with subscriber counts, retention
// eviction, tag registration, and optimistic patch records.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::api::types::{TaskPage, UpdateTaskModel};
use crate::error::{Result, TaskError};

use super::key::QueryKey;
use super::tags::{Tag, TagIndex};

/// How long an entry outlives its last subscriber.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(5);

/// Fetch status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryStatus {
    #[default]
    Uninitialized,
    Loading,
    Fulfilled,
    Error,
}

/// One cached query result.
#[derive(Debug)]
struct CacheEntry {
    status: EntryStatus,
    value: Option<TaskPage>,
    error: Option<TaskError>,
    subscribers: usize,
    last_access: Instant,
    /// Armed when the subscriber count drops to zero.
    expires_at: Option<Instant>,
    /// Set by tag invalidation; a stale entry refetches on the next read.
    stale: bool,
    /// Present while a fetch is in flight; joiners wake when it settles.
    inflight: Option<watch::Sender<()>>,
}

impl CacheEntry {
    fn new() -> Self {
        Self {
            status: EntryStatus::Uninitialized,
            value: None,
            error: None,
            subscribers: 0,
            last_access: Instant::now(),
            expires_at: None,
            stale: false,
            inflight: None,
        }
    }
}

/// What a reader should do next, as decided by the cache.
#[derive(Debug)]
pub enum FetchDecision {
    /// A fresh value is cached; use it.
    Cached(TaskPage),
    /// A fetch for this key is in flight; await the receiver, then call
    /// [`Store::settled`].
    Join(watch::Receiver<()>),
    /// The caller owns the fetch and must settle it with
    /// [`Store::complete_fetch`].
    Fetch,
}

/// Process-scoped entity cache shared by the query and mutation layers.
///
/// Cloning is cheap; clones share the same entries. The inner lock is never
/// held across an await, so async readers and writers interleave freely.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug)]
struct StoreInner {
    entries: HashMap<QueryKey, CacheEntry>,
    tag_index: TagIndex,
    retention: Duration,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                entries: HashMap::new(),
                tag_index: TagIndex::new(),
                retention,
            })),
        }
    }

    /// Peek the cached value without touching status or staleness.
    pub fn read(&self, key: &QueryKey) -> Option<TaskPage> {
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(key)?;
        entry.last_access = Instant::now();
        entry.value.clone()
    }

    /// Status and staleness of an entry, if present.
    pub fn entry_state(&self, key: &QueryKey) -> Option<(EntryStatus, bool)> {
        let inner = self.inner.lock();
        inner.entries.get(key).map(|entry| (entry.status, entry.stale))
    }

    /// Begin a read: reuse a fresh value, join an in-flight fetch, or take
    /// ownership of a new one.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchDecision {
        let mut inner = self.inner.lock();
        inner.evict_expired();
        let entry = inner
            .entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::new);
        entry.last_access = Instant::now();

        if entry.status == EntryStatus::Fulfilled && !entry.stale {
            if let Some(value) = &entry.value {
                trace!(%key, "cache hit");
                return FetchDecision::Cached(value.clone());
            }
        }
        if entry.status == EntryStatus::Loading {
            if let Some(inflight) = &entry.inflight {
                trace!(%key, "joining in-flight fetch");
                return FetchDecision::Join(inflight.subscribe());
            }
        }

        let (sender, _) = watch::channel(());
        entry.status = EntryStatus::Loading;
        entry.inflight = Some(sender);
        debug!(%key, "cache miss, fetch started");
        FetchDecision::Fetch
    }

    /// Outcome of a settled fetch, for woken joiners. `None` when the entry
    /// was evicted or is loading again.
    pub fn settled(&self, key: &QueryKey) -> Option<Result<TaskPage>> {
        let inner = self.inner.lock();
        let entry = inner.entries.get(key)?;
        match entry.status {
            EntryStatus::Fulfilled => entry.value.clone().map(Ok),
            EntryStatus::Error => entry.error.clone().map(Err),
            _ => None,
        }
    }

    /// Settle a fetch owned via [`FetchDecision::Fetch`]: store the outcome,
    /// register the entry's tags, and wake joiners.
    pub fn complete_fetch(&self, key: &QueryKey, result: Result<TaskPage>, tags: Vec<Tag>) {
        let waker = {
            let mut inner = self.inner.lock();
            let StoreInner {
                entries,
                tag_index,
                retention,
            } = &mut *inner;
            let Some(entry) = entries.get_mut(key) else {
                return;
            };
            match result {
                Ok(value) => {
                    entry.value = Some(value);
                    entry.error = None;
                    entry.status = EntryStatus::Fulfilled;
                }
                Err(err) => {
                    entry.value = None;
                    entry.error = Some(err);
                    entry.status = EntryStatus::Error;
                }
            }
            entry.stale = false;
            if entry.subscribers == 0 {
                entry.expires_at = Some(Instant::now() + *retention);
            }
            let waker = entry.inflight.take();
            tag_index.register(key.clone(), tags);
            debug!(%key, status = ?entry.status, "fetch settled");
            waker
        };
        if let Some(sender) = waker {
            let _ = sender.send(());
        }
    }

    /// Subscribe to a key, creating its entry if absent. The entry stays
    /// resident while the handle is alive.
    pub fn subscribe(&self, key: QueryKey) -> Subscription {
        let mut inner = self.inner.lock();
        let entry = inner
            .entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::new);
        entry.subscribers += 1;
        entry.expires_at = None;
        Subscription {
            store: self.clone(),
            key,
        }
    }

    fn release(&self, key: &QueryKey) {
        let mut inner = self.inner.lock();
        let retention = inner.retention;
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.expires_at = Some(Instant::now() + retention);
            }
        }
    }

    /// Optimistically merge `model` into the cached copy of `task_id` under
    /// `key`. Returns an undo record when the task was present.
    pub fn apply_patch(
        &self,
        key: &QueryKey,
        task_id: &str,
        model: &UpdateTaskModel,
    ) -> Option<PatchRecord> {
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(key)?;
        let value = entry.value.as_mut()?;
        if !value.items.iter().any(|task| task.id == task_id) {
            return None;
        }
        let previous = value.clone();
        if let Some(task) = value.items.iter_mut().find(|task| task.id == task_id) {
            model.apply_to(task);
        }
        debug!(%key, task_id, "optimistic patch applied");
        Some(PatchRecord {
            store: self.clone(),
            key: key.clone(),
            previous,
        })
    }

    /// Mark every entry depending on any of `tags` stale; the next read of a
    /// stale entry goes back to the network. Returns the keys marked.
    pub fn invalidate(&self, tags: &[Tag]) -> Vec<QueryKey> {
        let mut inner = self.inner.lock();
        let StoreInner {
            entries, tag_index, ..
        } = &mut *inner;
        let mut marked = Vec::new();
        for key in tag_index.invalidate(tags) {
            if let Some(entry) = entries.get_mut(&key) {
                entry.stale = true;
                marked.push(key);
            }
        }
        debug!(count = marked.len(), "tag invalidation marked entries stale");
        marked
    }

    /// Drop one entry unconditionally.
    pub fn evict(&self, key: &QueryKey) {
        let mut inner = self.inner.lock();
        inner.entries.remove(key);
        inner.tag_index.remove(key);
    }

    /// Drop every entry whose retention window has elapsed.
    pub fn evict_expired(&self) {
        self.inner.lock().evict_expired();
    }

    /// Drop everything; fresh-store semantics for tests and logout.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.tag_index = TagIndex::new();
    }
}

impl StoreInner {
    // In-flight entries are never evicted: the eventual result is stored even
    // if nobody is left to observe it.
    fn evict_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry.subscribers == 0
                    && entry.status != EntryStatus::Loading
                    && entry.expires_at.is_some_and(|at| at <= now)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            if let Some(entry) = self.entries.remove(&key) {
                trace!(%key, idle_secs = entry.last_access.elapsed().as_secs(), "evicted expired entry");
            }
            self.tag_index.remove(&key);
        }
    }
}

/// RAII handle pinning a cache entry; dropping it starts the retention
/// countdown once the last subscriber is gone.
#[derive(Debug)]
pub struct Subscription {
    store: Store,
    key: QueryKey,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Explicit drop, for symmetry with [`Store::subscribe`].
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.store.release(&self.key);
    }
}

/// Undo token produced by an optimistic patch; consumed at most once.
#[derive(Debug)]
pub struct PatchRecord {
    store: Store,
    key: QueryKey,
    previous: TaskPage,
}

impl PatchRecord {
    /// Restore the entry to its pre-patch value. A no-op when the entry was
    /// evicted in the meantime.
    pub fn undo(self) {
        let mut inner = self.store.inner.lock();
        if let Some(entry) = inner.entries.get_mut(&self.key) {
            debug!(key = %self.key, "optimistic patch rolled back");
            entry.value = Some(self.previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Task, TaskPriority, TaskStatus};

    fn task(id: &str, title: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            status,
            priority: TaskPriority::Middle,
            start_date: None,
            deadline: None,
            todo_list_id: "L1".to_string(),
            order: 0,
            added_date: None,
        }
    }

    fn page(tasks: Vec<Task>) -> TaskPage {
        TaskPage {
            total_count: tasks.len() as i32,
            items: tasks,
            error: None,
        }
    }

    fn fill(store: &Store, key: &QueryKey, value: TaskPage) {
        assert!(matches!(store.begin_fetch(key), FetchDecision::Fetch));
        store.complete_fetch(key, Ok(value), vec![Tag::task("L1")]);
    }

    #[test]
    fn test_second_reader_joins_in_flight_fetch() {
        let store = Store::new();
        let key = QueryKey::tasks_page("L1", 1);

        assert!(matches!(store.begin_fetch(&key), FetchDecision::Fetch));
        assert!(matches!(store.begin_fetch(&key), FetchDecision::Join(_)));

        store.complete_fetch(&key, Ok(page(vec![])), vec![Tag::any_task()]);
        assert!(matches!(store.begin_fetch(&key), FetchDecision::Cached(_)));
    }

    #[test]
    fn test_settled_replays_error_to_joiners() {
        let store = Store::new();
        let key = QueryKey::tasks_page("L1", 1);

        assert!(matches!(store.begin_fetch(&key), FetchDecision::Fetch));
        let err = TaskError::Network("connection refused".to_string());
        store.complete_fetch(&key, Err(err.clone()), vec![Tag::any_task()]);

        assert_eq!(store.settled(&key), Some(Err(err)));
        // a fresh read after an error is a manual retry
        assert!(matches!(store.begin_fetch(&key), FetchDecision::Fetch));
    }

    #[test]
    fn test_retention_evicts_after_last_unsubscribe() {
        let store = Store::with_retention(Duration::ZERO);
        let key = QueryKey::tasks_page("L1", 1);

        let subscription = store.subscribe(key.clone());
        fill(&store, &key, page(vec![task("T1", "Buy milk", TaskStatus::New)]));

        store.evict_expired();
        assert!(store.read(&key).is_some(), "subscribed entry must survive");

        subscription.unsubscribe();
        store.evict_expired();
        assert!(store.read(&key).is_none(), "expired entry must be gone");
        assert!(matches!(store.begin_fetch(&key), FetchDecision::Fetch));
    }

    #[test]
    fn test_loading_entry_survives_eviction() {
        let store = Store::with_retention(Duration::ZERO);
        let key = QueryKey::tasks_page("L1", 1);

        let subscription = store.subscribe(key.clone());
        assert!(matches!(store.begin_fetch(&key), FetchDecision::Fetch));
        drop(subscription);

        store.evict_expired();
        assert!(matches!(store.begin_fetch(&key), FetchDecision::Join(_)));

        // the result is stored even though nobody is subscribed anymore
        store.complete_fetch(&key, Ok(page(vec![])), vec![Tag::any_task()]);
        assert!(store.read(&key).is_some());
    }

    #[test]
    fn test_patch_and_undo_restore_previous_value() {
        let store = Store::new();
        let key = QueryKey::tasks_page("L1", 1);
        fill(&store, &key, page(vec![task("T1", "Buy milk", TaskStatus::New)]));

        let record = store
            .apply_patch(&key, "T1", &UpdateTaskModel::status(TaskStatus::Completed))
            .unwrap();
        let patched = store.read(&key).unwrap();
        assert_eq!(patched.items[0].status, TaskStatus::Completed);

        record.undo();
        let restored = store.read(&key).unwrap();
        assert_eq!(restored.items[0].status, TaskStatus::New);
    }

    #[test]
    fn test_patch_skips_absent_task() {
        let store = Store::new();
        let key = QueryKey::tasks_page("L1", 1);
        fill(&store, &key, page(vec![task("T1", "Buy milk", TaskStatus::New)]));

        let record = store.apply_patch(&key, "T2", &UpdateTaskModel::title("x"));
        assert!(record.is_none());
    }

    #[test]
    fn test_undo_after_eviction_is_noop() {
        let store = Store::new();
        let key = QueryKey::tasks_page("L1", 1);
        fill(&store, &key, page(vec![task("T1", "Buy milk", TaskStatus::New)]));

        let record = store
            .apply_patch(&key, "T1", &UpdateTaskModel::status(TaskStatus::Completed))
            .unwrap();
        store.evict(&key);
        record.undo();

        assert!(store.read(&key).is_none());
    }

    #[test]
    fn test_invalidate_marks_matching_entries_stale() {
        let store = Store::new();
        let key_x = QueryKey::tasks_page("X", 1);
        let key_y = QueryKey::tasks_page("Y", 1);

        assert!(matches!(store.begin_fetch(&key_x), FetchDecision::Fetch));
        store.complete_fetch(&key_x, Ok(page(vec![])), vec![Tag::task("X")]);
        assert!(matches!(store.begin_fetch(&key_y), FetchDecision::Fetch));
        store.complete_fetch(&key_y, Ok(page(vec![])), vec![Tag::task("Y")]);

        let marked = store.invalidate(&[Tag::task("X")]);
        assert_eq!(marked, vec![key_x.clone()]);
        assert_eq!(
            store.entry_state(&key_x),
            Some((EntryStatus::Fulfilled, true))
        );

        assert!(matches!(store.begin_fetch(&key_x), FetchDecision::Fetch));
        assert!(matches!(store.begin_fetch(&key_y), FetchDecision::Cached(_)));
    }

    #[test]
    fn test_clear_empties_store_and_index() {
        let store = Store::new();
        let key = QueryKey::tasks_page("L1", 1);
        fill(&store, &key, page(vec![task("T1", "Buy milk", TaskStatus::New)]));

        store.clear();

        assert!(store.read(&key).is_none());
        assert!(store.invalidate(&[Tag::any_task()]).is_empty());
    }
}
