// Tasks endpoint wiring.
// Query layer: cache-first reads with in-flight deduplication and tag
// registration. Mutation layer: settle-then-invalidate, with an optimistic
// patch on task update that rolls back when the server rejects it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{FetchDecision, QueryKey, Store, Subscription, Tag};
use crate::config::PAGE_SIZE;
use crate::error::{Result, TaskError};

use super::endpoints::TasksTransport;
use super::types::{ResultCode, Task, TaskPage, UpdateTaskModel};

/// Tasks API facade over the entity cache and the REST transport.
pub struct TasksApi {
    transport: Arc<dyn TasksTransport>,
    store: Store,
}

impl TasksApi {
    pub fn new(transport: Arc<dyn TasksTransport>) -> Self {
        Self::with_store(transport, Store::new())
    }

    /// Build with an externally owned store (shared, preconfigured, or
    /// cleared between tests).
    pub fn with_store(transport: Arc<dyn TasksTransport>, store: Store) -> Self {
        Self { transport, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Hold a page's cache entry alive while a view observes it.
    pub fn subscribe_tasks(&self, todolist_id: &str, page: u32) -> Subscription {
        self.store
            .subscribe(QueryKey::tasks_page(todolist_id, page))
    }

    /// Peek the cached page without touching the network.
    pub fn cached_tasks(&self, todolist_id: &str, page: u32) -> Option<TaskPage> {
        self.store.read(&QueryKey::tasks_page(todolist_id, page))
    }

    /// Fetch one page of a todo-list's tasks, going to the network only when
    /// the cache holds no fresh entry. Concurrent calls for the same page
    /// share a single request.
    pub async fn get_tasks_page(&self, todolist_id: &str, page: u32) -> Result<TaskPage> {
        let key = QueryKey::tasks_page(todolist_id, page);
        loop {
            match self.store.begin_fetch(&key) {
                FetchDecision::Cached(page_data) => return Ok(page_data),
                FetchDecision::Join(mut waiter) => {
                    let _ = waiter.changed().await;
                    if let Some(outcome) = self.store.settled(&key) {
                        return outcome;
                    }
                    // evicted or loading again under us; take the whole path again
                }
                FetchDecision::Fetch => break,
            }
        }

        let fetched = self
            .transport
            .fetch_tasks(todolist_id, page, PAGE_SIZE)
            .await;
        let result = match fetched {
            Ok(mut page_data) => match page_data.error.take() {
                Some(message) => Err(TaskError::Server {
                    result_code: ResultCode::Error,
                    messages: vec![message],
                    fields_errors: Vec::new(),
                }),
                None => Ok(page_data),
            },
            Err(err) => Err(err),
        };

        // An empty page may reflect stale global state, so it stays pinned to
        // the broad Task tag and refetches on any task mutation. Failed
        // fetches are pinned the same way.
        let tags = match &result {
            Ok(page_data) if !page_data.items.is_empty() => vec![Tag::task(todolist_id)],
            _ => vec![Tag::any_task()],
        };

        if let Err(err) = &result {
            warn!(todolist_id, page, %err, "tasks fetch failed");
        }
        self.store.complete_fetch(&key, result.clone(), tags);
        result
    }

    /// Create a task in a todo-list.
    pub async fn add_task(&self, todolist_id: &str, title: &str) -> Result<Task> {
        let result = self
            .transport
            .create_task(todolist_id, title)
            .await
            .and_then(|envelope| envelope.into_result());
        self.store.invalidate(&[Tag::task(todolist_id)]);
        result.map(|data| data.item)
    }

    /// Delete a task.
    pub async fn remove_task(&self, todolist_id: &str, task_id: &str) -> Result<()> {
        let result = self
            .transport
            .delete_task(todolist_id, task_id)
            .await
            .and_then(|envelope| envelope.into_result());
        self.store.invalidate(&[Tag::task(todolist_id)]);
        result.map(|_| ())
    }

    /// Update a task, optimistically patching the page the caller is viewing.
    ///
    /// The patch is reverted if the server rejects the update. Copies of the
    /// task cached under other pages are not patched; they catch up through
    /// tag invalidation.
    pub async fn update_task(
        &self,
        todolist_id: &str,
        task_id: &str,
        model: UpdateTaskModel,
        page: u32,
    ) -> Result<Task> {
        let key = QueryKey::tasks_page(todolist_id, page);
        let patch = self.store.apply_patch(&key, task_id, &model);

        let result = self
            .transport
            .put_task(todolist_id, task_id, &model)
            .await
            .and_then(|envelope| envelope.into_result());

        match &result {
            // on success the optimistic value stands; the invalidation
            // refetch is the source of truth
            Ok(_) => {}
            Err(err) => {
                if let Some(patch) = patch {
                    debug!(task_id, %err, "update rejected, rolling back optimistic patch");
                    patch.undo();
                }
            }
        }
        self.store.invalidate(&[Tag::task(todolist_id)]);
        result.map(|data| data.item)
    }
}
