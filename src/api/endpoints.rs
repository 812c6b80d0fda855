// REST endpoint implementations.
// Maps the tasks transport surface onto the backend's paths and envelopes.

use async_trait::async_trait;

use crate::error::Result;

use super::client::TodoClient;
use super::types::{Empty, ResponseEnvelope, TaskItem, TaskPage, UpdateTaskModel};

/// Transport boundary for the tasks REST surface.
///
/// The production implementation is [`TodoClient`]; tests substitute an
/// in-memory fake to script server behavior.
#[async_trait]
pub trait TasksTransport: Send + Sync {
    /// `GET todo-lists/{todolistId}/tasks?page={page}&count={count}`
    async fn fetch_tasks(&self, todolist_id: &str, page: u32, count: u32) -> Result<TaskPage>;

    /// `POST todo-lists/{todolistId}/tasks`
    async fn create_task(
        &self,
        todolist_id: &str,
        title: &str,
    ) -> Result<ResponseEnvelope<TaskItem>>;

    /// `PUT todo-lists/{todolistId}/tasks/{taskId}`
    async fn put_task(
        &self,
        todolist_id: &str,
        task_id: &str,
        model: &UpdateTaskModel,
    ) -> Result<ResponseEnvelope<TaskItem>>;

    /// `DELETE todo-lists/{todolistId}/tasks/{taskId}`
    async fn delete_task(
        &self,
        todolist_id: &str,
        task_id: &str,
    ) -> Result<ResponseEnvelope<Empty>>;
}

#[async_trait]
impl TasksTransport for TodoClient {
    async fn fetch_tasks(&self, todolist_id: &str, page: u32, count: u32) -> Result<TaskPage> {
        let params = [("page", page.to_string()), ("count", count.to_string())];
        let response = self
            .get(&format!("todo-lists/{}/tasks", todolist_id), &params)
            .await?;
        Ok(response.json().await?)
    }

    async fn create_task(
        &self,
        todolist_id: &str,
        title: &str,
    ) -> Result<ResponseEnvelope<TaskItem>> {
        let body = serde_json::json!({ "title": title });
        let response = self
            .post(&format!("todo-lists/{}/tasks", todolist_id), &body)
            .await?;
        Ok(response.json().await?)
    }

    async fn put_task(
        &self,
        todolist_id: &str,
        task_id: &str,
        model: &UpdateTaskModel,
    ) -> Result<ResponseEnvelope<TaskItem>> {
        let response = self
            .put(&format!("todo-lists/{}/tasks/{}", todolist_id, task_id), model)
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_task(
        &self,
        todolist_id: &str,
        task_id: &str,
    ) -> Result<ResponseEnvelope<Empty>> {
        let response = self
            .delete(&format!("todo-lists/{}/tasks/{}", todolist_id, task_id))
            .await?;
        Ok(response.json().await?)
    }
}
