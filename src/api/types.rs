// Todo-list REST API types.
// Defines the response envelope and task payloads the backend speaks.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};

/// Result code carried in every response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ResultCode {
    Success,
    Error,
    /// The server demands a CAPTCHA round-trip before accepting more
    /// requests; resolving it belongs to the auth layer.
    CaptchaRequired,
    Unknown(i32),
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        match code {
            0 => ResultCode::Success,
            1 => ResultCode::Error,
            10 => ResultCode::CaptchaRequired,
            other => ResultCode::Unknown(other),
        }
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        match code {
            ResultCode::Success => 0,
            ResultCode::Error => 1,
            ResultCode::CaptchaRequired => 10,
            ResultCode::Unknown(other) => other,
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", i32::from(*self))
    }
}

/// Per-field validation error reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

/// Uniform wrapper around every mutation endpoint response.
///
/// Failure envelopes carry an empty object in `data`, so the payload is
/// decoded leniently and only required once the result code says success.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: DeserializeOwned"))]
pub struct ResponseEnvelope<T> {
    pub result_code: ResultCode,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub fields_errors: Vec<FieldError>,
    #[serde(default, deserialize_with = "lenient_data")]
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    /// Successful envelope wrapping `data`.
    pub fn success(data: T) -> Self {
        Self {
            result_code: ResultCode::Success,
            messages: Vec::new(),
            fields_errors: Vec::new(),
            data: Some(data),
        }
    }

    /// Failure envelope with the given code and messages.
    pub fn failure(result_code: ResultCode, messages: Vec<String>) -> Self {
        Self {
            result_code,
            messages,
            fields_errors: Vec::new(),
            data: None,
        }
    }

    /// Unwrap the payload, surfacing server messages on failure.
    pub fn into_result(self) -> Result<T> {
        match self.result_code {
            ResultCode::Success => self
                .data
                .ok_or_else(|| TaskError::Decode("response envelope has no payload".to_string())),
            code => Err(TaskError::Server {
                result_code: code,
                messages: self.messages,
                fields_errors: self.fields_errors,
            }),
        }
    }
}

fn lenient_data<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Task completion state; the wire format is an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "i32", into = "i32")]
pub enum TaskStatus {
    #[default]
    New,
    Completed,
    Unknown(i32),
}

impl From<i32> for TaskStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => TaskStatus::New,
            1 => TaskStatus::Completed,
            other => TaskStatus::Unknown(other),
        }
    }
}

impl From<TaskStatus> for i32 {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::New => 0,
            TaskStatus::Completed => 1,
            TaskStatus::Unknown(other) => other,
        }
    }
}

/// Task priority scale used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "i32", into = "i32")]
pub enum TaskPriority {
    Low,
    #[default]
    Middle,
    High,
    Urgently,
    Later,
    Unknown(i32),
}

impl From<i32> for TaskPriority {
    fn from(code: i32) -> Self {
        match code {
            0 => TaskPriority::Low,
            1 => TaskPriority::Middle,
            2 => TaskPriority::High,
            3 => TaskPriority::Urgently,
            4 => TaskPriority::Later,
            other => TaskPriority::Unknown(other),
        }
    }
}

impl From<TaskPriority> for i32 {
    fn from(priority: TaskPriority) -> Self {
        match priority {
            TaskPriority::Low => 0,
            TaskPriority::Middle => 1,
            TaskPriority::High => 2,
            TaskPriority::Urgently => 3,
            TaskPriority::Later => 4,
            TaskPriority::Unknown(other) => other,
        }
    }
}

/// A single task belonging to a todo-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub todo_list_id: String,
    pub order: i32,
    #[serde(default)]
    pub added_date: Option<DateTime<Utc>>,
}

/// One page of one todo-list's tasks.
///
/// The list endpoint has no envelope; a set `error` is the server's way of
/// rejecting the read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    #[serde(default)]
    pub items: Vec<Task>,
    #[serde(default)]
    pub total_count: i32,
    #[serde(default)]
    pub error: Option<String>,
}

/// Single-item payload returned by task create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskItem {
    pub item: Task,
}

/// Payload of envelopes that carry no data (task delete).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}

/// Partial update for a task; unset fields are omitted from the request
/// body and left untouched by the cache-side merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl UpdateTaskModel {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Merge the set fields onto `task` in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(start_date) = self.start_date {
            task.start_date = Some(start_date);
        }
        if let Some(deadline) = self.deadline {
            task.deadline = Some(deadline);
        }
    }
}
