// Error types for the taskdeck client.
// Covers transport failures, server-side rejections, and response decoding.

use thiserror::Error;

use crate::api::types::{FieldError, ResultCode};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// Transport-level failure: the server never produced a response.
    #[error("failed to reach server: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("malformed server response: {0}")]
    Decode(String),

    /// The server answered with a non-success result code.
    #[error("server rejected the request: {}", join_messages(.messages))]
    Server {
        result_code: ResultCode,
        messages: Vec<String>,
        fields_errors: Vec<FieldError>,
    },

    #[error("authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("missing {0} environment variable")]
    MissingEnv(&'static str),
}

// Variants carry owned strings rather than source errors: a settled error is
// stored in the cache entry and replayed to late joiners, so it must be Clone.
impl From<reqwest::Error> for TaskError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TaskError::Decode(err.to_string())
        } else {
            TaskError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Decode(err.to_string())
    }
}

fn join_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        "no details provided".to_string()
    } else {
        messages.join("; ")
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
