// Client configuration.
// Resolves the backend base URL and credentials from the environment.

use crate::error::{Result, TaskError};

const DEFAULT_BASE_URL: &str = "https://social-network.samuraijs.com/api/1.1";

/// Tasks fetched per page; the `count` query parameter on every list request.
pub const PAGE_SIZE: u32 = 10;

/// Connection settings for [`crate::TodoClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub auth_token: String,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Build a config from `TODO_API_KEY`, `TODO_API_TOKEN`, and the
    /// optional `TODO_API_BASE_URL` override.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("TODO_API_KEY").map_err(|_| TaskError::MissingEnv("TODO_API_KEY"))?;
        let auth_token =
            std::env::var("TODO_API_TOKEN").map_err(|_| TaskError::MissingEnv("TODO_API_TOKEN"))?;
        let base_url = std::env::var("TODO_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            base_url,
            api_key,
            auth_token,
        })
    }
}
