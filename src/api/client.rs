// Todo-list backend HTTP client.
// Handles authentication headers and request/response processing.

use reqwest::{
    Client, Response, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{Result, TaskError};

const API_KEY_HEADER: &str = "API-KEY";

/// HTTP client for the todo-list REST backend.
///
/// Credentials ride on every request as default headers; the backend expects
/// both an application API key and the user's bearer token.
pub struct TodoClient {
    client: Client,
    base_url: String,
}

impl TodoClient {
    /// Create a client with the given configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.auth_token))
                .map_err(|e| TaskError::Network(e.to_string()))?,
        );
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| TaskError::Network(e.to_string()))?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the environment (see [`ClientConfig::from_env`]).
    pub fn from_env() -> Result<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get<T: Serialize + ?Sized>(
        &self,
        path: &str,
        params: &T,
    ) -> Result<Response> {
        let response = self.client.get(self.url(path)).query(params).send().await?;
        check_response(response).await
    }

    /// Make a POST request with a JSON body.
    pub(crate) async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        check_response(response).await
    }

    /// Make a PUT request with a JSON body.
    pub(crate) async fn put<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let response = self.client.put(self.url(path)).json(body).send().await?;
        check_response(response).await
    }

    /// Make a DELETE request.
    pub(crate) async fn delete(&self, path: &str) -> Result<Response> {
        let response = self.client.delete(self.url(path)).send().await?;
        check_response(response).await
    }
}

/// Check response status and convert HTTP-level failures.
async fn check_response(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::OK | StatusCode::CREATED => Ok(response),
        StatusCode::UNAUTHORIZED => Err(TaskError::Unauthorized),
        status => Err(TaskError::Network(format!(
            "HTTP {}: {}",
            status,
            response.text().await.unwrap_or_default()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = ClientConfig::new("http://localhost:3000/", "key", "token");
        let client = TodoClient::new(&config).unwrap();
        assert_eq!(
            client.url("todo-lists/L1/tasks"),
            "http://localhost:3000/todo-lists/L1/tasks"
        );
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let config = ClientConfig::new("http://localhost:3000", "bad\nkey", "token");
        assert!(matches!(TodoClient::new(&config), Err(TaskError::Network(_))));
    }
}
