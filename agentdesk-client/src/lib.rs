//! Agentdesk HTTP Client
//!
//! A small, type-safe HTTP client for the log endpoints of the agent
//! management console backend.
//!
//! It covers the request/response endpoints (log sources, history pages,
//! downloads) as well as the two server-sent event streams: structured log
//! entries and opaque container log lines.
//!
//! # Example
//!
//! ```no_run
//! use agentdesk_client::ConsoleClient;
//! use agentdesk_core::dto::log::LogQuery;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ConsoleClient::new("http://localhost:8080");
//!
//!     let page = client.get_logs(&LogQuery::default()).await?;
//!     for entry in page.logs {
//!         println!("{} {}", entry.level, entry.message);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod logs;
pub mod sse;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use sse::{SseEvent, SseStream};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// HTTP client for the console backend
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    /// Base URL of the backend (e.g., "http://localhost:8080")
    base_url: String,
    /// Bearer token forwarded on every request, if any
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl ConsoleClient {
    /// Create a new console client
    ///
    /// # Example
    /// ```
    /// use agentdesk_client::ConsoleClient;
    ///
    /// let client = ConsoleClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new console client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc. Do not set a
    /// global request timeout on a client used for streams: it would cut
    /// long-lived event streams.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Attach a bearer token issued by the console's login flow
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    /// Get the base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self.client.get(self.url(path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Fail with an `ApiError` unless the response has a success status
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
