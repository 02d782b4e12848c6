//! Log-related API endpoints

use crate::ConsoleClient;
use crate::error::Result;
use crate::sse::{self, SseStream};
use agentdesk_core::dto::log::{DownloadQuery, LogPage, LogQuery, StreamQuery};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tracing::debug;

const EVENT_STREAM: &str = "text/event-stream";

impl ConsoleClient {
    // =============================================================================
    // History
    // =============================================================================

    /// List the known log source identifiers
    pub async fn list_log_sources(&self) -> Result<Vec<String>> {
        let response = self.get("/api/logs/sources").send().await?;

        self.handle_response(response).await
    }

    /// Fetch one page of historical log entries
    ///
    /// # Example
    /// ```no_run
    /// # use agentdesk_client::ConsoleClient;
    /// # use agentdesk_core::dto::log::LogQuery;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = ConsoleClient::new("http://localhost:8080");
    /// let page = client
    ///     .get_logs(&LogQuery::latest(Some("agent".to_string()), 100))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_logs(&self, query: &LogQuery) -> Result<LogPage> {
        let response = self.get("/api/logs").query(query).send().await?;

        self.handle_response(response).await
    }

    /// Download the last `lines` lines of a log as a file body
    pub async fn download_logs(&self, query: &DownloadQuery) -> Result<Vec<u8>> {
        let response = self.get("/api/logs/download").query(query).send().await?;
        let body = Self::check_status(response).await?.bytes().await?;

        Ok(body.to_vec())
    }

    // =============================================================================
    // Streams
    // =============================================================================

    /// Open the structured log stream
    ///
    /// Each event's data is one JSON-encoded `LogEntry`.
    pub async fn open_log_stream(&self, query: &StreamQuery) -> Result<SseStream> {
        let response = self
            .get("/api/logs/stream")
            .query(query)
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        debug!("Log stream opened (source: {:?})", query.source);
        Ok(sse::event_stream(Self::check_status(response).await?))
    }

    /// Open the container log stream
    ///
    /// Each event's data is an opaque, preformatted chunk of container output.
    pub async fn open_container_log_stream(&self, granularity: Option<u64>) -> Result<SseStream> {
        let query = StreamQuery {
            source: None,
            granularity,
        };
        let response = self
            .get("/api/sandbox/logs/stream")
            .query(&query)
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        debug!("Container log stream opened");
        Ok(sse::event_stream(Self::check_status(response).await?))
    }
}
