//! Structured log repository

use agentdesk_client::ConsoleClient;
use agentdesk_core::domain::log::LogEntry;
use agentdesk_core::dto::log::{LogQuery, StreamQuery};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;

use super::PayloadStream;

/// Repository trait for the structured log endpoints
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Opens the live log stream
    ///
    /// # Arguments
    /// * `source` - Restrict the stream to one log source
    async fn open_stream(&self, source: Option<&str>) -> Result<PayloadStream>;

    /// Fetches the most recent page of history
    ///
    /// # Arguments
    /// * `source` - Restrict the page to one log source
    /// * `page_size` - Number of entries to request
    async fn fetch_recent(&self, source: Option<&str>, page_size: usize) -> Result<Vec<LogEntry>>;
}

/// HTTP implementation of LogRepository
pub struct HttpLogRepository {
    client: ConsoleClient,
    granularity: Option<u64>,
}

impl HttpLogRepository {
    pub fn new(client: ConsoleClient) -> Self {
        Self {
            client,
            granularity: None,
        }
    }

    /// Asks the backend to batch stream events over `seconds`
    pub fn with_granularity(mut self, seconds: u64) -> Self {
        self.granularity = Some(seconds);
        self
    }
}

#[async_trait]
impl LogRepository for HttpLogRepository {
    async fn open_stream(&self, source: Option<&str>) -> Result<PayloadStream> {
        let query = StreamQuery {
            source: source.map(str::to_string),
            granularity: self.granularity,
        };

        let events = self
            .client
            .open_log_stream(&query)
            .await
            .context("Failed to open log stream")?;

        Ok(Box::pin(events.map(|event| {
            event
                .map(|event| event.data)
                .map_err(anyhow::Error::from)
        })))
    }

    async fn fetch_recent(&self, source: Option<&str>, page_size: usize) -> Result<Vec<LogEntry>> {
        let query = LogQuery::latest(source.map(str::to_string), page_size);

        let page = self
            .client
            .get_logs(&query)
            .await
            .context("Failed to fetch recent logs")?;

        Ok(page.logs)
    }
}
