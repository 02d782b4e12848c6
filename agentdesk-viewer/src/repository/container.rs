//! Container log repository

use agentdesk_client::ConsoleClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;

use super::PayloadStream;

/// Repository trait for the opaque container log stream
#[async_trait]
pub trait ContainerLogRepository: Send + Sync {
    /// Opens the container log stream
    ///
    /// # Arguments
    /// * `granularity` - Server-side batching window in seconds
    async fn open_stream(&self, granularity: Option<u64>) -> Result<PayloadStream>;
}

/// HTTP implementation of ContainerLogRepository
pub struct HttpContainerLogRepository {
    client: ConsoleClient,
}

impl HttpContainerLogRepository {
    pub fn new(client: ConsoleClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContainerLogRepository for HttpContainerLogRepository {
    async fn open_stream(&self, granularity: Option<u64>) -> Result<PayloadStream> {
        let events = self
            .client
            .open_container_log_stream(granularity)
            .await
            .context("Failed to open container log stream")?;

        Ok(Box::pin(events.map(|event| {
            event
                .map(|event| event.data)
                .map_err(anyhow::Error::from)
        })))
    }
}
