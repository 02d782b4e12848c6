//! Configuration module
//!
//! Handles CLI configuration: where the console lives and how to
//! authenticate against it.

use agentdesk_client::ConsoleClient;
use agentdesk_viewer::ViewerConfig;
use anyhow::Result;
use tracing::warn;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the console backend
    pub console_url: String,
    /// Bearer token, if the backend requires one
    pub token: Option<String>,
}

impl Config {
    /// Builds an HTTP client for the configured backend
    pub fn client(&self) -> ConsoleClient {
        let client = ConsoleClient::new(&self.console_url);
        match &self.token {
            Some(token) => client.with_token(token),
            None => client,
        }
    }

    /// Viewer settings from the environment, pointed at the configured backend
    pub fn viewer_config(&self) -> Result<ViewerConfig> {
        let config = ViewerConfig::from_env()
            .unwrap_or_else(|e| {
                warn!("Ignoring viewer settings from environment: {:#}", e);
                ViewerConfig::default()
            })
            .with_console_url(&self.console_url);
        config.validate()?;
        Ok(config)
    }
}
