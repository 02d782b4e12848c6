//! Viewer configuration
//!
//! Defines the backend location and the tuning knobs of the stream
//! clients: buffer ceiling, flush period, gap-fill page size and the
//! reconnect delay.

use std::time::Duration;

use agentdesk_core::dto::log::DEFAULT_PAGE_SIZE;
use uuid::Uuid;

use crate::buffer::DEFAULT_CAPACITY;
use crate::reconnect::{DEFAULT_RECONNECT_DELAY, ReconnectPolicy};

/// Default flush period of the pending queue
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(250);

/// Shortest flush period a viewer will run with
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Viewer configuration
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Identifies this viewer instance in traces
    pub viewer_id: Uuid,

    /// Console backend base URL (e.g., "http://localhost:8080")
    pub console_url: String,

    /// Maximum number of entries kept in the rendered buffer
    pub buffer_capacity: usize,

    /// How often pending entries are moved into the buffer
    pub flush_interval: Duration,

    /// Entries requested when loading or gap-filling history
    pub backfill_page_size: usize,

    /// Wait between consecutive failed reconnect attempts
    pub reconnect_delay: Duration,
}

impl ViewerConfig {
    /// Creates a new configuration with defaults
    pub fn new(console_url: String) -> Self {
        Self {
            viewer_id: Uuid::new_v4(),
            console_url,
            buffer_capacity: DEFAULT_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            backfill_page_size: DEFAULT_PAGE_SIZE,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - AGENTDESK_URL (default: http://localhost:8080)
    /// - AGENTDESK_BUFFER_CAPACITY (default: 1000)
    /// - AGENTDESK_FLUSH_INTERVAL_MS (default: 250)
    /// - AGENTDESK_BACKFILL_PAGE_SIZE (default: 100)
    /// - AGENTDESK_RECONNECT_DELAY_SECS (default: 5)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("AGENTDESK_URL") {
            config.console_url = url;
        }

        config.buffer_capacity = env_parse("AGENTDESK_BUFFER_CAPACITY").unwrap_or(DEFAULT_CAPACITY);

        config.flush_interval = env_parse("AGENTDESK_FLUSH_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_FLUSH_INTERVAL);

        config.backfill_page_size =
            env_parse("AGENTDESK_BACKFILL_PAGE_SIZE").unwrap_or(DEFAULT_PAGE_SIZE);

        config.reconnect_delay = env_parse("AGENTDESK_RECONNECT_DELAY_SECS")
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RECONNECT_DELAY);

        config.validate()?;
        Ok(config)
    }

    /// Overrides the backend URL
    pub fn with_console_url(mut self, console_url: impl Into<String>) -> Self {
        self.console_url = console_url.into();
        self
    }

    /// Flush period clamped to `MIN_FLUSH_INTERVAL`
    pub fn effective_flush_interval(&self) -> Duration {
        self.flush_interval.max(MIN_FLUSH_INTERVAL)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.reconnect_delay)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.console_url.is_empty() {
            anyhow::bail!("console_url cannot be empty");
        }

        if !self.console_url.starts_with("http://") && !self.console_url.starts_with("https://") {
            anyhow::bail!("console_url must start with http:// or https://");
        }

        if self.buffer_capacity == 0 {
            anyhow::bail!("buffer_capacity must be greater than 0");
        }

        if self.flush_interval.is_zero() {
            anyhow::bail!("flush_interval must be greater than 0");
        }

        if self.backfill_page_size == 0 {
            anyhow::bail!("backfill_page_size must be greater than 0");
        }

        Ok(())
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080".to_string())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert_eq!(config.buffer_capacity, 1000);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.backfill_page_size, 100);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ViewerConfig::default();

        config.console_url = "localhost:8080".to_string();
        assert!(config.validate().is_err());

        config.console_url = "https://console.internal".to_string();
        assert!(config.validate().is_ok());

        config.buffer_capacity = 0;
        assert!(config.validate().is_err());
        config.buffer_capacity = 10;

        config.flush_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.flush_interval = Duration::from_millis(10);

        config.backfill_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_viewer_ids_are_unique() {
        assert_ne!(ViewerConfig::default().viewer_id, ViewerConfig::default().viewer_id);
    }

    #[test]
    fn test_with_console_url() {
        let config = ViewerConfig::default().with_console_url("http://10.0.0.2:9000");
        assert_eq!(config.console_url, "http://10.0.0.2:9000");
        assert_eq!(config.reconnect_policy().delay_for(2), config.reconnect_delay);
    }
}
