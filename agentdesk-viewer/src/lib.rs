//! Agentdesk Viewer
//!
//! Live, capped views over the console backend's log streams.
//!
//! Architecture:
//! - Repositories: stream and history access over the console HTTP client
//! - Buffer: bounded, batch-flushed storage shared by both viewers
//! - Viewers: `LogViewer` for structured entries (with history gap-fill on
//!   reconnect) and `ContainerLogViewer` for opaque container output
//!
//! Each viewer owns its state; there is no process-wide buffer. Dropping a
//! viewer stops its session.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use agentdesk_client::ConsoleClient;
//! use agentdesk_viewer::{HttpLogRepository, LogViewer, ViewerConfig, ViewerEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ViewerConfig::from_env()?;
//!     let client = ConsoleClient::new(config.console_url.clone());
//!     let mut viewer = LogViewer::new(Arc::new(HttpLogRepository::new(client)), config);
//!
//!     let mut events = viewer.subscribe();
//!     viewer.start(Some("agent".to_string()));
//!     while let Ok(event) = events.recv().await {
//!         if let ViewerEvent::Appended(batch) = event {
//!             for entry in batch.iter() {
//!                 println!("{} {}", entry.level, entry.message);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod container;
pub mod reconnect;
pub mod repository;
pub mod state;
mod view;
pub mod viewer;

pub use buffer::LogBuffer;
pub use config::ViewerConfig;
pub use container::ContainerLogViewer;
pub use reconnect::ReconnectPolicy;
pub use repository::{
    ContainerLogRepository, HttpContainerLogRepository, HttpLogRepository, LogRepository,
    PayloadStream,
};
pub use state::{StreamPhase, ViewerEvent};
pub use viewer::LogViewer;
