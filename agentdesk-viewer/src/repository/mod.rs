//! Repository layer
//!
//! Repositories are thin adapters over the console HTTP client. They hand
//! the viewers raw event payloads and history pages without any buffering
//! or retry logic of their own.
//!
//! All repositories are trait-based so viewer sessions can be driven by
//! in-memory fakes in tests.

mod container;
mod logs;

use std::pin::Pin;

use futures_util::Stream;

/// Raw data payloads of one stream connection, in arrival order
///
/// The stream ending, or yielding an error, is a transport failure.
pub type PayloadStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

// Re-export traits
pub use container::ContainerLogRepository;
pub use logs::LogRepository;

// Re-export implementations
pub use container::HttpContainerLogRepository;
pub use logs::HttpLogRepository;
