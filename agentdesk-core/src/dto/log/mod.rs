//! Log DTOs for the console log endpoints

use serde::{Deserialize, Serialize};

use crate::domain::log::LogEntry;

/// Default number of entries requested per history page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Query for `GET /api/logs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub page: u32,
    pub page_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl LogQuery {
    /// The most recent page for an optional source filter
    pub fn latest(source: Option<String>, page_size: usize) -> Self {
        Self {
            page: 1,
            page_size,
            source,
        }
    }
}

impl Default for LogQuery {
    fn default() -> Self {
        Self::latest(None, DEFAULT_PAGE_SIZE)
    }
}

/// Response envelope of `GET /api/logs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogPage {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

/// Query for `GET /api/logs/stream`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Server-side batching window in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<u64>,
}

/// Query for `GET /api/logs/download`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadQuery {
    pub lines: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
