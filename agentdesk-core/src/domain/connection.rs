//! Connection state shown to the user while a log stream is live

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visible state of a stream connection
///
/// Drives the "disconnected, retrying" banner. It is never an error the
/// consumer has to handle; the viewers recover on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(label)
    }
}
