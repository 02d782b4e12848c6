//! Stream phases and the events viewers publish

use agentdesk_core::domain::connection::ConnectionState;
use std::sync::Arc;

/// Phase of the reconnection state machine
///
/// ```text
///  Idle ──start──▶ Streaming ──transport error──▶ ErrorPending
///                      ▲                               │ retry delay
///                      └────── stream reopened ── Reconnecting
/// ```
///
/// There is no terminal phase other than `Idle`, which is only reached
/// through `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Streaming,
    ErrorPending,
    Reconnecting,
}

impl StreamPhase {
    /// What the connection banner should show for this phase
    pub fn connection_state(&self) -> ConnectionState {
        match self {
            StreamPhase::Idle | StreamPhase::ErrorPending => ConnectionState::Disconnected,
            StreamPhase::Streaming => ConnectionState::Connected,
            StreamPhase::Reconnecting => ConnectionState::Reconnecting,
        }
    }
}

/// Change notifications published by a viewer
#[derive(Debug, Clone)]
pub enum ViewerEvent<T> {
    /// The reconnection state machine moved
    Phase(StreamPhase),
    /// A flush appended this batch at the tail of the buffer
    Appended(Arc<[T]>),
    /// The buffer was replaced wholesale (history load or gap-fill)
    Replaced(Arc<[T]>),
    /// The buffer was emptied because a new session started
    Cleared,
    /// A transient, non-blocking notification for the user
    Notice(String),
}
