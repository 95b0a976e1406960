//! Event types for live run streaming
//!
//! These types describe what flows out of a stream connection:
//! - Decoded events (type tag + JSON payload)
//! - Connection status as seen by consumers
//! - Why a connection last went offline

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type used when a `data:` line has no preceding `event:` line
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Session-local event identifier
///
/// Monotonic within one client session. Used only to tell a new event apart
/// from one that has already been dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single decoded event from the stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl StreamEvent {
    /// Create an event stamped with the current time
    pub fn new(id: EventId, event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Connection state of the live stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    /// Short label for status indicators
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Live",
            ConnectionStatus::Disconnected => "Offline",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        };
        write!(f, "{}", s)
    }
}

/// Why the stream last transitioned to [`ConnectionStatus::Disconnected`]
///
/// Cancellation is a normal close, so it is kept distinct from failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The caller closed the connection
    Cancelled,
    /// The server ended the stream
    EndOfStream,
    /// The request or the stream failed
    Failed(String),
}

impl DisconnectReason {
    /// Check if this reason represents something going wrong
    pub fn is_failure(&self) -> bool {
        matches!(self, DisconnectReason::Failed(_))
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Cancelled => write!(f, "closed"),
            DisconnectReason::EndOfStream => write!(f, "stream ended"),
            DisconnectReason::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}
