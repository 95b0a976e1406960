//! Event History - bounded buffer of recent events plus connection status
//!
//! The history keeps the newest event at the front and evicts from the back
//! once the cap is reached. Connection status is published through a
//! `tokio::sync::watch` channel so tasks other than the owner can observe it.

use std::collections::VecDeque;

use tokio::sync::watch;
use tracing::debug;

use super::types::{ConnectionStatus, DisconnectReason, StreamEvent};

/// Default number of events retained
pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Bounded, most-recent-first event buffer for one observed path
pub struct EventHistory {
    events: VecDeque<StreamEvent>,
    cap: usize,
    path: Option<String>,
    status_tx: watch::Sender<ConnectionStatus>,
    disconnect_reason: Option<DisconnectReason>,
}

impl EventHistory {
    /// Create a history with the given cap (a cap of 0 is raised to 1)
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        debug!(cap, "EventHistory::new: called");
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            events: VecDeque::with_capacity(cap + 1),
            cap,
            path: None,
            status_tx,
            disconnect_reason: None,
        }
    }

    /// Insert an event at the front, evicting the oldest when over cap
    pub fn push(&mut self, event: StreamEvent) {
        debug!(id = %event.id, event_type = %event.event_type, "EventHistory::push");
        self.events.push_front(event);
        if self.events.len() > self.cap {
            if let Some(evicted) = self.events.pop_back() {
                debug!(id = %evicted.id, "EventHistory::push: evicted oldest");
            }
        }
    }

    /// Most recent event, if any
    pub fn latest(&self) -> Option<&StreamEvent> {
        self.events.front()
    }

    /// Iterate events, newest first
    pub fn iter(&self) -> impl Iterator<Item = &StreamEvent> {
        self.events.iter()
    }

    /// Owned copy of the buffer, newest first
    pub fn snapshot(&self) -> Vec<StreamEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Empty the buffer; connection status is left alone
    pub fn clear(&mut self) {
        debug!(len = self.events.len(), "EventHistory::clear: called");
        self.events.clear();
    }

    /// Path whose events the buffer currently holds
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        debug!(%path, "EventHistory::set_path: called");
        self.path = Some(path);
    }

    /// Latest connection status
    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// Why the last disconnect happened (None while connecting or connected)
    pub fn disconnect_reason(&self) -> Option<&DisconnectReason> {
        self.disconnect_reason.as_ref()
    }

    /// Receiver that observes every status transition
    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Record a status transition
    ///
    /// Returns false (and changes nothing) when `status` equals the current
    /// status, so each connection reports `Disconnected` at most once.
    pub fn set_status(&mut self, status: ConnectionStatus, reason: Option<DisconnectReason>) -> bool {
        let current = self.status();
        if current == status {
            debug!(%status, "EventHistory::set_status: unchanged");
            return false;
        }
        debug!(from = %current, to = %status, ?reason, "EventHistory::set_status: transition");
        self.disconnect_reason = match status {
            ConnectionStatus::Disconnected => reason,
            _ => None,
        };
        self.status_tx.send_replace(status);
        true
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
