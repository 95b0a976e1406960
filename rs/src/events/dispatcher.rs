//! Dispatcher - delivers each newly recorded event exactly once
//!
//! The dispatcher owns the [`EventHistory`] and a dispatch marker (the id of
//! the last event already delivered). Recording an event appends it to the
//! history and runs dispatch right away, so every event is delivered
//! individually. Running dispatch again without a new event is a no-op.

use tokio::sync::watch;
use tracing::debug;

use super::history::EventHistory;
use super::registry::{Subscribers, Subscription};
use super::types::{ConnectionStatus, DisconnectReason, EventId, StreamEvent};

/// Fans recorded events out to subscribers
pub struct Dispatcher {
    history: EventHistory,
    subscribers: Subscribers,
    last_dispatched: Option<EventId>,
}

impl Dispatcher {
    /// Create a dispatcher whose history retains `history_cap` events
    pub fn new(history_cap: usize) -> Self {
        debug!(history_cap, "Dispatcher::new: called");
        Self {
            history: EventHistory::new(history_cap),
            subscribers: Subscribers::new(),
            last_dispatched: None,
        }
    }

    /// Register a callback for `event_type` (or [`super::WILDCARD`])
    pub fn subscribe<F>(&self, event_type: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(event_type, callback)
    }

    /// Registration handle that can be shared with other tasks
    pub fn subscribers(&self) -> Subscribers {
        self.subscribers.clone()
    }

    /// Store an event and dispatch it
    ///
    /// Returns the number of callbacks invoked.
    pub fn record(&mut self, event: StreamEvent) -> usize {
        self.history.push(event);
        self.dispatch_latest()
    }

    /// Dispatch the newest event if it has not been dispatched yet
    ///
    /// The marker is updated before any callback runs, so a re-entrant or
    /// repeated trigger sees the event as already delivered.
    pub fn dispatch_latest(&mut self) -> usize {
        let Some(latest) = self.history.latest() else {
            return 0;
        };
        if self.last_dispatched == Some(latest.id) {
            debug!(id = %latest.id, "Dispatcher::dispatch_latest: already dispatched");
            return 0;
        }
        self.last_dispatched = Some(latest.id);

        let callbacks = self.subscribers.callbacks_for(&latest.event_type);
        debug!(
            id = %latest.id,
            event_type = %latest.event_type,
            callbacks = callbacks.len(),
            "Dispatcher::dispatch_latest: dispatching"
        );
        for callback in &callbacks {
            callback(latest);
        }
        callbacks.len()
    }

    /// Empty the history and reset the marker
    ///
    /// The next event recorded after this is treated as new whatever its id.
    pub fn clear_events(&mut self) {
        debug!("Dispatcher::clear_events: called");
        self.history.clear();
        self.last_dispatched = None;
    }

    /// Id of the last event delivered to subscribers
    pub fn last_dispatched(&self) -> Option<EventId> {
        self.last_dispatched
    }

    /// Buffered events, newest first
    pub fn events(&self) -> impl Iterator<Item = &StreamEvent> {
        self.history.iter()
    }

    pub fn history(&self) -> &EventHistory {
        &self.history
    }

    pub(crate) fn history_mut(&mut self) -> &mut EventHistory {
        &mut self.history
    }

    pub fn status(&self) -> ConnectionStatus {
        self.history.status()
    }

    pub fn disconnect_reason(&self) -> Option<&DisconnectReason> {
        self.history.disconnect_reason()
    }

    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.history.status_receiver()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(super::history::DEFAULT_HISTORY_CAP)
    }
}
