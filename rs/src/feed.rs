//! LiveFeed - one observed stream path wired to history and subscribers
//!
//! The feed is the single owner of the connection handle and the dispatcher.
//! Updates from the reader task are applied one at a time by [`LiveFeed::pump`],
//! so history mutation and callback dispatch always happen on the task that
//! drives the feed.
//!
//! Switching to a different path clears the history (and the dispatch marker)
//! so events from the previous path are never attributed to the new one.
//! Re-watching the same path, as a reconnect does, keeps the history.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::events::{
    ConnectionStatus, DisconnectReason, Dispatcher, StreamEvent, Subscribers, Subscription,
};
use crate::stream::{StreamClient, StreamError, StreamHandle, StreamUpdate};

/// Live event feed for one path at a time
pub struct LiveFeed {
    client: StreamClient,
    dispatcher: Dispatcher,
    handle: Option<StreamHandle>,
}

impl LiveFeed {
    pub fn new(client: StreamClient, history_cap: usize) -> Self {
        debug!(history_cap, "LiveFeed::new: called");
        Self {
            client,
            dispatcher: Dispatcher::new(history_cap),
            handle: None,
        }
    }

    /// Start streaming `path`, replacing any current connection
    pub fn watch(&mut self, path: &str) -> Result<(), StreamError> {
        // Validate before touching any state
        self.client.endpoint().resolve(path)?;
        self.close();

        if self.dispatcher.history().path() != Some(path) {
            info!(from = ?self.dispatcher.history().path(), to = %path, "LiveFeed::watch: switching path");
            self.dispatcher.clear_events();
            self.dispatcher.history_mut().set_path(path);
        }

        let handle = self.client.open(path)?;
        self.dispatcher
            .history_mut()
            .set_status(ConnectionStatus::Connecting, None);
        self.handle = Some(handle);
        Ok(())
    }

    /// Close the connection; a no-op when already closed
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(connection = handle.connection(), path = handle.path(), "LiveFeed::close: closing");
            handle.close();
        }
        self.client.close();
        self.dispatcher
            .history_mut()
            .set_status(ConnectionStatus::Disconnected, Some(DisconnectReason::Cancelled));
    }

    /// Wait for the next update and apply it
    ///
    /// Returns false once there is no active connection left to read from.
    /// Cancel safe: dropping the future loses no update.
    pub async fn pump(&mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };

        match handle.recv().await {
            Some(update) => {
                self.apply(update);
                true
            }
            None => {
                debug!("LiveFeed::pump: reader exited");
                self.handle = None;
                false
            }
        }
    }

    /// Like [`LiveFeed::pump`], but gives up once `interrupt` is cancelled
    ///
    /// Returns None when interrupted. A token cancelled before the call wins
    /// over any update already waiting.
    pub async fn pump_until_cancelled(&mut self, interrupt: &CancellationToken) -> Option<bool> {
        tokio::select! {
            biased;
            _ = interrupt.cancelled() => None,
            more = self.pump() => Some(more),
        }
    }

    /// Pump until the connection ends or is closed
    pub async fn run(&mut self) {
        while self.pump().await {}
    }

    fn apply(&mut self, update: StreamUpdate) {
        match update {
            StreamUpdate::Connected => {
                self.dispatcher
                    .history_mut()
                    .set_status(ConnectionStatus::Connected, None);
            }
            StreamUpdate::Event(event) => {
                self.dispatcher.record(event);
            }
            StreamUpdate::Closed(reason) => {
                self.handle = None;
                self.client.close();
                self.dispatcher
                    .history_mut()
                    .set_status(ConnectionStatus::Disconnected, Some(reason));
            }
        }
    }

    pub fn subscribe<F>(&self, event_type: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(event_type, callback)
    }

    pub fn subscribers(&self) -> Subscribers {
        self.dispatcher.subscribers()
    }

    /// Buffered events, newest first
    pub fn events(&self) -> impl Iterator<Item = &StreamEvent> {
        self.dispatcher.events()
    }

    pub fn clear_events(&mut self) {
        self.dispatcher.clear_events();
    }

    pub fn status(&self) -> ConnectionStatus {
        self.dispatcher.status()
    }

    pub fn disconnect_reason(&self) -> Option<&DisconnectReason> {
        self.dispatcher.disconnect_reason()
    }

    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.dispatcher.status_receiver()
    }

    /// Path whose events the history holds
    pub fn path(&self) -> Option<&str> {
        self.dispatcher.history().path()
    }

    /// Check if a connection is open or being opened
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
