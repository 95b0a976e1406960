//! StreamClient - owns at most one streaming connection at a time
//!
//! Opening a connection spawns a reader task that performs the request,
//! decodes the body incrementally and reports [`StreamUpdate`]s over an
//! unbounded channel. Each connection has its own [`CancellationToken`];
//! closing cancels it and the reader exits at its next suspension point
//! without reporting an error.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::credentials::CredentialProvider;
use super::decoder::{DEFAULT_MAX_LINE_LEN, FrameDecoder};
use super::endpoint::Endpoint;
use super::error::StreamError;
use crate::events::{DisconnectReason, StreamEvent};

/// Default time allowed to establish the TCP/TLS connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a reader task reports about its connection
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    /// A success response with a body is available
    Connected,
    /// A frame was decoded
    Event(StreamEvent),
    /// The connection ended on its own (never sent for a cancelled connection)
    Closed(DisconnectReason),
}

/// Handle to one open connection
pub struct StreamHandle {
    connection: u64,
    path: String,
    cancel: CancellationToken,
    updates: mpsc::UnboundedReceiver<StreamUpdate>,
}

impl StreamHandle {
    /// Next update from the reader; None once the reader has exited
    pub async fn recv(&mut self) -> Option<StreamUpdate> {
        self.updates.recv().await
    }

    /// Cancel the connection (idempotent)
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!(connection = self.connection, path = %self.path, "StreamHandle::close: cancelling");
        }
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn connection(&self) -> u64 {
        self.connection
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

struct ActiveConnection {
    connection: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Client that streams one endpoint path at a time
pub struct StreamClient {
    http: Client,
    endpoint: Endpoint,
    credentials: Arc<dyn CredentialProvider>,
    sequence: Arc<AtomicU64>,
    max_line_len: usize,
    active: Option<ActiveConnection>,
    next_connection: u64,
}

impl StreamClient {
    /// Create a client with the default connect timeout
    pub fn new(endpoint: Endpoint, credentials: Arc<dyn CredentialProvider>) -> Result<Self, StreamError> {
        Self::with_connect_timeout(endpoint, credentials, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a client with a custom connect timeout
    ///
    /// Only connection setup is bounded; the stream itself may stay open
    /// indefinitely.
    pub fn with_connect_timeout(
        endpoint: Endpoint,
        credentials: Arc<dyn CredentialProvider>,
        connect_timeout: Duration,
    ) -> Result<Self, StreamError> {
        debug!(base_url = %endpoint.base_url(), ?connect_timeout, "StreamClient::new: called");
        let http = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            credentials,
            sequence: Arc::new(AtomicU64::new(0)),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            active: None,
            next_connection: 0,
        })
    }

    /// Set the longest stream line decoded; longer lines are dropped
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Open a connection to `path`, closing any previous one first
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&mut self, path: &str) -> Result<StreamHandle, StreamError> {
        let url = self.endpoint.resolve(path)?;
        self.close();

        self.next_connection += 1;
        let connection = self.next_connection;
        let cancel = CancellationToken::new();
        let (tx, updates) = mpsc::unbounded_channel();

        info!(connection, %url, "StreamClient::open: connecting");
        let reader = StreamReader {
            connection,
            http: self.http.clone(),
            url,
            credentials: Arc::clone(&self.credentials),
            decoder: FrameDecoder::with_sequence(Arc::clone(&self.sequence)).with_max_line_len(self.max_line_len),
            tx,
        };
        let task = tokio::spawn(reader.run(cancel.clone()));

        self.active = Some(ActiveConnection {
            connection,
            cancel: cancel.clone(),
            task,
        });

        Ok(StreamHandle {
            connection,
            path: path.to_string(),
            cancel,
            updates,
        })
    }

    /// Cancel the active connection, if any (idempotent)
    pub fn close(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(connection = active.connection, "StreamClient::close: cancelling active connection");
            active.cancel.cancel();
        }
    }

    /// Cancel the active connection and wait for its reader to exit
    pub async fn shutdown(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(connection = active.connection, "StreamClient::shutdown: called");
            active.cancel.cancel();
            if let Err(e) = active.task.await {
                warn!(connection = active.connection, error = %e, "StreamClient::shutdown: reader task failed");
            }
        }
    }

    /// Check if a reader task is still running
    pub fn is_open(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.cancel.is_cancelled() && !active.task.is_finished())
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reader task state for one connection
struct StreamReader {
    connection: u64,
    http: Client,
    url: Url,
    credentials: Arc<dyn CredentialProvider>,
    decoder: FrameDecoder,
    tx: mpsc::UnboundedSender<StreamUpdate>,
}

impl StreamReader {
    async fn run(mut self, cancel: CancellationToken) {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            reason = self.read() => Some(reason),
        };

        match outcome {
            Some(reason) => {
                match &reason {
                    DisconnectReason::Failed(message) => {
                        warn!(connection = self.connection, url = %self.url, %message, "StreamReader: connection failed");
                    }
                    _ => {
                        info!(connection = self.connection, %reason, "StreamReader: connection closed");
                    }
                }
                let _ = self.tx.send(StreamUpdate::Closed(reason));
            }
            None => {
                debug!(connection = self.connection, "StreamReader: cancelled");
            }
        }
        self.decoder.reset();
    }

    async fn read(&mut self) -> DisconnectReason {
        let headers = match self.credentials.headers().await {
            Ok(headers) => headers,
            Err(e) => return DisconnectReason::Failed(e.to_string()),
        };

        let response = match self
            .http
            .get(self.url.clone())
            .headers(headers)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return DisconnectReason::Failed(format!("request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return DisconnectReason::Failed(format!("HTTP {}", status));
        }
        if status == StatusCode::NO_CONTENT {
            return DisconnectReason::Failed("response has no body".to_string());
        }

        debug!(connection = self.connection, %status, "StreamReader: connected");
        if self.tx.send(StreamUpdate::Connected).is_err() {
            return DisconnectReason::Cancelled;
        }

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return DisconnectReason::Failed(format!("stream error: {}", e)),
            };
            for event in self.decoder.push(&chunk) {
                if self.tx.send(StreamUpdate::Event(event)).is_err() {
                    debug!(connection = self.connection, "StreamReader: receiver dropped");
                    return DisconnectReason::Cancelled;
                }
            }
        }

        DisconnectReason::EndOfStream
    }
}
