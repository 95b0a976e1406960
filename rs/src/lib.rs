//! Runstream - live event stream client for workflow run dashboards
//!
//! Runstream opens a long-lived event-stream connection to a workflow server,
//! decodes frames incrementally from arbitrary byte chunks, keeps a bounded
//! history of recent events, and delivers each new event exactly once, in
//! arrival order, to callbacks registered by event type or by wildcard.
//!
//! # Core Concepts
//!
//! - **One connection per feed**: opening a path closes the previous one
//! - **Lossless decoding**: chunk boundaries never change the decoded events
//! - **Failures are status, not errors**: consumers watch `Live`/`Connecting`/`Offline`
//! - **Exactly-once dispatch**: a dispatch marker prevents redelivery
//!
//! # Modules
//!
//! - [`stream`] - connection, credentials, endpoint resolution, frame decoder
//! - [`events`] - history buffer, subscription registry, dispatcher
//! - [`feed`] - `LiveFeed`, the three layers wired together
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//!
//! # Example
//!
//! ```ignore
//! use runstream::{Config, LiveFeed, WILDCARD};
//!
//! let config = Config::load(None)?;
//! let mut feed = LiveFeed::new(config.stream_client()?, config.history_cap);
//! let _all = feed.subscribe(WILDCARD, |event| println!("{}: {}", event.event_type, event.payload));
//! feed.watch("runs/42/stream")?;
//! feed.run().await;
//! ```

pub mod cli;
pub mod config;
pub mod events;
pub mod feed;
pub mod render;
pub mod stream;

pub use config::{AuthConfig, Config};
pub use events::{
    ConnectionStatus, DisconnectReason, Dispatcher, EventHistory, EventId, StreamEvent, Subscribers, Subscription,
    WILDCARD,
};
pub use feed::LiveFeed;
pub use stream::{
    BearerToken, CredentialProvider, Endpoint, FrameDecoder, NoCredentials, StaticHeaders, StreamClient,
    StreamError, StreamHandle, StreamUpdate,
};
