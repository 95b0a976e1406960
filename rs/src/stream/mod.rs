//! Live stream connection and event-stream decoding
//!
//! # Architecture
//!
//! ```text
//!   StreamClient::open(path)
//!         │  Endpoint::resolve + CredentialProvider::headers
//!         ▼
//!   reader task (one per connection, CancellationToken)
//!         │  reqwest bytes_stream -> FrameDecoder::push
//!         ▼
//!   StreamUpdate { Connected | Event | Closed } ──mpsc──▶ StreamHandle::recv
//! ```
//!
//! Transport failures never surface as errors to the caller of `recv`; they
//! arrive as `StreamUpdate::Closed(DisconnectReason::Failed(..))`. A
//! cancelled connection sends nothing further.

mod client;
mod credentials;
mod decoder;
mod endpoint;
mod error;

pub use client::{DEFAULT_CONNECT_TIMEOUT, StreamClient, StreamHandle, StreamUpdate};
pub use credentials::{BearerToken, CredentialProvider, NoCredentials, StaticHeaders};
pub use decoder::{DEFAULT_MAX_LINE_LEN, FrameDecoder};
pub use endpoint::Endpoint;
pub use error::StreamError;
