//! Event history and subscription dispatch
//!
//! Decoded stream events land here. The [`Dispatcher`] keeps a bounded
//! history of recent events and fans each new one out to registered
//! callbacks, once per event, in arrival order.
//!
//! # Architecture
//!
//! ```text
//!   StreamEvent (from the stream reader)
//!         │
//!         ▼
//! ┌────────────────────────────────────────────┐
//! │                 Dispatcher                  │
//! │  ┌──────────────┐      ┌────────────────┐  │
//! │  │ EventHistory │      │  Subscribers   │  │
//! │  │ newest first │      │ type -> [cb]   │  │
//! │  │ capped (50)  │      │ "*"  -> [cb]   │  │
//! │  └──────────────┘      └────────────────┘  │
//! └────────────────────────────────────────────┘
//!         │ typed callbacks, then wildcard callbacks
//!         ▼
//!   log views, toasts, status widgets
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use runstream::events::{Dispatcher, WILDCARD};
//!
//! let mut dispatcher = Dispatcher::new(50);
//! let sub = dispatcher.subscribe("step", |event| println!("step: {}", event.payload));
//! let _all = dispatcher.subscribe(WILDCARD, |event| println!("{}", event.event_type));
//!
//! dispatcher.record(event);
//! sub.unsubscribe();
//! ```

mod dispatcher;
mod history;
mod registry;
mod types;

pub use dispatcher::Dispatcher;
pub use history::{DEFAULT_HISTORY_CAP, EventHistory};
pub use registry::{Callback, Subscribers, Subscription, SubscriptionId, WILDCARD};
pub use types::{ConnectionStatus, DEFAULT_EVENT_TYPE, DisconnectReason, EventId, StreamEvent};
