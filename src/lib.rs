//! Streaming watch client for the Kubernetes API
//!
//! Opens long-lived `watch=true` connections against the API server and
//! exposes the newline-delimited event stream as a typed, infinite
//! [`Stream`](futures::Stream) of [`WatchItem`]s. The stream tracks the most
//! recently observed `resourceVersion`, classifies error envelopes and idle
//! timeouts, and reopens the underlying body transparently when it fails or
//! goes stale. Transport, TLS and authentication stay behind the
//! [`HttpClient`] trait.
//!
//! Entry point: [`watch_resource`]. For step-at-a-time control, use
//! [`Watcher`] directly.

pub mod backoff;
pub mod error;
pub mod event;
pub mod http;
pub mod meta;
pub mod params;
pub mod watcher;

pub use backoff::FibonacciBackoff;
pub use error::{Error, Result};
pub use event::{EventType, WatchItem};
pub use http::{BoxBody, HttpClient, HttpResponse, WatchBody, WatchRequest};
pub use meta::ResourceMeta;
pub use params::WatchParams;
pub use watcher::{Watcher, watch_resource};
