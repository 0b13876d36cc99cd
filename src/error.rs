use std::io;

use http::{HeaderMap, StatusCode};
use thiserror::Error;

/// Errors that can occur while opening or consuming a watch session
#[derive(Error, Debug)]
pub enum Error {
    /// The API server answered a watch call with a non-2xx status
    #[error("api error: {status}")]
    Api {
        status: StatusCode,
        headers: HeaderMap,
        /// HTTP reason phrase
        message: String,
        /// Response body, when the server sent one
        body: Option<String>,
    },

    /// Transport failure while connecting or reading the stream
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A stream line was not valid JSON, or a payload did not match the
    /// expected resource type
    #[error("json error: {0}")]
    Json(#[source] serde_json::Error),

    /// A decoded line was missing a required watch field
    #[error("{0}")]
    Protocol(String),
}

impl Error {
    /// True for idle-read timeouts, which the watcher reports as
    /// [`WatchItem::NoData`](crate::WatchItem::NoData) instead of an error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Io(err) if err.kind() == io::ErrorKind::TimedOut)
    }
}

/// Result type for watch operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
