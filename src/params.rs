use std::time::Duration;

use crate::backoff::FibonacciBackoff;

/// Options for a watch session
///
/// Selectors and the starting `resourceVersion` are fixed for the life of
/// the session; the watcher itself advances the version as events arrive.
#[derive(Debug, Clone, Default)]
pub struct WatchParams {
    /// Version to resume from; `None` starts from the server's current state
    pub resource_version: Option<String>,
    pub field_selector: Option<String>,
    pub label_selector: Option<String>,
    /// Idle read timeout per line; `None` blocks until the server sends one
    pub read_timeout: Option<Duration>,
    /// Delay schedule applied before each reconnect; `None` reconnects
    /// immediately and leaves pacing to the caller
    pub reconnect_backoff: Option<FibonacciBackoff>,
}

/// Assembles `<path>?watch=true&k1=v1&…`, skipping absent values and
/// preserving pair order. Percent-encoding is the transport's concern.
pub(crate) fn watch_uri(path: &str, pairs: &[(&str, Option<&str>)]) -> String {
    let mut uri = format!("{path}?watch=true");
    for (key, value) in pairs {
        if let Some(value) = value {
            uri.push('&');
            uri.push_str(key);
            uri.push('=');
            uri.push_str(value);
        }
    }
    uri
}
