use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::meta::too_old_resource_version;

/// Kubernetes watch event types, as sent in the `type` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    /// Resource created (or replayed on watch start)
    Added,
    /// Resource updated
    Modified,
    /// Resource deleted
    Deleted,
    /// Periodic cursor update carrying only a fresh `resourceVersion`
    Bookmark,
    /// Forward-compatible passthrough for types this crate does not know
    Other(String),
}

impl EventType {
    fn from_wire(raw: &str) -> Self {
        match raw {
            "ADDED" => Self::Added,
            "MODIFIED" => Self::Modified,
            "DELETED" => Self::Deleted,
            "BOOKMARK" => Self::Bookmark,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire form, round-tripping the server's `type` field verbatim
    pub fn as_str(&self) -> &str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
            Self::Bookmark => "BOOKMARK",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outcome of a watch step
#[derive(Debug)]
pub enum WatchItem<K> {
    /// A resource change delivered by the server
    Event { event_type: EventType, object: K },
    /// The server reported the watched `resourceVersion` as gone. Carries
    /// the suggested resume version when the status message names one; the
    /// session reconnects either way.
    InvalidResourceVersion(Option<String>),
    /// The idle read timeout elapsed without a line; poll again
    NoData,
    /// Any other per-step failure. The stream continues; the caller decides
    /// whether to keep pulling, back off or give up.
    Error(Error),
}

/// Classifies one decoded line of the watch stream.
///
/// `ERROR` envelopes become [`WatchItem::InvalidResourceVersion`]; anything
/// else must carry a payload decodable as `K`.
pub(crate) fn classify<K>(mut line: Value) -> Result<WatchItem<K>>
where
    K: DeserializeOwned,
{
    let raw_type = line
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Protocol("Json object should have a type field".to_string()))?
        .to_string();

    let object = match line.get_mut("object").map(Value::take) {
        None | Some(Value::Null) => {
            return Err(Error::Protocol(
                "Json object should have an object field".to_string(),
            ));
        }
        Some(object) => object,
    };

    if raw_type == "ERROR" {
        let status: Status = serde_json::from_value(object).map_err(Error::Json)?;
        let next_version = status.message.as_deref().and_then(too_old_resource_version);
        return Ok(WatchItem::InvalidResourceVersion(next_version));
    }

    let object = serde_json::from_value(object).map_err(Error::Json)?;
    Ok(WatchItem::Event {
        event_type: EventType::from_wire(&raw_type),
        object,
    })
}
