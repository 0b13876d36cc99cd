use std::io;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{ACCEPT, CONNECTION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{Error, Result};

/// Streaming reader half of a watch response
pub type BoxBody = Pin<Box<dyn AsyncBufRead + Send>>;

/// A prepared watch call
#[derive(Debug)]
pub struct WatchRequest {
    pub method: Method,
    /// Path and query, relative to the cluster base URL
    pub uri: String,
    pub headers: HeaderMap,
}

/// Raw response surfaced by an [`HttpClient`]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BoxBody,
}

/// Transport executing watch calls
///
/// Implementations own connection setup, TLS, base-URL resolution and
/// authentication (typically a bearer token added to every request).
/// Dropping the returned body must release the underlying connection.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: WatchRequest) -> Result<HttpResponse>;
}

pub(crate) fn watch_request(uri: String) -> WatchRequest {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    WatchRequest {
        method: Method::GET,
        uri,
        headers,
    }
}

/// Executes a watch call and classifies the HTTP status.
///
/// 2xx responses hand back the streaming body; anything else is drained
/// into an [`Error::Api`] envelope.
pub(crate) async fn open_watch<C>(
    client: &C,
    uri: String,
    read_timeout: Option<Duration>,
) -> Result<WatchBody>
where
    C: HttpClient + ?Sized,
{
    let response = client.execute(watch_request(uri)).await?;
    if response.status.is_success() {
        return Ok(WatchBody::new(response.body, read_timeout));
    }

    // Failure bodies are finite; capture them whole for diagnostics.
    let mut reader = response.body;
    let mut text = String::new();
    let body = match reader.read_to_string(&mut text).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(text),
    };

    Err(Error::Api {
        status: response.status,
        headers: response.headers,
        message: response
            .status
            .canonical_reason()
            .unwrap_or("watch request failed")
            .to_string(),
        body,
    })
}

/// Line-oriented reader over a live watch response body
pub struct WatchBody {
    reader: BoxBody,
    read_timeout: Option<Duration>,
    line: String,
}

impl std::fmt::Debug for WatchBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchBody")
            .field("read_timeout", &self.read_timeout)
            .field("line", &self.line)
            .finish()
    }
}

impl WatchBody {
    pub fn new(reader: BoxBody, read_timeout: Option<Duration>) -> Self {
        Self {
            reader,
            read_timeout,
            line: String::new(),
        }
    }

    /// Reads the next newline-delimited JSON object.
    ///
    /// Consumes exactly one line per call, never reading past the next
    /// newline. An exhausted body yields an `UnexpectedEof` error; an idle
    /// timeout yields `TimedOut`, which the watcher maps to `NoData`.
    pub async fn next_object(&mut self) -> Result<Value> {
        self.line.clear();
        let read = match self.read_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.reader.read_line(&mut self.line)).await {
                    Ok(result) => result?,
                    Err(_elapsed) => {
                        return Err(Error::Io(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "timed out waiting for the next event",
                        )));
                    }
                }
            }
            None => self.reader.read_line(&mut self.line).await?,
        };

        if read == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Null response from the server.",
            )));
        }

        serde_json::from_str(self.line.trim_end()).map_err(Error::Json)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::io::BufReader;

    use super::*;

    fn body_of(text: &'static str) -> BoxBody {
        Box::pin(BufReader::new(text.as_bytes()))
    }

    struct OneShot(Mutex<Option<HttpResponse>>);

    #[async_trait]
    impl HttpClient for OneShot {
        async fn execute(&self, _request: WatchRequest) -> Result<HttpResponse> {
            Ok(self.0.lock().unwrap().take().expect("single call"))
        }
    }

    #[test]
    fn watch_request_carries_streaming_headers() {
        let request = watch_request("/api/v1/pods?watch=true".to_string());

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.headers[ACCEPT], "application/json");
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers[CONNECTION], "keep-alive");
    }

    #[tokio::test]
    async fn reads_one_object_per_line() {
        let mut body = WatchBody::new(body_of("{\"a\":1}\n{\"b\":2}\n"), None);

        assert_eq!(body.next_object().await.unwrap()["a"], 1);
        assert_eq!(body.next_object().await.unwrap()["b"], 2);
    }

    #[tokio::test]
    async fn exhausted_body_is_a_null_response_error() {
        let mut body = WatchBody::new(body_of(""), None);

        let err = body.next_object().await.unwrap_err();
        assert!(err.to_string().contains("Null response"), "got {err}");
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn invalid_line_surfaces_as_json_error() {
        let mut body = WatchBody::new(body_of("not json\n"), None);

        let err = body.next_object().await.unwrap_err();
        assert!(matches!(err, Error::Json(_)), "got {err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_read_times_out() {
        let (reader, _writer) = tokio::io::duplex(64);
        let mut body = WatchBody::new(
            Box::pin(BufReader::new(reader)),
            Some(Duration::from_millis(200)),
        );

        let err = body.next_object().await.unwrap_err();
        assert!(err.is_timeout(), "got {err:?}");
    }

    #[tokio::test]
    async fn non_2xx_becomes_an_api_error_with_body() {
        let client = OneShot(Mutex::new(Some(HttpResponse {
            status: StatusCode::FORBIDDEN,
            headers: HeaderMap::new(),
            body: body_of("RBAC: access denied"),
        })));

        let err = open_watch(&client, "/api/v1/pods?watch=true".to_string(), None)
            .await
            .unwrap_err();
        match err {
            Error::Api { status, message, body, .. } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "Forbidden");
                assert_eq!(body.as_deref(), Some("RBAC: access denied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_2xx_without_body_has_no_body_field() {
        let client = OneShot(Mutex::new(Some(HttpResponse {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers: HeaderMap::new(),
            body: body_of(""),
        })));

        let err = open_watch(&client, "/api/v1/pods?watch=true".to_string(), None)
            .await
            .unwrap_err();
        match err {
            Error::Api { status, body, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
