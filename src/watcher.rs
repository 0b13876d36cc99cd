use std::marker::PhantomData;
use std::sync::Arc;

use futures::{Stream, stream};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::event::{self, WatchItem};
use crate::http::{self, HttpClient, WatchBody};
use crate::meta::ResourceMeta;
use crate::params::{self, WatchParams};

/// One watch session against a single resource collection
///
/// Owns the live response body and the most recently observed
/// `resourceVersion`, so a dropped or desynced connection can be reopened
/// without losing the stream position. Created through [`Watcher::connect`]
/// or [`watch_resource`], then driven by [`Watcher::step`] one item at a
/// time.
pub struct Watcher<K, C: ?Sized> {
    path: String,
    client: Arc<C>,
    params: WatchParams,
    resource_version: Option<String>,
    /// `None` marks a failed or stale body; the next step reopens
    body: Option<WatchBody>,
    _marker: PhantomData<fn() -> K>,
}

impl<K, C> Watcher<K, C>
where
    K: DeserializeOwned + ResourceMeta,
    C: HttpClient + ?Sized,
{
    /// Builds the session and performs the initial handshake.
    ///
    /// The first call to the server happens here; a failure is returned
    /// directly and no session exists. Every failure after this point is
    /// delivered in-band as a [`WatchItem`].
    pub async fn connect(path: &str, client: Arc<C>, params: WatchParams) -> Result<Self> {
        let mut watcher = Self {
            path: path.to_string(),
            client,
            resource_version: params.resource_version.clone(),
            params,
            body: None,
            _marker: PhantomData,
        };

        let body = http::open_watch(
            watcher.client.as_ref(),
            watcher.watch_uri(),
            watcher.params.read_timeout,
        )
        .await?;
        watcher.body = Some(body);

        Ok(watcher)
    }

    /// The most recently observed `resourceVersion`, if any
    pub fn resource_version(&self) -> Option<&str> {
        self.resource_version.as_deref()
    }

    fn watch_uri(&self) -> String {
        params::watch_uri(
            &self.path,
            &[
                ("resourceVersion", self.resource_version.as_deref()),
                ("fieldSelector", self.params.field_selector.as_deref()),
                ("labelSelector", self.params.label_selector.as_deref()),
            ],
        )
    }

    async fn reopen(&mut self) -> Result<WatchBody> {
        if let Some(backoff) = self.params.reconnect_backoff.as_mut() {
            tokio::time::sleep(backoff.next_delay()).await;
        }

        debug!(
            path = %self.path,
            resource_version = ?self.resource_version,
            "reopening watch",
        );
        http::open_watch(
            self.client.as_ref(),
            self.watch_uri(),
            self.params.read_timeout,
        )
        .await
    }

    /// Performs one state transition and yields exactly one item.
    ///
    /// Ensures a live body (reopening a failed one), reads a single line,
    /// classifies it and folds the outcome back into the session state. No
    /// outcome terminates the session: errors surface as items and the next
    /// call carries on.
    pub async fn step(&mut self) -> WatchItem<K> {
        let outcome = match self.body.as_mut() {
            Some(body) => Self::read_one(body).await,
            None => match self.reopen().await {
                Ok(body) => Self::read_one(self.body.insert(body)).await,
                // still no body; the next step retries the reopen
                Err(error) => return WatchItem::Error(error),
            },
        };

        self.apply(outcome)
    }

    async fn read_one(body: &mut WatchBody) -> Result<WatchItem<K>> {
        let line = body.next_object().await?;
        event::classify(line)
    }

    fn apply(&mut self, outcome: Result<WatchItem<K>>) -> WatchItem<K> {
        match outcome {
            Ok(WatchItem::Event { event_type, object }) => {
                if let Some(version) = object.resource_version() {
                    self.resource_version = Some(version.to_string());
                }
                if let Some(backoff) = self.params.reconnect_backoff.as_mut() {
                    backoff.reset();
                }
                WatchItem::Event { event_type, object }
            }
            Ok(WatchItem::InvalidResourceVersion(next_version)) => {
                warn!(
                    current = ?self.resource_version,
                    next = ?next_version,
                    "watched resourceVersion is gone, resyncing",
                );
                if let Some(version) = &next_version {
                    self.resource_version = Some(version.clone());
                }
                // the server will not send anything further on this body
                self.body = None;
                WatchItem::InvalidResourceVersion(next_version)
            }
            Ok(item) => item,
            Err(error) if error.is_timeout() => WatchItem::NoData,
            Err(error) => {
                match &error {
                    // the line arrived but did not decode; skip it and keep
                    // reading the same stream
                    Error::Json(_) | Error::Protocol(_) => {
                        debug!(%error, "skipping undecodable watch line");
                    }
                    _ => {
                        debug!(%error, "watch body failed, reopening on next poll");
                        self.body = None;
                    }
                }
                WatchItem::Error(error)
            }
        }
    }

    /// Turns the session into a lazy, infinite stream of items.
    ///
    /// Single consumer, pull-driven; the caller controls cadence and
    /// termination. Dropping the stream drops the session and with it the
    /// current body, releasing the connection.
    pub fn into_stream(self) -> impl Stream<Item = WatchItem<K>> {
        stream::unfold(self, |mut watcher| async move {
            let item = watcher.step().await;
            Some((item, watcher))
        })
    }
}

/// Opens a watch on `path` and returns its event stream.
///
/// ```no_run
/// # use std::sync::Arc;
/// # async fn example(client: Arc<dyn kubewatch::HttpClient>) -> kubewatch::Result<()> {
/// use futures::{StreamExt, pin_mut};
/// use k8s_openapi::api::core::v1::Pod;
/// use kubewatch::{WatchItem, WatchParams};
///
/// let events = kubewatch::watch_resource::<Pod, _>(
///     "/api/v1/pods",
///     client,
///     WatchParams::default(),
/// )
/// .await?;
/// pin_mut!(events);
/// while let Some(item) = events.next().await {
///     if let WatchItem::Event { event_type, object } = item {
///         println!("{event_type} {:?}", object.metadata.name);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn watch_resource<K, C>(
    path: &str,
    client: Arc<C>,
    params: WatchParams,
) -> Result<impl Stream<Item = WatchItem<K>>>
where
    K: DeserializeOwned + ResourceMeta,
    C: HttpClient + ?Sized,
{
    let watcher = Watcher::connect(path, client, params).await?;
    Ok(watcher.into_stream())
}
