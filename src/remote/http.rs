//! REST + event-stream client for a hosted realtime database.
//!
//! `GET`, `PATCH` and `PUT` on `{url}/{path}.json` read, merge and replace
//! the value. A `GET` with `Accept: text/event-stream` keeps the connection
//! open and streams `put`/`patch` events, which are applied to a local copy
//! of the value so every notification carries the full snapshot.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
    apply_patch, apply_put, stamp_fields, PathUpdate, RemoteEvent, RemoteFeed, RemoteStore,
    SseDecoder,
};
use crate::config::Config;
use crate::errors::{SyncError, SyncResult};

/// Remote store reached over HTTP.
#[derive(Debug)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    path: String,
    auth: Option<String>,
    shutdown: CancellationToken,
}

impl HttpRemote {
    /// Open a client for the configured backend.
    pub fn open(config: &Config) -> SyncResult<Self> {
        if !config.is_remote_configured() {
            return Err(SyncError::Config(
                "remote store is not configured (placeholder credential)".into(),
            ));
        }
        tracing::info!(
            project = %config.project_id,
            path = %config.remote_path,
            "Opening remote store at {}",
            config.database_url
        );
        Ok(Self::new(
            &config.database_url,
            &config.remote_path,
            Some(config.api_key.clone()),
        ))
    }

    pub fn new(base_url: &str, path: &str, auth: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            path: path.trim_matches('/').to_string(),
            auth,
            shutdown: CancellationToken::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/{}.json", self.base_url, self.path)
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let builder = self.client.request(method, self.url());
        match &self.auth {
            Some(auth) => builder.query(&[("auth", auth)]),
            None => builder,
        }
    }
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn check_status(response: Response, what: &str) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Connectivity(format!(
        "{} rejected with status {}: {}",
        what,
        status,
        body.trim()
    )))
}

fn snapshot_of(tree: &Value) -> Option<Value> {
    (!tree.is_null()).then(|| tree.clone())
}

/// Read the event stream until it ends, fails or the listener goes away.
async fn pump_events(
    request: RequestBuilder,
    tx: &mpsc::UnboundedSender<RemoteEvent>,
) -> SyncResult<()> {
    let response = check_status(request.send().await?, "event stream").await?;
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::default();
    let mut tree = Value::Null;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for frame in decoder.push(&chunk) {
            match frame.event.as_str() {
                "put" | "patch" => {
                    let update: PathUpdate = match serde_json::from_str(&frame.data) {
                        Ok(update) => update,
                        Err(e) => {
                            tracing::warn!("Skipping malformed {} event: {}", frame.event, e);
                            continue;
                        }
                    };
                    if frame.event == "put" {
                        apply_put(&mut tree, &update.path, update.data);
                    } else {
                        apply_patch(&mut tree, &update.path, update.data);
                    }
                    if tx.send(RemoteEvent::Snapshot(snapshot_of(&tree))).is_err() {
                        return Ok(());
                    }
                }
                "keep-alive" => {}
                "cancel" => {
                    return Err(SyncError::Connectivity(
                        "event stream cancelled by the server".into(),
                    ))
                }
                "auth_revoked" => {
                    return Err(SyncError::Connectivity("access credential revoked".into()))
                }
                other => tracing::debug!("Ignoring stream event {}", other),
            }
        }
    }

    Err(SyncError::Connectivity("event stream closed".into()))
}

#[async_trait]
impl RemoteStore for HttpRemote {
    fn subscribe(&self) -> RemoteFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = self.shutdown.child_token();
        let request = self
            .request(Method::GET)
            .header(ACCEPT, "text/event-stream");

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Remote event stream stopped");
                }
                result = pump_events(request, &tx) => {
                    if let Err(err) = result {
                        tracing::warn!("Remote event stream failed: {}", err);
                        let _ = tx.send(RemoteEvent::Failed(err));
                    }
                }
            }
        });

        RemoteFeed::new(rx, token)
    }

    async fn read_once(&self) -> SyncResult<Option<Value>> {
        let response = check_status(self.request(Method::GET).send().await?, "read").await?;
        let value: Value = response.json().await?;
        Ok(snapshot_of(&value))
    }

    async fn write_partial(&self, mut fields: Map<String, Value>) -> SyncResult<()> {
        stamp_fields(&mut fields);
        let response = self
            .request(Method::PATCH)
            .json(&fields)
            .send()
            .await
            .map_err(|e| SyncError::from(e).into_write_error())?;
        check_status(response, "partial write")
            .await
            .map_err(SyncError::into_write_error)?;
        Ok(())
    }

    async fn write_full(&self, value: Value) -> SyncResult<()> {
        let response = self
            .request(Method::PUT)
            .json(&value)
            .send()
            .await
            .map_err(|e| SyncError::from(e).into_write_error())?;
        check_status(response, "full write")
            .await
            .map_err(SyncError::into_write_error)?;
        Ok(())
    }

    async fn close(&self) {
        self.shutdown.cancel();
    }
}
