//! Remote realtime store adapters.
//!
//! The remote store is a push-capable key-value service holding one
//! AppData-shaped value at a fixed logical path. Adapters expose it as an
//! event feed plus two write operations; they apply no ordering or conflict
//! detection between overlapping writers.

mod http;
mod memory;
mod sse;

pub use http::*;
pub use memory::*;
pub use sse::*;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::errors::SyncResult;
use crate::models::{now_millis, LAST_UPDATED_KEY};

/// Default logical path of the page data.
pub const REMOTE_PATH: &str = "portfolioData";

/// One notification from a remote subscription.
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    /// The full raw value at the path, `None` when nothing is stored.
    Snapshot(Option<Value>),
    /// The transport failed. No further events follow.
    Failed(crate::errors::SyncError),
}

/// A live remote subscription.
///
/// Dropping the feed stops the listener behind it.
pub struct RemoteFeed {
    events: mpsc::UnboundedReceiver<RemoteEvent>,
    _guard: Option<DropGuard>,
}

impl RemoteFeed {
    /// A feed whose producer is stopped through `cancel` when the feed drops.
    pub fn new(events: mpsc::UnboundedReceiver<RemoteEvent>, cancel: CancellationToken) -> Self {
        Self {
            events,
            _guard: Some(cancel.drop_guard()),
        }
    }

    /// A feed with no background producer to stop.
    pub fn detached(events: mpsc::UnboundedReceiver<RemoteEvent>) -> Self {
        Self {
            events,
            _guard: None,
        }
    }

    /// Wait for the next event. `None` once the producer is gone.
    ///
    /// Cancel safe.
    pub async fn next(&mut self) -> Option<RemoteEvent> {
        self.events.recv().await
    }
}

/// A push-subscribable remote key-value path.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Start listening. The current value is delivered once the connection
    /// is up, then again after every remote mutation.
    fn subscribe(&self) -> RemoteFeed;

    /// Read the current value once.
    async fn read_once(&self) -> SyncResult<Option<Value>>;

    /// Merge the given top-level fields into the remote value.
    ///
    /// Fields not mentioned are left alone; a `null` field deletes it.
    async fn write_partial(&self, fields: Map<String, Value>) -> SyncResult<()>;

    /// Replace the entire remote value.
    async fn write_full(&self, value: Value) -> SyncResult<()>;

    /// Close the connection and end every live feed.
    async fn close(&self);
}

/// Stamp `_lastUpdated` unless the caller already did.
pub fn stamp_fields(fields: &mut Map<String, Value>) {
    fields
        .entry(LAST_UPDATED_KEY.to_string())
        .or_insert_with(|| Value::from(now_millis()));
}
