//! In-process remote store.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::{stamp_fields, RemoteEvent, RemoteFeed, RemoteStore};
use crate::errors::{SyncError, SyncResult};

#[derive(Debug, Default)]
struct MemoryState {
    value: Option<Value>,
    connected: bool,
    reject_writes: Option<String>,
    subscribers: Vec<mpsc::UnboundedSender<RemoteEvent>>,
    writes: usize,
}

impl MemoryState {
    fn broadcast(&mut self) {
        if !self.connected {
            return;
        }
        let event = RemoteEvent::Snapshot(self.value.clone());
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// A remote store living in memory.
///
/// Behaves like the realtime service (top-level merge on partial writes,
/// push of the full value to every listener) and can be told to stay silent,
/// reject writes or drop its transport.
#[derive(Debug)]
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// A connected, empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                connected: true,
                ..Default::default()
            }),
        }
    }

    /// A connected store holding `value`.
    pub fn with_value(value: Value) -> Self {
        let remote = Self::new();
        remote.state.lock().value = Some(value);
        remote
    }

    /// A store that never answers until [`MemoryRemote::connect`] is called.
    pub fn disconnected() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Bring the connection up and push the current value to every listener.
    pub fn connect(&self) {
        let mut state = self.state.lock();
        state.connected = true;
        state.broadcast();
    }

    /// Simulate a write by another editor.
    pub fn set_remote_value(&self, value: Option<Value>) {
        let mut state = self.state.lock();
        state.value = value;
        state.broadcast();
    }

    /// Make every subsequent write fail with `reason`, or succeed again on `None`.
    pub fn reject_writes(&self, reason: Option<&str>) {
        self.state.lock().reject_writes = reason.map(str::to_string);
    }

    /// Break the transport: every listener gets a failure and is dropped.
    pub fn fail_transport(&self, message: &str) {
        let mut state = self.state.lock();
        state.connected = false;
        for tx in state.subscribers.drain(..) {
            let _ = tx.send(RemoteEvent::Failed(SyncError::Connectivity(message.to_string())));
        }
    }

    /// The stored value.
    pub fn value(&self) -> Option<Value> {
        self.state.lock().value.clone()
    }

    /// Number of accepted writes.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    fn check_writable(state: &MemoryState) -> SyncResult<()> {
        if let Some(reason) = &state.reject_writes {
            return Err(SyncError::Write(reason.clone()));
        }
        if !state.connected {
            return Err(SyncError::Write("remote store is not connected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn subscribe(&self) -> RemoteFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        if state.connected {
            let _ = tx.send(RemoteEvent::Snapshot(state.value.clone()));
        }
        state.subscribers.push(tx);
        RemoteFeed::detached(rx)
    }

    async fn read_once(&self) -> SyncResult<Option<Value>> {
        let state = self.state.lock();
        if !state.connected {
            return Err(SyncError::Connectivity("remote store is not connected".into()));
        }
        Ok(state.value.clone())
    }

    async fn write_partial(&self, mut fields: Map<String, Value>) -> SyncResult<()> {
        let mut state = self.state.lock();
        Self::check_writable(&state)?;

        stamp_fields(&mut fields);
        let mut current = match state.value.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in fields {
            if value.is_null() {
                current.remove(&key);
            } else {
                current.insert(key, value);
            }
        }
        state.value = Some(Value::Object(current));
        state.writes += 1;
        state.broadcast();
        Ok(())
    }

    async fn write_full(&self, value: Value) -> SyncResult<()> {
        let mut state = self.state.lock();
        Self::check_writable(&state)?;

        state.value = (!value.is_null()).then_some(value);
        state.writes += 1;
        state.broadcast();
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.state.lock();
        state.connected = false;
        state.subscribers.clear();
    }
}
