//! Sync coordinator.
//!
//! Reconciles the remote store, the local cache and the compiled defaults
//! into one stream of fully-populated snapshots, and pushes edits back.
//!
//! ```text
//!              remote snapshot            remote snapshot
//! Connecting ──────────────────► Synced ◄───────────────┐
//!     │                            │  ▲                  │
//!     │ fallback window elapsed    │  └──────────────────┘
//!     ▼                            │ transport error
//!  Offline ◄───────────────────────┘
//!     │  late remote snapshot
//!     └──────────────────────► Synced
//! ```
//!
//! The fallback window only decides the first paint. A remote snapshot that
//! arrives after the cache was served is still delivered, since the live
//! remote is authoritative. A transport error ends the remote subscription
//! for the rest of the session and serves the cache once.
//!
//! Edits are optimistic: [`SyncCoordinator::save`] publishes the new value
//! to subscribers before any I/O, writes the cache through, then pushes to
//! the remote. A failed remote write is reported to the caller and the
//! visible state is left as is.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;

use crate::cache::LocalCache;
use crate::errors::SyncResult;
use crate::models::{now_millis, AppData};
use crate::remote::{RemoteEvent, RemoteFeed, RemoteStore};
use crate::schema::{default_app_data, merge_or_default};

/// Where the visible data currently comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Waiting for the first snapshot.
    Connecting,
    /// Showing remote data, with the remote subscription live.
    Synced,
    /// Showing local cache or default data.
    Offline,
}

type Listener = Box<dyn FnMut(AppData) + Send>;

/// The callback of one subscriber.
///
/// Snapshots are queued and handed over by whichever caller holds the
/// listener. A delivery made from inside the listener (or concurrently with
/// it) only enqueues, so the listener may call back into the coordinator.
struct Sink {
    closed: AtomicBool,
    queue: Mutex<VecDeque<AppData>>,
    listener: Mutex<Option<Listener>>,
}

impl Sink {
    fn new(listener: Listener) -> Self {
        Self {
            closed: AtomicBool::new(false),
            queue: Mutex::new(VecDeque::new()),
            listener: Mutex::new(Some(listener)),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn deliver(&self, data: AppData) {
        if self.is_closed() {
            return;
        }
        self.queue.lock().push_back(data);
        self.drain();
    }

    fn next_queued(&self) -> Option<AppData> {
        self.queue.lock().pop_front()
    }

    fn drain(&self) {
        loop {
            let Some(mut listener) = self.listener.try_lock() else {
                return;
            };
            while let Some(data) = self.next_queued() {
                if self.is_closed() {
                    break;
                }
                if let Some(listener) = listener.as_mut() {
                    listener(data);
                }
            }
            if self.is_closed() {
                listener.take();
                self.queue.lock().clear();
                return;
            }
            drop(listener);

            // A snapshot enqueued after the last pop but before the unlock
            // found the listener busy; hand it over now.
            if self.queue.lock().is_empty() {
                return;
            }
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.queue.lock().clear();
        // A busy listener is released by the caller draining it.
        if let Some(mut listener) = self.listener.try_lock() {
            listener.take();
        }
    }
}

/// State shared with the subscription tasks.
struct Shared {
    state: RwLock<SyncState>,
    current: RwLock<Option<AppData>>,
    sinks: Mutex<Vec<Arc<Sink>>>,
}

impl Shared {
    fn set_state(&self, next: SyncState) {
        let mut state = self.state.write();
        if *state != next {
            tracing::info!(from = ?*state, to = ?next, "Sync state changed");
            *state = next;
        }
    }

    /// Deliver to one subscriber and make it the visible snapshot.
    fn publish_to(&self, sink: &Sink, data: AppData) {
        if sink.is_closed() {
            return;
        }
        *self.current.write() = Some(data.clone());
        sink.deliver(data);
    }

    /// Make `data` the visible snapshot for every subscriber.
    fn publish_all(&self, data: AppData) {
        *self.current.write() = Some(data.clone());
        let sinks: Vec<Arc<Sink>> = {
            let mut sinks = self.sinks.lock();
            sinks.retain(|sink| !sink.is_closed());
            sinks.clone()
        };
        for sink in sinks {
            sink.deliver(data.clone());
        }
    }
}

/// Handle of a live subscription. Dropping it unsubscribes.
pub struct Subscription {
    sink: Arc<Sink>,
    token: CancellationToken,
}

impl Subscription {
    /// Stop future deliveries and cancel the pending fallback timer.
    ///
    /// Writes already in flight are not aborted.
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.sink.is_closed()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.sink.close();
        self.token.cancel();
    }
}

/// Decrements the in-flight write counter when dropped.
struct PendingWrite(Arc<AtomicUsize>);

impl PendingWrite {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Composes remote store, local cache and defaults.
pub struct SyncCoordinator {
    remote: Option<Arc<dyn RemoteStore>>,
    cache: Arc<dyn LocalCache>,
    fallback_window: Duration,
    shared: Arc<Shared>,
    last_stamp: AtomicI64,
    pending_writes: Arc<AtomicUsize>,
}

impl SyncCoordinator {
    /// `remote` is `None` when no backend is configured; the coordinator
    /// then serves the local cache only.
    pub fn new(
        remote: Option<Arc<dyn RemoteStore>>,
        cache: Arc<dyn LocalCache>,
        fallback_window: Duration,
    ) -> Self {
        Self {
            remote,
            cache,
            fallback_window,
            shared: Arc::new(Shared {
                state: RwLock::new(SyncState::Connecting),
                current: RwLock::new(None),
                sinks: Mutex::new(Vec::new()),
            }),
            last_stamp: AtomicI64::new(0),
            pending_writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.shared.state.read()
    }

    /// The last snapshot made visible, if any.
    pub fn current(&self) -> Option<AppData> {
        self.shared.current.read().clone()
    }

    /// Number of writes not yet settled.
    pub fn pending_writes(&self) -> usize {
        self.pending_writes.load(Ordering::SeqCst)
    }

    /// Start delivering snapshots to `on_data`.
    ///
    /// The first snapshot arrives no later than the fallback window. Must be
    /// called from within a Tokio runtime. `on_data` must not block; it may
    /// call back into the coordinator.
    pub fn subscribe<F>(&self, on_data: F) -> Subscription
    where
        F: FnMut(AppData) + Send + 'static,
    {
        let sink = Arc::new(Sink::new(Box::new(on_data)));
        self.shared.sinks.lock().push(sink.clone());
        let token = CancellationToken::new();

        // Timer and listener start together so neither gets a head start
        let fallback = tokio::time::sleep(self.fallback_window);
        let feed = self.remote.as_ref().map(|remote| remote.subscribe());

        let run = SubscriptionRun {
            cache: self.cache.clone(),
            shared: self.shared.clone(),
            sink: sink.clone(),
            token: token.clone(),
            fallback_window: self.fallback_window,
        };
        tokio::spawn(run.drive(feed, fallback));

        Subscription { sink, token }
    }

    /// Apply `data` optimistically, then persist it locally and remotely.
    ///
    /// Returns a `Write` error when the remote rejects the write; the local
    /// state keeps `data` regardless and nothing is retried.
    pub async fn save(&self, mut data: AppData) -> SyncResult<()> {
        data.last_updated = self.next_stamp(data.last_updated);
        self.shared.publish_all(data.clone());
        let _pending = PendingWrite::start(&self.pending_writes);

        if let Err(e) = self.cache.save(&data) {
            tracing::warn!("Local cache write failed: {}", e);
        }

        let Some(remote) = &self.remote else {
            tracing::debug!("No remote store configured, saved locally");
            return Ok(());
        };

        let fields = data.editable_fields()?;
        match remote.write_partial(fields).await {
            Ok(()) => {
                tracing::debug!(last_updated = data.last_updated, "Remote write accepted");
                Ok(())
            }
            Err(e) => {
                let e = e.into_write_error();
                tracing::warn!(
                    "Remote write failed, visible data may not reach other viewers: {}",
                    e
                );
                Err(e)
            }
        }
    }

    /// Discard all customization: overwrite the remote with the defaults,
    /// clear the cache and return the defaults for display.
    pub fn reset(&self) -> AppData {
        let defaults = default_app_data();

        if let Some(remote) = self.remote.clone() {
            match (
                serde_json::to_value(&defaults),
                tokio::runtime::Handle::try_current(),
            ) {
                (Ok(value), Ok(handle)) => {
                    let pending = PendingWrite::start(&self.pending_writes);
                    handle.spawn(async move {
                        let _pending = pending;
                        if let Err(e) = remote.write_full(value).await {
                            tracing::warn!("Remote reset failed: {}", e.into_write_error());
                        }
                    });
                }
                (Err(e), _) => tracing::warn!("Could not encode defaults for reset: {}", e),
                (_, Err(e)) => tracing::warn!("Remote reset skipped, no runtime: {}", e),
            }
        }

        if let Err(e) = self.cache.clear() {
            tracing::warn!("Local cache clear failed: {}", e);
        }
        self.shared.publish_all(defaults.clone());
        tracing::info!("Page data reset to defaults");
        defaults
    }

    /// Close the remote store. Live subscriptions fall back to the cache.
    pub async fn close(&self) {
        if let Some(remote) = &self.remote {
            remote.close().await;
        }
    }

    /// A write timestamp never older than any previous one of this client.
    fn next_stamp(&self, floor: i64) -> i64 {
        let candidate = now_millis().max(floor);
        let previous = self.last_stamp.fetch_max(candidate, Ordering::SeqCst);
        previous.max(candidate)
    }
}

/// Everything one subscription task needs.
struct SubscriptionRun {
    cache: Arc<dyn LocalCache>,
    shared: Arc<Shared>,
    sink: Arc<Sink>,
    token: CancellationToken,
    fallback_window: Duration,
}

impl SubscriptionRun {
    fn serve_cache(&self) {
        self.shared.set_state(SyncState::Offline);
        self.shared.publish_to(&self.sink, self.cache.load());
    }

    async fn drive(self, feed: Option<RemoteFeed>, fallback: Sleep) {
        let Some(mut feed) = feed else {
            tracing::info!("No remote store configured, serving local cache");
            self.serve_cache();
            return;
        };

        tokio::pin!(fallback);
        let mut painted = false;

        loop {
            // Biased: cancellation first, then the remote, so a snapshot that
            // is ready in the same poll as the timer wins the race.
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                event = feed.next() => match event {
                    Some(RemoteEvent::Snapshot(raw)) => {
                        painted = true;
                        let data = merge_or_default(raw.as_ref());
                        tracing::debug!(last_updated = data.last_updated, "Remote snapshot received");
                        self.shared.set_state(SyncState::Synced);
                        self.shared.publish_to(&self.sink, data);
                    }
                    Some(RemoteEvent::Failed(e)) => {
                        tracing::warn!("Remote subscription failed, serving local cache: {}", e);
                        self.serve_cache();
                        break;
                    }
                    None => {
                        tracing::warn!("Remote subscription closed, serving local cache");
                        self.serve_cache();
                        break;
                    }
                },
                _ = &mut fallback, if !painted => {
                    painted = true;
                    tracing::info!(
                        window_ms = self.fallback_window.as_millis() as u64,
                        "No remote snapshot within the fallback window, serving local cache"
                    );
                    self.serve_cache();
                }
            }
        }
    }
}
