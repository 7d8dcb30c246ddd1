//! Local snapshot cache.
//!
//! A single fixed key holding the JSON-serialized [`AppData`]. Backends only
//! move raw strings; decoding and healing live in the provided methods so
//! every backend shares the "corrupt content falls back to defaults" rule.

mod file;

pub use file::*;

use parking_lot::Mutex;

use crate::errors::SyncResult;
use crate::models::AppData;
use crate::schema::{default_app_data, merge};

/// Key of the persisted snapshot.
pub const STORAGE_KEY: &str = "admudcraft_data";

/// Synchronous key-value storage for the local snapshot.
pub trait LocalCache: Send + Sync {
    /// Read the raw snapshot, `None` when nothing is stored.
    fn read_raw(&self) -> SyncResult<Option<String>>;

    /// Overwrite the raw snapshot.
    fn write_raw(&self, raw: &str) -> SyncResult<()>;

    /// Remove the snapshot.
    fn remove(&self) -> SyncResult<()>;

    /// Load the healed snapshot, or the defaults if absent or unreadable.
    fn load(&self) -> AppData {
        let raw = match self.read_raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => return default_app_data(),
            Err(e) => {
                tracing::warn!("Local cache unreadable, using defaults: {}", e);
                return default_app_data();
            }
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => merge(&value),
            Err(e) => {
                tracing::warn!("Local cache corrupt, using defaults: {}", e);
                default_app_data()
            }
        }
    }

    /// Write-through the full snapshot.
    fn save(&self, data: &AppData) -> SyncResult<()> {
        let raw = serde_json::to_string(data)?;
        self.write_raw(&raw)
    }

    /// Drop the snapshot.
    fn clear(&self) -> SyncResult<()> {
        self.remove()
    }
}

/// In-memory cache, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    slot: Mutex<Option<String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with arbitrary raw content, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }
}

impl LocalCache for MemoryCache {
    fn read_raw(&self) -> SyncResult<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    fn write_raw(&self, raw: &str) -> SyncResult<()> {
        *self.slot.lock() = Some(raw.to_string());
        Ok(())
    }

    fn remove(&self) -> SyncResult<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}
