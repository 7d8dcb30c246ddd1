//! Page sync engine
//!
//! Keeps an editable creator landing page consistent across a remote realtime
//! store, a local snapshot cache and compiled-in defaults, with optimistic
//! local edits and a digest-gated admin mode.

pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod models;
pub mod remote;
pub mod schema;
pub mod sync;

pub use auth::{AdminSession, CredentialVerifier};
pub use cache::{FileCache, LocalCache, MemoryCache};
pub use config::Config;
pub use errors::{SyncError, SyncResult};
pub use models::AppData;
pub use remote::{HttpRemote, MemoryRemote, RemoteStore};
pub use schema::{default_app_data, merge};
pub use sync::{Subscription, SyncCoordinator, SyncState};
