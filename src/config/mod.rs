//! Configuration module for the page sync engine.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{ADMIN_DIGEST, ADMIN_SALT};
use crate::remote::REMOTE_PATH;

/// Credential value shipped in the template; means "no backend configured".
pub const PLACEHOLDER_API_KEY: &str = "ISI_API_KEY_DISINI";

/// Default first-paint fallback window.
pub const DEFAULT_FALLBACK_WINDOW: Duration = Duration::from_millis(3000);

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote realtime store endpoint
    pub database_url: String,
    /// Access credential for the remote store
    pub api_key: String,
    /// Project identifier of the remote backend
    pub project_id: String,
    /// Logical path of the page data in the remote store
    pub remote_path: String,
    /// Directory holding the local snapshot
    pub cache_dir: PathBuf,
    /// How long to wait for the remote before painting from the cache
    pub fallback_window: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Salt mixed into the admin credential digest
    pub admin_salt: String,
    /// Stored digest of the admin credential
    pub admin_digest: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            project_id: String::new(),
            remote_path: REMOTE_PATH.to_string(),
            cache_dir: PathBuf::from("./data"),
            fallback_window: DEFAULT_FALLBACK_WINDOW,
            log_level: "info".to_string(),
            admin_salt: ADMIN_SALT.to_string(),
            admin_digest: ADMIN_DIGEST.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let fallback_window = match env::var("PAGE_SYNC_FALLBACK_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    tracing::warn!(
                        "Invalid PAGE_SYNC_FALLBACK_MS {:?}, using {} ms",
                        raw,
                        defaults.fallback_window.as_millis()
                    );
                    defaults.fallback_window
                }
            },
            Err(_) => defaults.fallback_window,
        };

        Self {
            database_url: env::var("PAGE_SYNC_DATABASE_URL").unwrap_or(defaults.database_url),
            api_key: env::var("PAGE_SYNC_API_KEY").unwrap_or(defaults.api_key),
            project_id: env::var("PAGE_SYNC_PROJECT_ID").unwrap_or(defaults.project_id),
            remote_path: env::var("PAGE_SYNC_REMOTE_PATH").unwrap_or(defaults.remote_path),
            cache_dir: env::var("PAGE_SYNC_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            fallback_window,
            log_level: env::var("PAGE_SYNC_LOG_LEVEL").unwrap_or(defaults.log_level),
            admin_salt: env::var("PAGE_SYNC_ADMIN_SALT").unwrap_or(defaults.admin_salt),
            admin_digest: env::var("PAGE_SYNC_ADMIN_DIGEST").unwrap_or(defaults.admin_digest),
        }
    }

    /// Whether a remote backend is configured. Otherwise the engine runs
    /// from the local cache only.
    pub fn is_remote_configured(&self) -> bool {
        self.api_key != PLACEHOLDER_API_KEY && !self.database_url.trim().is_empty()
    }
}
