//! Page Sync Agent
//!
//! Headless client of the landing-page data: keeps the local snapshot cache
//! in step with the remote store and logs every snapshot it sees.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use page_sync::models::format_number;
use page_sync::{AppData, Config, FileCache, HttpRemote, LocalCache, RemoteStore, SyncCoordinator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Page Sync Agent");
    tracing::info!("Cache directory: {:?}", config.cache_dir);
    tracing::info!("Fallback window: {} ms", config.fallback_window.as_millis());

    // Local mode when the backend is still the template placeholder
    let remote: Option<Arc<dyn RemoteStore>> = if config.is_remote_configured() {
        Some(Arc::new(HttpRemote::open(&config)?) as Arc<dyn RemoteStore>)
    } else {
        tracing::warn!("No remote store configured (PAGE_SYNC_API_KEY). Running from local cache only!");
        None
    };

    let cache: Arc<dyn LocalCache> = Arc::new(FileCache::new(&config.cache_dir));
    let coordinator = SyncCoordinator::new(remote, cache.clone(), config.fallback_window);

    let subscription = coordinator.subscribe(move |data: AppData| {
        log_snapshot(&data);
        // Keep the snapshot around for the next offline start
        if let Err(e) = cache.save(&data) {
            tracing::warn!("Could not refresh local cache: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down, state was {:?}", coordinator.state());

    subscription.unsubscribe();
    coordinator.close().await;

    Ok(())
}

fn log_snapshot(data: &AppData) {
    tracing::info!(
        name = %data.profile.name,
        subscribers = %format_number(data.stats.subscribers),
        followers = %format_number(data.stats.followers),
        schedule = data.schedule.len(),
        rank = data.rank.len(),
        moderators = data.moderators.len(),
        gallery = data.gallery.len(),
        last_updated = data.last_updated,
        "Snapshot received"
    );
}
