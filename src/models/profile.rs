//! Singleton records of the page: profile, featured content and stats.

use serde::{Deserialize, Serialize};

/// Creator profile shown in the page header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub tagline: String,
    pub avatar: String,
    pub youtube_url: String,
    pub tiktok_url: String,
    pub discord_url: String,
    pub store_url: String,
    pub second_store_url: String,
    pub support_url: String,
}

/// Featured video embeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub youtube_id: String,
    pub tiktok_url: String,
}

/// Audience counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub subscribers: u64,
    pub followers: u64,
    pub total_views: u64,
}

/// Render a counter the way the page header shows it (`1.2M`, `45.0K`, `999`).
pub fn format_number(num: u64) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}
