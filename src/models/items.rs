//! Items of the ordered collections.

use serde::{Deserialize, Serialize};

/// One day of the weekly stream schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: String,
    pub day: String,
    pub activity: String,
    pub time: String,
    pub badge: String,
}

/// An entry of a leaderboard (community ranking or moderator list).
///
/// `rank` is the display position and is renumbered after structural
/// changes; `points` is the score and is never touched by renumbering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankItem {
    pub id: String,
    pub rank: u32,
    pub name: String,
    /// Channel handle (`@name`); empty when the member has none.
    #[serde(default)]
    pub youtube_handle: String,
    pub points: u64,
    pub avatar: String,
}

/// A gallery image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub src: String,
}

/// Operator edit of a leaderboard entry.
///
/// Identity (`id`) and display position (`rank`) are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardEdit {
    pub name: String,
    pub youtube_handle: String,
    pub avatar: String,
    pub points: u64,
}

impl RankItem {
    /// Apply an operator edit, keeping `id` and `rank`.
    pub fn apply(&mut self, edit: LeaderboardEdit) {
        self.name = edit.name;
        self.youtube_handle = edit.youtube_handle.trim().to_string();
        self.avatar = edit.avatar;
        self.points = edit.points;
    }
}
