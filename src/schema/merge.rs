//! Merge-with-defaults healing.
//!
//! Upstream values (remote snapshots, the local cache) may be partial, stale
//! or mistyped. [`merge`] turns any JSON value into a fully-populated
//! [`AppData`] by filling every gap from the compiled defaults:
//!
//! - `profile`, `content`, `stats`: field-wise overlay. A field that is
//!   missing or has the wrong type keeps its default; unknown fields are
//!   dropped.
//! - `schedule`, `gallery`: a non-empty upstream sequence replaces the
//!   default wholesale, otherwise the default sequence is used.
//! - `rank`, `moderators`: like the other sequences, except each upstream
//!   item at index `i` is overlaid onto the default item at `i` (when there
//!   is one) to heal half-written entries, and a hole (`null` entry or
//!   missing index) keeps the default item of its position.
//!
//! Sequences may also arrive as objects keyed by index (sparse arrays are
//! stored that way by the realtime store). Items with a missing or
//! duplicated `id` get a deterministic replacement, so the result always
//! has unique ids and `merge` stays idempotent.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::default_app_data;
use crate::models::{
    AppData, Content, GalleryItem, Profile, RankItem, ScheduleItem, Stats, LAST_UPDATED_KEY,
};

/// Typed read access to an optional JSON object, with per-field fallbacks.
#[derive(Clone, Copy)]
struct Fields<'a>(Option<&'a Map<String, Value>>);

impl<'a> Fields<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        Fields(value.and_then(Value::as_object))
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.and_then(|map| map.get(key))
    }

    fn text(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }

    fn count(&self, key: &str, default: u64) -> u64 {
        match self.get(key) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
                .unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    fn position(&self, key: &str, default: u32) -> u32 {
        u32::try_from(self.count(key, u64::from(default))).unwrap_or(default)
    }

    fn timestamp(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(default),
            _ => default,
        }
    }
}

/// Heal any JSON value into a fully-populated [`AppData`]. Never fails.
pub fn merge(partial: &Value) -> AppData {
    let defaults = default_app_data();
    if !partial.is_object() {
        if !partial.is_null() {
            tracing::debug!("Discarding non-object upstream value");
        }
        return defaults;
    }
    let root = Fields::of(Some(partial));

    AppData {
        profile: heal_profile(Fields::of(root.get("profile")), &defaults.profile),
        content: heal_content(Fields::of(root.get("content")), &defaults.content),
        stats: heal_stats(Fields::of(root.get("stats")), &defaults.stats),
        schedule: heal_sequence(root.get("schedule"), &defaults.schedule, "s", heal_schedule_item),
        rank: heal_leaderboard(root.get("rank"), &defaults.rank, "r"),
        moderators: heal_leaderboard(root.get("moderators"), &defaults.moderators, "m"),
        gallery: heal_sequence(root.get("gallery"), &defaults.gallery, "g", heal_gallery_item),
        last_updated: root.timestamp(LAST_UPDATED_KEY, defaults.last_updated),
    }
}

/// Heal an optional upstream value, using the defaults when it is absent.
pub fn merge_or_default(partial: Option<&Value>) -> AppData {
    match partial {
        Some(value) => merge(value),
        None => default_app_data(),
    }
}

fn heal_profile(f: Fields<'_>, d: &Profile) -> Profile {
    Profile {
        name: f.text("name", &d.name),
        tagline: f.text("tagline", &d.tagline),
        avatar: f.text("avatar", &d.avatar),
        youtube_url: f.text("youtubeUrl", &d.youtube_url),
        tiktok_url: f.text("tiktokUrl", &d.tiktok_url),
        discord_url: f.text("discordUrl", &d.discord_url),
        store_url: f.text("storeUrl", &d.store_url),
        second_store_url: f.text("secondStoreUrl", &d.second_store_url),
        support_url: f.text("supportUrl", &d.support_url),
    }
}

fn heal_content(f: Fields<'_>, d: &Content) -> Content {
    Content {
        youtube_id: f.text("youtubeId", &d.youtube_id),
        tiktok_url: f.text("tiktokUrl", &d.tiktok_url),
    }
}

fn heal_stats(f: Fields<'_>, d: &Stats) -> Stats {
    Stats {
        subscribers: f.count("subscribers", d.subscribers),
        followers: f.count("followers", d.followers),
        total_views: f.count("totalViews", d.total_views),
    }
}

fn heal_schedule_item(f: Fields<'_>, _index: usize) -> ScheduleItem {
    ScheduleItem {
        id: f.text("id", ""),
        day: f.text("day", ""),
        activity: f.text("activity", ""),
        time: f.text("time", ""),
        badge: f.text("badge", ""),
    }
}

fn heal_gallery_item(f: Fields<'_>, _index: usize) -> GalleryItem {
    GalleryItem {
        id: f.text("id", ""),
        src: f.text("src", ""),
    }
}

fn heal_rank_item(f: Fields<'_>, base: Option<&RankItem>, index: usize) -> RankItem {
    let position = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
    match base {
        Some(d) => RankItem {
            id: f.text("id", &d.id),
            rank: f.position("rank", d.rank),
            name: f.text("name", &d.name),
            youtube_handle: f.text("youtubeHandle", &d.youtube_handle),
            points: f.count("points", d.points),
            avatar: f.text("avatar", &d.avatar),
        },
        None => RankItem {
            id: f.text("id", ""),
            rank: f.position("rank", position),
            name: f.text("name", ""),
            youtube_handle: f.text("youtubeHandle", ""),
            points: f.count("points", 0),
            avatar: f.text("avatar", ""),
        },
    }
}

/// Object-shaped upstream items of a sequence with their real index, in
/// index order. Holes (nulls, missing keys, non-objects) are left out
/// without shifting later items.
///
/// Returns `None` when the sequence is absent, empty or not a sequence.
fn upstream_items(value: Option<&Value>) -> Option<Vec<(usize, &Map<String, Value>)>> {
    let items: Vec<(usize, &Map<String, Value>)> = match value? {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| Some((i, item.as_object()?)))
            .collect(),
        Value::Object(keyed) => {
            let mut indexed: Vec<(usize, &Value)> = Vec::new();
            let mut named: Vec<&Value> = Vec::new();
            for (key, item) in keyed {
                match key.parse::<usize>() {
                    Ok(i) => indexed.push((i, item)),
                    Err(_) => named.push(item),
                }
            }
            indexed.sort_by_key(|(i, _)| *i);
            // Non-index keys follow the indexed entries
            let next = indexed.last().map_or(0, |(i, _)| i.saturating_add(1));
            indexed.extend(
                named
                    .into_iter()
                    .enumerate()
                    .map(|(n, item)| (next.saturating_add(n), item)),
            );
            indexed
                .into_iter()
                .filter_map(|(i, item)| Some((i, item.as_object()?)))
                .collect()
        }
        _ => return None,
    };
    (!items.is_empty()).then_some(items)
}

fn heal_sequence<T, F>(value: Option<&Value>, defaults: &[T], prefix: &str, heal: F) -> Vec<T>
where
    T: Clone + HasId,
    F: Fn(Fields<'_>, usize) -> T,
{
    let Some(items) = upstream_items(value) else {
        return defaults.to_vec();
    };
    let mut healed: Vec<T> = items
        .into_iter()
        .map(|(i, item)| heal(Fields(Some(item)), i))
        .collect();
    ensure_unique_ids(&mut healed, prefix);
    healed
}

/// Like [`heal_sequence`], but item `i` is overlaid on default item `i` and
/// a hole keeps the default item of its position.
fn heal_leaderboard(value: Option<&Value>, defaults: &[RankItem], prefix: &str) -> Vec<RankItem> {
    let Some(items) = upstream_items(value) else {
        return defaults.to_vec();
    };
    let mut healed = Vec::with_capacity(items.len());
    let mut next = 0;
    for (index, item) in items {
        healed.extend(defaults.iter().take(index).skip(next).cloned());
        healed.push(heal_rank_item(Fields(Some(item)), defaults.get(index), index));
        next = index.saturating_add(1);
    }
    ensure_unique_ids(&mut healed, prefix);
    healed
}

/// Items that carry an opaque identity.
trait HasId {
    fn id_mut(&mut self) -> &mut String;
}

impl HasId for ScheduleItem {
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
}

impl HasId for RankItem {
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
}

impl HasId for GalleryItem {
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
}

/// Replace empty or repeated ids with `<prefix><n>`, the first free `n`.
fn ensure_unique_ids<T: HasId>(items: &mut [T], prefix: &str) {
    let mut taken = HashSet::new();
    let mut needs_id = Vec::new();
    for (i, item) in items.iter_mut().enumerate() {
        let id = item.id_mut();
        if id.is_empty() || !taken.insert(id.clone()) {
            needs_id.push(i);
        }
    }
    if needs_id.is_empty() {
        return;
    }

    tracing::debug!(count = needs_id.len(), prefix, "Healing missing or duplicate item ids");
    let mut n = 1usize;
    for i in needs_id {
        let fresh = loop {
            let candidate = format!("{}{}", prefix, n);
            n += 1;
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(fresh.clone());
        *items[i].id_mut() = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn remerge(data: &AppData) -> AppData {
        merge(&serde_json::to_value(data).unwrap())
    }

    #[test]
    fn test_null_and_garbage_yield_defaults() {
        assert_eq!(merge(&Value::Null), default_app_data());
        assert_eq!(merge(&json!("corrupt")), default_app_data());
        assert_eq!(merge(&json!([1, 2, 3])), default_app_data());
        assert_eq!(merge(&json!({})), default_app_data());
        assert_eq!(merge_or_default(None), default_app_data());
    }

    #[test]
    fn test_singleton_overlay_keeps_missing_fields() {
        let merged = merge(&json!({
            "profile": { "name": "Other", "unknownField": true },
            "stats": { "followers": 7, "totalViews": "not a number" }
        }));
        let defaults = default_app_data();

        assert_eq!(merged.profile.name, "Other");
        assert_eq!(merged.profile.tagline, defaults.profile.tagline);
        assert_eq!(merged.stats.followers, 7);
        assert_eq!(merged.stats.subscribers, defaults.stats.subscribers);
        assert_eq!(merged.stats.total_views, defaults.stats.total_views);
    }

    #[test]
    fn test_mistyped_record_falls_back() {
        let merged = merge(&json!({ "content": 42, "profile": null }));
        let defaults = default_app_data();
        assert_eq!(merged.content, defaults.content);
        assert_eq!(merged.profile, defaults.profile);
    }

    #[test]
    fn test_legacy_payload_without_moderators() {
        let merged = merge(&json!({
            "profile": { "name": "Legacy" },
            "schedule": [{ "id": "a", "day": "Senin", "activity": "x", "time": "1", "badge": "b" }],
            "gallery": [{ "id": "p", "src": "pic.png" }],
            "_lastUpdated": 1700000000000i64
        }));
        let defaults = default_app_data();

        assert_eq!(merged.moderators, defaults.moderators);
        assert_eq!(merged.profile.name, "Legacy");
        assert_eq!(merged.schedule.len(), 1);
        assert_eq!(merged.schedule[0].id, "a");
        assert_eq!(merged.gallery[0].src, "pic.png");
        assert_eq!(merged.last_updated, 1_700_000_000_000);
    }

    #[test]
    fn test_sequences_replace_wholesale() {
        let merged = merge(&json!({
            "schedule": [{ "id": "x", "day": "Senin" }]
        }));
        assert_eq!(merged.schedule.len(), 1);
        assert_eq!(merged.schedule[0].activity, "");
    }

    #[test]
    fn test_empty_sequence_uses_defaults() {
        let merged = merge(&json!({ "gallery": [] }));
        assert_eq!(merged.gallery, default_app_data().gallery);
    }

    #[test]
    fn test_leaderboard_items_overlay_defaults_by_index() {
        let merged = merge(&json!({
            "rank": [
                { "id": "r1", "points": 1 },
                { "name": "NoId" },
                { "id": "x9", "name": "Newcomer" },
                { "id": "x10" },
                { "id": "x11" },
                { "id": "x12", "name": "Extra" }
            ]
        }));
        let defaults = default_app_data();

        assert_eq!(merged.rank.len(), 6);
        assert_eq!(merged.rank[0].name, defaults.rank[0].name);
        assert_eq!(merged.rank[0].points, 1);
        // Missing id and fields come from default item at the same index
        assert_eq!(merged.rank[1].id, "r2");
        assert_eq!(merged.rank[1].name, "NoId");
        assert_eq!(merged.rank[1].points, defaults.rank[1].points);
        // No default at index 5: blank base, rank from position
        assert_eq!(merged.rank[5].name, "Extra");
        assert_eq!(merged.rank[5].rank, 6);
        assert_eq!(merged.rank[5].points, 0);
    }

    #[test]
    fn test_leaderboard_hole_keeps_position() {
        let defaults = default_app_data();
        let merged = merge(&json!({ "rank": [null, { "points": 7 }] }));

        assert_eq!(merged.rank.len(), 2);
        assert_eq!(merged.rank[0], defaults.rank[0]);
        assert_eq!(merged.rank[1].id, defaults.rank[1].id);
        assert_eq!(merged.rank[1].name, defaults.rank[1].name);
        assert_eq!(merged.rank[1].avatar, defaults.rank[1].avatar);
        assert_eq!(merged.rank[1].points, 7);
    }

    #[test]
    fn test_keyed_leaderboard_uses_key_as_index() {
        let defaults = default_app_data();
        let merged = merge(&json!({ "moderators": { "2": { "name": "Third" } } }));

        let ids: Vec<&str> = merged.moderators.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(merged.moderators[1], defaults.moderators[1]);
        assert_eq!(merged.moderators[2].name, "Third");
        assert_eq!(merged.moderators[2].rank, defaults.moderators[2].rank);
        assert_eq!(remerge(&merged), merged);
    }

    #[test]
    fn test_sequence_hole_does_not_shift_items() {
        let merged = merge(&json!({
            "gallery": [null, { "src": "b" }, { "id": "c", "src": "c" }]
        }));
        assert_eq!(merged.gallery.len(), 2);
        assert_eq!(merged.gallery[0].src, "b");
        assert_eq!(merged.gallery[1].id, "c");
    }

    #[test]
    fn test_keyed_sequence_is_ordered_by_index() {
        let merged = merge(&json!({
            "gallery": {
                "10": { "id": "late", "src": "c" },
                "2": { "id": "mid", "src": "b" },
                "0": { "id": "first", "src": "a" }
            }
        }));
        let ids: Vec<&str> = merged.gallery.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "mid", "late"]);
    }

    #[test]
    fn test_duplicate_ids_are_healed() {
        let merged = merge(&json!({
            "gallery": [
                { "id": "g1", "src": "a" },
                { "id": "g1", "src": "b" },
                { "src": "c" }
            ]
        }));
        let ids: Vec<&str> = merged.gallery.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let inputs = vec![
            Value::Null,
            json!({}),
            json!({ "rank": [{ "name": "a" }, { "id": "r1" }], "stats": { "followers": 1.9 } }),
            json!({ "moderators": { "3": { "name": "z" } }, "profile": { "name": 5 } }),
            json!({ "rank": [null, { "points": 7 }, null, { "id": "r1" }] }),
            serde_json::to_value(default_app_data()).unwrap(),
        ];
        for input in inputs {
            let once = merge(&input);
            assert_eq!(remerge(&once), once, "not idempotent for {}", input);
        }
    }
}
