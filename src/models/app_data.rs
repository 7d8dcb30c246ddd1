//! The page aggregate and its collection operations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Content, GalleryItem, LeaderboardEdit, Profile, RankItem, ScheduleItem, Stats};
use crate::errors::{SyncError, SyncResult};

/// Wire name of the write timestamp.
pub const LAST_UPDATED_KEY: &str = "_lastUpdated";

/// Top-level fields pushed to the remote store on every save.
pub const EDITABLE_FIELDS: [&str; 7] = [
    "profile",
    "content",
    "stats",
    "schedule",
    "rank",
    "moderators",
    "gallery",
];

/// The complete persisted content of the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppData {
    pub profile: Profile,
    pub content: Content,
    pub stats: Stats,
    pub schedule: Vec<ScheduleItem>,
    pub rank: Vec<RankItem>,
    pub moderators: Vec<RankItem>,
    pub gallery: Vec<GalleryItem>,
    /// Milliseconds since the Unix epoch of the last write by this client.
    #[serde(rename = "_lastUpdated", default)]
    pub last_updated: i64,
}

/// The ordered collections of [`AppData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Schedule,
    Rank,
    Moderators,
    Gallery,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Schedule => "schedule",
            CollectionKind::Rank => "rank",
            CollectionKind::Moderators => "moderators",
            CollectionKind::Gallery => "gallery",
        }
    }

    /// Whether items of this collection carry a display `rank`.
    pub fn is_leaderboard(&self) -> bool {
        matches!(self, CollectionKind::Rank | CollectionKind::Moderators)
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn new_item_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn out_of_range(kind: CollectionKind, index: usize, len: usize) -> SyncError {
    SyncError::NotFound(format!(
        "{} item {} not found (collection has {} items)",
        kind.as_str(),
        index,
        len
    ))
}

/// Rewrite `rank` to the contiguous sequence 1..=N in array order.
pub fn renumber(items: &mut [RankItem]) {
    for (i, item) in items.iter_mut().enumerate() {
        item.rank = i as u32 + 1;
    }
}

impl AppData {
    /// Number of items in a collection.
    pub fn len_of(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::Schedule => self.schedule.len(),
            CollectionKind::Rank => self.rank.len(),
            CollectionKind::Moderators => self.moderators.len(),
            CollectionKind::Gallery => self.gallery.len(),
        }
    }

    fn leaderboard_mut(&mut self, kind: CollectionKind) -> Option<&mut Vec<RankItem>> {
        match kind {
            CollectionKind::Rank => Some(&mut self.rank),
            CollectionKind::Moderators => Some(&mut self.moderators),
            _ => None,
        }
    }

    /// Append a placeholder item and return its freshly assigned id.
    pub fn add_item(&mut self, kind: CollectionKind) -> String {
        let id = new_item_id();
        match kind {
            CollectionKind::Schedule => self.schedule.push(ScheduleItem {
                id: id.clone(),
                day: "Hari Baru".to_string(),
                activity: "Isi kegiatan...".to_string(),
                time: "00:00".to_string(),
                badge: "Live".to_string(),
            }),
            CollectionKind::Rank => {
                let rank = self.rank.len() as u32 + 1;
                self.rank.push(RankItem {
                    id: id.clone(),
                    rank,
                    name: "Nama Member".to_string(),
                    youtube_handle: String::new(),
                    points: 0,
                    avatar: "https://ui-avatars.com/api/?name=Member&background=random"
                        .to_string(),
                });
            }
            CollectionKind::Moderators => {
                let rank = self.moderators.len() as u32 + 1;
                self.moderators.push(RankItem {
                    id: id.clone(),
                    rank,
                    name: "Nama Moderator".to_string(),
                    youtube_handle: String::new(),
                    points: 0,
                    avatar: "https://ui-avatars.com/api/?name=Mod&background=random".to_string(),
                });
            }
            CollectionKind::Gallery => {
                let seed = uuid::Uuid::new_v4().as_u128() % 1000;
                self.gallery.push(GalleryItem {
                    id: id.clone(),
                    src: format!("https://picsum.photos/400/300?random={}", seed),
                });
            }
        }
        id
    }

    /// Remove the item at `index`. Leaderboards are renumbered afterwards.
    pub fn delete_item(&mut self, kind: CollectionKind, index: usize) -> SyncResult<()> {
        let len = self.len_of(kind);
        if index >= len {
            return Err(out_of_range(kind, index, len));
        }

        match kind {
            CollectionKind::Schedule => {
                self.schedule.remove(index);
            }
            CollectionKind::Gallery => {
                self.gallery.remove(index);
            }
            CollectionKind::Rank | CollectionKind::Moderators => {
                if let Some(items) = self.leaderboard_mut(kind) {
                    items.remove(index);
                    renumber(items);
                }
            }
        }
        Ok(())
    }

    /// Edit a schedule entry in place. The item keeps its id.
    pub fn edit_schedule<F>(&mut self, index: usize, edit: F) -> SyncResult<()>
    where
        F: FnOnce(&mut ScheduleItem),
    {
        let len = self.schedule.len();
        let item = self
            .schedule
            .get_mut(index)
            .ok_or_else(|| out_of_range(CollectionKind::Schedule, index, len))?;
        let id = item.id.clone();
        edit(item);
        item.id = id;
        Ok(())
    }

    /// Edit a gallery entry in place. The item keeps its id.
    pub fn edit_gallery<F>(&mut self, index: usize, edit: F) -> SyncResult<()>
    where
        F: FnOnce(&mut GalleryItem),
    {
        let len = self.gallery.len();
        let item = self
            .gallery
            .get_mut(index)
            .ok_or_else(|| out_of_range(CollectionKind::Gallery, index, len))?;
        let id = item.id.clone();
        edit(item);
        item.id = id;
        Ok(())
    }

    /// Edit a leaderboard entry.
    pub fn edit_leaderboard(
        &mut self,
        kind: CollectionKind,
        index: usize,
        edit: LeaderboardEdit,
    ) -> SyncResult<()> {
        let len = self.len_of(kind);
        let items = self.leaderboard_mut(kind).ok_or_else(|| {
            SyncError::NotFound(format!("{} is not a leaderboard", kind.as_str()))
        })?;
        let item = items
            .get_mut(index)
            .ok_or_else(|| out_of_range(kind, index, len))?;
        item.apply(edit);
        Ok(())
    }

    /// The fields sent with a partial remote write, timestamp included.
    pub fn editable_fields(&self) -> SyncResult<Map<String, Value>> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => return Err(SyncError::MalformedData("AppData is not an object".into())),
        };
        fields.retain(|key, _| EDITABLE_FIELDS.contains(&key.as_str()) || key == LAST_UPDATED_KEY);
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::default_app_data;

    fn ranks(items: &[RankItem]) -> Vec<u32> {
        items.iter().map(|i| i.rank).collect()
    }

    #[test]
    fn test_delete_renumbers_leaderboard() {
        let mut data = default_app_data();
        let removed = data.rank[1].id.clone();

        data.delete_item(CollectionKind::Rank, 1).unwrap();

        assert_eq!(ranks(&data.rank), vec![1, 2, 3, 4]);
        assert!(data.rank.iter().all(|r| r.id != removed));
        // Points are scores, not positions
        assert_eq!(data.rank[1].points, 11000);
    }

    #[test]
    fn test_successive_deletes_stay_contiguous() {
        let mut data = default_app_data();
        for _ in 0..3 {
            data.add_item(CollectionKind::Moderators);
        }
        assert_eq!(data.moderators.len(), 7);

        data.delete_item(CollectionKind::Moderators, 2).unwrap();
        data.delete_item(CollectionKind::Moderators, 4).unwrap();

        assert_eq!(ranks(&data.moderators), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_delete_out_of_range() {
        let mut data = default_app_data();
        let err = data.delete_item(CollectionKind::Gallery, 99).unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
        assert_eq!(data.gallery.len(), 4);
    }

    #[test]
    fn test_add_item_assigns_unique_ids_and_rank() {
        let mut data = default_app_data();
        let a = data.add_item(CollectionKind::Rank);
        let b = data.add_item(CollectionKind::Rank);

        assert_ne!(a, b);
        assert_eq!(data.rank.last().unwrap().rank, 7);
        assert_eq!(data.rank[5].id, a);
    }

    #[test]
    fn test_delete_schedule_does_not_touch_others() {
        let mut data = default_app_data();
        data.delete_item(CollectionKind::Schedule, 0).unwrap();
        assert_eq!(data.schedule.len(), 6);
        assert_eq!(data.schedule[0].id, "2");
        assert_eq!(ranks(&data.rank), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_edit_schedule_keeps_id() {
        let mut data = default_app_data();
        data.edit_schedule(0, |item| {
            item.id = "hijacked".into();
            item.activity = "Build Battle".into();
        })
        .unwrap();

        assert_eq!(data.schedule[0].id, "1");
        assert_eq!(data.schedule[0].activity, "Build Battle");
    }

    #[test]
    fn test_edit_leaderboard_rejects_plain_collection() {
        let mut data = default_app_data();
        let err = data
            .edit_leaderboard(CollectionKind::Gallery, 0, LeaderboardEdit::default())
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[test]
    fn test_editable_fields() {
        let mut data = default_app_data();
        data.last_updated = 77;
        let fields = data.editable_fields().unwrap();

        assert_eq!(fields.len(), EDITABLE_FIELDS.len() + 1);
        assert_eq!(fields[LAST_UPDATED_KEY], 77);
        assert!(fields["moderators"].is_array());
    }
}
