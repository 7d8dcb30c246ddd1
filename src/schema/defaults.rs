//! Compiled default content of the page.

use crate::models::{AppData, Content, GalleryItem, Profile, RankItem, ScheduleItem, Stats};

fn schedule(id: &str, day: &str, activity: &str, time: &str, badge: &str) -> ScheduleItem {
    ScheduleItem {
        id: id.to_string(),
        day: day.to_string(),
        activity: activity.to_string(),
        time: time.to_string(),
        badge: badge.to_string(),
    }
}

fn ranked(id: &str, rank: u32, name: &str, handle: &str, points: u64, seed: u32) -> RankItem {
    RankItem {
        id: id.to_string(),
        rank,
        name: name.to_string(),
        youtube_handle: handle.to_string(),
        points,
        avatar: format!("https://picsum.photos/50/50?random={}", seed),
    }
}

fn picture(id: &str, seed: u32) -> GalleryItem {
    GalleryItem {
        id: id.to_string(),
        src: format!("https://picsum.photos/400/300?random={}", seed),
    }
}

/// Build the fully-populated default [`AppData`].
///
/// `last_updated` is zero so that defaults compare equal however often they
/// are built.
pub fn default_app_data() -> AppData {
    AppData {
        profile: Profile {
            name: "AdmudCraft".to_string(),
            tagline: "Digital Crafter & Redstone Engineer".to_string(),
            avatar: "https://z-cdn-media.chatglm.cn/files/4ff9bcd3-5fbb-4f00-a4d1-ce066b56a0a1.jpg"
                .to_string(),
            youtube_url: "https://youtube.com/@admudcraft".to_string(),
            tiktok_url: "https://tiktok.com/@admudcraft".to_string(),
            discord_url: "https://discord.gg/4YrY3ruMvg".to_string(),
            store_url: "https://adhost-phi.vercel.app".to_string(),
            second_store_url: "https://billing.mineidhost.com?ref=Admud-Jawa".to_string(),
            support_url: "https://sociabuzz.com/admud/tribe".to_string(),
        },
        content: Content {
            youtube_id: "MmB9b5njVbA".to_string(),
            tiktok_url: "https://www.tiktok.com/@admudcraft/video/7359154398421234955".to_string(),
        },
        stats: Stats {
            subscribers: 12_500,
            followers: 45_000,
            total_views: 1_200_000,
        },
        schedule: vec![
            schedule("1", "Senin", "Survival Minecraft", "19:00 WIB", "Live"),
            schedule("2", "Selasa", "Off Stream / Editing", "-", "Off"),
            schedule("3", "Rabu", "Mabar Server", "20:00 WIB", "Mabar"),
            schedule("4", "Kamis", "Review Map Subscriber", "19:30 WIB", "Live"),
            schedule("5", "Jumat", "Jumat Berkah (Giveaway)", "16:00 WIB", "Event"),
            schedule("6", "Sabtu", "Marathon Stream", "13:00 WIB", "Long"),
            schedule("7", "Minggu", "Istirahat / Random Game", "Tentative", "Chill"),
        ],
        rank: vec![
            ranked("r1", 1, "SultanCraft_99", "@sultancraft", 15_000, 1),
            ranked("r2", 2, "MinerPro_ID", "@minerpro", 12_400, 2),
            ranked("r3", 3, "RedstoneMaster", "@redstone", 11_000, 3),
            ranked("r4", 4, "CreeperHugger", "@creeper", 9_500, 4),
            ranked("r5", 5, "DiamondHunter", "@diamond", 8_200, 5),
        ],
        moderators: vec![
            ranked("m1", 1, "Admin_Ganteng", "@admin_ganteng", 99_999, 20),
            ranked("m2", 2, "Bot_Police", "@bot_police", 8_888, 21),
            ranked("m3", 3, "Helper_Santuy", "@helper_santuy", 5_555, 22),
            ranked("m4", 4, "Mod_Baru_Rekrut", "@mod_baru", 3_000, 23),
        ],
        gallery: vec![
            picture("g1", 10),
            picture("g2", 11),
            picture("g3", 12),
            picture("g4", 13),
        ],
        last_updated: 0,
    }
}
