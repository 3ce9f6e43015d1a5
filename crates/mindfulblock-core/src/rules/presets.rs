//! Built-in rule bundles.

use serde::Serialize;

use super::mode::BlockMode;
use super::store::ImportEntry;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub group: &'static str,
    pub domains: &'static [&'static str],
}

impl Preset {
    /// Import entries for this preset, all in `mode`.
    pub fn entries(&self, mode: BlockMode) -> Vec<ImportEntry> {
        self.domains
            .iter()
            .map(|d| ImportEntry {
                domain: d.to_string(),
                group: Some(self.group.to_string()),
                mode,
            })
            .collect()
    }
}

pub const PRESETS: &[Preset] = &[
    Preset {
        id: "social_media",
        name: "Social Media Detox",
        description: "Infinite-scroll feeds",
        group: "Social Media",
        domains: &[
            "facebook.com",
            "twitter.com",
            "x.com",
            "instagram.com",
            "tiktok.com",
            "reddit.com",
            "linkedin.com",
            "pinterest.com",
            "threads.net",
            "tumblr.com",
            "9gag.com",
        ],
    },
    Preset {
        id: "entertainment",
        name: "Video & Streaming",
        description: "Video platforms and streaming services",
        group: "Entertainment",
        domains: &[
            "youtube.com",
            "netflix.com",
            "twitch.tv",
            "vimeo.com",
            "dailymotion.com",
        ],
    },
    Preset {
        id: "news_vn",
        name: "News (VN)",
        description: "Popular Vietnamese news portals",
        group: "News",
        domains: &[
            "vnexpress.net",
            "kenh14.vn",
            "zingnews.vn",
            "znews.vn",
            "dantri.com.vn",
            "tuoitre.vn",
            "thanhnien.vn",
            "24h.com.vn",
            "baomoi.com",
            "vietnamnet.vn",
            "soha.vn",
        ],
    },
    Preset {
        id: "shopping",
        name: "Shopping Spree",
        description: "Marketplaces that invite impulse buying",
        group: "Shopping",
        domains: &[
            "shopee.vn",
            "lazada.vn",
            "tiki.vn",
            "sendo.vn",
            "amazon.com",
            "ebay.com",
            "etsy.com",
            "alibaba.com",
            "aliexpress.com",
            "taobao.com",
            "1688.com",
        ],
    },
    Preset {
        id: "games",
        name: "Online Games",
        description: "Web games and gaming portals",
        group: "Games",
        domains: &[
            "roblox.com",
            "gamevui.vn",
            "y8.com",
            "poki.com",
            "crazygames.com",
            "itch.io",
            "steampowered.com",
            "epicgames.com",
            "riotgames.com",
            "garena.vn",
            "uplay.ubisoft.com",
        ],
    },
    Preset {
        id: "adult",
        name: "Adult Content",
        description: "Common adult content sites",
        group: "Adult",
        domains: &[
            "pornhub.com",
            "xvideos.com",
            "xnxx.com",
            "xhamster.com",
            "youporn.com",
            "redtube.com",
            "onlyfans.com",
            "stripchat.com",
            "chaturbate.com",
            "bongacams.com",
        ],
    },
];

pub fn find(id: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.id.eq_ignore_ascii_case(id.trim()))
}
