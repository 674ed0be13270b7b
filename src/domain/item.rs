use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Presentation format of a feed entry, refined over time: every item
/// starts `Unknown` and may be promoted to `Video` or `Short`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    Video,
    Short,
    Unknown,
}

impl VideoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoKind::Video => "video",
            VideoKind::Short => "short",
            VideoKind::Unknown => "unknown",
        }
    }

    /// Parse a stored kind string. Anything unrecognized maps to `Unknown`
    /// so a corrupt row never poisons a read.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "video" => VideoKind::Video,
            "short" => VideoKind::Short,
            _ => VideoKind::Unknown,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, VideoKind::Unknown)
    }
}

impl std::fmt::Display for VideoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub video_id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub author_name: String,
    pub thumbnail_url: String,
    pub link_url: String,
    pub kind: VideoKind,
    pub category: Option<String>,
    pub keywords: Vec<String>,
}

impl FeedItem {
    /// Build an item with the defaults the feed may omit: author falls back
    /// to `"Unknown"`, the thumbnail to the conventional ytimg template.
    pub fn new(
        video_id: impl Into<String>,
        title: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        let video_id = video_id.into();
        Self {
            thumbnail_url: default_thumbnail_url(&video_id),
            link_url: watch_url(&video_id),
            title: title.into(),
            published_at,
            author_name: "Unknown".into(),
            kind: VideoKind::Unknown,
            category: None,
            keywords: Vec::new(),
            video_id,
        }
    }

    /// Link appropriate for the item's kind: shorts get the shorts URL.
    pub fn display_link(&self) -> String {
        match self.kind {
            VideoKind::Short => shorts_url(&self.video_id),
            _ => self.link_url.clone(),
        }
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

pub fn shorts_url(video_id: &str) -> String {
    format!("https://www.youtube.com/shorts/{video_id}")
}

pub fn embed_url(video_id: &str, autoplay: bool) -> String {
    let autoplay = if autoplay { 1 } else { 0 };
    format!("https://www.youtube.com/embed/{video_id}?rel=0&modestbranding=1&autoplay={autoplay}")
}

pub fn default_thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")
}

pub fn channel_feed_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/feeds/videos.xml?channel_id={channel_id}")
}
