pub mod sqlite;

use std::collections::HashMap;

use crate::app::Result;
use crate::domain::{FeedSnapshot, HistoryEntry, Settings, SettingsPatch, VideoKind};

pub use sqlite::SqliteStore;

/// Persistence for the fetched snapshot and the manual-import override.
///
/// The two records share a shape but have independent lifecycles: the
/// fetched snapshot expires by TTL, the manual override only by an
/// explicit clear.
pub trait SnapshotRepository {
    fn save_snapshot(&self, snapshot: &FeedSnapshot) -> Result<()>;
    /// TTL is enforced here: an expired snapshot reads as `None` even
    /// though its rows are still on disk.
    fn snapshot(&self) -> Result<Option<FeedSnapshot>>;
    /// Escape hatch for the network-failure fallback; ignores the TTL.
    fn snapshot_ignoring_ttl(&self) -> Result<Option<FeedSnapshot>>;
    fn clear_snapshot(&self) -> Result<()>;

    fn save_manual(&self, snapshot: &FeedSnapshot) -> Result<()>;
    fn manual(&self) -> Result<Option<FeedSnapshot>>;
    fn clear_manual(&self) -> Result<()>;
}

/// Persistent map from video id to its resolved kind. Append-only except
/// for the explicit clear; `Unknown` is never stored.
pub trait ClassificationRepository {
    fn record_kind(&self, video_id: &str, kind: VideoKind) -> Result<()>;
    fn kind_of(&self, video_id: &str) -> Result<Option<VideoKind>>;
    fn all_kinds(&self) -> Result<HashMap<String, VideoKind>>;
    fn clear_kinds(&self) -> Result<()>;
}

/// Watch history: newest first, deduplicated by video id, capped at
/// [`crate::domain::MAX_HISTORY_ENTRIES`] entries.
pub trait HistoryRepository {
    fn record_watch(&self, entry: &HistoryEntry) -> Result<()>;
    fn history(&self) -> Result<Vec<HistoryEntry>>;
    fn clear_history(&self) -> Result<()>;
}

/// User settings, merged over defaults key-by-key on read so corrupt or
/// missing rows fall back per key instead of failing the whole record.
pub trait SettingsRepository {
    fn settings(&self) -> Result<Settings>;
    fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings>;
}
