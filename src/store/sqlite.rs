use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, ViewdeckError};
use crate::domain::{
    FeedItem, FeedSnapshot, HistoryEntry, Settings, SettingsPatch, Theme, VideoKind,
    MAX_HISTORY_ENTRIES,
};
use crate::store::{
    ClassificationRepository, HistoryRepository, SettingsRepository, SnapshotRepository,
};

const ORIGIN_FETCHED: &str = "fetched";
const ORIGIN_MANUAL: &str = "manual";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    default_settings: Settings,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_defaults(path, Settings::default())
    }

    pub fn with_defaults<P: AsRef<Path>>(path: P, defaults: Settings) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            default_settings: defaults,
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            default_settings: Settings::default(),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ViewdeckError::Storage(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| ViewdeckError::Storage(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn write_snapshot(&self, origin: &str, snapshot: &FeedSnapshot) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM snapshot_items WHERE origin = ?1", params![origin])?;
        tx.execute("DELETE FROM snapshots WHERE origin = ?1", params![origin])?;
        tx.execute(
            "INSERT INTO snapshots (origin, captured_at, ttl_ms, channel_title)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                origin,
                snapshot.captured_at.to_rfc3339(),
                snapshot.ttl.num_milliseconds(),
                snapshot.channel_title
            ],
        )?;

        for (position, item) in snapshot.items.iter().enumerate() {
            let keywords =
                serde_json::to_string(&item.keywords).unwrap_or_else(|_| "[]".to_string());
            tx.execute(
                "INSERT INTO snapshot_items
                 (origin, position, video_id, title, published_at, author_name,
                  thumbnail_url, link_url, kind, category, keywords)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    origin,
                    position as i64,
                    item.video_id,
                    item.title,
                    item.published_at.to_rfc3339(),
                    item.author_name,
                    item.thumbnail_url,
                    item.link_url,
                    item.kind.as_str(),
                    item.category,
                    keywords
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn read_snapshot(&self, origin: &str, enforce_ttl: bool) -> Result<Option<FeedSnapshot>> {
        let conn = self.conn()?;

        let meta = conn
            .query_row(
                "SELECT captured_at, ttl_ms, channel_title FROM snapshots WHERE origin = ?1",
                params![origin],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((captured_at, ttl_ms, channel_title)) = meta else {
            return Ok(None);
        };
        // An unreadable capture timestamp makes freshness undecidable;
        // treat the record as absent.
        let Some(captured_at) = Self::parse_datetime(&captured_at) else {
            return Ok(None);
        };
        let ttl = Duration::milliseconds(ttl_ms);

        let mut snapshot = FeedSnapshot {
            items: Vec::new(),
            channel_title,
            captured_at,
            ttl,
        };
        if enforce_ttl && snapshot.is_expired() {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            "SELECT video_id, title, published_at, author_name, thumbnail_url,
                    link_url, kind, category, keywords
             FROM snapshot_items WHERE origin = ?1 ORDER BY position",
        )?;
        snapshot.items = stmt
            .query_map(params![origin], Self::item_from_row)?
            .filter_map(std::result::Result::ok)
            .flatten()
            .collect();

        Ok(Some(snapshot))
    }

    /// Rows that fail to decode yield `None` and are dropped, so one bad
    /// row cannot take the whole snapshot down.
    fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Option<FeedItem>> {
        let video_id: String = row.get(0)?;
        let title: String = row.get(1)?;
        let published_at: String = row.get(2)?;
        let author_name: String = row.get(3)?;
        let thumbnail_url: String = row.get(4)?;
        let link_url: String = row.get(5)?;
        let kind: String = row.get(6)?;
        let category: Option<String> = row.get(7)?;
        let keywords: String = row.get(8)?;

        let Some(published_at) = Self::parse_datetime(&published_at) else {
            return Ok(None);
        };

        Ok(Some(FeedItem {
            video_id,
            title,
            published_at,
            author_name,
            thumbnail_url,
            link_url,
            kind: VideoKind::from_str_lossy(&kind),
            category,
            keywords: serde_json::from_str(&keywords).unwrap_or_default(),
        }))
    }
}

impl SnapshotRepository for SqliteStore {
    fn save_snapshot(&self, snapshot: &FeedSnapshot) -> Result<()> {
        self.write_snapshot(ORIGIN_FETCHED, snapshot)
    }

    fn snapshot(&self) -> Result<Option<FeedSnapshot>> {
        self.read_snapshot(ORIGIN_FETCHED, true)
    }

    fn snapshot_ignoring_ttl(&self) -> Result<Option<FeedSnapshot>> {
        self.read_snapshot(ORIGIN_FETCHED, false)
    }

    fn clear_snapshot(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM snapshot_items WHERE origin = ?1",
            params![ORIGIN_FETCHED],
        )?;
        conn.execute(
            "DELETE FROM snapshots WHERE origin = ?1",
            params![ORIGIN_FETCHED],
        )?;
        Ok(())
    }

    fn save_manual(&self, snapshot: &FeedSnapshot) -> Result<()> {
        self.write_snapshot(ORIGIN_MANUAL, snapshot)
    }

    fn manual(&self) -> Result<Option<FeedSnapshot>> {
        self.read_snapshot(ORIGIN_MANUAL, false)
    }

    fn clear_manual(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM snapshot_items WHERE origin = ?1",
            params![ORIGIN_MANUAL],
        )?;
        conn.execute(
            "DELETE FROM snapshots WHERE origin = ?1",
            params![ORIGIN_MANUAL],
        )?;
        Ok(())
    }
}

impl ClassificationRepository for SqliteStore {
    fn record_kind(&self, video_id: &str, kind: VideoKind) -> Result<()> {
        // The cache only ever holds resolved kinds.
        if !kind.is_resolved() {
            return Ok(());
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO classifications (video_id, kind, resolved_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(video_id) DO UPDATE SET kind = ?2, resolved_at = ?3",
            params![video_id, kind.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn kind_of(&self, video_id: &str) -> Result<Option<VideoKind>> {
        let conn = self.conn()?;
        let kind = conn
            .query_row(
                "SELECT kind FROM classifications WHERE video_id = ?1",
                params![video_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(kind
            .map(|k| VideoKind::from_str_lossy(&k))
            .filter(VideoKind::is_resolved))
    }

    fn all_kinds(&self) -> Result<HashMap<String, VideoKind>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT video_id, kind FROM classifications")?;
        let kinds = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    VideoKind::from_str_lossy(&row.get::<_, String>(1)?),
                ))
            })?
            .filter_map(std::result::Result::ok)
            .filter(|(_, kind)| kind.is_resolved())
            .collect();

        Ok(kinds)
    }

    fn clear_kinds(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM classifications", [])?;
        Ok(())
    }
}

impl HistoryRepository for SqliteStore {
    fn record_watch(&self, entry: &HistoryEntry) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        // REPLACE both dedupes by id and moves the entry to the front
        // (ordering is by watched_at).
        tx.execute(
            "INSERT OR REPLACE INTO history (video_id, watched_at, progress)
             VALUES (?1, ?2, ?3)",
            params![
                entry.video_id,
                entry.watched_at.to_rfc3339(),
                entry.progress
            ],
        )?;
        tx.execute(
            "DELETE FROM history WHERE video_id NOT IN
             (SELECT video_id FROM history ORDER BY watched_at DESC, rowid DESC LIMIT ?1)",
            params![MAX_HISTORY_ENTRIES as i64],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn history(&self) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT video_id, watched_at, progress FROM history
             ORDER BY watched_at DESC, rowid DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![MAX_HISTORY_ENTRIES as i64], |row| {
                let video_id: String = row.get(0)?;
                let watched_at: String = row.get(1)?;
                let progress: Option<f64> = row.get(2)?;
                Ok(Self::parse_datetime(&watched_at).map(|watched_at| HistoryEntry {
                    video_id,
                    watched_at,
                    progress,
                }))
            })?
            .filter_map(std::result::Result::ok)
            .flatten()
            .collect();

        Ok(entries)
    }

    fn clear_history(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM history", [])?;
        Ok(())
    }
}

impl SettingsRepository for SqliteStore {
    fn settings(&self) -> Result<Settings> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(std::result::Result::ok)
            .collect();

        let mut settings = self.default_settings;
        for (key, value) in rows {
            match key.as_str() {
                "theme" => {
                    if let Some(theme) = Theme::parse(&value) {
                        settings.theme = theme;
                    }
                }
                "autoplay" => {
                    if let Ok(autoplay) = value.parse() {
                        settings.autoplay = autoplay;
                    }
                }
                "ads_enabled" => {
                    if let Ok(ads_enabled) = value.parse() {
                        settings.ads_enabled = ads_enabled;
                    }
                }
                // Keys written by a newer or older build are left alone.
                _ => {}
            }
        }

        Ok(settings)
    }

    fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        let mut settings = self.settings()?;
        settings.apply(patch);

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for (key, value) in [
            ("theme", settings.theme.as_str().to_string()),
            ("autoplay", settings.autoplay.to_string()),
            ("ads_enabled", settings.ads_enabled.to_string()),
        ] {
            tx.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
        }
        tx.commit()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample_snapshot() -> FeedSnapshot {
        let mut items = Vec::new();
        for (id, title, day) in [("v1", "First", 1), ("v2", "Second", 2)] {
            let mut item = FeedItem::new(
                id,
                title,
                Utc.with_ymd_and_hms(2024, 2, day, 8, 0, 0).unwrap(),
            );
            item.keywords = vec!["python".into()];
            items.push(item);
        }
        FeedSnapshot::new(items, Some("Python Peak".into()), Duration::minutes(15))
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        store.save_snapshot(&sample_snapshot()).unwrap();

        let loaded = store.snapshot().unwrap().unwrap();
        assert_eq!(loaded.channel_title, Some("Python Peak".into()));
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].video_id, "v1");
        assert_eq!(loaded.items[0].keywords, vec!["python".to_string()]);
    }

    #[test]
    fn test_expired_snapshot_reads_absent() {
        let store = SqliteStore::in_memory().unwrap();
        let mut snap = sample_snapshot();
        snap.captured_at = Utc::now() - Duration::minutes(16);
        store.save_snapshot(&snap).unwrap();

        assert!(store.snapshot().unwrap().is_none());
        // The rows are still there for the stale fallback.
        let stale = store.snapshot_ignoring_ttl().unwrap().unwrap();
        assert_eq!(stale.items.len(), 2);
    }

    #[test]
    fn test_manual_and_fetched_are_independent() {
        let store = SqliteStore::in_memory().unwrap();
        store.save_snapshot(&sample_snapshot()).unwrap();

        let mut manual = sample_snapshot();
        manual.items.truncate(1);
        store.save_manual(&manual).unwrap();

        assert_eq!(store.snapshot().unwrap().unwrap().items.len(), 2);
        assert_eq!(store.manual().unwrap().unwrap().items.len(), 1);

        store.clear_manual().unwrap();
        assert!(store.manual().unwrap().is_none());
        assert!(store.snapshot().unwrap().is_some());
    }

    #[test]
    fn test_save_snapshot_replaces_previous() {
        let store = SqliteStore::in_memory().unwrap();
        store.save_snapshot(&sample_snapshot()).unwrap();

        let mut next = sample_snapshot();
        next.items.truncate(1);
        store.save_snapshot(&next).unwrap();

        assert_eq!(store.snapshot().unwrap().unwrap().items.len(), 1);
    }

    #[test]
    fn test_classification_roundtrip_and_unknown_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        store.record_kind("v1", VideoKind::Short).unwrap();
        store.record_kind("v2", VideoKind::Unknown).unwrap();

        assert_eq!(store.kind_of("v1").unwrap(), Some(VideoKind::Short));
        assert_eq!(store.kind_of("v2").unwrap(), None);

        let all = store.all_kinds().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("v1"), Some(&VideoKind::Short));

        store.clear_kinds().unwrap();
        assert!(store.all_kinds().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_classification_row_reads_absent() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO classifications (video_id, kind, resolved_at)
                 VALUES ('v9', 'widescreen', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();

        assert_eq!(store.kind_of("v9").unwrap(), None);
        assert!(store.all_kinds().unwrap().is_empty());
    }

    #[test]
    fn test_history_rewatch_moves_to_front() {
        let store = SqliteStore::in_memory().unwrap();
        for (id, minute) in [("a", 1), ("b", 2), ("c", 3)] {
            let entry = HistoryEntry {
                video_id: id.into(),
                watched_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap(),
                progress: None,
            };
            store.record_watch(&entry).unwrap();
        }

        let rewatch = HistoryEntry {
            video_id: "a".into(),
            watched_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 10, 0).unwrap(),
            progress: Some(0.5),
        };
        store.record_watch(&rewatch).unwrap();

        let history = store.history().unwrap();
        let ids: Vec<&str> = history.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);
        assert_eq!(history[0].progress, Some(0.5));
    }

    #[test]
    fn test_history_caps_at_limit() {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..(MAX_HISTORY_ENTRIES + 10) {
            let entry = HistoryEntry {
                video_id: format!("v{i}"),
                watched_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
                    + Duration::minutes(i as i64),
                progress: None,
            };
            store.record_watch(&entry).unwrap();
        }

        let history = store.history().unwrap();
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        // Newest first; the oldest ten were evicted.
        assert_eq!(history[0].video_id, format!("v{}", MAX_HISTORY_ENTRIES + 9));
        assert_eq!(history.last().unwrap().video_id, "v10");
    }

    #[test]
    fn test_settings_default_when_empty() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.settings().unwrap(), Settings::default());
    }

    #[test]
    fn test_settings_patch_and_merge() {
        let store = SqliteStore::in_memory().unwrap();
        let updated = store
            .update_settings(&SettingsPatch {
                theme: Some(Theme::Light),
                autoplay: Some(false),
                ads_enabled: None,
            })
            .unwrap();
        assert_eq!(updated.theme, Theme::Light);
        assert!(!updated.autoplay);
        assert!(updated.ads_enabled);

        let reloaded = store.settings().unwrap();
        assert_eq!(reloaded, updated);
    }

    #[test]
    fn test_corrupt_settings_rows_fall_back_per_key() {
        let store = SqliteStore::in_memory().unwrap();
        {
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO settings (key, value) VALUES ('theme', 'neon')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO settings (key, value) VALUES ('autoplay', 'false')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO settings (key, value) VALUES ('shiny_new_toggle', '1')",
                [],
            )
            .unwrap();
        }

        let settings = store.settings().unwrap();
        assert_eq!(settings.theme, Settings::default().theme);
        assert!(!settings.autoplay);
        assert!(settings.ads_enabled);
    }

    #[test]
    fn test_corrupt_item_row_is_skipped() {
        let store = SqliteStore::in_memory().unwrap();
        store.save_snapshot(&sample_snapshot()).unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE snapshot_items SET published_at = 'not-a-date' WHERE video_id = 'v1'",
                [],
            )
            .unwrap();

        let loaded = store.snapshot().unwrap().unwrap();
        let ids: Vec<&str> = loaded.items.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["v2"]);
    }

    #[test]
    fn test_store_survives_on_disk_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewdeck.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.save_snapshot(&sample_snapshot()).unwrap();
            store.record_kind("v1", VideoKind::Video).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.snapshot().unwrap().unwrap().items.len(), 2);
        assert_eq!(store.kind_of("v1").unwrap(), Some(VideoKind::Video));
    }
}
