use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Duration;

use crate::app::{Result, ViewdeckError};
use crate::classifier::Classifier;
use crate::domain::{FeedItem, FeedQuery, FeedSnapshot, HistoryEntry, Settings, SettingsPatch};
use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::store::{
    ClassificationRepository, HistoryRepository, SettingsRepository, SnapshotRepository,
    SqliteStore,
};

/// Composes store, fetcher, parser, and classifier into the operations the
/// surfaces consume. The hub only ever hands out derived views; persisted
/// state is owned by the store.
///
/// Storage failures on the load path are logged and masked, never
/// surfaced: a read falls back to defaults, a failed persist leaves the
/// in-memory snapshot intact.
pub struct FeedHub {
    store: Arc<SqliteStore>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    classifier: Arc<Classifier>,
    parser: FeedParser,
    feed_url: Option<String>,
    cache_ttl: Duration,
}

impl FeedHub {
    pub fn new(
        store: Arc<SqliteStore>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        classifier: Arc<Classifier>,
        feed_url: Option<String>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            classifier,
            parser: FeedParser::new(),
            feed_url,
            cache_ttl,
        }
    }

    /// Load the current snapshot: the manual override wins, then a live
    /// cached snapshot, then the network.
    pub async fn load(&self) -> Result<FeedSnapshot> {
        match self.store.manual() {
            Ok(Some(snapshot)) => return Ok(self.overlay(snapshot)),
            Ok(None) => {}
            Err(e) => tracing::warn!("manual feed read failed: {e}"),
        }

        match self.store.snapshot() {
            Ok(Some(snapshot)) => return Ok(self.overlay(snapshot)),
            Ok(None) => {}
            Err(e) => tracing::warn!("snapshot read failed: {e}"),
        }

        self.refresh().await
    }

    /// Fetch from the configured feed source, bypassing caches. On a
    /// network failure a stale stored snapshot is served instead when one
    /// exists; otherwise the error surfaces.
    pub async fn refresh(&self) -> Result<FeedSnapshot> {
        let feed_url = self.feed_url.as_deref().ok_or_else(|| {
            ViewdeckError::Config(
                "no feed source configured - set channel.id or feed.url in the config file".into(),
            )
        })?;

        let text = match self.fetcher.fetch_text(feed_url).await {
            Ok(text) => text,
            Err(e) => {
                if let Ok(Some(stale)) = self.store.snapshot_ignoring_ttl() {
                    tracing::warn!("feed fetch failed, serving stale snapshot: {e}");
                    return Ok(self.overlay(stale));
                }
                return Err(e);
            }
        };

        if !self.parser.validate(&text) {
            return Err(ViewdeckError::Validation(
                "feed content failed structural checks - not a YouTube channel feed".into(),
            ));
        }

        let parsed = self.parser.parse(&text)?;
        let snapshot = self.overlay(FeedSnapshot::new(
            parsed.items,
            parsed.channel_title,
            self.cache_ttl,
        ));

        if let Err(e) = self.store.save_snapshot(&snapshot) {
            tracing::warn!("failed to persist snapshot: {e}");
        }

        Ok(snapshot)
    }

    /// Import user-supplied feed markup verbatim, replacing the manual
    /// override. Never touches the network.
    pub fn import_manual(&self, text: &str) -> Result<FeedSnapshot> {
        if !self.parser.validate(text) {
            return Err(ViewdeckError::Validation(
                "invalid feed content - make sure it contains feed, entry, and yt:videoId elements"
                    .into(),
            ));
        }

        let parsed = self.parser.parse(text)?;
        let snapshot = self.overlay(FeedSnapshot::new(
            parsed.items,
            parsed.channel_title,
            self.cache_ttl,
        ));

        if let Err(e) = self.store.save_manual(&snapshot) {
            tracing::warn!("failed to persist manual feed: {e}");
        }

        Ok(snapshot)
    }

    /// Apply the persistent classification cache over a snapshot: a cached
    /// kind overrides the parser's `Unknown`.
    fn overlay(&self, mut snapshot: FeedSnapshot) -> FeedSnapshot {
        let kinds = self.store.all_kinds().unwrap_or_else(|e| {
            tracing::warn!("classification cache read failed: {e}");
            HashMap::new()
        });
        for item in &mut snapshot.items {
            if let Some(kind) = kinds.get(&item.video_id) {
                item.kind = *kind;
            }
        }
        snapshot
    }

    /// Run the batch classifier over unresolved items in place. Results
    /// land in the persistent cache as they resolve.
    pub async fn classify_pending(&self, snapshot: &mut FeedSnapshot) -> usize {
        self.classifier.classify_batch(&mut snapshot.items).await
    }

    pub fn filtered(&self, items: &[FeedItem], query: &FeedQuery) -> Vec<FeedItem> {
        query.apply(items)
    }

    /// Sorted, deduplicated union of item keywords.
    pub fn keywords(&self, items: &[FeedItem]) -> Vec<String> {
        items
            .iter()
            .flat_map(|item| item.keywords.iter())
            .filter(|k| !k.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn record_watch(&self, video_id: &str, progress: Option<f64>) {
        let mut entry = HistoryEntry::new(video_id);
        entry.progress = progress;
        if let Err(e) = self.store.record_watch(&entry) {
            tracing::warn!("failed to record watch for {video_id}: {e}");
        }
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.store.history().unwrap_or_else(|e| {
            tracing::warn!("history read failed: {e}");
            Vec::new()
        })
    }

    pub fn settings(&self) -> Settings {
        self.store.settings().unwrap_or_else(|e| {
            tracing::warn!("settings read failed: {e}");
            Settings::default()
        })
    }

    pub fn update_settings(&self, patch: &SettingsPatch) -> Settings {
        match self.store.update_settings(patch) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("settings update failed: {e}");
                self.settings()
            }
        }
    }
}
