use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future::join_all;
use image::GenericImageView;

use crate::domain::{FeedItem, VideoKind};
use crate::fetcher::Fetcher;
use crate::store::{ClassificationRepository, SqliteStore};

/// Aspect ratio (height over width) above which a thumbnail is treated as
/// a Short. Standard thumbnails are 16:9 (0.5625); Shorts are portrait.
const SHORTS_ASPECT_THRESHOLD: f64 = 1.2;

/// Unknown items are probed in groups of this size: concurrent within a
/// group, sequential across groups, bounding simultaneous image loads.
const CLASSIFY_BATCH_SIZE: usize = 5;

/// Pure decision rule over natural thumbnail dimensions. A ratio of
/// exactly 1.2 is still a regular video; degenerate dimensions stay
/// unknown.
pub fn classify_by_ratio(width: u32, height: u32) -> VideoKind {
    if width == 0 || height == 0 {
        return VideoKind::Unknown;
    }
    let ratio = f64::from(height) / f64::from(width);
    if ratio > SHORTS_ASPECT_THRESHOLD {
        VideoKind::Short
    } else {
        VideoKind::Video
    }
}

/// Source of natural image dimensions. The production impl loads the
/// image over HTTP; any out-of-band signal can substitute behind this
/// seam without touching callers.
#[async_trait]
pub trait DimensionProbe {
    /// `(width, height)` of the image at `url`, or `None` when it cannot
    /// be fetched or decoded.
    async fn probe(&self, url: &str) -> Option<(u32, u32)>;
}

pub struct HttpDimensionProbe {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl HttpDimensionProbe {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl DimensionProbe for HttpDimensionProbe {
    async fn probe(&self, url: &str) -> Option<(u32, u32)> {
        let bytes = match self.fetcher.fetch_bytes(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("thumbnail fetch failed for {url}: {e}");
                return None;
            }
        };
        match image::load_from_memory(&bytes) {
            Ok(img) => Some(img.dimensions()),
            Err(e) => {
                tracing::debug!("thumbnail decode failed for {url}: {e}");
                None
            }
        }
    }
}

/// Resolves item kinds from thumbnail geometry, backed by the persistent
/// classification cache. Probe failures are swallowed: the item stays
/// `Unknown` and is retried opportunistically on a later pass.
pub struct Classifier {
    store: Arc<SqliteStore>,
    probe: Arc<dyn DimensionProbe + Send + Sync>,
    in_flight: Mutex<HashSet<String>>,
}

impl Classifier {
    pub fn new(store: Arc<SqliteStore>, probe: Arc<dyn DimensionProbe + Send + Sync>) -> Self {
        Self {
            store,
            probe,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<String>> {
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Resolve the kind of a single item. The persistent cache wins over
    /// the probe; an id already being probed is not probed again.
    pub async fn classify(&self, item: &FeedItem) -> VideoKind {
        if item.kind.is_resolved() {
            return item.kind;
        }

        match self.store.kind_of(&item.video_id) {
            Ok(Some(kind)) => return kind,
            Ok(None) => {}
            Err(e) => tracing::warn!("classification cache read failed: {e}"),
        }

        if !self.in_flight().insert(item.video_id.clone()) {
            return VideoKind::Unknown;
        }

        let kind = match self.probe.probe(&item.thumbnail_url).await {
            Some((width, height)) => classify_by_ratio(width, height),
            None => VideoKind::Unknown,
        };

        if kind.is_resolved() {
            if let Err(e) = self.store.record_kind(&item.video_id, kind) {
                tracing::warn!(
                    "failed to persist classification for {}: {e}",
                    item.video_id
                );
            }
        }

        self.in_flight().remove(&item.video_id);
        kind
    }

    /// Classify every unresolved item in place. Returns how many items
    /// were resolved by this pass.
    pub async fn classify_batch(&self, items: &mut [FeedItem]) -> usize {
        let pending: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.kind.is_resolved())
            .map(|(idx, _)| idx)
            .collect();

        let mut resolved = 0;
        for group in pending.chunks(CLASSIFY_BATCH_SIZE) {
            let probes: Vec<_> = group.iter().map(|&idx| self.classify(&items[idx])).collect();
            let kinds = join_all(probes).await;
            for (&idx, kind) in group.iter().zip(kinds) {
                if kind.is_resolved() {
                    items[idx].kind = kind;
                    resolved += 1;
                }
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use super::*;

    struct FixedProbe {
        dims: Option<(u32, u32)>,
        calls: AtomicUsize,
    }

    impl FixedProbe {
        fn new(dims: Option<(u32, u32)>) -> Self {
            Self {
                dims,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DimensionProbe for FixedProbe {
        async fn probe(&self, _url: &str) -> Option<(u32, u32)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.dims
        }
    }

    fn classifier_with(probe: Arc<FixedProbe>) -> Classifier {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        Classifier::new(store, probe)
    }

    #[test]
    fn test_ratio_boundaries() {
        // 16:9 landscape thumbnail.
        assert_eq!(classify_by_ratio(480, 270), VideoKind::Video);
        // 9:16 portrait thumbnail.
        assert_eq!(classify_by_ratio(270, 480), VideoKind::Short);
        // Exactly at the threshold stays a video; just past it is a short.
        assert_eq!(classify_by_ratio(1000, 1200), VideoKind::Video);
        assert_eq!(classify_by_ratio(10000, 12001), VideoKind::Short);
        // Degenerate dimensions are undecidable.
        assert_eq!(classify_by_ratio(0, 480), VideoKind::Unknown);
        assert_eq!(classify_by_ratio(480, 0), VideoKind::Unknown);
    }

    #[tokio::test]
    async fn test_classify_persists_and_never_reprobes() {
        let probe = Arc::new(FixedProbe::new(Some((270, 480))));
        let classifier = classifier_with(probe.clone());
        let item = FeedItem::new("v1", "A short", Utc::now());

        assert_eq!(classifier.classify(&item).await, VideoKind::Short);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

        // Second call is served from the persistent cache.
        assert_eq!(classifier.classify(&item).await, VideoKind::Short);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probe_failure_resolves_unknown_and_retries_later() {
        let probe = Arc::new(FixedProbe::new(None));
        let classifier = classifier_with(probe.clone());
        let item = FeedItem::new("v1", "Unreachable", Utc::now());

        assert_eq!(classifier.classify(&item).await, VideoKind::Unknown);
        // Unknown is not cached, so the next pass probes again.
        assert_eq!(classifier.classify(&item).await, VideoKind::Unknown);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolved_item_is_not_probed() {
        let probe = Arc::new(FixedProbe::new(Some((270, 480))));
        let classifier = classifier_with(probe.clone());
        let mut item = FeedItem::new("v1", "Known", Utc::now());
        item.kind = VideoKind::Video;

        assert_eq!(classifier.classify(&item).await, VideoKind::Video);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_resolves_all_pending() {
        let probe = Arc::new(FixedProbe::new(Some((480, 270))));
        let classifier = classifier_with(probe.clone());

        let mut items: Vec<FeedItem> = (0..12)
            .map(|i| FeedItem::new(format!("v{i}"), format!("Video {i}"), Utc::now()))
            .collect();
        items[3].kind = VideoKind::Short;

        let resolved = classifier.classify_batch(&mut items).await;
        assert_eq!(resolved, 11);
        assert!(items.iter().all(|item| item.kind.is_resolved()));
        // The already-resolved item was never probed.
        assert_eq!(probe.calls.load(Ordering::SeqCst), 11);
    }
}
