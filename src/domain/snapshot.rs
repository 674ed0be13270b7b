use chrono::{DateTime, Duration, Utc};

use crate::domain::FeedItem;

/// One fetched-and-parsed batch of feed items at a point in time.
///
/// A snapshot read back from storage is only served while it is fresh;
/// past its TTL it is treated as absent and a new fetch is triggered.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub items: Vec<FeedItem>,
    pub channel_title: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl FeedSnapshot {
    pub fn new(items: Vec<FeedItem>, channel_title: Option<String>, ttl: Duration) -> Self {
        Self {
            items,
            channel_title,
            captured_at: Utc::now(),
            ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.captured_at > self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_snapshot_is_not_expired() {
        let snap = FeedSnapshot::new(Vec::new(), None, Duration::minutes(15));
        assert!(!snap.is_expired());
    }

    #[test]
    fn test_snapshot_expires_after_ttl() {
        let mut snap = FeedSnapshot::new(Vec::new(), None, Duration::minutes(15));
        snap.captured_at = Utc::now() - Duration::minutes(16);
        assert!(snap.is_expired());
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let captured = Utc::now();
        let mut snap = FeedSnapshot::new(Vec::new(), None, Duration::minutes(15));
        snap.captured_at = captured;
        // Exactly at the TTL the snapshot is still considered live.
        assert!(!snap.is_expired_at(captured + Duration::minutes(15)));
        assert!(snap.is_expired_at(captured + Duration::minutes(15) + Duration::milliseconds(1)));
    }
}
