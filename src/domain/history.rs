use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Watch history is capped; the oldest entries are evicted past this.
pub const MAX_HISTORY_ENTRIES: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub video_id: String,
    pub watched_at: DateTime<Utc>,
    /// Playback position as a fraction in `[0, 1]`, when known.
    pub progress: Option<f64>,
}

impl HistoryEntry {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            watched_at: Utc::now(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }
}
