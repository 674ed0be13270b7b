pub mod history;
pub mod item;
pub mod query;
pub mod settings;
pub mod snapshot;

pub use history::{HistoryEntry, MAX_HISTORY_ENTRIES};
pub use item::{FeedItem, VideoKind};
pub use query::{FeedQuery, KindFilter, SortOrder};
pub use settings::{Settings, SettingsPatch, Theme};
pub use snapshot::FeedSnapshot;
