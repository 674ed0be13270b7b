use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{FeedItem, VideoKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    #[default]
    All,
    /// Regular videos; unclassified items pass too so nothing vanishes
    /// from the default view while classification is pending.
    Videos,
    /// Only items positively classified as shorts.
    Shorts,
}

impl FromStr for KindFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(KindFilter::All),
            "videos" => Ok(KindFilter::Videos),
            "shorts" => Ok(KindFilter::Shorts),
            other => Err(format!(
                "unknown filter '{other}' (expected all, videos, or shorts)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            other => Err(format!(
                "unknown sort order '{other}' (expected newest or oldest)"
            )),
        }
    }
}

/// A filtered/sorted projection over snapshot items.
///
/// Title search is a case-insensitive substring match while the keyword
/// filter is a case-insensitive exact match; the asymmetry (free text vs
/// tags) is deliberate. The two are independent conjuncts, applied before
/// the kind filter and a stable publish-date sort.
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub search: Option<String>,
    pub keyword: Option<String>,
    pub kind: KindFilter,
    pub sort: SortOrder,
}

impl FeedQuery {
    pub fn apply(&self, items: &[FeedItem]) -> Vec<FeedItem> {
        let mut out: Vec<FeedItem> = items.to_vec();

        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            out.retain(|item| item.title.to_lowercase().contains(&needle));
        }

        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            let keyword = keyword.to_lowercase();
            out.retain(|item| {
                item.keywords
                    .iter()
                    .any(|k| k.to_lowercase() == keyword)
            });
        }

        match self.kind {
            KindFilter::All => {}
            KindFilter::Videos => out.retain(|item| {
                matches!(item.kind, VideoKind::Video | VideoKind::Unknown)
            }),
            KindFilter::Shorts => out.retain(|item| item.kind == VideoKind::Short),
        }

        // Vec::sort_by is stable, so equal timestamps keep feed order.
        match self.sort {
            SortOrder::Newest => out.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
            SortOrder::Oldest => out.sort_by(|a, b| a.published_at.cmp(&b.published_at)),
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn fixture() -> Vec<FeedItem> {
        let mut items = Vec::new();
        let specs: [(&str, &str, VideoKind, &[&str], i64); 5] = [
            ("v1", "Python sorting tricks", VideoKind::Video, &["python", "tips"], 1),
            ("v2", "Turtle spiral art", VideoKind::Short, &["python", "turtle"], 2),
            ("v3", "Pygame in 60 seconds", VideoKind::Short, &["pygame"], 3),
            ("v4", "Rust vs Python", VideoKind::Video, &["rust"], 4),
            ("v5", "Python list comprehensions", VideoKind::Short, &["python"], 5),
        ];
        for (id, title, kind, keywords, day) in specs {
            let mut item = FeedItem::new(
                id,
                title,
                Utc.with_ymd_and_hms(2024, 1, day as u32, 12, 0, 0).unwrap(),
            );
            item.kind = kind;
            item.keywords = keywords.iter().map(|k| k.to_string()).collect();
            items.push(item);
        }
        items
    }

    #[test]
    fn test_default_query_sorts_newest_first() {
        let result = FeedQuery::default().apply(&fixture());
        let ids: Vec<&str> = result.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["v5", "v4", "v3", "v2", "v1"]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let query = FeedQuery {
            search: Some("PYTHON".into()),
            ..Default::default()
        };
        let result = query.apply(&fixture());
        let ids: Vec<&str> = result.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["v5", "v4", "v1"]);
    }

    #[test]
    fn test_keyword_is_exact_match_not_substring() {
        // "py" is a substring of "python" and "pygame" but matches neither tag.
        let query = FeedQuery {
            keyword: Some("py".into()),
            ..Default::default()
        };
        assert!(query.apply(&fixture()).is_empty());

        let query = FeedQuery {
            keyword: Some("PyThOn".into()),
            ..Default::default()
        };
        let result = query.apply(&fixture());
        let ids: Vec<&str> = result.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["v5", "v2", "v1"]);
    }

    #[test]
    fn test_videos_filter_keeps_unknown() {
        let mut items = fixture();
        items[0].kind = VideoKind::Unknown;
        let query = FeedQuery {
            kind: KindFilter::Videos,
            ..Default::default()
        };
        let result = query.apply(&items);
        let ids: Vec<&str> = result.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["v4", "v1"]);
    }

    #[test]
    fn test_shorts_filter_excludes_unknown() {
        let mut items = fixture();
        items[1].kind = VideoKind::Unknown;
        let query = FeedQuery {
            kind: KindFilter::Shorts,
            ..Default::default()
        };
        let result = query.apply(&items);
        let ids: Vec<&str> = result.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["v5", "v3"]);
    }

    #[test]
    fn test_combined_search_shorts_oldest() {
        let query = FeedQuery {
            search: Some("py".into()),
            kind: KindFilter::Shorts,
            sort: SortOrder::Oldest,
            ..Default::default()
        };
        let result = query.apply(&fixture());
        let ids: Vec<&str> = result.iter().map(|i| i.video_id.as_str()).collect();
        // Only shorts whose title contains "py", ascending by publish date.
        assert_eq!(ids, ["v3", "v5"]);
    }

    #[test]
    fn test_search_and_keyword_are_independent_conjuncts() {
        let query = FeedQuery {
            search: Some("turtle".into()),
            keyword: Some("python".into()),
            ..Default::default()
        };
        let result = query.apply(&fixture());
        let ids: Vec<&str> = result.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["v2"]);
    }

    #[test]
    fn test_empty_search_string_is_ignored() {
        let query = FeedQuery {
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(query.apply(&fixture()).len(), 5);
    }
}
