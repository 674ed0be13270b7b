use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::app::{Result, ViewdeckError};
use crate::domain::FeedItem;

/// Result of a successful parse: the entries plus the channel title the
/// feed header carries.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub channel_title: Option<String>,
    pub items: Vec<FeedItem>,
}

/// Parser for the YouTube channel Atom feed
/// (`https://www.youtube.com/feeds/videos.xml?channel_id=...`).
///
/// The feed uses the `yt:` and `media:` extension namespaces for the video
/// id, thumbnail, category, and keywords, so entries are read directly from
/// the XML event stream.
#[derive(Clone)]
pub struct FeedParser;

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Element whose text content is currently being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    ChannelTitle,
    EntryTitle,
    VideoId,
    Published,
    AuthorName,
    Category,
    Keywords,
}

#[derive(Debug, Default)]
struct EntryDraft {
    video_id: Option<String>,
    title: Option<String>,
    published: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
    category: Option<String>,
    keywords: Option<String>,
}

impl EntryDraft {
    /// Finalize the entry. Returns `None` when a required field is missing
    /// or the publish timestamp does not parse; such entries are skipped
    /// without failing the batch.
    fn build(self) -> Option<FeedItem> {
        let video_id = self.video_id.filter(|v| !v.is_empty())?;
        let title = self.title.filter(|t| !t.is_empty())?;
        let published = parse_timestamp(&self.published?)?;

        let mut item = FeedItem::new(video_id, title, published);
        if let Some(author) = self.author_name.filter(|a| !a.is_empty()) {
            item.author_name = author;
        }
        if let Some(url) = self.thumbnail_url.filter(|u| !u.is_empty()) {
            item.thumbnail_url = url;
        }
        item.category = self.category.filter(|c| !c.is_empty());
        item.keywords = split_keywords(self.keywords.as_deref().unwrap_or(""));
        Some(item)
    }
}

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Cheap structural pre-check used to reject obviously-invalid input
    /// (manual imports in particular) before attempting a full parse.
    pub fn validate(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        trimmed.contains("<feed")
            && trimmed.contains("</feed>")
            && trimmed.contains("<entry")
            && trimmed.contains("yt:videoId")
    }

    pub fn parse(&self, text: &str) -> Result<ParsedFeed> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut channel_title: Option<String> = None;
        let mut saw_feed = false;
        let mut entry_count = 0usize;
        let mut in_media_group = false;
        let mut in_author = false;
        let mut draft: Option<EntryDraft> = None;
        let mut field: Option<TextField> = None;
        let mut items = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.on_element_start(
                        &e,
                        &mut saw_feed,
                        &mut entry_count,
                        &mut in_media_group,
                        &mut in_author,
                        &mut draft,
                        &mut field,
                        channel_title.is_some(),
                    );
                }
                Ok(Event::Empty(e)) => {
                    if e.name().as_ref() == b"media:thumbnail" {
                        if let Some(draft) = draft.as_mut() {
                            if draft.thumbnail_url.is_none() {
                                draft.thumbnail_url = thumbnail_url_attr(&e);
                            }
                        }
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(target) = field {
                        if let Ok(text) = t.unescape() {
                            route_text(
                                target,
                                text.into_owned(),
                                &mut channel_title,
                                &mut draft,
                            );
                        }
                    }
                }
                Ok(Event::CData(t)) => {
                    if let Some(target) = field {
                        let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                        route_text(target, text, &mut channel_title, &mut draft);
                    }
                }
                Ok(Event::End(e)) => {
                    field = None;
                    match e.name().as_ref() {
                        b"entry" => {
                            if let Some(finished) = draft.take() {
                                if let Some(item) = finished.build() {
                                    items.push(item);
                                }
                            }
                        }
                        b"media:group" => in_media_group = false,
                        b"author" => in_author = false,
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ViewdeckError::Parse(format!(
                        "invalid XML - please check the feed content ({e})"
                    )));
                }
            }
        }

        if !saw_feed {
            return Err(ViewdeckError::Parse(
                "no feed element found - this does not appear to be a valid YouTube RSS feed"
                    .into(),
            ));
        }
        if entry_count == 0 {
            return Err(ViewdeckError::Parse(
                "no entries found in the feed - the channel may have no public videos".into(),
            ));
        }

        Ok(ParsedFeed {
            channel_title,
            items,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn on_element_start(
        &self,
        e: &BytesStart<'_>,
        saw_feed: &mut bool,
        entry_count: &mut usize,
        in_media_group: &mut bool,
        in_author: &mut bool,
        draft: &mut Option<EntryDraft>,
        field: &mut Option<TextField>,
        have_channel_title: bool,
    ) {
        *field = None;
        match e.name().as_ref() {
            b"feed" => *saw_feed = true,
            b"entry" => {
                *entry_count += 1;
                *draft = Some(EntryDraft::default());
            }
            b"media:group" => *in_media_group = true,
            b"author" => *in_author = true,
            b"title" => {
                if draft.is_some() {
                    if !*in_media_group {
                        *field = Some(TextField::EntryTitle);
                    }
                } else if *saw_feed && !have_channel_title {
                    *field = Some(TextField::ChannelTitle);
                }
            }
            b"yt:videoId" if draft.is_some() => *field = Some(TextField::VideoId),
            b"published" if draft.is_some() => *field = Some(TextField::Published),
            b"name" if draft.is_some() && *in_author => *field = Some(TextField::AuthorName),
            b"media:category" if draft.is_some() => *field = Some(TextField::Category),
            b"media:keywords" if draft.is_some() => *field = Some(TextField::Keywords),
            b"media:thumbnail" => {
                if let Some(draft) = draft.as_mut() {
                    if draft.thumbnail_url.is_none() {
                        draft.thumbnail_url = thumbnail_url_attr(e);
                    }
                }
            }
            _ => {}
        }
    }
}

fn route_text(
    target: TextField,
    text: String,
    channel_title: &mut Option<String>,
    draft: &mut Option<EntryDraft>,
) {
    match target {
        TextField::ChannelTitle => {
            if channel_title.is_none() {
                *channel_title = Some(text);
            }
        }
        other => {
            if let Some(draft) = draft.as_mut() {
                let slot = match other {
                    TextField::EntryTitle => &mut draft.title,
                    TextField::VideoId => &mut draft.video_id,
                    TextField::Published => &mut draft.published,
                    TextField::AuthorName => &mut draft.author_name,
                    TextField::Category => &mut draft.category,
                    TextField::Keywords => &mut draft.keywords,
                    TextField::ChannelTitle => unreachable!(),
                };
                if slot.is_none() {
                    *slot = Some(text);
                }
            }
        }
    }
}

fn thumbnail_url_attr(e: &BytesStart<'_>) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.as_ref() == b"url" {
            attr.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| s.parse::<DateTime<Utc>>().ok())
}

/// Split a `media:keywords` value on commas, trimming whitespace and
/// dropping empty tokens.
fn split_keywords(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::domain::VideoKind;

    use super::*;

    const FEED_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015"
      xmlns:media="http://search.yahoo.com/mrss/"
      xmlns="http://www.w3.org/2005/Atom">
  <title>Python Peak</title>
  <author>
    <name>Python Peak</name>
    <uri>https://www.youtube.com/channel/UC123</uri>
  </author>
  <entry>
    <id>yt:video:aaa111</id>
    <yt:videoId>aaa111</yt:videoId>
    <title>Fractal trees with turtle</title>
    <published>2024-03-01T10:00:00+00:00</published>
    <author>
      <name>Python Peak</name>
    </author>
    <media:group>
      <media:title>Fractal trees with turtle</media:title>
      <media:thumbnail url="https://i.ytimg.com/vi/aaa111/custom.jpg" width="480" height="360"/>
      <media:category label="Education">Education</media:category>
      <media:keywords>python, turtle , fractals,,art</media:keywords>
    </media:group>
  </entry>
  <entry>
    <id>yt:video:bbb222</id>
    <yt:videoId>bbb222</yt:videoId>
    <title>Sorting in one line</title>
    <published>2024-03-02T10:00:00+00:00</published>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_returns_all_valid_entries() {
        let parsed = FeedParser::new().parse(FEED_SAMPLE).unwrap();
        assert_eq!(parsed.channel_title, Some("Python Peak".into()));
        assert_eq!(parsed.items.len(), 2);
        assert!(parsed.items.iter().all(|i| i.kind == VideoKind::Unknown));

        let ids: Vec<&str> = parsed.items.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["aaa111", "bbb222"]);
    }

    #[test]
    fn test_entry_fields_are_extracted() {
        let parsed = FeedParser::new().parse(FEED_SAMPLE).unwrap();
        let item = &parsed.items[0];
        assert_eq!(item.title, "Fractal trees with turtle");
        assert_eq!(item.author_name, "Python Peak");
        assert_eq!(item.thumbnail_url, "https://i.ytimg.com/vi/aaa111/custom.jpg");
        assert_eq!(item.link_url, "https://www.youtube.com/watch?v=aaa111");
        assert_eq!(item.category, Some("Education".into()));
        assert_eq!(item.keywords, ["python", "turtle", "fractals", "art"]);
    }

    #[test]
    fn test_optional_fields_fall_back() {
        let parsed = FeedParser::new().parse(FEED_SAMPLE).unwrap();
        let item = &parsed.items[1];
        assert_eq!(item.author_name, "Unknown");
        assert_eq!(
            item.thumbnail_url,
            "https://i.ytimg.com/vi/bbb222/hqdefault.jpg"
        );
        assert!(item.keywords.is_empty());
        assert!(item.category.is_none());
    }

    #[test]
    fn test_entry_missing_required_field_is_skipped() {
        let feed = r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015">
  <title>Test</title>
  <entry>
    <yt:videoId>good1</yt:videoId>
    <title>Kept</title>
    <published>2024-01-01T00:00:00Z</published>
  </entry>
  <entry>
    <title>No video id</title>
    <published>2024-01-02T00:00:00Z</published>
  </entry>
  <entry>
    <yt:videoId>good2</yt:videoId>
    <published>2024-01-03T00:00:00Z</published>
  </entry>
  <entry>
    <yt:videoId>badts</yt:videoId>
    <title>Bad timestamp</title>
    <published>yesterday</published>
  </entry>
</feed>"#;
        let parsed = FeedParser::new().parse(feed).unwrap();
        let ids: Vec<&str> = parsed.items.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["good1"]);
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        let result = FeedParser::new().parse("<feed><entry></feed>");
        assert!(matches!(result, Err(ViewdeckError::Parse(_))));
    }

    #[test]
    fn test_missing_feed_container_is_a_parse_error() {
        let result = FeedParser::new().parse("<rss><channel></channel></rss>");
        assert!(matches!(result, Err(ViewdeckError::Parse(_))));
    }

    #[test]
    fn test_zero_entries_is_a_parse_error() {
        let result = FeedParser::new().parse("<feed><title>Empty</title></feed>");
        assert!(matches!(result, Err(ViewdeckError::Parse(_))));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let feed = r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015">
  <title>A &amp; B</title>
  <entry>
    <yt:videoId>e1</yt:videoId>
    <title>Tips &amp; tricks</title>
    <published>2024-01-01T00:00:00Z</published>
  </entry>
</feed>"#;
        let parsed = FeedParser::new().parse(feed).unwrap();
        assert_eq!(parsed.channel_title, Some("A & B".into()));
        assert_eq!(parsed.items[0].title, "Tips & tricks");
    }

    #[test]
    fn test_validate_accepts_feed_shape() {
        assert!(FeedParser::new().validate(FEED_SAMPLE));
    }

    #[test]
    fn test_validate_rejects_non_feeds() {
        let parser = FeedParser::new();
        assert!(!parser.validate(""));
        assert!(!parser.validate("just some text"));
        assert!(!parser.validate("<rss version=\"2.0\"></rss>"));
        // Feed markup without the yt:videoId marker is not a channel feed.
        assert!(!parser.validate("<feed><entry></entry></feed>"));
    }

    #[test]
    fn test_video_ids_are_unique_in_fixture() {
        let parsed = FeedParser::new().parse(FEED_SAMPLE).unwrap();
        let mut ids: Vec<&str> = parsed.items.iter().map(|i| i.video_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), parsed.items.len());
    }
}
