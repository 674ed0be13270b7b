use crate::domain::{FeedItem, FeedQuery, HistoryEntry, KindFilter, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Feed,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

pub struct TuiApp {
    pub items: Vec<FeedItem>,
    pub filtered: Vec<FeedItem>,
    pub query: FeedQuery,
    pub keywords: Vec<String>,
    keyword_index: Option<usize>,
    pub history: Vec<HistoryEntry>,
    pub view: View,
    pub input_mode: InputMode,
    pub search_input: String,
    pub selected: usize,
    pub history_selected: usize,
    pub channel_title: Option<String>,
    pub status_message: Option<String>,
    pub is_refreshing: bool,
    pub should_quit: bool,
}

impl TuiApp {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            filtered: Vec::new(),
            query: FeedQuery::default(),
            keywords: Vec::new(),
            keyword_index: None,
            history: Vec::new(),
            view: View::Feed,
            input_mode: InputMode::Normal,
            search_input: String::new(),
            selected: 0,
            history_selected: 0,
            channel_title: None,
            status_message: None,
            is_refreshing: false,
            should_quit: false,
        }
    }

    pub fn set_items(
        &mut self,
        items: Vec<FeedItem>,
        channel_title: Option<String>,
        keywords: Vec<String>,
    ) {
        self.items = items;
        self.channel_title = channel_title;
        self.keywords = keywords;
        self.keyword_index = None;
        self.refilter();
    }

    /// Re-run the query over the current items, keeping the selection in
    /// bounds.
    pub fn refilter(&mut self) {
        self.filtered = self.query.apply(&self.items);
        if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len().saturating_sub(1);
        }
    }

    pub fn selected_item(&self) -> Option<&FeedItem> {
        self.filtered.get(self.selected)
    }

    pub fn selected_history(&self) -> Option<&HistoryEntry> {
        self.history.get(self.history_selected)
    }

    pub fn move_up(&mut self) {
        match self.view {
            View::Feed => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            View::History => {
                if self.history_selected > 0 {
                    self.history_selected -= 1;
                }
            }
        }
    }

    pub fn move_down(&mut self) {
        match self.view {
            View::Feed => {
                if !self.filtered.is_empty() && self.selected < self.filtered.len() - 1 {
                    self.selected += 1;
                }
            }
            View::History => {
                if !self.history.is_empty() && self.history_selected < self.history.len() - 1 {
                    self.history_selected += 1;
                }
            }
        }
    }

    pub fn cycle_filter(&mut self) {
        self.query.kind = match self.query.kind {
            KindFilter::All => KindFilter::Videos,
            KindFilter::Videos => KindFilter::Shorts,
            KindFilter::Shorts => KindFilter::All,
        };
        self.refilter();
    }

    pub fn cycle_sort(&mut self) {
        self.query.sort = match self.query.sort {
            SortOrder::Newest => SortOrder::Oldest,
            SortOrder::Oldest => SortOrder::Newest,
        };
        self.refilter();
    }

    /// Step through the keyword tags: none -> first -> ... -> last -> none.
    pub fn cycle_keyword(&mut self) {
        self.keyword_index = match self.keyword_index {
            None if self.keywords.is_empty() => None,
            None => Some(0),
            Some(i) if i + 1 < self.keywords.len() => Some(i + 1),
            Some(_) => None,
        };
        self.query.keyword = self.keyword_index.map(|i| self.keywords[i].clone());
        self.refilter();
    }

    pub fn begin_search(&mut self) {
        self.input_mode = InputMode::Search;
        self.search_input = self.query.search.clone().unwrap_or_default();
    }

    pub fn commit_search(&mut self) {
        self.input_mode = InputMode::Normal;
        let input = self.search_input.trim().to_string();
        self.query.search = (!input.is_empty()).then_some(input);
        self.refilter();
    }

    pub fn cancel_search(&mut self) {
        self.input_mode = InputMode::Normal;
        self.search_input.clear();
    }

    pub fn clear_search(&mut self) {
        self.query.search = None;
        self.refilter();
    }

    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            View::Feed => View::History,
            View::History => View::Feed,
        };
    }

    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
    }

    /// Title for a history entry, falling back to the raw id when the
    /// video is no longer in the snapshot.
    pub fn title_for(&self, video_id: &str) -> String {
        self.items
            .iter()
            .find(|item| item.video_id == video_id)
            .map(|item| item.title.clone())
            .unwrap_or_else(|| video_id.to_string())
    }
}

impl Default for TuiApp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::VideoKind;

    use super::*;

    fn app_with_items() -> TuiApp {
        let mut app = TuiApp::new();
        let mut items = Vec::new();
        for (id, title, kind) in [
            ("v1", "Python tips", VideoKind::Video),
            ("v2", "Turtle art", VideoKind::Short),
            ("v3", "More python", VideoKind::Video),
        ] {
            let mut item = FeedItem::new(id, title, Utc::now());
            item.kind = kind;
            item.keywords = vec!["python".into()];
            items.push(item);
        }
        app.set_items(items, Some("Test".into()), vec!["python".into()]);
        app
    }

    #[test]
    fn test_cycle_filter_narrows_list() {
        let mut app = app_with_items();
        assert_eq!(app.filtered.len(), 3);

        app.cycle_filter(); // videos
        assert_eq!(app.filtered.len(), 2);

        app.cycle_filter(); // shorts
        assert_eq!(app.filtered.len(), 1);

        app.cycle_filter(); // back to all
        assert_eq!(app.filtered.len(), 3);
    }

    #[test]
    fn test_selection_stays_in_bounds_after_refilter() {
        let mut app = app_with_items();
        app.selected = 2;
        app.cycle_filter(); // videos: 2 items
        app.cycle_filter(); // shorts: 1 item
        assert_eq!(app.selected, 0);
        assert!(app.selected_item().is_some());
    }

    #[test]
    fn test_search_commit_and_clear() {
        let mut app = app_with_items();
        app.begin_search();
        app.search_input = "python".into();
        app.commit_search();
        assert_eq!(app.filtered.len(), 2);
        assert_eq!(app.input_mode, InputMode::Normal);

        app.clear_search();
        assert_eq!(app.filtered.len(), 3);
    }

    #[test]
    fn test_cycle_keyword_wraps_to_none() {
        let mut app = app_with_items();
        app.cycle_keyword();
        assert_eq!(app.query.keyword.as_deref(), Some("python"));
        app.cycle_keyword();
        assert_eq!(app.query.keyword, None);
    }
}
