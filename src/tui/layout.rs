use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::domain::{KindFilter, SortOrder, VideoKind};
use crate::tui::app::{InputMode, TuiApp, View};

pub fn render(frame: &mut Frame, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Min(8),     // Video or history list
            Constraint::Length(9),  // Detail pane
            Constraint::Length(1),  // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    match app.view {
        View::Feed => render_feed_list(frame, app, chunks[1]),
        View::History => render_history_list(frame, app, chunks[1]),
    }
    render_detail(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);
}

fn kind_badge(kind: VideoKind) -> Span<'static> {
    match kind {
        VideoKind::Video => Span::styled("[V]", Style::default().fg(Color::Blue)),
        VideoKind::Short => Span::styled("[S]", Style::default().fg(Color::Magenta)),
        VideoKind::Unknown => Span::styled("[?]", Style::default().fg(Color::DarkGray)),
    }
}

fn render_header(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let title = app.channel_title.as_deref().unwrap_or("viewdeck");

    let filter = match app.query.kind {
        KindFilter::All => "all",
        KindFilter::Videos => "videos",
        KindFilter::Shorts => "shorts",
    };
    let sort = match app.query.sort {
        SortOrder::Newest => "newest",
        SortOrder::Oldest => "oldest",
    };

    let mut spans = vec![
        Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(
            format!("filter:{filter} sort:{sort}"),
            Style::default().fg(Color::Yellow),
        ),
    ];
    if let Some(keyword) = &app.query.keyword {
        spans.push(Span::styled(
            format!(" tag:{keyword}"),
            Style::default().fg(Color::Green),
        ));
    }
    match app.input_mode {
        InputMode::Search => spans.push(Span::styled(
            format!(" search:{}_", app.search_input),
            Style::default().fg(Color::Cyan),
        )),
        InputMode::Normal => {
            if let Some(search) = &app.query.search {
                spans.push(Span::styled(
                    format!(" search:{search}"),
                    Style::default().fg(Color::Cyan),
                ));
            }
        }
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_feed_list(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let items: Vec<ListItem> = app
        .filtered
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let line = Line::from(vec![
                kind_badge(item.kind),
                Span::raw(" "),
                Span::styled(
                    item.published_at.format("%Y-%m-%d").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(" "),
                Span::raw(item.title.clone()),
            ]);

            let style = if i == app.selected {
                Style::default().bg(Color::Cyan).fg(Color::Black)
            } else {
                Style::default()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Videos ({}) ", app.filtered.len())),
    );
    frame.render_widget(list, area);
}

fn render_history_list(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let items: Vec<ListItem> = app
        .history
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let progress = entry
                .progress
                .map(|p| format!(" {:.0}%", p * 100.0))
                .unwrap_or_default();
            let line = Line::from(vec![
                Span::styled(
                    entry.watched_at.format("%Y-%m-%d %H:%M").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(" "),
                Span::raw(app.title_for(&entry.video_id)),
                Span::styled(progress, Style::default().fg(Color::Green)),
            ]);

            let style = if i == app.history_selected {
                Style::default().bg(Color::Cyan).fg(Color::Black)
            } else {
                Style::default()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" History ({}) ", app.history.len())),
    );
    frame.render_widget(list, area);
}

fn render_detail(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let lines = match app.view {
        View::Feed => app.selected_item().map(|item| {
            let mut lines = vec![
                Line::from(Span::styled(
                    item.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(vec![
                    Span::styled("By ", Style::default().fg(Color::DarkGray)),
                    Span::styled(item.author_name.clone(), Style::default().fg(Color::Yellow)),
                    Span::styled("  Published ", Style::default().fg(Color::DarkGray)),
                    Span::styled(
                        item.published_at.format("%Y-%m-%d %H:%M").to_string(),
                        Style::default().fg(Color::Yellow),
                    ),
                ]),
                Line::from(vec![kind_badge(item.kind)]),
            ];
            if let Some(category) = &item.category {
                lines.push(Line::from(format!("Category: {category}")));
            }
            if !item.keywords.is_empty() {
                lines.push(Line::from(format!("Tags: {}", item.keywords.join(", "))));
            }
            lines.push(Line::from(Span::styled(
                item.display_link(),
                Style::default().fg(Color::Blue),
            )));
            lines
        }),
        View::History => app.selected_history().map(|entry| {
            vec![
                Line::from(Span::styled(
                    app.title_for(&entry.video_id),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(format!(
                    "Watched {}",
                    entry.watched_at.format("%Y-%m-%d %H:%M")
                )),
            ]
        }),
    }
    .unwrap_or_else(|| vec![Line::from("Nothing selected")]);

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Details "));
    frame.render_widget(detail, area);
}

fn render_status_bar(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let text = if app.is_refreshing {
        "Refreshing...".to_string()
    } else if let Some(message) = &app.status_message {
        message.clone()
    } else {
        "j/k move  Enter open  f filter  s sort  t tag  / search  h history  c classify  R refresh  q quit"
            .to_string()
    };

    let status = Paragraph::new(text).style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(status, area);
}
