pub mod app;
pub mod event;
pub mod layout;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use crossterm::event::KeyCode;
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::{AppContext, Result};
use crate::domain::FeedSnapshot;

use self::app::{InputMode, TuiApp, View};
use self::event::{Action, AppEvent, EventHandler};

type Tui = Terminal<CrosstermBackend<Stdout>>;

pub async fn run(ctx: Arc<AppContext>) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, ctx).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(terminal: &mut Tui, ctx: Arc<AppContext>) -> Result<()> {
    let mut tui_app = TuiApp::new();
    let event_handler = EventHandler::new(Duration::from_millis(100));

    match ctx.hub.load().await {
        Ok(snapshot) => apply_snapshot(&mut tui_app, &ctx, snapshot),
        Err(e) => tui_app.set_status(format!("Failed to load feed: {e}")),
    }
    tui_app.history = ctx.hub.history();

    loop {
        terminal.draw(|frame| layout::render(frame, &tui_app))?;

        match event_handler.next()? {
            AppEvent::Key(key) => {
                if tui_app.input_mode == InputMode::Search {
                    match key.code {
                        KeyCode::Enter => tui_app.commit_search(),
                        KeyCode::Esc => tui_app.cancel_search(),
                        KeyCode::Backspace => {
                            tui_app.search_input.pop();
                        }
                        KeyCode::Char(c) => tui_app.search_input.push(c),
                        _ => {}
                    }
                    continue;
                }

                match Action::from(key) {
                    Action::Quit => {
                        tui_app.should_quit = true;
                    }
                    Action::MoveUp => tui_app.move_up(),
                    Action::MoveDown => tui_app.move_down(),
                    Action::CycleFilter => tui_app.cycle_filter(),
                    Action::CycleSort => tui_app.cycle_sort(),
                    Action::CycleKeyword => tui_app.cycle_keyword(),
                    Action::BeginSearch => tui_app.begin_search(),
                    Action::ClearSearch => tui_app.clear_search(),
                    Action::ToggleHistory => {
                        tui_app.history = ctx.hub.history();
                        tui_app.toggle_view();
                    }
                    Action::Open => open_selected(&mut tui_app, &ctx),
                    Action::Refresh => {
                        tui_app.is_refreshing = true;
                        terminal.draw(|frame| layout::render(frame, &tui_app))?;

                        match ctx.hub.refresh().await {
                            Ok(snapshot) => {
                                let count = snapshot.items.len();
                                apply_snapshot(&mut tui_app, &ctx, snapshot);
                                tui_app.set_status(format!("Refreshed: {count} videos"));
                            }
                            Err(e) => tui_app.set_status(format!("Refresh failed: {e}")),
                        }
                        tui_app.is_refreshing = false;
                    }
                    Action::Classify => {
                        tui_app.set_status("Classifying...".into());
                        terminal.draw(|frame| layout::render(frame, &tui_app))?;

                        let resolved = ctx.classifier.classify_batch(&mut tui_app.items).await;
                        tui_app.refilter();
                        tui_app.set_status(format!("Classified {resolved} entries"));
                    }
                    Action::None => {}
                }
            }
            AppEvent::Tick => {}
        }

        if tui_app.should_quit {
            break;
        }
    }

    Ok(())
}

fn apply_snapshot(tui_app: &mut TuiApp, ctx: &AppContext, snapshot: FeedSnapshot) {
    let keywords = ctx.hub.keywords(&snapshot.items);
    tui_app.set_items(snapshot.items, snapshot.channel_title, keywords);
}

fn open_selected(tui_app: &mut TuiApp, ctx: &AppContext) {
    let link = match tui_app.view {
        View::Feed => tui_app
            .selected_item()
            .map(|item| (item.video_id.clone(), item.display_link())),
        View::History => tui_app.selected_history().map(|entry| {
            (
                entry.video_id.clone(),
                crate::domain::item::watch_url(&entry.video_id),
            )
        }),
    };

    let Some((video_id, link)) = link else {
        return;
    };

    if let Err(e) = open::that(&link) {
        tui_app.set_status(format!("Failed to open browser: {e}"));
        return;
    }

    ctx.hub.record_watch(&video_id, None);
    tui_app.history = ctx.hub.history();
    tui_app.set_status(format!("Opened {link}"));
}
