use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

use crate::app::Result;

pub enum AppEvent {
    Key(KeyEvent),
    Tick,
}

pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    pub fn next(&self) -> Result<AppEvent> {
        if event::poll(self.tick_rate)? {
            if let Event::Key(key) = event::read()? {
                return Ok(AppEvent::Key(key));
            }
        }
        Ok(AppEvent::Tick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    MoveUp,
    MoveDown,
    Open,
    CycleFilter,
    CycleSort,
    CycleKeyword,
    BeginSearch,
    ClearSearch,
    ToggleHistory,
    Refresh,
    Classify,
    None,
}

impl From<KeyEvent> for Action {
    fn from(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
            KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
            KeyCode::Enter | KeyCode::Char('o') => Action::Open,
            KeyCode::Char('f') => Action::CycleFilter,
            KeyCode::Char('s') => Action::CycleSort,
            KeyCode::Char('t') => Action::CycleKeyword,
            KeyCode::Char('/') => Action::BeginSearch,
            KeyCode::Esc => Action::ClearSearch,
            KeyCode::Char('h') => Action::ToggleHistory,
            KeyCode::Char('R') => Action::Refresh,
            KeyCode::Char('c') => Action::Classify,
            _ => Action::None,
        }
    }
}
