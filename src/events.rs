use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    ForceQuit,
    Back,
    MoveUp,
    MoveDown,
    Toggle,
    Confirm,
    Advance,
}

fn map_key_event(key_event: KeyEvent) -> AppEvent {
    if key_event.kind != KeyEventKind::Press {
        return AppEvent::Tick;
    }

    if key_event.code == KeyCode::Char('c') && key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return AppEvent::ForceQuit;
    }

    match key_event.code {
        KeyCode::Char('q') => AppEvent::ForceQuit,
        KeyCode::Esc => AppEvent::Back,
        KeyCode::Up | KeyCode::Char('k') => AppEvent::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => AppEvent::MoveDown,
        KeyCode::Char(' ') => AppEvent::Toggle,
        KeyCode::Enter => AppEvent::Confirm,
        KeyCode::Tab => AppEvent::Advance,
        _ => AppEvent::Tick,
    }
}

pub fn next_event() -> io::Result<AppEvent> {
    if event::poll(POLL_INTERVAL)?
        && let Event::Key(key_event) = event::read()?
    {
        return Ok(map_key_event(key_event));
    }

    Ok(AppEvent::Tick)
}
