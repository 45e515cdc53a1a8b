//! Input handling for the TUI.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::{Action, Mode};

/// Convert a crossterm Event to an Action for the current mode.
pub fn handle_event(event: &Event, mode: Mode) -> Option<Action> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key_event(key, mode),
        _ => None,
    }
}

fn handle_key_event(key: &KeyEvent, mode: Mode) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(match mode {
            Mode::Normal => Action::Quit,
            Mode::Editing => Action::CancelEdit,
            Mode::Modal => Action::Dismiss,
        });
    }

    match mode {
        Mode::Modal => match key.code {
            KeyCode::Enter | KeyCode::Char('y') => Some(Action::Confirm),
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('q') => Some(Action::Dismiss),
            _ => None,
        },
        Mode::Editing => match key.code {
            KeyCode::Enter => Some(Action::CommitEdit),
            KeyCode::Esc => Some(Action::CancelEdit),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Char(c) => Some(Action::Input(c)),
            _ => None,
        },
        Mode::Normal => match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
            KeyCode::Tab => Some(Action::NextPanel),
            KeyCode::Enter | KeyCode::Char(' ') => Some(Action::Select),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('u') => Some(Action::Unmount),
            KeyCode::Char('e') => Some(Action::Execute),
            KeyCode::Char('d') => Some(Action::Delete),
            KeyCode::Char('f') => Some(Action::ToggleFormat),
            KeyCode::Char('p') => Some(Action::ToggleRepair),
            KeyCode::Char('i') => Some(Action::EditIso),
            KeyCode::Char('x') => Some(Action::ClearIso),
            KeyCode::F(5) => Some(Action::Refresh),
            _ => None,
        },
    }
}
