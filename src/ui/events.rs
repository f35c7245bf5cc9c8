use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app_state::events::{Effect, Event, InputEvent};
use crate::app_state::{Controller, UiState};

/// Handle input events and return the effects they caused
pub fn handle_input(event: InputEvent, controller: &mut Controller) -> Vec<Effect> {
    match event {
        InputEvent::Key(key) => handle_key_event(key, controller),
        InputEvent::Resize(_width, _height) => {
            // Terminal resize is handled automatically by ratatui
            Vec::new()
        }
    }
}

/// Handle keyboard events
fn handle_key_event(key: KeyEvent, controller: &mut Controller) -> Vec<Effect> {
    if key.kind != KeyEventKind::Press {
        return Vec::new();
    }

    // Handle Ctrl-C to quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return controller.handle(Event::Quit);
    }

    if controller.state().input.editing {
        return handle_input_mode(key, controller);
    }

    match key_to_event(key, controller) {
        Some(event) => controller.handle(event),
        None => Vec::new(),
    }
}

/// Handle input when the URL field has focus
fn handle_input_mode(key: KeyEvent, controller: &mut Controller) -> Vec<Effect> {
    let input = controller.input_mut();
    match key.code {
        KeyCode::Enter => {
            input.editing = false;
            let url = input.text.trim().to_string();
            controller.handle(Event::Submit(url))
        }
        KeyCode::Esc => {
            input.editing = false;
            Vec::new()
        }
        KeyCode::Char(c) => {
            input.text.push(c);
            Vec::new()
        }
        KeyCode::Backspace => {
            input.text.pop();
            Vec::new()
        }
        KeyCode::Delete => {
            input.text.clear();
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// Map a shortcut to a controller event for the current state
fn key_to_event(key: KeyEvent, controller: &mut Controller) -> Option<Event> {
    let state = controller.state();

    match key.code {
        KeyCode::Char('q') => Some(Event::Quit),
        KeyCode::Char('i') | KeyCode::Char('/') => {
            controller.input_mut().editing = true;
            None
        }
        KeyCode::Esc | KeyCode::Char('x') => Some(Event::Reset),
        KeyCode::Char('r') => Some(Event::Retry),
        KeyCode::Char('s') => Some(Event::SaveArtifact),
        KeyCode::Up | KeyCode::Char('k') => Some(Event::MoveSelection(-1)),
        KeyCode::Down | KeyCode::Char('j') => Some(Event::MoveSelection(1)),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c.to_digit(10)? as usize - 1;
            let format_id = state.preview.as_ref()?.formats.get(index)?.format_id.clone();
            Some(Event::SelectFormat(format_id))
        }
        KeyCode::Enter => {
            if matches!(state.ui, UiState::Error(_)) {
                Some(Event::Retry)
            } else if state.ui == UiState::Idle {
                controller.input_mut().editing = true;
                None
            } else {
                Some(Event::ConfirmDownload)
            }
        }
        KeyCode::Char('d') => Some(Event::ConfirmDownload),
        _ => None,
    }
}
