//! Event handling for the portals TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode, InputTarget};
use crate::ui::FocusedPanel;

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a mouse event
fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> EventResult {
    match (mouse.kind, app.focused_panel) {
        (MouseEventKind::ScrollUp, FocusedPanel::Console) => app.scroll_up(3),
        (MouseEventKind::ScrollDown, FocusedPanel::Console) => app.scroll_down(3),
        (MouseEventKind::ScrollUp, FocusedPanel::Chronicle) => app.chronicle.select_prev(),
        (MouseEventKind::ScrollDown, FocusedPanel::Chronicle) => {
            app.chronicle.select_next(app.session.story().len())
        }
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Handle a key event
fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    if app.has_overlay() {
        return handle_overlay_key(app, key);
    }

    let result = match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Insert => handle_insert_mode(app, key),
        InputMode::Command => handle_command_mode(app, key),
    };

    if app.should_quit {
        EventResult::Quit
    } else {
        result
    }
}

/// Handle keys in NORMAL mode
fn handle_normal_mode(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        // Oracle controls
        KeyCode::Char('c') => app.trigger_consult(),
        KeyCode::Char('C') => app.request_connect(None),
        KeyCode::Char('m') => app.begin_edit(InputTarget::Model),
        KeyCode::Char('d') => app.begin_edit(InputTarget::Date),
        KeyCode::Char(':') => app.enter_command_mode(),

        KeyCode::Char('?') | KeyCode::F(1) => app.toggle_help(),
        KeyCode::Char('q') => app.request_quit(),

        KeyCode::Tab | KeyCode::BackTab => app.cycle_focus(),

        _ => return handle_panel_keys(app, key),
    }
    EventResult::NeedsRedraw
}

/// Navigation keys for whichever panel is focused
fn handle_panel_keys(app: &mut App, key: KeyEvent) -> EventResult {
    let chapters = app.session.story().len();

    match (app.focused_panel, key.code) {
        (FocusedPanel::Console, KeyCode::Char('j') | KeyCode::Down) => app.scroll_down(1),
        (FocusedPanel::Console, KeyCode::Char('k') | KeyCode::Up) => app.scroll_up(1),
        (FocusedPanel::Console, KeyCode::PageDown) => app.scroll_down(10),
        (FocusedPanel::Console, KeyCode::PageUp) => app.scroll_up(10),
        (FocusedPanel::Console, KeyCode::Char('g')) => app.scroll_to_top(),
        (FocusedPanel::Console, KeyCode::Char('G')) => app.scroll_to_bottom(),
        (FocusedPanel::Console, KeyCode::Enter) => app.trigger_consult(),

        (FocusedPanel::Chronicle, KeyCode::Char('j') | KeyCode::Down) => {
            app.chronicle.select_next(chapters)
        }
        (FocusedPanel::Chronicle, KeyCode::Char('k') | KeyCode::Up) => app.chronicle.select_prev(),
        (FocusedPanel::Chronicle, KeyCode::Char('g')) => app.chronicle.select_latest(),
        (FocusedPanel::Chronicle, KeyCode::Char('G')) => app.chronicle.select_oldest(chapters),
        (FocusedPanel::Chronicle, KeyCode::Enter | KeyCode::Char(' ')) => {
            app.chronicle.toggle_selected(chapters)
        }

        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Handle keys in INSERT mode (editing a console field)
fn handle_insert_mode(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc => app.enter_normal_mode(),
        KeyCode::Enter => app.submit_input(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Char(c) => app.type_char(c),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Handle keys in COMMAND mode (: commands)
fn handle_command_mode(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc => app.enter_normal_mode(),

        KeyCode::Enter => {
            let command = app.input_buffer().to_string();
            app.enter_normal_mode();
            if command.len() > 1 {
                app.process_command(&command);
            }
        }

        KeyCode::Left => {
            if app.cursor_position() > 1 {
                app.cursor_left();
            }
        }
        KeyCode::Right => app.cursor_right(),
        KeyCode::Backspace => {
            if app.cursor_position() > 1 {
                app.backspace();
            } else {
                // Backspace on just ":" exits command mode
                app.enter_normal_mode();
            }
        }

        KeyCode::Char(c) => app.type_char(c),

        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Handle key when overlay is open
fn handle_overlay_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.close_overlay();
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}
