use crate::application::{App, AppMode, FormItem};
use crossterm::event::{KeyCode, KeyModifiers};

use super::ui::help_line_count;

pub struct InputHandler;

impl InputHandler {
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) && key == KeyCode::Char('c') {
            app.should_quit = true;
            return;
        }

        match app.mode {
            AppMode::Normal => Self::handle_normal_mode(app, key, modifiers),
            AppMode::Editing => Self::handle_editing_mode(app, key),
            AppMode::Help => Self::handle_help_mode(app, key),
        }
    }

    fn handle_normal_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('n') => app.request_next(),
                KeyCode::Char('p') => app.go_previous(),
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Esc => app.should_quit = true,
            KeyCode::F(1) => app.show_help(),
            KeyCode::Up | KeyCode::BackTab => app.focus_previous(),
            KeyCode::Down | KeyCode::Tab => app.focus_next(),
            KeyCode::Enter => app.activate(),
            KeyCode::Delete => app.remove_focused_document(),
            KeyCode::Char(c) => match app.focused_item() {
                // Typing on a text row starts editing it, keeping the value
                Some(FormItem::Text(_)) | Some(FormItem::PreferredName(_)) => {
                    app.start_editing();
                    app.insert_char(c);
                }
                Some(_) if c == ' ' => app.activate(),
                _ => {}
            },
            _ => {}
        }
    }

    fn handle_editing_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => app.finish_editing(),
            KeyCode::Tab => {
                app.finish_editing();
                app.focus_next();
            }
            KeyCode::Esc => app.cancel_editing(),
            KeyCode::Backspace => app.delete_char_before_cursor(),
            KeyCode::Left => app.move_cursor_left(),
            KeyCode::Right => app.move_cursor_right(),
            KeyCode::Home => app.cursor_position = 0,
            KeyCode::End => app.cursor_position = app.input.chars().count(),
            KeyCode::Char(c) => app.insert_char(c),
            _ => {}
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        let max_scroll = help_line_count().saturating_sub(1);
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q') => app.close_help(),
            KeyCode::Up | KeyCode::Char('k') => {
                app.help_scroll = app.help_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll = (app.help_scroll + 1).min(max_scroll);
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll = (app.help_scroll + 5).min(max_scroll);
            }
            KeyCode::Home => app.help_scroll = 0,
            _ => {}
        }
    }
}
