//! Keyboard dispatch.
//!
//! Priority: open overlay, then global keys, then run selector and chart keys.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{AppState, Overlay, ZOOM_IN, ZOOM_OUT};

pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Key release/repeat events show up on some terminals.
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.overlay != Overlay::None {
        handle_overlay_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.running = false
        }
        KeyCode::Char('?') => app.overlay = Overlay::Help,
        KeyCode::Char('e') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
        }
        KeyCode::Char('r') => app.request_runs(),

        // Run selector
        KeyCode::Char('j') | KeyCode::Down => app.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_cursor(-1),
        KeyCode::Enter => app.select_cursor(),
        KeyCode::Esc => app.select_run(None),

        // Charts
        KeyCode::Tab => app.cycle_focus(true),
        KeyCode::BackTab => app.cycle_focus(false),
        KeyCode::Char('h') | KeyCode::Left => app.pan(-1.0),
        KeyCode::Char('l') | KeyCode::Right => app.pan(1.0),
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom(ZOOM_IN),
        KeyCode::Char('-') => app.zoom(ZOOM_OUT),
        KeyCode::Char('0') => app.fit(),
        _ => {}
    }
}

fn handle_overlay_key(app: &mut AppState, key: KeyEvent) {
    match app.overlay {
        Overlay::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.overlay = Overlay::None;
            }
        }
        Overlay::ErrorHistory => match key.code {
            KeyCode::Esc | KeyCode::Char('e') | KeyCode::Char('q') => {
                app.overlay = Overlay::None;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if app.error_scroll + 1 < app.error_history.len() {
                    app.error_scroll += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                app.error_scroll = app.error_scroll.saturating_sub(1);
            }
            _ => {}
        },
        Overlay::None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{loaded_app, test_app};
    use crate::app::ErrorCategory;
    use crate::worker::WorkerCommand;
    use crossterm::event::KeyEventState;
    use runscope_core::{PaneKind, RenderSurface};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn release_events_are_ignored() {
        let (mut app, _rx) = test_app();
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        handle_key(&mut app, release);
        assert!(app.running);
        handle_key(&mut app, press(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[test]
    fn overlay_swallows_keys() {
        let (mut app, _rx) = test_app();
        handle_key(&mut app, press(KeyCode::Char('?')));
        assert_eq!(app.overlay, Overlay::Help);
        handle_key(&mut app, press(KeyCode::Char('r')));
        assert!(!app.runs_loading);
        handle_key(&mut app, press(KeyCode::Esc));
        assert_eq!(app.overlay, Overlay::None);
    }

    #[test]
    fn error_history_scrolls_within_bounds() {
        let (mut app, _rx) = test_app();
        for i in 0..3 {
            app.push_error(ErrorCategory::Data, format!("e{i}"), String::new());
        }
        handle_key(&mut app, press(KeyCode::Char('e')));
        for _ in 0..5 {
            handle_key(&mut app, press(KeyCode::Char('j')));
        }
        assert_eq!(app.error_scroll, 2);
        handle_key(&mut app, press(KeyCode::Up));
        assert_eq!(app.error_scroll, 1);
    }

    #[test]
    fn reload_asks_the_worker() {
        let (mut app, rx) = test_app();
        handle_key(&mut app, press(KeyCode::Char('r')));
        assert!(app.runs_loading);
        assert!(matches!(rx.try_recv(), Ok(WorkerCommand::LoadRuns)));
    }

    #[test]
    fn chart_keys_drive_the_focused_pane() {
        let (mut app, _rx) = loaded_app();
        handle_key(&mut app, press(KeyCode::Tab));
        assert_eq!(app.focus, PaneKind::Trade);

        let before = app
            .charts
            .pane(PaneKind::Trade)
            .surface()
            .visible_logical_range()
            .unwrap();
        handle_key(&mut app, press(KeyCode::Char('+')));
        handle_key(&mut app, press(KeyCode::Char('h')));
        let after = app
            .charts
            .pane(PaneKind::Price)
            .surface()
            .visible_logical_range()
            .unwrap();
        assert!(after.span() < before.span());
        assert!(after.from < before.from + (before.span() - after.span()) / 2.0);
    }

    #[test]
    fn escape_clears_the_selection() {
        let (mut app, _rx) = loaded_app();
        handle_key(&mut app, press(KeyCode::Esc));
        assert!(app.store.selected().is_none());
    }
}
