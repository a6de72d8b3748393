//! Random key sequences against a loaded demo run.
//!
//! Whatever the user presses, the three panes keep showing the same
//! instants, the propagation guard is released, and drawing never fails.

use std::sync::mpsc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use proptest::prelude::*;
use ratatui::backend::TestBackend;
use ratatui::Terminal;

use runscope_core::api::{BacktestApi, DemoApi};
use runscope_core::format::MetricFormatter;
use runscope_core::normalize::TradeReasonPolicy;
use runscope_core::store::FetchKind;
use runscope_core::{GroupState, RenderSurface};
use runscope_tui::app::{AppSettings, AppState, Overlay};
use runscope_tui::worker::{WorkerCommand, WorkerResponse};
use runscope_tui::{input, ui};

fn loaded_app() -> (AppState, mpsc::Receiver<WorkerCommand>) {
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (_resp_tx, resp_rx) = mpsc::channel();
    let settings = AppSettings {
        source_name: "demo".into(),
        policy: TradeReasonPolicy::FallbackLabel,
        formatter: MetricFormatter::new("$"),
    };
    let mut app = AppState::new(settings, cmd_tx, resp_rx);
    let api = DemoApi::new(7);
    app.handle_worker_response(WorkerResponse::Runs(api.runs()));
    app.select_cursor();
    feed(&mut app, &cmd_rx, &api);
    (app, cmd_rx)
}

/// Answer every pending fetch command synchronously.
fn feed(app: &mut AppState, rx: &mpsc::Receiver<WorkerCommand>, api: &DemoApi) {
    while let Ok(cmd) = rx.try_recv() {
        match cmd {
            WorkerCommand::FetchRun { ticket } => {
                for kind in FetchKind::ALL {
                    let result = api.fetch(kind, &ticket.run_id);
                    app.handle_worker_response(WorkerResponse::Fetched {
                        ticket: ticket.clone(),
                        kind,
                        result,
                    });
                }
            }
            WorkerCommand::LoadRuns => app.handle_worker_response(WorkerResponse::Runs(api.runs())),
            WorkerCommand::Shutdown => {}
        }
    }
}

fn arb_key() -> impl Strategy<Value = KeyCode> {
    prop_oneof![
        Just(KeyCode::Char('h')),
        Just(KeyCode::Char('l')),
        Just(KeyCode::Char('+')),
        Just(KeyCode::Char('-')),
        Just(KeyCode::Char('0')),
        Just(KeyCode::Char('j')),
        Just(KeyCode::Char('k')),
        Just(KeyCode::Char('r')),
        Just(KeyCode::Char('?')),
        Just(KeyCode::Char('e')),
        Just(KeyCode::Tab),
        Just(KeyCode::BackTab),
        Just(KeyCode::Enter),
        Just(KeyCode::Esc),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn panes_stay_aligned_under_any_keys(keys in prop::collection::vec(arb_key(), 1..40)) {
        let (mut app, rx) = loaded_app();
        let api = DemoApi::new(7);
        let mut terminal = Terminal::new(TestBackend::new(140, 44)).unwrap();

        for code in keys {
            input::handle_key(&mut app, KeyEvent::new(code, KeyModifiers::NONE));
            feed(&mut app, &rx, &api);

            prop_assert!(!app.sync.is_propagating());
            prop_assert!(app.running);
            prop_assert!(app.cursor < app.store.runs().len());
            prop_assert!(!matches!(app.charts.state(), GroupState::Faulted(_)));

            let ranges: Vec<_> = app
                .charts
                .panes()
                .map(|p| p.surface().visible_logical_range())
                .collect();
            prop_assert!(ranges.iter().all(|r| *r == ranges[0]), "{:?}", ranges);

            let windows: Vec<_> = app
                .charts
                .panes()
                .map(|p| p.surface().visible_time_range())
                .collect();
            prop_assert!(windows.iter().all(|w| *w == windows[0]), "{:?}", windows);

            terminal.draw(|f| ui::draw(f, &app)).unwrap();
        }
    }
}

#[test]
fn quitting_from_an_overlay_needs_two_presses() {
    let (mut app, _rx) = loaded_app();
    input::handle_key(&mut app, KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE));
    input::handle_key(&mut app, KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
    assert_eq!(app.overlay, Overlay::None);
    assert!(app.running);
    input::handle_key(&mut app, KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
    assert!(!app.running);
}
