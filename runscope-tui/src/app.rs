//! Application state for the RunScope viewer.
//!
//! `AppState` has exactly one owner, the main loop. Workers only talk to it
//! through the channels.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use runscope_core::api::FetchError;
use runscope_core::domain::RunId;
use runscope_core::format::MetricFormatter;
use runscope_core::normalize::TradeReasonPolicy;
use runscope_core::store::ApplyOutcome;
use runscope_core::{
    ChartError, ChartPane, PaneGroup, PaneKind, RenderSurface, RunStore, SceneSurface, SyncOutcome,
    TimeScaleSynchronizer,
};

use crate::worker::{WorkerCommand, WorkerResponse};

const ERROR_HISTORY_CAP: usize = 50;
/// Fraction of the visible span moved by one pan step.
const PAN_FRACTION: f64 = 0.1;
pub const ZOOM_IN: f64 = 0.8;
pub const ZOOM_OUT: f64 = 1.25;

/// Status bar severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Render,
    Fault,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Network => "NET",
            ErrorCategory::Data => "DATA",
            ErrorCategory::Render => "RENDER",
            ErrorCategory::Fault => "FAULT",
        }
    }

    fn of_chart(err: &ChartError) -> Self {
        match err {
            ChartError::NoDisplayableData => ErrorCategory::Data,
            ChartError::Render { .. } => ErrorCategory::Render,
            ChartError::Faulted(_) => ErrorCategory::Fault,
        }
    }

    fn of_fetch(err: &FetchError) -> Self {
        match err {
            FetchError::Decode { .. } => ErrorCategory::Data,
            _ => ErrorCategory::Network,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    ErrorHistory,
}

/// Settings the app needs from the configuration.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub source_name: String,
    pub policy: TradeReasonPolicy,
    pub formatter: MetricFormatter,
}

pub struct AppState {
    pub running: bool,
    pub source_name: String,

    // Runs and results
    pub store: RunStore,
    pub runs_loading: bool,
    /// Highlighted row in the run selector.
    pub cursor: usize,

    // Charts
    pub charts: PaneGroup<SceneSurface>,
    pub sync: TimeScaleSynchronizer,
    pub focus: PaneKind,
    pub chart_size: (u16, u16),
    pub policy: TradeReasonPolicy,
    pub formatter: MetricFormatter,

    // Worker channels
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,

    // Errors and status
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,
}

fn scene_surfaces((width, height): (u16, u16)) -> impl FnMut(PaneKind) -> SceneSurface {
    move |kind| SceneSurface::new(kind.surface_options(width, height))
}

impl AppState {
    pub fn new(
        settings: AppSettings,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
    ) -> Self {
        let chart_size = (80, 12);
        Self {
            running: true,
            source_name: settings.source_name,
            store: RunStore::new(),
            runs_loading: false,
            cursor: 0,
            charts: PaneGroup::new(scene_surfaces(chart_size)),
            sync: TimeScaleSynchronizer::new(),
            focus: PaneKind::Price,
            chart_size,
            policy: settings.policy,
            formatter: settings.formatter,
            worker_tx,
            worker_rx,
            status_message: None,
            error_history: VecDeque::new(),
            error_scroll: 0,
            overlay: Overlay::None,
        }
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > ERROR_HISTORY_CAP {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }

    fn send(&mut self, cmd: WorkerCommand) {
        if self.worker_tx.send(cmd).is_err() {
            self.push_error(
                ErrorCategory::Network,
                "Background worker is not running".into(),
                String::new(),
            );
        }
    }

    // ── Runs ────────────────────────────────────────────────────────

    pub fn request_runs(&mut self) {
        self.runs_loading = true;
        self.set_status(format!("Loading runs from {}...", self.source_name));
        self.send(WorkerCommand::LoadRuns);
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.store.runs().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
    }

    /// Select the run under the cursor.
    pub fn select_cursor(&mut self) {
        let Some(run) = self.store.runs().get(self.cursor) else {
            return;
        };
        let run_id = run.run_id.clone();
        self.select_run(Some(run_id));
    }

    /// Change the selection: drop everything shown for the previous run and
    /// request the new run's data. `None` clears the view.
    pub fn select_run(&mut self, run: Option<RunId>) {
        let ticket = self.store.select(run);

        if self.charts.fault().is_some() {
            self.charts.recover(scene_surfaces(self.chart_size));
        }
        if let Err(e) = self.charts.clear() {
            self.report_chart_error(e, "clearing charts");
        }

        match ticket {
            Some(ticket) => {
                info!(%ticket, "loading run");
                self.set_status(format!("Loading {}...", ticket.run_id));
                self.send(WorkerCommand::FetchRun { ticket });
            }
            None => self.set_status("Selection cleared"),
        }
    }

    // ── Worker responses ────────────────────────────────────────────

    pub fn handle_worker_response(&mut self, resp: WorkerResponse) {
        match resp {
            WorkerResponse::Runs(Ok(runs)) => {
                self.runs_loading = false;
                let count = runs.len();
                self.store.set_runs(runs);
                self.move_cursor(0);
                if count == 0 {
                    self.set_warning("No runs available");
                } else {
                    self.set_status(format!("{count} runs loaded"));
                }
            }
            WorkerResponse::Runs(Err(e)) => {
                self.runs_loading = false;
                let message = format!("Failed to fetch runs: {e}");
                self.store.set_error(message.clone());
                self.push_error(ErrorCategory::of_fetch(&e), message, "run list".into());
            }
            WorkerResponse::Fetched {
                ticket,
                kind,
                result,
            } => {
                let category = result.as_ref().err().map(ErrorCategory::of_fetch);
                match self.store.apply(&ticket, kind, result) {
                    ApplyOutcome::Stale => {}
                    ApplyOutcome::Failed => {
                        let message = self.store.error().unwrap_or_default().to_string();
                        self.push_error(
                            category.unwrap_or(ErrorCategory::Network),
                            message,
                            ticket.to_string(),
                        );
                    }
                    ApplyOutcome::Applied { charts_dirty } => {
                        if charts_dirty {
                            self.refresh_charts();
                        }
                        if !self.store.is_loading() && self.store.error().is_none() {
                            self.set_status(format!("Loaded {}", ticket.run_id));
                        }
                    }
                }
            }
        }
    }

    /// Rebuild the three panes from the stored signals and trades. Nothing
    /// happens until signals have arrived.
    pub fn refresh_charts(&mut self) {
        let Some(signals) = self.store.signals() else {
            return;
        };
        let result = self
            .charts
            .refresh(signals, self.store.trades(), self.policy, &self.sync);
        match result {
            Ok(summary) => {
                let dropped = summary.report.dropped_price();
                if dropped > 0 || summary.dropped_trades > 0 {
                    self.set_warning(format!(
                        "Skipped {dropped} invalid price rows, {} trades",
                        summary.dropped_trades
                    ));
                }
            }
            Err(e) => self.report_chart_error(e, "chart refresh"),
        }
    }

    fn report_chart_error(&mut self, err: ChartError, context: &str) {
        warn!(error = %err, context, "chart error");
        self.push_error(ErrorCategory::of_chart(&err), err.to_string(), context.into());
    }

    // ── Chart interaction ───────────────────────────────────────────

    pub fn cycle_focus(&mut self, forward: bool) {
        self.focus = if forward {
            self.focus.next()
        } else {
            self.focus.prev()
        };
    }

    /// Pan the focused pane by a tenth of its visible span.
    pub fn pan(&mut self, direction: f64) {
        let span = self
            .charts
            .pane(self.focus)
            .surface()
            .visible_logical_range()
            .map_or(0.0, |r| r.span());
        let bars = (span * PAN_FRACTION).max(1.0) * direction.signum();
        self.interact(|pane| pane.pan(bars));
    }

    pub fn zoom(&mut self, factor: f64) {
        self.interact(|pane| pane.zoom(factor));
    }

    pub fn fit(&mut self) {
        self.interact(|pane| {
            pane.fit();
            Ok(())
        });
    }

    /// Apply a viewport change to the focused pane and let the synchronizer
    /// carry it to the others, all inside the pane group's fault boundary.
    fn interact(
        &mut self,
        f: impl FnOnce(&mut ChartPane<SceneSurface>) -> Result<(), ChartError>,
    ) {
        let focus = self.focus;
        let sync = &self.sync;
        let result = self.charts.guarded(|group| {
            f(group.pane_mut(focus))?;
            let mut first_failure = None;
            for outcome in sync.dispatch_pending(group) {
                if let SyncOutcome::Propagated { failures, .. } = outcome {
                    if let Some((pane, e)) = failures.into_iter().next() {
                        first_failure.get_or_insert(ChartError::render(pane, e));
                    }
                }
            }
            first_failure.map_or(Ok(()), Err)
        });
        match result {
            Ok(Ok(())) => debug!(pane = %focus, "viewport changed"),
            Ok(Err(e)) | Err(e) => self.report_chart_error(e, "viewport change"),
        }
    }

    /// Resize every surface. New surfaces built on recovery use this size.
    pub fn resize_charts(&mut self, width: u16, height: u16) {
        if self.chart_size != (width, height) {
            self.chart_size = (width, height);
            self.charts.resize(width, height);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::mpsc;

    use runscope_core::api::{BacktestApi, DemoApi};
    use runscope_core::store::FetchKind;
    use runscope_core::{GroupState, LogicalRange, RenderSurface};

    pub(crate) fn test_app() -> (AppState, mpsc::Receiver<WorkerCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (_resp_tx, resp_rx) = mpsc::channel();
        let settings = AppSettings {
            source_name: "demo".into(),
            policy: TradeReasonPolicy::RequireReason,
            formatter: MetricFormatter::default(),
        };
        (AppState::new(settings, cmd_tx, resp_rx), cmd_rx)
    }

    /// Select the first demo run and feed every fetch back synchronously.
    pub(crate) fn loaded_app() -> (AppState, mpsc::Receiver<WorkerCommand>) {
        let (mut app, cmd_rx) = test_app();
        let api = DemoApi::default();
        app.handle_worker_response(WorkerResponse::Runs(api.runs()));
        app.select_cursor();
        let WorkerCommand::FetchRun { ticket } = cmd_rx.try_recv().unwrap() else {
            panic!("expected a fetch command");
        };
        for kind in FetchKind::ALL {
            let result = api.fetch(kind, &ticket.run_id);
            app.handle_worker_response(WorkerResponse::Fetched {
                ticket: ticket.clone(),
                kind,
                result,
            });
        }
        (app, cmd_rx)
    }

    #[test]
    fn error_history_capped() {
        let (mut app, _rx) = test_app();
        for i in 0..60 {
            app.push_error(ErrorCategory::Data, format!("error {i}"), String::new());
        }
        assert_eq!(app.error_history.len(), 50);
        assert!(app.error_history[0].message.contains("59"));
        assert_eq!(app.status_message.as_ref().unwrap().1, StatusLevel::Error);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let (mut app, _rx) = test_app();
        app.move_cursor(3);
        assert_eq!(app.cursor, 0);
        app.handle_worker_response(WorkerResponse::Runs(DemoApi::default().runs()));
        app.move_cursor(10);
        assert_eq!(app.cursor, 2);
        app.move_cursor(-10);
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn loaded_run_fills_charts_and_metrics() {
        let (app, _rx) = loaded_app();
        assert!(!app.store.is_loading());
        assert!(matches!(app.charts.state(), GroupState::Ready(_)));
        assert!(app.charts.panes().all(|p| p.has_data()));
        assert!(app.store.metrics().is_some());
    }

    #[test]
    fn stale_response_is_ignored() {
        let (mut app, cmd_rx) = test_app();
        let api = DemoApi::default();
        let runs = api.runs().unwrap();
        app.handle_worker_response(WorkerResponse::Runs(Ok(runs.clone())));

        app.select_run(Some(runs[0].run_id.clone()));
        let WorkerCommand::FetchRun { ticket: old } = cmd_rx.try_recv().unwrap() else {
            panic!("expected a fetch command");
        };
        app.select_run(Some(runs[1].run_id.clone()));

        app.handle_worker_response(WorkerResponse::Fetched {
            ticket: old.clone(),
            kind: FetchKind::Signals,
            result: api.fetch(FetchKind::Signals, &old.run_id),
        });
        assert!(app.store.signals().is_none());
        assert!(app.charts.panes().all(|p| !p.has_data()));
    }

    #[test]
    fn fetch_failure_is_recorded() {
        let (mut app, cmd_rx) = test_app();
        app.select_run(Some(RunId::new("nope")));
        let WorkerCommand::FetchRun { ticket } = cmd_rx.try_recv().unwrap() else {
            panic!("expected a fetch command");
        };
        let result = DemoApi::default().fetch(FetchKind::Metrics, &ticket.run_id);
        app.handle_worker_response(WorkerResponse::Fetched {
            ticket,
            kind: FetchKind::Metrics,
            result,
        });
        let record = &app.error_history[0];
        assert_eq!(record.category, ErrorCategory::Network);
        assert!(record.message.starts_with("Failed to fetch metrics"));
        assert!(app.store.error().is_some());
    }

    #[test]
    fn clearing_selection_empties_charts() {
        let (mut app, _rx) = loaded_app();
        app.select_run(None);
        assert!(app.store.selected().is_none());
        assert!(app.charts.panes().all(|p| !p.has_data()));
        assert_eq!(app.charts.state(), &GroupState::Empty);
    }

    #[test]
    fn zoom_on_focused_pane_moves_all_panes() {
        let (mut app, _rx) = loaded_app();
        app.focus = PaneKind::Oscillator;
        app.zoom(ZOOM_IN);
        app.pan(-1.0);

        let target = app
            .charts
            .pane(PaneKind::Oscillator)
            .surface()
            .visible_logical_range()
            .unwrap();
        let full = LogicalRange::fitting(
            app.charts
                .pane(PaneKind::Oscillator)
                .surface()
                .bar_count(),
        );
        assert!(target.span() < full.span());
        for pane in app.charts.panes() {
            assert_eq!(pane.surface().visible_logical_range(), Some(target));
        }
        assert!(!app.sync.is_propagating());

        app.fit();
        for pane in app.charts.panes() {
            assert_eq!(pane.surface().visible_logical_range(), Some(full));
        }
    }

    #[test]
    fn focus_cycles_through_panes() {
        let (mut app, _rx) = test_app();
        app.cycle_focus(true);
        assert_eq!(app.focus, PaneKind::Trade);
        app.cycle_focus(false);
        app.cycle_focus(false);
        assert_eq!(app.focus, PaneKind::Oscillator);
    }
}
