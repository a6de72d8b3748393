//! Top-level UI layout: run list and metrics on the left, the three
//! synchronized chart panes on the right, status bar at the bottom.

pub mod chart_pane;
pub mod metrics_table;
pub mod overlays;
pub mod run_selector;
pub mod status_bar;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use runscope_core::PaneKind;

use crate::app::{AppState, Overlay};
use crate::theme::{self, Theme};
use crate::ui::chart_pane::ChartPaneView;

const SIDEBAR_WIDTH: u16 = 38;

/// Draw the entire UI.
pub fn draw(f: &mut Frame, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());
    let main_area = chunks[0];
    let status_area = chunks[1];

    let (sidebar, charts) = split_main(main_area);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Min(5)])
        .split(sidebar);
    run_selector::render(f, side[0], app);
    metrics_table::render(f, side[1], app);

    draw_charts(f, charts, app);
    status_bar::render(f, status_area, app);

    match app.overlay {
        Overlay::Help => overlays::render_help(f, main_area),
        Overlay::ErrorHistory => overlays::render_error_history(f, main_area, app),
        Overlay::None => {}
    }
}

fn split_main(area: Rect) -> (Rect, Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(area);
    (cols[0], cols[1])
}

fn pane_areas(area: Rect) -> [Rect; 3] {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(32),
            Constraint::Percentage(28),
        ])
        .split(area);
    [rows[0], rows[1], rows[2]]
}

/// Size of one chart pane for a terminal of `area`, used to size surfaces.
pub fn pane_size(area: Rect) -> (u16, u16) {
    let main = Rect {
        height: area.height.saturating_sub(1),
        ..area
    };
    let (_, charts) = split_main(main);
    let [price, _, _] = pane_areas(charts);
    (price.width, price.height)
}

fn draw_charts(f: &mut Frame, area: Rect, app: &AppState) {
    if let Some(reason) = app.charts.fault() {
        draw_fault(f, area, reason);
        return;
    }

    let mut area = area;
    if let Some(err) = app.store.error() {
        let banner = Rect { height: 1, ..area };
        f.render_widget(
            Paragraph::new(Span::styled(format!(" {err}"), theme::negative())),
            banner,
        );
        area.y += 1;
        area.height = area.height.saturating_sub(1);
    }

    let theme = Theme::default();
    for (kind, rect) in PaneKind::ALL.into_iter().zip(pane_areas(area)) {
        let view = ChartPaneView::new(kind, app.charts.pane(kind).surface(), &theme)
            .focused(app.focus == kind);
        f.render_widget(view, rect);
    }
}

/// Static stand-in for the chart region after a caught panic.
fn draw_fault(f: &mut Frame, area: Rect, reason: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::negative())
        .title(" Charts unavailable ")
        .title_style(theme::negative());
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "The chart region stopped after an internal error.",
            theme::negative(),
        )),
        Line::from(Span::styled(format!("  {reason}"), theme::muted())),
        Line::from(""),
        Line::from(Span::styled(
            "Select a run to rebuild the charts. [e] error history",
            theme::text_secondary(),
        )),
    ];
    f.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
