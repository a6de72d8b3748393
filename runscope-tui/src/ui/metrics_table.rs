//! Metrics for the selected run, one labelled row per key.

use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};

use runscope_core::domain::metric_label;
use runscope_core::format::NOT_AVAILABLE;
use runscope_core::store::FetchKind;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(false))
        .title(" Metrics ")
        .title_style(theme::panel_title(false));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(metrics) = app.store.metrics() else {
        let msg = if app.store.selected().is_none() {
            "Select a run"
        } else if app.store.is_pending(FetchKind::Metrics) {
            "Loading metrics..."
        } else {
            "No metrics"
        };
        f.render_widget(Paragraph::new(Span::styled(msg, theme::muted())), inner);
        return;
    };

    let rows: Vec<Row> = metrics
        .display_keys()
        .into_iter()
        .map(|key| {
            let value = app.formatter.format(metrics.get(key).as_ref(), key);
            let style = if value == NOT_AVAILABLE {
                theme::muted()
            } else {
                theme::text()
            };
            Row::new(vec![
                Span::styled(metric_label(key), theme::text_secondary()),
                Span::styled(value, style),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Percentage(55), Constraint::Percentage(45)])
        .column_spacing(1);
    f.render_widget(table, inner);
}
