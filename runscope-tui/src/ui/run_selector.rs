//! Run list: cursor row highlighted, selected run marked.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let runs = app.store.runs();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(false))
        .title(format!(" Runs ({}) ", runs.len()))
        .title_style(theme::panel_title(false));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if runs.is_empty() {
        let msg = if app.runs_loading {
            "Loading runs..."
        } else {
            "No runs. [r] reload"
        };
        f.render_widget(Paragraph::new(Span::styled(msg, theme::muted())), inner);
        return;
    }

    // Keep the cursor in view.
    let height = inner.height.max(1) as usize;
    let start = app.cursor.saturating_sub(height - 1);
    let selected = app.store.selected();

    let lines: Vec<Line> = runs
        .iter()
        .enumerate()
        .skip(start)
        .take(height)
        .map(|(i, run)| {
            let is_selected = selected == Some(&run.run_id);
            let marker = if is_selected { "▶ " } else { "  " };
            let mut style = if is_selected {
                theme::accent()
            } else {
                theme::text_secondary()
            };
            if i == app.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(vec![
                Span::styled(marker, theme::accent()),
                Span::styled(run.label(), style),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
}
