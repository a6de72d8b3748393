//! One chart pane drawn from a scene surface.
//!
//! Direct buffer writes, one terminal column per slice of the visible
//! logical range. Bars are positioned through the surface's time axis, so a
//! series with warm-up gaps lines up with the panes above it:
//! - Series: `•` at each column's last value, `│` joining adjacent columns
//! - Markers: `▲`/`▼`/`●` one row above or below the bar they annotate
//! - Price lines: dashed horizontal lines with their title at the left edge
//! - Time axis: first and last visible bar times, when the surface shows time

use chrono::DateTime;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Widget},
};

use runscope_core::chart::{ChartPoint, LineStyle, LogicalRange};
use runscope_core::surface::SceneSeries;
use runscope_core::{MarkerPosition, MarkerShape, PaneKind, RenderSurface, SceneSurface};

use crate::theme::{self, Theme};

const LABEL_WIDTH: u16 = 8;

pub struct ChartPaneView<'a> {
    kind: PaneKind,
    surface: &'a SceneSurface,
    theme: &'a Theme,
    focused: bool,
}

impl<'a> ChartPaneView<'a> {
    pub fn new(kind: PaneKind, surface: &'a SceneSurface, theme: &'a Theme) -> Self {
        Self {
            kind,
            surface,
            theme,
            focused: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    fn series(&self) -> Option<&'a SceneSeries> {
        self.surface.series().first().filter(|s| !s.points.is_empty())
    }
}

/// Map a value to a row offset in the plot area (0 = top).
fn value_to_y(value: f64, y_min: f64, y_max: f64, plot_height: u16) -> u16 {
    if (y_max - y_min).abs() < 1e-9 || plot_height == 0 {
        return 0;
    }
    let frac = (value - y_min) / (y_max - y_min);
    let y = plot_height.saturating_sub(1) as f64 * (1.0 - frac);
    y.round().max(0.0).min(plot_height.saturating_sub(1) as f64) as u16
}

/// Map a logical bar index to a column offset in the plot area.
fn index_to_x(index: f64, range: LogicalRange, plot_width: u16) -> u16 {
    let frac = (index - range.from) / range.span();
    (frac * plot_width as f64)
        .floor()
        .max(0.0)
        .min(plot_width.saturating_sub(1) as f64) as u16
}

fn value_bounds(points: &[ChartPoint], series: &SceneSeries) -> (f64, f64) {
    let mut lo = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
    let mut hi = points.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
    for line in &series.price_lines {
        lo = lo.min(line.price);
        hi = hi.max(line.price);
    }
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

fn time_label(time: i64, seconds: bool) -> String {
    let fmt = if seconds { "%m-%d %H:%M:%S" } else { "%m-%d %H:%M" };
    DateTime::from_timestamp(time, 0)
        .map(|t| t.format(fmt).to_string())
        .unwrap_or_default()
}

impl Widget for ChartPaneView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let series = self.series();
        let range = self.surface.visible_logical_range();

        let title = match series {
            Some(s) => format!(
                " {} | {} pts | {} markers ",
                self.kind.label(),
                s.points.len(),
                s.markers.len()
            ),
            None => format!(" {} [No Data] ", self.kind.label()),
        };
        let block = Block::default()
            .title(Span::styled(title, theme::panel_title(self.focused)))
            .borders(Borders::ALL)
            .border_style(theme::panel_border(self.focused))
            .style(Style::default().bg(self.theme.background));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let (Some(series), Some(range)) = (series, range) else {
            return;
        };
        let bars = self.surface.visible_bars();
        let visible = self.surface.points_in(series, bars.clone());
        if visible.is_empty() {
            buf.set_string(inner.x + 1, inner.y, "Nothing in view (0 to fit)", theme::muted());
            return;
        }

        let time_scale = self.surface.options().time_scale;
        let plot_left = inner.x + LABEL_WIDTH;
        let plot_top = inner.y;
        let plot_width = inner.width.saturating_sub(LABEL_WIDTH);
        let plot_height = inner.height.saturating_sub(u16::from(time_scale.time_visible));
        if plot_width < 2 || plot_height < 2 {
            return;
        }

        let (y_lower, y_upper) = value_bounds(visible, series);

        // Y-axis labels
        let y_labels = [y_upper, (y_upper + y_lower) / 2.0, y_lower];
        let y_positions = [0u16, plot_height / 2, plot_height - 1];
        for (value, y_pos) in y_labels.iter().zip(y_positions) {
            buf.set_string(
                inner.x,
                plot_top + y_pos,
                format!("{:>7.1}", value),
                Style::default().fg(self.theme.muted),
            );
        }

        // Price lines under the series
        for line in &series.price_lines {
            let py = plot_top + value_to_y(line.price, y_lower, y_upper, plot_height);
            let color = self.theme.tint(line.color);
            let style = Style::default().fg(color).add_modifier(Modifier::DIM);
            for x in plot_left..plot_left + plot_width {
                let ch = match line.style {
                    LineStyle::Solid => "─",
                    LineStyle::Dashed if (x - plot_left) % 3 == 0 => "-",
                    LineStyle::Dotted if (x - plot_left) % 2 == 0 => "·",
                    _ => " ",
                };
                buf.set_string(x, py, ch, style);
            }
        }

        // Series: last value per column, joined vertically
        let style = Style::default().fg(self.theme.tint(series.style.color));
        let mut columns: Vec<Option<u16>> = vec![None; plot_width as usize];
        for point in visible {
            let Some(index) = self.surface.bar_index(point.time) else {
                continue;
            };
            let x = index_to_x(index as f64, range, plot_width);
            columns[x as usize] = Some(value_to_y(point.value, y_lower, y_upper, plot_height));
        }
        let mut prev: Option<u16> = None;
        for (x, y) in columns.iter().enumerate() {
            let Some(y) = *y else { continue };
            let px = plot_left + x as u16;
            if let Some(p) = prev {
                for gap in p.min(y) + 1..p.max(y) {
                    buf.set_string(px, plot_top + gap, "│", style);
                }
            }
            buf.set_string(px, plot_top + y, "•", style);
            prev = Some(y);
        }

        // Price line titles stay readable over the series
        for line in &series.price_lines {
            let py = plot_top + value_to_y(line.price, y_lower, y_upper, plot_height);
            buf.set_string(
                plot_left,
                py,
                &line.title,
                Style::default()
                    .fg(self.theme.tint(line.color))
                    .add_modifier(Modifier::BOLD),
            );
        }

        // Markers on their bar, off the line
        for marker in &series.markers {
            let Some(index) = self.surface.bar_index(marker.time) else {
                continue;
            };
            if !bars.contains(&index) {
                continue;
            }
            let Ok(at) = visible.binary_search_by_key(&marker.time, |p| p.time) else {
                continue;
            };
            let x = plot_left + index_to_x(index as f64, range, plot_width);
            let y = value_to_y(visible[at].value, y_lower, y_upper, plot_height);
            let y = match marker.position {
                MarkerPosition::AboveBar => y.saturating_sub(1),
                MarkerPosition::BelowBar => (y + 1).min(plot_height - 1),
            };
            let glyph = match marker.shape {
                MarkerShape::ArrowUp => "▲",
                MarkerShape::ArrowDown => "▼",
                MarkerShape::Circle => "●",
            };
            buf.set_string(
                x,
                plot_top + y,
                glyph,
                Style::default()
                    .fg(self.theme.tint(marker.color))
                    .add_modifier(Modifier::BOLD),
            );
        }

        // Time axis
        if let (true, Some((from, to))) =
            (time_scale.time_visible, self.surface.visible_time_range())
        {
            let axis_y = plot_top + plot_height;
            let first = time_label(from, time_scale.seconds_visible);
            let last = time_label(to, time_scale.seconds_visible);
            let muted = Style::default().fg(self.theme.muted);
            buf.set_string(plot_left, axis_y, &first, muted);
            let last_width = last.chars().count() as u16;
            if plot_width > first.chars().count() as u16 + last_width + 1 {
                buf.set_string(plot_left + plot_width - last_width, axis_y, &last, muted);
            }
        }
    }
}
