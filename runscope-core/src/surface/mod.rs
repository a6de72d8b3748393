//! The rendering-surface capability the chart panes drive.
//!
//! A surface is one independently rendered chart: it owns line series,
//! their markers and price lines, and a time scale with a visible logical
//! range. Logical index `i` is the `i`-th bar of the surface's time axis, so
//! surfaces given the same axis agree on which instant an index means. Range-change notifications are queued by the surface while it is
//! subscribed and drained by its owner; the owner decides how to deliver them.
//!
//! [`SceneSurface`] is the in-memory implementation: it enforces the ordering
//! contract and keeps everything a front-end needs to draw.

pub mod scene;

#[cfg(test)]
pub(crate) mod flaky;

use thiserror::Error;

use crate::chart::{ChartPoint, LogicalRange, Marker, PriceLine, Tint};

pub use scene::{SceneSeries, SceneSurface};

/// Handle to a series inside one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceTheme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrosshairMode {
    #[default]
    Normal,
    Magnet,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScaleOptions {
    pub time_visible: bool,
    pub seconds_visible: bool,
}

impl Default for TimeScaleOptions {
    fn default() -> Self {
        Self {
            time_visible: true,
            seconds_visible: false,
        }
    }
}

/// Creation options for a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOptions {
    pub width: u16,
    pub height: u16,
    pub theme: SurfaceTheme,
    pub crosshair: CrosshairMode,
    pub time_scale: TimeScaleOptions,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            width: 80,
            height: 12,
            theme: SurfaceTheme::Dark,
            crosshair: CrosshairMode::Normal,
            time_scale: TimeScaleOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStyle {
    pub title: String,
    pub color: Tint,
    pub line_width: u8,
}

impl SeriesStyle {
    pub fn line(title: impl Into<String>, color: Tint) -> Self {
        Self {
            title: title.into(),
            color,
            line_width: 2,
        }
    }
}

/// Operations a surface may refuse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("surface has been disposed")]
    Disposed,

    #[error("unknown series {0:?}")]
    UnknownSeries(SeriesId),

    #[error("series data must be strictly increasing in time (index {index})")]
    UnorderedData { index: usize },

    #[error("series value at index {index} is not finite")]
    NonFiniteValue { index: usize },

    #[error("time axis must be strictly increasing (index {index})")]
    UnorderedAxis { index: usize },

    #[error("point at index {index} is not on the time axis")]
    OffAxis { index: usize },

    #[error("marker times must be non-decreasing (index {index})")]
    UnsortedMarkers { index: usize },

    #[error("invalid logical range {from}..{to}")]
    InvalidRange { from: f64, to: f64 },

    #[error("surface rejected operation: {0}")]
    Rejected(String),
}

/// Chart-engine capability used by a pane.
pub trait RenderSurface {
    fn options(&self) -> &SurfaceOptions;

    /// Set the bar times of the time scale. Every later series point must
    /// sit on one of them. An empty axis places points by their own order.
    fn set_time_axis(&mut self, times: &[i64]) -> Result<(), SurfaceError>;

    fn add_line_series(&mut self, style: SeriesStyle) -> Result<SeriesId, SurfaceError>;

    fn remove_series(&mut self, id: SeriesId) -> Result<(), SurfaceError>;

    /// Replace all points of a series. Points must be strictly increasing in
    /// time and finite.
    fn set_series_data(&mut self, id: SeriesId, points: &[ChartPoint]) -> Result<(), SurfaceError>;

    /// Replace the marker set of a series. Times must be non-decreasing.
    fn set_markers(&mut self, id: SeriesId, markers: &[Marker]) -> Result<(), SurfaceError>;

    fn add_price_line(&mut self, id: SeriesId, line: PriceLine) -> Result<(), SurfaceError>;

    /// Start queueing a notification for every visible-range change.
    fn subscribe_visible_range_change(&mut self);

    /// Take the queued range-change notifications, oldest first.
    fn drain_range_changes(&mut self) -> Vec<LogicalRange>;

    fn visible_logical_range(&self) -> Option<LogicalRange>;

    fn set_visible_logical_range(&mut self, range: LogicalRange) -> Result<(), SurfaceError>;

    /// Show every bar of the time axis, or of the longest series without one.
    fn fit_content(&mut self);

    fn resize(&mut self, width: u16, height: u16);

    /// Release everything. Every later mutating call fails with `Disposed`.
    fn dispose(&mut self);
}
