//! Test surface that fails or panics on demand.

use crate::chart::{ChartPoint, LogicalRange, Marker, PriceLine};

use super::{RenderSurface, SceneSurface, SeriesId, SeriesStyle, SurfaceError, SurfaceOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Fail,
    Panic,
}

#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub remove: Option<Fault>,
    pub set_data: Option<Fault>,
    pub set_markers: Option<Fault>,
    pub price_line: Option<Fault>,
    pub set_range: Option<Fault>,
}

#[derive(Debug, Clone)]
pub struct FlakySurface {
    pub inner: SceneSurface,
    pub faults: Faults,
}

impl FlakySurface {
    pub fn new(options: SurfaceOptions) -> Self {
        Self {
            inner: SceneSurface::new(options),
            faults: Faults::default(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(SurfaceOptions::default())
    }
}

fn trip(fault: Option<Fault>, op: &str) -> Result<(), SurfaceError> {
    match fault {
        Some(Fault::Fail) => Err(SurfaceError::Rejected(format!("{op} refused"))),
        Some(Fault::Panic) => panic!("{op} blew up"),
        None => Ok(()),
    }
}

impl RenderSurface for FlakySurface {
    fn options(&self) -> &SurfaceOptions {
        self.inner.options()
    }

    fn set_time_axis(&mut self, times: &[i64]) -> Result<(), SurfaceError> {
        self.inner.set_time_axis(times)
    }

    fn add_line_series(&mut self, style: SeriesStyle) -> Result<SeriesId, SurfaceError> {
        self.inner.add_line_series(style)
    }

    fn remove_series(&mut self, id: SeriesId) -> Result<(), SurfaceError> {
        trip(self.faults.remove, "remove_series")?;
        self.inner.remove_series(id)
    }

    fn set_series_data(&mut self, id: SeriesId, points: &[ChartPoint]) -> Result<(), SurfaceError> {
        trip(self.faults.set_data, "set_series_data")?;
        self.inner.set_series_data(id, points)
    }

    fn set_markers(&mut self, id: SeriesId, markers: &[Marker]) -> Result<(), SurfaceError> {
        trip(self.faults.set_markers, "set_markers")?;
        self.inner.set_markers(id, markers)
    }

    fn add_price_line(&mut self, id: SeriesId, line: PriceLine) -> Result<(), SurfaceError> {
        trip(self.faults.price_line, "add_price_line")?;
        self.inner.add_price_line(id, line)
    }

    fn subscribe_visible_range_change(&mut self) {
        self.inner.subscribe_visible_range_change()
    }

    fn drain_range_changes(&mut self) -> Vec<LogicalRange> {
        self.inner.drain_range_changes()
    }

    fn visible_logical_range(&self) -> Option<LogicalRange> {
        self.inner.visible_logical_range()
    }

    fn set_visible_logical_range(&mut self, range: LogicalRange) -> Result<(), SurfaceError> {
        trip(self.faults.set_range, "set_visible_logical_range")?;
        self.inner.set_visible_logical_range(range)
    }

    fn fit_content(&mut self) {
        self.inner.fit_content()
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.inner.resize(width, height)
    }

    fn dispose(&mut self) {
        self.inner.dispose()
    }
}
