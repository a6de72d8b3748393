//! In-memory [`RenderSurface`]: validates every call and keeps the scene for
//! a front-end to draw.

use std::ops::Range;

use crate::chart::{ChartPoint, LogicalRange, Marker, PriceLine};

use super::{RenderSurface, SeriesId, SeriesStyle, SurfaceError, SurfaceOptions};

/// One line series as last loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSeries {
    pub id: SeriesId,
    pub style: SeriesStyle,
    pub points: Vec<ChartPoint>,
    pub markers: Vec<Marker>,
    pub price_lines: Vec<PriceLine>,
}

#[derive(Debug, Clone)]
pub struct SceneSurface {
    options: SurfaceOptions,
    axis: Vec<i64>,
    series: Vec<SceneSeries>,
    next_id: u32,
    visible: Option<LogicalRange>,
    subscribed: bool,
    pending: Vec<LogicalRange>,
    disposed: bool,
}

impl SceneSurface {
    pub fn new(options: SurfaceOptions) -> Self {
        Self {
            options,
            axis: Vec::new(),
            series: Vec::new(),
            next_id: 1,
            visible: None,
            subscribed: false,
            pending: Vec::new(),
            disposed: false,
        }
    }

    pub fn series(&self) -> &[SceneSeries] {
        &self.series
    }

    pub fn series_by_id(&self, id: SeriesId) -> Option<&SceneSeries> {
        self.series.iter().find(|s| s.id == id)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn time_axis(&self) -> &[i64] {
        &self.axis
    }

    /// Bars on the time scale: the axis, or the longest series without one.
    pub fn bar_count(&self) -> usize {
        if self.axis.is_empty() {
            self.longest().map_or(0, |s| s.points.len())
        } else {
            self.axis.len()
        }
    }

    /// Time of bar `index`.
    pub fn bar_time(&self, index: usize) -> Option<i64> {
        if self.axis.is_empty() {
            self.longest()?.points.get(index).map(|p| p.time)
        } else {
            self.axis.get(index).copied()
        }
    }

    /// Logical index of the bar at `time`, if there is one.
    pub fn bar_index(&self, time: i64) -> Option<usize> {
        if self.axis.is_empty() {
            self.longest()?
                .points
                .binary_search_by_key(&time, |p| p.time)
                .ok()
        } else {
            self.axis.binary_search(&time).ok()
        }
    }

    /// Bars at least partly inside the visible range.
    pub fn visible_bars(&self) -> Range<usize> {
        self.visible_logical_range()
            .map_or(0..0, |r| r.bar_indices(self.bar_count()))
    }

    /// First and last visible bar times.
    pub fn visible_time_range(&self) -> Option<(i64, i64)> {
        let bars = self.visible_bars();
        if bars.is_empty() {
            return None;
        }
        Some((self.bar_time(bars.start)?, self.bar_time(bars.end - 1)?))
    }

    /// The points of `series` that fall on bars in `bars`.
    pub fn points_in<'s>(&self, series: &'s SceneSeries, bars: Range<usize>) -> &'s [ChartPoint] {
        if bars.is_empty() {
            return &[];
        }
        let (Some(first), Some(last)) = (self.bar_time(bars.start), self.bar_time(bars.end - 1))
        else {
            return &[];
        };
        let lo = series.points.partition_point(|p| p.time < first);
        let hi = series.points.partition_point(|p| p.time <= last);
        &series.points[lo..hi.max(lo)]
    }

    fn longest(&self) -> Option<&SceneSeries> {
        self.series.iter().max_by_key(|s| s.points.len())
    }

    fn ensure_live(&self) -> Result<(), SurfaceError> {
        if self.disposed {
            Err(SurfaceError::Disposed)
        } else {
            Ok(())
        }
    }

    fn series_mut(&mut self, id: SeriesId) -> Result<&mut SceneSeries, SurfaceError> {
        self.series
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SurfaceError::UnknownSeries(id))
    }

    fn update_visible(&mut self, range: Option<LogicalRange>) {
        if self.visible == range {
            return;
        }
        self.visible = range;
        if let (true, Some(r)) = (self.subscribed, range) {
            self.pending.push(r);
        }
    }
}

impl RenderSurface for SceneSurface {
    fn options(&self) -> &SurfaceOptions {
        &self.options
    }

    fn set_time_axis(&mut self, times: &[i64]) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        if let Some(index) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SurfaceError::UnorderedAxis { index: index + 1 });
        }
        self.axis = times.to_vec();
        Ok(())
    }

    fn add_line_series(&mut self, style: SeriesStyle) -> Result<SeriesId, SurfaceError> {
        self.ensure_live()?;
        let id = SeriesId(self.next_id);
        self.next_id += 1;
        self.series.push(SceneSeries {
            id,
            style,
            points: Vec::new(),
            markers: Vec::new(),
            price_lines: Vec::new(),
        });
        Ok(id)
    }

    fn remove_series(&mut self, id: SeriesId) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        let before = self.series.len();
        self.series.retain(|s| s.id != id);
        if self.series.len() == before {
            return Err(SurfaceError::UnknownSeries(id));
        }
        Ok(())
    }

    fn set_series_data(&mut self, id: SeriesId, points: &[ChartPoint]) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        if let Some(index) = points.iter().position(|p| !p.value.is_finite()) {
            return Err(SurfaceError::NonFiniteValue { index });
        }
        if let Some(index) = points.windows(2).position(|w| w[1].time <= w[0].time) {
            return Err(SurfaceError::UnorderedData { index: index + 1 });
        }
        if !self.axis.is_empty() {
            if let Some(index) = points
                .iter()
                .position(|p| self.axis.binary_search(&p.time).is_err())
            {
                return Err(SurfaceError::OffAxis { index });
            }
        }
        self.series_mut(id)?.points = points.to_vec();
        Ok(())
    }

    fn set_markers(&mut self, id: SeriesId, markers: &[Marker]) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        if let Some(index) = markers.windows(2).position(|w| w[1].time < w[0].time) {
            return Err(SurfaceError::UnsortedMarkers { index: index + 1 });
        }
        self.series_mut(id)?.markers = markers.to_vec();
        Ok(())
    }

    fn add_price_line(&mut self, id: SeriesId, line: PriceLine) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        if !line.price.is_finite() {
            return Err(SurfaceError::Rejected(format!(
                "price line '{}' is not finite",
                line.title
            )));
        }
        self.series_mut(id)?.price_lines.push(line);
        Ok(())
    }

    fn subscribe_visible_range_change(&mut self) {
        self.subscribed = true;
    }

    fn drain_range_changes(&mut self) -> Vec<LogicalRange> {
        std::mem::take(&mut self.pending)
    }

    fn visible_logical_range(&self) -> Option<LogicalRange> {
        if self.disposed {
            return None;
        }
        self.visible
    }

    fn set_visible_logical_range(&mut self, range: LogicalRange) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        if !range.is_valid() {
            return Err(SurfaceError::InvalidRange {
                from: range.from,
                to: range.to,
            });
        }
        self.update_visible(Some(range));
        Ok(())
    }

    fn fit_content(&mut self) {
        if self.disposed {
            return;
        }
        let bars = self.bar_count();
        let range = (bars > 0).then(|| LogicalRange::fitting(bars));
        self.update_visible(range);
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.options.width = width;
        self.options.height = height;
    }

    fn dispose(&mut self) {
        self.axis.clear();
        self.series.clear();
        self.pending.clear();
        self.visible = None;
        self.subscribed = false;
        self.disposed = true;
    }
}
