//! Chart-ready primitives: points, markers, threshold lines, logical ranges.

/// One point of a line series. `time` is unix seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub time: i64,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Palette shared by series, markers and price lines. Surfaces map these to
/// their own colour space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tint {
    Green,
    Red,
    Blue,
    Purple,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerPosition {
    AboveBar,
    BelowBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
    Circle,
}

/// Annotation attached to a time point of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub time: i64,
    pub position: MarkerPosition,
    pub color: Tint,
    pub shape: MarkerShape,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

/// Static horizontal line at a fixed value, independent of the data.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLine {
    pub price: f64,
    pub color: Tint,
    pub style: LineStyle,
    pub title: String,
}

impl PriceLine {
    pub fn dashed(price: f64, color: Tint, title: impl Into<String>) -> Self {
        Self {
            price,
            color,
            style: LineStyle::Dashed,
            title: title.into(),
        }
    }
}

/// Visible window of a time scale in bar-index space. Bar `i` spans
/// `[i - 0.5, i + 0.5]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalRange {
    pub from: f64,
    pub to: f64,
}

impl LogicalRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Range showing exactly `bars` bars.
    pub fn fitting(bars: usize) -> Self {
        Self::new(-0.5, bars.max(1) as f64 - 0.5)
    }

    pub fn is_valid(&self) -> bool {
        self.from.is_finite() && self.to.is_finite() && self.to > self.from
    }

    pub fn span(&self) -> f64 {
        self.to - self.from
    }

    pub fn shifted(&self, bars: f64) -> Self {
        Self::new(self.from + bars, self.to + bars)
    }

    /// Scale around the centre. `factor < 1` zooms in. The span never drops
    /// below one bar.
    pub fn zoomed(&self, factor: f64) -> Self {
        let centre = (self.from + self.to) / 2.0;
        let half = (self.span() * factor).max(1.0) / 2.0;
        Self::new(centre - half, centre + half)
    }

    /// Indices of the bars at least partly inside the range, clamped to
    /// `0..len`.
    pub fn bar_indices(&self, len: usize) -> std::ops::Range<usize> {
        if len == 0 || !self.is_valid() {
            return 0..0;
        }
        let first = (self.from + 0.5).ceil().max(0.0) as usize;
        let last = (self.to - 0.5).floor();
        if last < 0.0 {
            return 0..0;
        }
        let end = (last as usize + 1).min(len);
        first.min(end)..end
    }
}
