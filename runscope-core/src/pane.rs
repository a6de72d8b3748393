//! Chart panes and the pane group.
//!
//! A [`ChartPane`] owns one surface, at most one primary series, its marker
//! set and its threshold lines. A refresh either fully replaces the pane's
//! content or leaves the pane empty; it never shows a mix.
//!
//! [`PaneGroup`] owns the three panes and is the fault boundary: a panic
//! escaping any pane operation is caught, every surface is disposed and the
//! group is `Faulted` until [`PaneGroup::recover`] rebuilds it. A pane whose
//! surface refused to drop an old series is treated the same way, since that
//! surface can no longer be emptied.
//!
//! All three panes are given one time axis per refresh, so a logical range
//! names the same instants on each of them.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, warn};

use crate::chart::{ChartPoint, LogicalRange, Marker, PriceLine, Tint};
use crate::domain::{RawSignal, RawTrade};
use crate::error::ChartError;
use crate::markers::{signal_markers, trade_markers};
use crate::normalize::{normalize_signals, validate_trades, NormalizeReport, TradeReasonPolicy};
use crate::surface::{
    RenderSurface, SeriesId, SeriesStyle, SurfaceError, SurfaceOptions, TimeScaleOptions,
};
use crate::sync::TimeScaleSynchronizer;

pub const OVERBOUGHT: f64 = 70.0;
pub const OVERSOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneKind {
    Price,
    Trade,
    Oscillator,
}

impl PaneKind {
    pub const ALL: [PaneKind; 3] = [PaneKind::Price, PaneKind::Trade, PaneKind::Oscillator];

    pub fn label(self) -> &'static str {
        match self {
            PaneKind::Price => "Price",
            PaneKind::Trade => "Trades",
            PaneKind::Oscillator => "RSI",
        }
    }

    pub fn index(self) -> usize {
        match self {
            PaneKind::Price => 0,
            PaneKind::Trade => 1,
            PaneKind::Oscillator => 2,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % 3]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + 2) % 3]
    }

    /// The two panes a range change on `self` propagates to.
    pub fn others(self) -> [PaneKind; 2] {
        [self.next(), self.next().next()]
    }

    pub fn series_style(self) -> SeriesStyle {
        match self {
            PaneKind::Price => SeriesStyle::line("Price", Tint::Blue),
            PaneKind::Trade => SeriesStyle::line("Price", Tint::Blue),
            PaneKind::Oscillator => SeriesStyle::line("RSI", Tint::Purple),
        }
    }

    /// Horizontal lines drawn on this pane regardless of the data.
    pub fn thresholds(self) -> Vec<PriceLine> {
        match self {
            PaneKind::Oscillator => vec![
                PriceLine::dashed(OVERBOUGHT, Tint::Red, "Overbought"),
                PriceLine::dashed(OVERSOLD, Tint::Green, "Oversold"),
            ],
            _ => Vec::new(),
        }
    }

    /// Only the bottom pane shows the time axis.
    pub fn surface_options(self, width: u16, height: u16) -> SurfaceOptions {
        SurfaceOptions {
            width,
            height,
            time_scale: TimeScaleOptions {
                time_visible: self == PaneKind::Oscillator,
                seconds_visible: false,
            },
            ..Default::default()
        }
    }
}

impl fmt::Display for PaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct ChartPane<S> {
    kind: PaneKind,
    surface: S,
    series: Option<SeriesId>,
    markers: Vec<Marker>,
    thresholds: Vec<PriceLine>,
    lost: bool,
}

impl<S: RenderSurface> ChartPane<S> {
    /// Wrap `surface` and subscribe to its range changes.
    pub fn new(kind: PaneKind, mut surface: S) -> Self {
        surface.subscribe_visible_range_change();
        Self {
            kind,
            surface,
            series: None,
            markers: Vec::new(),
            thresholds: Vec::new(),
            lost: false,
        }
    }

    pub fn kind(&self) -> PaneKind {
        self.kind
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn series_id(&self) -> Option<SeriesId> {
        self.series
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn thresholds(&self) -> &[PriceLine] {
        &self.thresholds
    }

    pub fn has_data(&self) -> bool {
        self.series.is_some()
    }

    /// The surface was disposed after it kept a series it was told to drop.
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Replace the pane's series, markers and thresholds on the time scale
    /// `axis`, then fit the visible range to it.
    pub fn refresh(
        &mut self,
        axis: &[i64],
        points: &[ChartPoint],
        markers: &[Marker],
    ) -> Result<(), ChartError> {
        self.clear()?;

        self.surface
            .set_time_axis(axis)
            .map_err(|e| ChartError::render(self.kind, e))?;
        let id = self
            .surface
            .add_line_series(self.kind.series_style())
            .map_err(|e| ChartError::render(self.kind, e))?;

        let thresholds = self.kind.thresholds();
        if let Err(e) = self.load(id, points, markers, &thresholds) {
            if let Err(cleanup) = self.surface.remove_series(id) {
                warn!(pane = %self.kind, error = %cleanup, "could not remove half-built series");
                self.lose_surface();
            }
            return Err(ChartError::render(self.kind, e));
        }

        self.series = Some(id);
        self.markers = markers.to_vec();
        self.thresholds = thresholds;
        self.surface.fit_content();
        debug!(pane = %self.kind, points = points.len(), markers = markers.len(), "pane refreshed");
        Ok(())
    }

    fn load(
        &mut self,
        id: SeriesId,
        points: &[ChartPoint],
        markers: &[Marker],
        thresholds: &[PriceLine],
    ) -> Result<(), SurfaceError> {
        self.surface.set_series_data(id, points)?;
        self.surface.set_markers(id, markers)?;
        for line in thresholds {
            self.surface.add_price_line(id, line.clone())?;
        }
        Ok(())
    }

    /// Remove the primary series and forget markers and thresholds.
    ///
    /// If the surface refuses the removal it is disposed, so the old series
    /// is never drawn next to newer data.
    pub fn clear(&mut self) -> Result<(), ChartError> {
        self.markers.clear();
        self.thresholds.clear();
        let Some(old) = self.series else {
            return Ok(());
        };
        if let Err(e) = self.surface.remove_series(old) {
            warn!(pane = %self.kind, error = %e, "surface kept a removed series");
            self.lose_surface();
            return Err(ChartError::render(self.kind, e));
        }
        self.series = None;
        Ok(())
    }

    fn lose_surface(&mut self) {
        self.dispose();
        self.lost = true;
    }

    fn dispose(&mut self) {
        self.series = None;
        self.markers.clear();
        self.thresholds.clear();
        self.surface.dispose();
    }

    /// Move the visible window by `bars`. No-op without a visible range.
    pub fn pan(&mut self, bars: f64) -> Result<(), ChartError> {
        self.adjust_range(|r| r.shifted(bars))
    }

    /// Scale the visible window around its centre.
    pub fn zoom(&mut self, factor: f64) -> Result<(), ChartError> {
        self.adjust_range(|r| r.zoomed(factor))
    }

    pub fn fit(&mut self) {
        self.surface.fit_content();
    }

    fn adjust_range(&mut self, f: impl FnOnce(LogicalRange) -> LogicalRange) -> Result<(), ChartError> {
        let Some(current) = self.surface.visible_logical_range() else {
            return Ok(());
        };
        self.surface
            .set_visible_logical_range(f(current))
            .map_err(|e| ChartError::render(self.kind, e))
    }
}

/// Counts from the last successful group refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshSummary {
    pub price_points: usize,
    pub rsi_points: usize,
    pub signal_markers: usize,
    pub trade_markers: usize,
    pub dropped_trades: usize,
    pub report: NormalizeReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupState {
    Empty,
    Ready(RefreshSummary),
    Faulted(String),
}

pub struct PaneGroup<S> {
    panes: [ChartPane<S>; 3],
    state: GroupState,
}

impl<S: RenderSurface> PaneGroup<S> {
    pub fn new(mut make_surface: impl FnMut(PaneKind) -> S) -> Self {
        Self {
            panes: PaneKind::ALL.map(|kind| ChartPane::new(kind, make_surface(kind))),
            state: GroupState::Empty,
        }
    }

    pub fn state(&self) -> &GroupState {
        &self.state
    }

    pub fn fault(&self) -> Option<&str> {
        match &self.state {
            GroupState::Faulted(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn pane(&self, kind: PaneKind) -> &ChartPane<S> {
        &self.panes[kind.index()]
    }

    pub fn pane_mut(&mut self, kind: PaneKind) -> &mut ChartPane<S> {
        &mut self.panes[kind.index()]
    }

    pub fn panes(&self) -> impl Iterator<Item = &ChartPane<S>> {
        self.panes.iter()
    }

    /// Run `f` inside the fault boundary. A panic disposes every surface and
    /// leaves the group `Faulted`.
    pub fn guarded<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Result<R, ChartError> {
        if let GroupState::Faulted(msg) = &self.state {
            return Err(ChartError::Faulted(msg.clone()));
        }
        match panic::catch_unwind(AssertUnwindSafe(|| f(self))) {
            Ok(value) => Ok(value),
            Err(payload) => Err(self.enter_fault(panic_message(payload.as_ref()))),
        }
    }

    fn enter_fault(&mut self, msg: String) -> ChartError {
        error!(error = %msg, "chart region faulted");
        for pane in &mut self.panes {
            pane.dispose();
        }
        self.state = GroupState::Faulted(msg.clone());
        ChartError::Faulted(msg)
    }

    /// Fault the group if a pane lost its surface during `op`.
    fn check_lost(&mut self, op: &str) -> Result<(), ChartError> {
        let Some(kind) = self.panes.iter().find(|p| p.is_lost()).map(|p| p.kind) else {
            return Ok(());
        };
        Err(self.enter_fault(format!("{kind} pane could not be cleared during {op}")))
    }

    /// Normalize once, derive markers once, refresh every pane on the shared
    /// time axis, then bring the panes onto the price pane's range.
    ///
    /// `NoDisplayableData` returns before any pane is touched. A render
    /// failure leaves that pane empty; the others are still refreshed and
    /// the first failure is returned. A pane that cannot be emptied faults
    /// the group.
    pub fn refresh(
        &mut self,
        signals: &[RawSignal],
        trades: &[RawTrade],
        policy: TradeReasonPolicy,
        sync: &TimeScaleSynchronizer,
    ) -> Result<RefreshSummary, ChartError> {
        if let GroupState::Faulted(msg) = &self.state {
            return Err(ChartError::Faulted(msg.clone()));
        }

        let normalized = normalize_signals(signals)?;
        let axis = normalized.time_axis();
        let validated = validate_trades(trades, policy);
        let signal_set = signal_markers(signals);
        let trade_set = trade_markers(&validated.trades);

        let summary = RefreshSummary {
            price_points: normalized.price.len(),
            rsi_points: normalized.rsi.len(),
            signal_markers: signal_set.len(),
            trade_markers: trade_set.len(),
            dropped_trades: validated.dropped,
            report: normalized.report.clone(),
        };

        let first_error = self.guarded(|group| {
            let results = [
                group
                    .pane_mut(PaneKind::Price)
                    .refresh(&axis, &normalized.price, &signal_set),
                group
                    .pane_mut(PaneKind::Trade)
                    .refresh(&axis, &normalized.price, &trade_set),
                group
                    .pane_mut(PaneKind::Oscillator)
                    .refresh(&axis, &normalized.rsi, &[]),
            ];
            for pane in &mut group.panes {
                pane.surface.drain_range_changes();
            }
            sync.on_range_changed(PaneKind::Price, group);
            results.into_iter().find_map(Result::err)
        })?;
        self.check_lost("refresh")?;

        self.state = GroupState::Ready(summary.clone());
        match first_error {
            Some(e) => {
                warn!(category = e.category(), error = %e, "chart refresh incomplete");
                Err(e)
            }
            None => {
                info!(
                    points = summary.price_points,
                    signals = summary.signal_markers,
                    trades = summary.trade_markers,
                    "charts refreshed"
                );
                Ok(summary)
            }
        }
    }

    /// Empty every pane. A faulted group stays faulted.
    pub fn clear(&mut self) -> Result<(), ChartError> {
        let cleared = self.guarded(|group| {
            let results: Vec<_> = group.panes.iter_mut().map(ChartPane::clear).collect();
            for pane in &mut group.panes {
                pane.surface.drain_range_changes();
            }
            results.into_iter().find_map(Result::err)
        })?;
        self.check_lost("clear")?;
        self.state = GroupState::Empty;
        cleared.map_or(Ok(()), Err)
    }

    /// Replace every surface with a fresh one and leave the group `Empty`.
    pub fn recover(&mut self, make_surface: impl FnMut(PaneKind) -> S) {
        *self = Self::new(make_surface);
        info!("chart region rebuilt");
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        for pane in &mut self.panes {
            pane.surface.resize(width, height);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
