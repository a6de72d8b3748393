//! Run/result store: the selected run, its fetched data, and the latest error.
//!
//! Every selection change bumps a generation counter and clears all run data
//! in one step. Fetches carry a [`FetchTicket`]; a response whose ticket is
//! not the current one is discarded, so a late answer for a previous run can
//! never land on the new one.

use std::fmt;

use tracing::{debug, info, warn};

use crate::api::FetchError;
use crate::domain::{MetricSet, PortfolioFinal, RawSignal, RawTrade, Run, RunId};

/// Identity of one selection. Reselecting the same run yields a new ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub run_id: RunId,
    pub generation: u64,
}

impl fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.run_id, self.generation)
    }
}

/// The four per-run endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Signals,
    Trades,
    Metrics,
    FinalValue,
}

impl FetchKind {
    pub const ALL: [FetchKind; 4] = [
        FetchKind::Signals,
        FetchKind::Trades,
        FetchKind::Metrics,
        FetchKind::FinalValue,
    ];

    /// First path segment of the endpoint.
    pub fn endpoint(self) -> &'static str {
        match self {
            FetchKind::Signals => "signals",
            FetchKind::Trades => "trades",
            FetchKind::Metrics => "metrics",
            FetchKind::FinalValue => "portfolio_final",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchPayload {
    Signals(Vec<RawSignal>),
    Trades(Vec<RawTrade>),
    Metrics(MetricSet),
    FinalValue(PortfolioFinal),
}

impl FetchPayload {
    pub fn kind(&self) -> FetchKind {
        match self {
            FetchPayload::Signals(_) => FetchKind::Signals,
            FetchPayload::Trades(_) => FetchKind::Trades,
            FetchPayload::Metrics(_) => FetchKind::Metrics,
            FetchPayload::FinalValue(_) => FetchKind::FinalValue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Stored. `charts_dirty` is set when signals or trades changed.
    Applied { charts_dirty: bool },
    /// The ticket belongs to an earlier selection; nothing changed.
    Stale,
    /// The fetch failed; the error message was recorded.
    Failed,
}

#[derive(Debug, Default)]
pub struct RunStore {
    runs: Vec<Run>,
    selected: Option<RunId>,
    generation: u64,
    pending: u8,
    signals: Option<Vec<RawSignal>>,
    trades: Option<Vec<RawTrade>>,
    metrics: Option<MetricSet>,
    final_value: Option<PortfolioFinal>,
    error: Option<String>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn set_runs(&mut self, runs: Vec<Run>) {
        info!(count = runs.len(), "run list loaded");
        self.runs = runs;
    }

    pub fn selected(&self) -> Option<&RunId> {
        self.selected.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Change the selection. All run data and the error are cleared before
    /// this returns; the returned ticket tags the fetches for the new run.
    pub fn select(&mut self, run: Option<RunId>) -> Option<FetchTicket> {
        self.generation += 1;
        self.signals = None;
        self.trades = None;
        self.metrics = None;
        self.final_value = None;
        self.error = None;
        self.selected = run;

        match &self.selected {
            Some(run_id) => {
                self.pending = FetchKind::ALL.iter().fold(0, |acc, k| acc | k.bit());
                debug!(run_id = %run_id, generation = self.generation, "run selected");
                self.current_ticket()
            }
            None => {
                self.pending = 0;
                debug!(generation = self.generation, "selection cleared");
                None
            }
        }
    }

    pub fn current_ticket(&self) -> Option<FetchTicket> {
        self.selected.as_ref().map(|run_id| FetchTicket {
            run_id: run_id.clone(),
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && self.selected.as_ref() == Some(&ticket.run_id)
    }

    /// Apply one fetch response.
    pub fn apply(
        &mut self,
        ticket: &FetchTicket,
        kind: FetchKind,
        result: Result<FetchPayload, FetchError>,
    ) -> ApplyOutcome {
        if !self.is_current(ticket) {
            debug!(ticket = %ticket, kind = %kind, "discarding stale response");
            return ApplyOutcome::Stale;
        }
        self.pending &= !kind.bit();

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!(run_id = %ticket.run_id, kind = %kind, error = %e, "fetch failed");
                self.error = Some(format!("Failed to fetch {kind}: {e}"));
                return ApplyOutcome::Failed;
            }
        };

        let charts_dirty = match payload {
            FetchPayload::Signals(rows) => {
                self.signals = Some(rows);
                true
            }
            FetchPayload::Trades(rows) => {
                self.trades = Some(rows);
                true
            }
            FetchPayload::Metrics(set) => {
                self.metrics = Some(set);
                false
            }
            FetchPayload::FinalValue(v) => {
                self.final_value = Some(v);
                false
            }
        };
        ApplyOutcome::Applied { charts_dirty }
    }

    pub fn is_loading(&self) -> bool {
        self.pending != 0
    }

    pub fn is_pending(&self, kind: FetchKind) -> bool {
        self.pending & kind.bit() != 0
    }

    pub fn signals(&self) -> Option<&[RawSignal]> {
        self.signals.as_deref()
    }

    /// Trades fetched so far; empty until the trades response arrives.
    pub fn trades(&self) -> &[RawTrade] {
        self.trades.as_deref().unwrap_or(&[])
    }

    /// Metrics with `final_portfolio_value` filled from the final-value
    /// endpoint. `None` until either source has answered.
    pub fn metrics(&self) -> Option<MetricSet> {
        if self.metrics.is_none() && self.final_value.is_none() {
            return None;
        }
        let mut set = self.metrics.clone().unwrap_or_default();
        if let Some(total) = self.final_value.and_then(|v| v.total) {
            set.insert_number("final_portfolio_value", Some(total));
        }
        Some(set)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record an error that is not tied to a run fetch (e.g. the run list).
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
