//! Results API client trait and structured error types.
//!
//! The BacktestApi trait abstracts over where run results come from (the REST
//! backend or the built-in demo source) so the worker and tests don't care.

pub mod demo;
pub mod http;

use thiserror::Error;

use crate::domain::{MetricSet, PortfolioFinal, RawSignal, RawTrade, Run, RunId};
use crate::store::{FetchKind, FetchPayload};

pub use demo::DemoApi;
pub use http::HttpApi;

/// Why a fetch failed. Displayable in the status bar and error history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("could not decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Source of backtest runs and their results.
pub trait BacktestApi: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// `GET /runs`
    fn runs(&self) -> Result<Vec<Run>, FetchError>;

    /// `GET /signals/{run_id}`
    fn signals(&self, run_id: &RunId) -> Result<Vec<RawSignal>, FetchError>;

    /// `GET /trades/{run_id}`
    fn trades(&self, run_id: &RunId) -> Result<Vec<RawTrade>, FetchError>;

    /// `GET /metrics/{run_id}`
    fn metrics(&self, run_id: &RunId) -> Result<MetricSet, FetchError>;

    /// `GET /portfolio_final/{run_id}`
    fn portfolio_final(&self, run_id: &RunId) -> Result<PortfolioFinal, FetchError>;

    /// Dispatch one per-run fetch by kind.
    fn fetch(&self, kind: FetchKind, run_id: &RunId) -> Result<FetchPayload, FetchError> {
        Ok(match kind {
            FetchKind::Signals => FetchPayload::Signals(self.signals(run_id)?),
            FetchKind::Trades => FetchPayload::Trades(self.trades(run_id)?),
            FetchKind::Metrics => FetchPayload::Metrics(self.metrics(run_id)?),
            FetchKind::FinalValue => FetchPayload::FinalValue(self.portfolio_final(run_id)?),
        })
    }
}
