//! Domain types for backtest results as served by the results backend.

pub mod ids;
pub mod metric;
pub mod run;
pub mod signal;
pub mod time;
pub mod trade;

pub use ids::RunId;
pub use metric::{metric_label, MetricSet, MetricValue, PortfolioFinal, DECLARED_METRICS};
pub use run::Run;
pub use signal::{RawSignal, SignalDirection};
pub use time::{parse_instant, unix_seconds};
pub use trade::{RawTrade, Trade, TradeAction};
