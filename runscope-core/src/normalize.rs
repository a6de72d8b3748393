//! Validator/normalizer: raw signal and trade rows → chart-ready data.
//!
//! A row failing validation is dropped and logged, never coerced to zero.
//! Each output series is stably sorted by time and strictly increasing:
//! the first row for a timestamp wins, later duplicates are dropped.

use serde_json::Value;
use tracing::{debug, warn};

use crate::chart::ChartPoint;
use crate::domain::{unix_seconds, RawSignal, RawTrade, Trade, TradeAction};
use crate::error::ChartError;

/// What the trade validator does with a trade that has no reason text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TradeReasonPolicy {
    /// Drop it (matches the backend contract: every trade carries a reason).
    #[default]
    RequireReason,
    /// Keep it; the marker builder labels it "Trade".
    FallbackLabel,
}

/// Counters for one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub records: usize,
    pub invalid_timestamp: usize,
    pub invalid_price: usize,
    pub invalid_rsi: usize,
    pub duplicate_price: usize,
    pub duplicate_rsi: usize,
}

impl NormalizeReport {
    pub fn dropped_price(&self) -> usize {
        self.invalid_timestamp + self.invalid_price + self.duplicate_price
    }
}

/// Price and oscillator series derived from one signals payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSignals {
    pub price: Vec<ChartPoint>,
    pub rsi: Vec<ChartPoint>,
    pub report: NormalizeReport,
}

impl NormalizedSignals {
    /// Every instant with a price or an RSI value, strictly increasing. The
    /// panes share it as their time scale.
    pub fn time_axis(&self) -> Vec<i64> {
        let mut axis = Vec::with_capacity(self.price.len().max(self.rsi.len()));
        let (mut p, mut r) = (self.price.iter().peekable(), self.rsi.iter().peekable());
        loop {
            let next = match (p.peek(), r.peek()) {
                (Some(a), Some(b)) if a.time < b.time => p.next(),
                (Some(a), Some(b)) if b.time < a.time => r.next(),
                (Some(_), Some(_)) => {
                    r.next();
                    p.next()
                }
                (Some(_), None) => p.next(),
                (None, Some(_)) => r.next(),
                (None, None) => break,
            };
            if let Some(point) = next {
                axis.push(point.time);
            }
        }
        axis
    }
}

/// Trades that passed validation, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedTrades {
    pub trades: Vec<Trade>,
    pub dropped: usize,
}

/// A finite JSON number. Strings, nulls and booleans are not numeric.
pub fn finite_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Build the price and RSI series.
///
/// Fails with [`ChartError::NoDisplayableData`] when no price point survives.
pub fn normalize_signals(raw: &[RawSignal]) -> Result<NormalizedSignals, ChartError> {
    let mut report = NormalizeReport {
        records: raw.len(),
        ..Default::default()
    };
    let mut price = Vec::with_capacity(raw.len());
    let mut rsi = Vec::with_capacity(raw.len());

    for (i, row) in raw.iter().enumerate() {
        let Some(time) = unix_seconds(&row.timestamp) else {
            debug!(index = i, timestamp = %row.timestamp, "dropping signal row: invalid timestamp");
            report.invalid_timestamp += 1;
            continue;
        };

        match finite_number(&row.price) {
            Some(value) => price.push(ChartPoint::new(time, value)),
            None => {
                debug!(index = i, price = %row.price, "dropping price point: not a finite number");
                report.invalid_price += 1;
            }
        }

        match finite_number(&row.rsi) {
            Some(value) => rsi.push(ChartPoint::new(time, value)),
            None => {
                debug!(index = i, rsi = %row.rsi, "dropping rsi point: not a finite number");
                report.invalid_rsi += 1;
            }
        }
    }

    let price = into_strict_series(price, &mut report.duplicate_price);
    let rsi = into_strict_series(rsi, &mut report.duplicate_rsi);

    if report.dropped_price() > 0 || report.duplicate_rsi > 0 {
        warn!(
            records = report.records,
            invalid_timestamp = report.invalid_timestamp,
            invalid_price = report.invalid_price,
            duplicate_price = report.duplicate_price,
            duplicate_rsi = report.duplicate_rsi,
            "signal rows dropped during normalization"
        );
    }

    if price.is_empty() {
        warn!(records = report.records, "no displayable price data");
        return Err(ChartError::NoDisplayableData);
    }

    Ok(NormalizedSignals { price, rsi, report })
}

/// Validate trade rows: parseable timestamp, known action, finite price, and
/// a non-empty reason unless the policy allows a fallback label.
pub fn validate_trades(raw: &[RawTrade], policy: TradeReasonPolicy) -> ValidatedTrades {
    let mut out = ValidatedTrades {
        trades: Vec::with_capacity(raw.len()),
        dropped: 0,
    };

    for (i, row) in raw.iter().enumerate() {
        match validate_trade(row, policy) {
            Ok(trade) => out.trades.push(trade),
            Err(why) => {
                debug!(index = i, reason = why, "dropping trade row");
                out.dropped += 1;
            }
        }
    }

    if out.dropped > 0 {
        warn!(
            records = raw.len(),
            dropped = out.dropped,
            "trade rows dropped during validation"
        );
    }
    out
}

fn validate_trade(row: &RawTrade, policy: TradeReasonPolicy) -> Result<Trade, &'static str> {
    let time = unix_seconds(&row.timestamp).ok_or("invalid timestamp")?;
    let action = row
        .action
        .as_str()
        .and_then(|s| s.parse::<TradeAction>().ok())
        .ok_or("unknown action")?;
    let price = finite_number(&row.price).ok_or("price is not a finite number")?;

    let reason = row
        .reason
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    if reason.is_none() && policy == TradeReasonPolicy::RequireReason {
        return Err("missing reason");
    }

    Ok(Trade {
        time,
        action,
        reason,
        price,
        quantity: row.quantity,
        net_profit: row.net_profit,
    })
}

/// Stable sort by time, then drop every point whose time is not strictly
/// greater than its predecessor's.
fn into_strict_series(mut points: Vec<ChartPoint>, duplicates: &mut usize) -> Vec<ChartPoint> {
    points.sort_by_key(|p| p.time);
    let before = points.len();
    points.dedup_by_key(|p| p.time);
    *duplicates += before - points.len();
    points
}
