//! Built-in demo source.
//!
//! Produces reproducible runs without a backend:
//! - Random-walk minute prices over several sessions, seeded per run
//! - Wilder RSI(14) and the 30/70 threshold signals derived from it
//! - Long/short trades that follow those signals, with realized P&L
//! - Metrics computed from the resulting equity curve
//! - A handful of malformed rows, as a real backend occasionally sends

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use super::{BacktestApi, FetchError};
use crate::domain::{MetricSet, PortfolioFinal, RawSignal, RawTrade, Run, RunId};
use crate::pane::{OVERBOUGHT, OVERSOLD};

const SESSIONS: usize = 4;
const BARS_PER_SESSION: usize = 375;
const RSI_PERIOD: usize = 14;
const INITIAL_CASH: f64 = 100_000.0;
const POSITION_FRACTION: f64 = 0.1;
const MINUTES_PER_YEAR: f64 = 252.0 * 375.0;

/// One generated run, fully materialized.
#[derive(Debug, Clone)]
struct DemoRun {
    signals: Vec<RawSignal>,
    trades: Vec<RawTrade>,
    metrics: MetricSet,
    final_value: f64,
}

#[derive(Debug, Clone)]
pub struct DemoApi {
    seed: u64,
    runs: Vec<Run>,
}

impl DemoApi {
    pub fn new(seed: u64) -> Self {
        let runs = (1..=3)
            .map(|i| {
                Run::new(
                    format!("demo-{seed}-{i}"),
                    format!("2024-03-{:02}T{:02}:30:00", i + 4, 9 + i),
                )
            })
            .collect();
        Self { seed, runs }
    }

    /// Per-run seed, independent of the order runs are generated in.
    fn run_seed(&self, run_id: &RunId) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(run_id.as_str().as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    fn generate(&self, run_id: &RunId, endpoint: &str) -> Result<DemoRun, FetchError> {
        if !self.runs.iter().any(|r| &r.run_id == run_id) {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: 404,
            });
        }
        let mut rng = StdRng::seed_from_u64(self.run_seed(run_id));
        Ok(build_run(run_id, &mut rng))
    }
}

impl Default for DemoApi {
    fn default() -> Self {
        Self::new(42)
    }
}

impl BacktestApi for DemoApi {
    fn name(&self) -> &str {
        "demo"
    }

    fn runs(&self) -> Result<Vec<Run>, FetchError> {
        Ok(self.runs.clone())
    }

    fn signals(&self, run_id: &RunId) -> Result<Vec<RawSignal>, FetchError> {
        Ok(self.generate(run_id, "signals")?.signals)
    }

    fn trades(&self, run_id: &RunId) -> Result<Vec<RawTrade>, FetchError> {
        Ok(self.generate(run_id, "trades")?.trades)
    }

    fn metrics(&self, run_id: &RunId) -> Result<MetricSet, FetchError> {
        Ok(self.generate(run_id, "metrics")?.metrics)
    }

    fn portfolio_final(&self, run_id: &RunId) -> Result<PortfolioFinal, FetchError> {
        let run = self.generate(run_id, "portfolio_final")?;
        Ok(PortfolioFinal {
            total: Some(run.final_value),
        })
    }
}

/// Minute timestamps: sessions on consecutive days from 09:15 UTC.
fn bar_times() -> Vec<DateTime<Utc>> {
    let Some(open) = NaiveDate::from_ymd_opt(2024, 1, 2).and_then(|d| d.and_hms_opt(9, 15, 0))
    else {
        return Vec::new();
    };
    let open = open.and_utc();
    (0..SESSIONS)
        .flat_map(|day| {
            (0..BARS_PER_SESSION).map(move |m| {
                open + Duration::days(day as i64) + Duration::minutes(m as i64)
            })
        })
        .collect()
}

fn random_walk(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let drift = rng.gen_range(-0.00005..0.00008);
    let vol = rng.gen_range(0.0008..0.0025);
    let mut price = rng.gen_range(80.0..400.0);
    (0..n)
        .map(|_| {
            let shock: f64 = rng.gen_range(-1.0..1.0);
            price *= 1.0 + drift + vol * shock;
            (price * 100.0).round() / 100.0
        })
        .collect()
}

/// Wilder RSI: averages seeded over the first `period` changes, then
/// smoothed with alpha = 1/period. NaN during warm-up.
fn wilder_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let ch = closes[i] - closes[i - 1];
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let ch = closes[i] - closes[i - 1];
        avg_gain = alpha * ch.max(0.0) + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * (-ch).max(0.0) + (1.0 - alpha) * avg_loss;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

fn signal_for(rsi: f64) -> i64 {
    if rsi < OVERSOLD {
        1
    } else if rsi > OVERBOUGHT {
        -1
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    quantity: f64,
    entry_price: f64,
    entry_bar: usize,
    short: bool,
}

#[derive(Debug, Default)]
struct Ledger {
    cash: f64,
    position: Option<OpenPosition>,
    trades: Vec<RawTrade>,
    profits: Vec<f64>,
    durations: Vec<f64>,
}

impl Ledger {
    fn equity(&self, price: f64) -> f64 {
        match self.position {
            Some(p) if p.short => self.cash - p.quantity * price,
            Some(p) => self.cash + p.quantity * price,
            None => self.cash,
        }
    }

    fn record(&mut self, at: DateTime<Utc>, action: &str, price: f64, qty: f64, reason: &str, pnl: Option<f64>) {
        self.trades.push(RawTrade {
            timestamp: json!(at.format("%Y-%m-%d %H:%M:%S").to_string()),
            action: json!(action),
            reason: json!(reason),
            price: json!(price),
            symbol: Some("DEMO".to_string()),
            quantity: Some(qty),
            value: Some(qty * price),
            fees: Some(0.0),
            net_profit: pnl,
        });
    }

    fn open(&mut self, bar: usize, at: DateTime<Utc>, price: f64, rsi: f64, short: bool) {
        let quantity = ((self.equity(price) * POSITION_FRACTION) / price).floor().max(1.0);
        if short {
            self.cash += quantity * price;
            let reason = format!("RSI overbought ({rsi:.1})");
            self.record(at, "Short", price, quantity, &reason, None);
        } else {
            self.cash -= quantity * price;
            let reason = format!("RSI oversold ({rsi:.1})");
            self.record(at, "Buy", price, quantity, &reason, None);
        }
        self.position = Some(OpenPosition {
            quantity,
            entry_price: price,
            entry_bar: bar,
            short,
        });
    }

    fn close(&mut self, bar: usize, at: DateTime<Utc>, price: f64, rsi: f64) {
        let Some(p) = self.position.take() else {
            return;
        };
        let (action, pnl) = if p.short {
            self.cash -= p.quantity * price;
            ("Cover", (p.entry_price - price) * p.quantity)
        } else {
            self.cash += p.quantity * price;
            ("Sell", (price - p.entry_price) * p.quantity)
        };
        let reason = if p.short {
            format!("RSI oversold ({rsi:.1})")
        } else {
            format!("RSI overbought ({rsi:.1})")
        };
        self.record(at, action, price, p.quantity, &reason, Some(pnl));
        self.profits.push(pnl);
        self.durations.push((bar - p.entry_bar) as f64);
    }
}

fn build_run(run_id: &RunId, rng: &mut StdRng) -> DemoRun {
    let times = bar_times();
    let closes = random_walk(rng, times.len());
    let rsi = wilder_rsi(&closes, RSI_PERIOD);

    let mut ledger = Ledger {
        cash: INITIAL_CASH,
        ..Default::default()
    };
    let mut equity = Vec::with_capacity(times.len());
    let mut signals = Vec::with_capacity(times.len() + 1);

    for (i, (&at, &price)) in times.iter().zip(&closes).enumerate() {
        let r = rsi[i];
        let signal = if r.is_finite() { signal_for(r) } else { 0 };

        match (signal, ledger.position.map(|p| p.short)) {
            (1, None) => ledger.open(i, at, price, r, false),
            (1, Some(true)) => ledger.close(i, at, price, r),
            (-1, None) => ledger.open(i, at, price, r, true),
            (-1, Some(false)) => ledger.close(i, at, price, r),
            _ => {}
        }
        equity.push(ledger.equity(price));

        signals.push(RawSignal {
            timestamp: json!(at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            price: json!(price),
            rsi: if r.is_finite() {
                json!((r * 100.0).round() / 100.0)
            } else {
                Value::Null
            },
            signal: json!(signal),
        });
    }

    corrupt_some_rows(&mut signals, &mut ledger.trades, rng);

    let final_value = equity.last().copied().unwrap_or(INITIAL_CASH);
    let metrics = compute_metrics(run_id, &times, &equity, &ledger);
    DemoRun {
        signals,
        trades: ledger.trades,
        metrics,
        final_value: (final_value * 100.0).round() / 100.0,
    }
}

/// A missing price, a bad timestamp, a textual RSI, a duplicated bar and two
/// rows out of order; plus one trade without a reason.
fn corrupt_some_rows(signals: &mut Vec<RawSignal>, trades: &mut Vec<RawTrade>, rng: &mut StdRng) {
    if signals.len() < 64 {
        return;
    }
    let base = rng.gen_range(20..40);
    signals[base].price = Value::Null;
    signals[base + 4].timestamp = json!("not-a-timestamp");
    signals[base + 8].rsi = json!("NaN");
    let mut dup = signals[base + 12].clone();
    dup.price = json!(0.01);
    signals.push(dup);
    signals.swap(base + 16, base + 17);

    if let Some(first) = trades.first() {
        let mut orphan = first.clone();
        orphan.reason = json!("");
        orphan.net_profit = None;
        trades.push(orphan);
    }
}

fn compute_metrics(run_id: &RunId, times: &[DateTime<Utc>], equity: &[f64], ledger: &Ledger) -> MetricSet {
    let mut m = MetricSet::new();
    let (Some(first), Some(last)) = (times.first(), times.last()) else {
        return m;
    };

    let total_return = equity.last().map_or(0.0, |e| e / INITIAL_CASH - 1.0);
    let days = (*last - *first).num_days();
    let annualized = if days > 0 {
        ((1.0 + total_return).powf(252.0 / days as f64) - 1.0) * 100.0
    } else {
        0.0
    };

    let returns: Vec<f64> = equity.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let mean = returns.iter().sum::<f64>() / returns.len().max(1) as f64;
    let std = std_dev(&returns, mean);
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let down_std = std_dev(&downside, 0.0);
    let sharpe = ratio(mean * MINUTES_PER_YEAR, std * MINUTES_PER_YEAR.sqrt());
    let sortino = ratio(mean * MINUTES_PER_YEAR, down_std * MINUTES_PER_YEAR.sqrt());

    let (max_dd, dd_start, dd_end) = max_drawdown(equity);
    let calmar = ratio(annualized, max_dd.abs());

    let wins = ledger.profits.iter().filter(|p| **p > 0.0).count();
    let win_rate = if ledger.profits.is_empty() {
        0.0
    } else {
        wins as f64 / ledger.profits.len() as f64 * 100.0
    };
    let gross_win: f64 = ledger.profits.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = -ledger.profits.iter().filter(|p| **p < 0.0).sum::<f64>();
    let profit_factor = if gross_loss > 0.0 {
        Some(gross_win / gross_loss)
    } else {
        None
    };
    let avg_duration = if ledger.durations.is_empty() {
        None
    } else {
        Some(ledger.durations.iter().sum::<f64>() / ledger.durations.len() as f64)
    };

    let stamp = |i: usize| json!(times[i].format("%Y-%m-%dT%H:%M:%S").to_string());
    let mut row = serde_json::Map::new();
    row.insert("run_id".into(), json!(run_id.as_str()));
    row.insert("max_drawdown_start".into(), stamp(dd_start));
    row.insert("max_drawdown_end".into(), stamp(dd_end));
    if let Ok(set) = serde_json::from_value::<MetricSet>(Value::Object(row)) {
        m = set;
    }

    m.insert_number("annualized_return", Some(annualized));
    m.insert_number("max_drawdown", Some(max_dd));
    m.insert_number("win_rate", Some(win_rate));
    m.insert_number("sharpe_ratio", sharpe);
    m.insert_number("sortino_ratio", sortino);
    m.insert_number("calmar_ratio", calmar);
    m.insert_number("profit_factor", profit_factor);
    m.insert_number("total_trades", Some(ledger.profits.len() as f64));
    m.insert_number("avg_trade_duration", avg_duration);
    m.insert_number("total_bars", Some(times.len() as f64));
    m
}

fn std_dev(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    (den > 0.0 && den.is_finite()).then(|| num / den)
}

/// Max drawdown in percent (non-positive) with the peak and trough indices.
fn max_drawdown(equity: &[f64]) -> (f64, usize, usize) {
    let mut peak = 0;
    let mut worst = (0.0, 0, 0);
    for (i, &e) in equity.iter().enumerate() {
        if e > equity[peak] {
            peak = i;
        }
        let dd = (e - equity[peak]) / equity[peak] * 100.0;
        if dd < worst.0 {
            worst = (dd, peak, i);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize_signals, validate_trades, TradeReasonPolicy};

    #[test]
    fn same_seed_same_data() {
        let a = DemoApi::new(7);
        let b = DemoApi::new(7);
        let run = a.runs().unwrap()[0].run_id.clone();
        assert_eq!(a.signals(&run).unwrap(), b.signals(&run).unwrap());
        assert_eq!(a.trades(&run).unwrap(), b.trades(&run).unwrap());
    }

    #[test]
    fn runs_differ_from_each_other() {
        let api = DemoApi::default();
        let runs = api.runs().unwrap();
        assert_eq!(runs.len(), 3);
        let a = api.signals(&runs[0].run_id).unwrap();
        let b = api.signals(&runs[1].run_id).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_run_is_not_found() {
        let api = DemoApi::default();
        assert_eq!(
            api.metrics(&RunId::new("nope")),
            Err(FetchError::Status {
                endpoint: "metrics".into(),
                status: 404
            })
        );
    }

    #[test]
    fn malformed_rows_are_filtered_by_the_normalizer() {
        let api = DemoApi::default();
        let run = api.runs().unwrap()[0].run_id.clone();
        let raw = api.signals(&run).unwrap();
        let out = normalize_signals(&raw).unwrap();

        assert_eq!(raw.len(), SESSIONS * BARS_PER_SESSION + 1);
        assert_eq!(out.report.invalid_timestamp, 1);
        assert_eq!(out.report.invalid_price, 1);
        assert_eq!(out.report.duplicate_price, 1);
        assert_eq!(out.price.len(), SESSIONS * BARS_PER_SESSION - 2);
        assert!(out.rsi.len() < out.price.len());
    }

    #[test]
    fn trades_follow_signals() {
        let api = DemoApi::default();
        let run = api.runs().unwrap()[0].run_id.clone();
        let raw = api.trades(&run).unwrap();
        let strict = validate_trades(&raw, TradeReasonPolicy::RequireReason);
        if !raw.is_empty() {
            assert_eq!(strict.dropped, 1, "the reason-less copy is dropped");
            assert!(strict
                .trades
                .iter()
                .all(|t| t.reason.as_deref().is_some_and(|r| r.starts_with("RSI"))));
        }
    }

    #[test]
    fn metrics_cover_declared_keys() {
        let api = DemoApi::default();
        let run = api.runs().unwrap()[0].run_id.clone();
        let m = api.metrics(&run).unwrap();
        assert!(m.get("annualized_return").is_some());
        assert!(m.get("max_drawdown_start").is_some());
        assert!(m.get("total_trades").is_some());
        assert!(api.portfolio_final(&run).unwrap().total.is_some());
    }

    #[test]
    fn rsi_matches_hand_computation() {
        let rsi = wilder_rsi(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(rsi[..3].iter().all(|v| v.is_nan()));
        assert_eq!(rsi[3], 100.0);

        let flat = wilder_rsi(&[5.0; 6], 3);
        assert_eq!(flat[5], 50.0);
    }

    #[test]
    fn drawdown_tracks_peak_and_trough() {
        let (dd, start, end) = max_drawdown(&[100.0, 120.0, 90.0, 110.0, 80.0, 130.0]);
        assert!((dd - (-100.0 / 3.0)).abs() < 1e-9);
        assert_eq!((start, end), (1, 4));
    }
}
