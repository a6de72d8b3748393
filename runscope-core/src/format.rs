//! Metric display strings.

use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

use crate::domain::{parse_instant, MetricValue};

pub const NOT_AVAILABLE: &str = "N/A";
pub const DEFAULT_CURRENCY: &str = "₹";

const DATE_KEYS: &[&str] = &["max_drawdown_start", "max_drawdown_end"];
const PERCENT_KEYS: &[&str] = &["annualized_return", "max_drawdown", "win_rate"];
const RATIO_KEYS: &[&str] = &["sharpe_ratio", "sortino_ratio", "calmar_ratio", "profit_factor"];
const DURATION_KEY: &str = "avg_trade_duration";
const CURRENCY_KEY: &str = "final_portfolio_value";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricFormatter {
    pub currency_symbol: String,
}

impl Default for MetricFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY)
    }
}

impl MetricFormatter {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Format with dates shown in the local timezone.
    pub fn format(&self, value: Option<&MetricValue>, key: &str) -> String {
        self.format_in(value, key, &Local)
    }

    pub fn format_in<Tz>(&self, value: Option<&MetricValue>, key: &str, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let Some(value) = value else {
            return NOT_AVAILABLE.to_string();
        };

        if DATE_KEYS.contains(&key) {
            return match value {
                MetricValue::Text(s) => match parse_instant(s) {
                    Some(at) => at.with_timezone(tz).format(DATE_FORMAT).to_string(),
                    None => s.clone(),
                },
                MetricValue::Number(n) if n.is_finite() => {
                    match DateTime::from_timestamp(*n as i64, 0) {
                        Some(at) => at.with_timezone(tz).format(DATE_FORMAT).to_string(),
                        None => NOT_AVAILABLE.to_string(),
                    }
                }
                MetricValue::Number(_) => NOT_AVAILABLE.to_string(),
            };
        }

        let v = match value {
            MetricValue::Number(n) if n.is_finite() => *n,
            MetricValue::Number(_) => return NOT_AVAILABLE.to_string(),
            MetricValue::Text(s) => return s.clone(),
        };

        if PERCENT_KEYS.contains(&key) {
            format!("{v:.2}%")
        } else if RATIO_KEYS.contains(&key) {
            format!("{v:.2}")
        } else if key == DURATION_KEY {
            format!("{v:.2} min")
        } else if key == CURRENCY_KEY {
            format!("{}{v:.2}", self.currency_symbol)
        } else {
            (v.round() as i64).to_string()
        }
    }
}

/// Format with the default currency symbol.
pub fn format_metric(value: Option<&MetricValue>, key: &str) -> String {
    MetricFormatter::default().format(value, key)
}
