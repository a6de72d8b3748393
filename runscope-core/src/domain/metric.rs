//! Per-run performance metrics from `GET /metrics/{run_id}` and
//! `GET /portfolio_final/{run_id}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Metric keys the viewer knows how to format, in display order, with labels.
pub const DECLARED_METRICS: [(&str, &str); 12] = [
    ("annualized_return", "Annualized Return"),
    ("max_drawdown", "Max Drawdown"),
    ("max_drawdown_start", "Max Drawdown Start"),
    ("max_drawdown_end", "Max Drawdown End"),
    ("win_rate", "Win Rate"),
    ("sharpe_ratio", "Sharpe Ratio"),
    ("sortino_ratio", "Sortino Ratio"),
    ("calmar_ratio", "Calmar Ratio"),
    ("profit_factor", "Profit Factor"),
    ("total_trades", "Total Trades"),
    ("avg_trade_duration", "Avg Trade Duration"),
    ("final_portfolio_value", "Final Portfolio Value"),
];

/// Columns of the metrics row that identify it rather than measure it.
const NON_METRIC_KEYS: &[&str] = &["run_id"];

/// A single metric value. Timestamps arrive as text.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

/// Flat metric mapping for one run. Null and missing are both "not available".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSet {
    values: BTreeMap<String, Value>,
}

/// Body of `GET /portfolio_final/{run_id}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioFinal {
    #[serde(default)]
    pub total: Option<f64>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<MetricValue> {
        match self.values.get(key)? {
            Value::Number(n) => n.as_f64().map(MetricValue::Number),
            Value::String(s) => Some(MetricValue::Text(s.clone())),
            Value::Bool(b) => Some(MetricValue::Number(if *b { 1.0 } else { 0.0 })),
            _ => None,
        }
    }

    pub fn insert_number(&mut self, key: impl Into<String>, value: Option<f64>) {
        let json = value
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        self.values.insert(key.into(), json);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in display order: every declared metric first (present or not),
    /// then any other keys alphabetically.
    pub fn display_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = DECLARED_METRICS.iter().map(|(k, _)| *k).collect();
        keys.extend(
            self.values
                .keys()
                .map(String::as_str)
                .filter(|k| !NON_METRIC_KEYS.contains(k))
                .filter(|k| !DECLARED_METRICS.iter().any(|(d, _)| d == k)),
        );
        keys
    }
}

/// Human label for a metric key; unknown keys are title-cased.
pub fn metric_label(key: &str) -> String {
    if let Some((_, label)) = DECLARED_METRICS.iter().find(|(k, _)| *k == key) {
        return (*label).to_string();
    }
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_metrics_row() {
        let set: MetricSet = serde_json::from_value(json!({
            "run_id": "R1",
            "annualized_return": 12.5,
            "max_drawdown_start": "2024-01-03T10:00:00",
            "sortino_ratio": null,
            "total_trades": 42,
            "exposure_time": 0.61
        }))
        .unwrap();

        assert_eq!(set.get("annualized_return"), Some(MetricValue::Number(12.5)));
        assert_eq!(
            set.get("max_drawdown_start"),
            Some(MetricValue::Text("2024-01-03T10:00:00".into()))
        );
        assert_eq!(set.get("sortino_ratio"), None);
        assert_eq!(set.get("calmar_ratio"), None);

        let keys = set.display_keys();
        assert_eq!(keys.len(), DECLARED_METRICS.len() + 1);
        assert_eq!(keys[0], "annualized_return");
        assert_eq!(*keys.last().unwrap(), "exposure_time");
        assert!(!keys.contains(&"run_id"));
    }

    #[test]
    fn insert_number_maps_non_finite_to_null() {
        let mut set = MetricSet::new();
        set.insert_number("final_portfolio_value", Some(1000.0));
        set.insert_number("bad", Some(f64::NAN));
        assert_eq!(set.get("final_portfolio_value"), Some(MetricValue::Number(1000.0)));
        assert_eq!(set.get("bad"), None);
    }

    #[test]
    fn labels() {
        assert_eq!(metric_label("win_rate"), "Win Rate");
        assert_eq!(metric_label("exposure_time"), "Exposure Time");
    }
}
