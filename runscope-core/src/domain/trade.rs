//! Executed orders from `GET /trades/{run_id}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Order side as recorded by the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
    Short,
    Cover,
}

impl TradeAction {
    /// Buys and covers are drawn below the bar in green; sells and shorts
    /// above it in red.
    pub fn is_below_bar(self) -> bool {
        matches!(self, TradeAction::Buy | TradeAction::Cover)
    }

    pub fn label(self) -> &'static str {
        match self {
            TradeAction::Buy => "Buy",
            TradeAction::Sell => "Sell",
            TradeAction::Short => "Short",
            TradeAction::Cover => "Cover",
        }
    }
}

impl FromStr for TradeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeAction::Buy),
            "sell" => Ok(TradeAction::Sell),
            "short" => Ok(TradeAction::Short),
            "cover" => Ok(TradeAction::Cover),
            other => Err(format!("unknown trade action '{other}'")),
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One trade row exactly as the backend sent it.
///
/// The charted fields stay loosely typed; the bookkeeping columns are carried
/// for the trade tape but never validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub action: Value,
    #[serde(default)]
    pub reason: Value,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub fees: Option<f64>,
    #[serde(default)]
    pub net_profit: Option<f64>,
}

/// A trade that passed validation: parseable time, known action, finite price.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub time: i64,
    pub action: TradeAction,
    /// `None` only when the reason policy lets reason-less trades through.
    pub reason: Option<String>,
    pub price: f64,
    pub quantity: Option<f64>,
    pub net_profit: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_parses_case_insensitively() {
        assert_eq!("Buy".parse::<TradeAction>(), Ok(TradeAction::Buy));
        assert_eq!("COVER".parse::<TradeAction>(), Ok(TradeAction::Cover));
        assert_eq!(" short ".parse::<TradeAction>(), Ok(TradeAction::Short));
        assert!("hold".parse::<TradeAction>().is_err());
    }

    #[test]
    fn below_bar_sides() {
        assert!(TradeAction::Buy.is_below_bar());
        assert!(TradeAction::Cover.is_below_bar());
        assert!(!TradeAction::Sell.is_below_bar());
        assert!(!TradeAction::Short.is_below_bar());
    }

    #[test]
    fn decodes_backend_row_with_bookkeeping_columns() {
        let raw: RawTrade = serde_json::from_value(json!({
            "timestamp": "2024-01-02T09:30:00",
            "symbol": "NIFTY",
            "action": "Buy",
            "quantity": 10,
            "price": 101.5,
            "value": 1015.0,
            "fees": 1.2,
            "net_profit": null,
            "reason": "RSI oversold"
        }))
        .unwrap();
        assert_eq!(raw.symbol.as_deref(), Some("NIFTY"));
        assert_eq!(raw.quantity, Some(10.0));
        assert_eq!(raw.net_profit, None);
        assert_eq!(raw.reason, json!("RSI oversold"));
    }
}
