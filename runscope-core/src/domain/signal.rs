//! Raw per-bar strategy evaluation rows from `GET /signals/{run_id}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One evaluated bar, exactly as the backend sent it.
///
/// Fields stay loosely typed so a single malformed row is dropped by the
/// normalizer instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub rsi: Value,
    #[serde(default)]
    pub signal: Value,
}

/// Buy/sell/none flag carried by a signal row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDirection {
    Buy,
    Sell,
    None,
}

impl RawSignal {
    /// `1` ⇒ buy, `-1` ⇒ sell, anything else ⇒ none.
    pub fn direction(&self) -> SignalDirection {
        match self.signal.as_f64() {
            Some(v) if v == 1.0 => SignalDirection::Buy,
            Some(v) if v == -1.0 => SignalDirection::Sell,
            _ => SignalDirection::None,
        }
    }
}
