//! Marker builder: BUY/SELL arrows from signals, reason circles from trades.
//!
//! Surfaces require marker times to be non-decreasing, so both sets are
//! stably sorted by time; ties keep their construction order.

use tracing::debug;

use crate::chart::{Marker, MarkerPosition, MarkerShape, Tint};
use crate::domain::{unix_seconds, RawSignal, SignalDirection, Trade};
use crate::normalize::finite_number;

/// Text used for a trade marker whose reason is absent.
pub const TRADE_FALLBACK_TEXT: &str = "Trade";

pub fn buy_marker(time: i64) -> Marker {
    Marker {
        time,
        position: MarkerPosition::BelowBar,
        color: Tint::Green,
        shape: MarkerShape::ArrowUp,
        text: "BUY".to_string(),
    }
}

pub fn sell_marker(time: i64) -> Marker {
    Marker {
        time,
        position: MarkerPosition::AboveBar,
        color: Tint::Red,
        shape: MarkerShape::ArrowDown,
        text: "SELL".to_string(),
    }
}

/// BUY markers for `signal = 1`, SELL markers for `signal = -1`.
///
/// A row needs a valid timestamp and a finite price to be marked, the same
/// rules that admit it to the price series. Buys are listed before sells
/// prior to the stable sort, so a buy and a sell at the same instant keep
/// that order.
pub fn signal_markers(raw: &[RawSignal]) -> Vec<Marker> {
    let mut buys = Vec::new();
    let mut sells = Vec::new();

    for row in raw {
        let direction = row.direction();
        if direction == SignalDirection::None {
            continue;
        }
        let Some(time) = unix_seconds(&row.timestamp) else {
            debug!(timestamp = %row.timestamp, "signal marker skipped: invalid timestamp");
            continue;
        };
        if finite_number(&row.price).is_none() {
            debug!(time, price = %row.price, "signal marker skipped: invalid price");
            continue;
        }
        match direction {
            SignalDirection::Buy => buys.push(buy_marker(time)),
            SignalDirection::Sell => sells.push(sell_marker(time)),
            SignalDirection::None => {}
        }
    }

    let mut markers = buys;
    markers.append(&mut sells);
    markers.sort_by_key(|m| m.time);
    markers
}

/// One circle per validated trade, coloured by side, labelled with its reason.
pub fn trade_markers(trades: &[Trade]) -> Vec<Marker> {
    let mut markers: Vec<Marker> = trades
        .iter()
        .map(|t| {
            let (position, color) = if t.action.is_below_bar() {
                (MarkerPosition::BelowBar, Tint::Green)
            } else {
                (MarkerPosition::AboveBar, Tint::Red)
            };
            Marker {
                time: t.time,
                position,
                color,
                shape: MarkerShape::Circle,
                text: t
                    .reason
                    .clone()
                    .unwrap_or_else(|| TRADE_FALLBACK_TEXT.to_string()),
            }
        })
        .collect();
    markers.sort_by_key(|m| m.time);
    markers
}
