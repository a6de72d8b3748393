//! RunScope TUI: terminal viewer for backtest runs.
//!
//! A run list and metrics table beside three stacked chart panes (price with
//! signal markers, price with trade markers, RSI with 70/30 thresholds) that
//! always show the same time window.

pub mod app;
pub mod input;
pub mod theme;
pub mod ui;
pub mod worker;

pub use app::{AppSettings, AppState};
pub use theme::Theme;
