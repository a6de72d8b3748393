//! RunScope Core: backtest run model and the synchronized chart pipeline.
//!
//! This crate contains everything the viewer needs that is not terminal I/O:
//! - Domain types for runs, raw signal/trade records and metric mappings
//! - Series normalization (validation, ordering, de-duplication)
//! - Marker derivation for signals and executed trades
//! - The `RenderSurface` capability and an in-memory scene implementation
//! - Chart panes, the pane group error boundary, and time-scale sync
//! - Metric display formatting
//! - The run/result store with stale-response detection
//! - The results API client (HTTP and deterministic demo source)
//! - Viewer configuration

pub mod api;
pub mod chart;
pub mod config;
pub mod domain;
pub mod error;
pub mod format;
pub mod markers;
pub mod normalize;
pub mod pane;
pub mod store;
pub mod surface;
pub mod sync;

pub use chart::{ChartPoint, LogicalRange, Marker, MarkerPosition, MarkerShape, Tint};
pub use error::ChartError;
pub use pane::{ChartPane, GroupState, PaneGroup, PaneKind};
pub use store::{FetchTicket, RunStore};
pub use surface::{RenderSurface, SceneSurface, SurfaceError};
pub use sync::{SyncOutcome, TimeScaleSynchronizer};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the fetch worker moves across threads
    /// is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Run>();
        require_sync::<domain::Run>();
        require_send::<domain::RawSignal>();
        require_sync::<domain::RawSignal>();
        require_send::<domain::RawTrade>();
        require_sync::<domain::RawTrade>();
        require_send::<domain::MetricSet>();
        require_sync::<domain::MetricSet>();
        require_send::<store::FetchTicket>();
        require_sync::<store::FetchTicket>();
        require_send::<store::FetchPayload>();
        require_sync::<store::FetchPayload>();
        require_send::<api::FetchError>();
        require_sync::<api::FetchError>();
        require_send::<api::HttpApi>();
        require_sync::<api::HttpApi>();
        require_send::<api::DemoApi>();
        require_sync::<api::DemoApi>();
        require_send::<config::ViewerConfig>();
        require_sync::<config::ViewerConfig>();
    }

    /// The propagation guard is a `Cell`: the synchronizer is `Send`, not `Sync`.
    #[test]
    fn synchronizer_lives_on_one_thread() {
        fn require_send<T: Send>() {}
        require_send::<TimeScaleSynchronizer>();
    }
}
