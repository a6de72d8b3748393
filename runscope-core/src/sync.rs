//! Time-scale synchronizer.
//!
//! A range change on one pane is applied to the other two. Applying it makes
//! those panes raise their own notifications; they are delivered back here
//! while the propagation guard is held and ignored, so one user action moves
//! each pane exactly once.

use std::cell::Cell;

use tracing::{trace, warn};

use crate::chart::LogicalRange;
use crate::pane::{PaneGroup, PaneKind};
use crate::surface::{RenderSurface, SurfaceError};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// A propagation was already in progress.
    Ignored,
    /// The source pane has no visible range to share.
    NoRange,
    Propagated {
        range: LogicalRange,
        targets: Vec<PaneKind>,
        failures: Vec<(PaneKind, SurfaceError)>,
    },
}

#[derive(Debug, Default)]
pub struct TimeScaleSynchronizer {
    propagating: Cell<bool>,
}

/// Holds the guard; releasing happens on drop, on every exit path.
struct PropagationToken<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> PropagationToken<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self { flag })
    }
}

impl Drop for PropagationToken<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl TimeScaleSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_propagating(&self) -> bool {
        self.propagating.get()
    }

    /// Handle a visible-range change raised by `source`.
    pub fn on_range_changed<S: RenderSurface>(
        &self,
        source: PaneKind,
        group: &mut PaneGroup<S>,
    ) -> SyncOutcome {
        let Some(_token) = PropagationToken::acquire(&self.propagating) else {
            trace!(pane = %source, "range change ignored during propagation");
            return SyncOutcome::Ignored;
        };

        let Some(range) = group.pane(source).surface().visible_logical_range() else {
            return SyncOutcome::NoRange;
        };

        let mut targets = Vec::with_capacity(2);
        let mut failures = Vec::new();
        for target in source.others() {
            match group
                .pane_mut(target)
                .surface_mut()
                .set_visible_logical_range(range)
            {
                Ok(()) => targets.push(target),
                Err(e) => {
                    warn!(source = %source, target = %target, error = %e, "range sync failed");
                    failures.push((target, e));
                }
            }
        }

        for target in source.others() {
            let raised = group.pane_mut(target).surface_mut().drain_range_changes();
            for _ in raised {
                self.on_range_changed(target, group);
            }
        }

        SyncOutcome::Propagated {
            range,
            targets,
            failures,
        }
    }

    /// Drain every pane's queued notifications and propagate, one pass per
    /// pane that changed.
    pub fn dispatch_pending<S: RenderSurface>(&self, group: &mut PaneGroup<S>) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        for kind in PaneKind::ALL {
            if group.pane_mut(kind).surface_mut().drain_range_changes().is_empty() {
                continue;
            }
            outcomes.push(self.on_range_changed(kind, group));
        }
        outcomes
    }
}
