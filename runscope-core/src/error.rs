//! Chart refresh failures.
//!
//! Fetch failures live in [`crate::api::FetchError`]; surface rejections in
//! [`crate::surface::SurfaceError`].

use thiserror::Error;

use crate::pane::PaneKind;
use crate::surface::SurfaceError;

/// Why a chart refresh did not complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// Normalization left no plottable price points. No pane was touched.
    #[error("no displayable data: every price record was invalid or missing")]
    NoDisplayableData,

    /// A rendering surface rejected an operation. The pane is left empty.
    #[error("{pane} pane render failure: {source}")]
    Render {
        pane: PaneKind,
        #[source]
        source: SurfaceError,
    },

    /// A panic escaped a pane update and was caught at the pane group.
    #[error("chart region failed: {0}")]
    Faulted(String),
}

impl ChartError {
    pub fn render(pane: PaneKind, source: SurfaceError) -> Self {
        ChartError::Render { pane, source }
    }

    /// Short category tag for status lines and the error history.
    pub fn category(&self) -> &'static str {
        match self {
            ChartError::NoDisplayableData => "DATA",
            ChartError::Render { .. } => "RENDER",
            ChartError::Faulted(_) => "FAULT",
        }
    }
}
