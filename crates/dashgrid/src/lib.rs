#![forbid(unsafe_code)]

//! dashgrid public facade crate.
//!
//! Re-exports the layout model, the runtime store and the drag surface, and
//! wires them together in [`Dashboard`]. Most applications only need the
//! [`prelude`].

use std::fmt;

mod dashboard;

pub use dashboard::Dashboard;

// --- Core re-exports -------------------------------------------------------

pub use dashgrid_core::{
    Card, CardKind, CardLocation, DEFAULT_ROW_IDS, LayoutError, LayoutState, Row, default_rows,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "file-storage")]
pub use dashgrid_runtime::FileStorage;
pub use dashgrid_runtime::{
    DashboardConfig, DataFeed, EmptyRowPolicy, FeedMsg, FetchError, Fetcher, LayoutMsg,
    LayoutObserver, LayoutStore, MemoryStorage, RefreshPolicy, RetryPolicy, RowDropPolicy,
    SnapshotStore, StorageBackend, StorageError,
};

// --- Widget re-exports -----------------------------------------------------

pub use dashgrid_widgets::{
    CardRenderer, CardView, DeleteControl, DragCoordinator, DragEvent, DragHandle, DropResolution,
    DropResult, IgnoreReason, LayoutView, RenderedRow, RowView, render_layout,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for dashgrid apps.
#[derive(Debug)]
pub enum Error {
    /// Snapshot storage failed.
    Storage(StorageError),
    /// The layout violates an invariant.
    Layout(LayoutError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Layout(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Layout(err) => Some(err),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

/// Standard result type for dashgrid APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Card, CardKind, CardRenderer, CardView, Dashboard, DashboardConfig, DragEvent, DropResult,
        Error, LayoutMsg, LayoutView, Result, Row, RowDropPolicy, render_layout,
    };

    pub use crate::{core, runtime, widgets};
}

pub use dashgrid_core as core;
pub use dashgrid_runtime as runtime;
pub use dashgrid_widgets as widgets;
