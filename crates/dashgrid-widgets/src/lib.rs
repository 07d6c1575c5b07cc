#![forbid(unsafe_code)]

//! Interaction and rendering surface for dashgrid.
//!
//! - [`drag`] turns drag gestures into layout mutations
//! - [`view`] gives renderers a read-only walk over rows and cards

pub mod drag;
pub mod view;

pub use drag::{
    CardDropTarget, DragCoordinator, DragEvent, DragState, DropResolution, DropResult,
    IgnoreReason, resolve_drop,
};
pub use view::{
    CardRenderer, CardView, DeleteControl, DragHandle, LayoutView, RenderedRow, RowView,
    render_layout,
};
