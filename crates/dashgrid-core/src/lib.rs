#![forbid(unsafe_code)]

//! Layout model for dashgrid.
//!
//! This crate owns the pure data side of the dashboard layout engine:
//!
//! - [`CardKind`] - closed set of widget types (unknown names are preserved)
//! - [`Card`] - a widget placement with a stable id, a kind and a title
//! - [`Row`] - an ordered band of cards
//! - [`LayoutState`] - the aggregate root (rows + edit mode) with the
//!   invariant-preserving edit primitives used by the runtime store
//! - [`LayoutError`] - validation and edit failures
//!
//! Nothing in here performs I/O. Persistence, logging of failed edits and
//! change notification live in `dashgrid-runtime`.
//!
//! # Invariants
//!
//! 1. A card id appears at most once across all rows.
//! 2. A row id appears at most once in the layout.
//! 3. Edits never create or destroy cards except [`LayoutState::delete_card`],
//!    which removes exactly one.
//! 4. Row order only changes through explicit row pruning.

pub mod card;
pub mod error;
pub mod layout;

pub use card::{Card, CardKind};
pub use error::LayoutError;
pub use layout::{CardLocation, DEFAULT_ROW_IDS, LayoutState, Row, default_rows};
