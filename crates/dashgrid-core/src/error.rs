//! Layout validation and edit errors.

use std::fmt;

/// Errors produced when validating a layout or applying an edit to it.
///
/// None of these are user-facing: the runtime store turns edit errors into
/// logged no-ops, and snapshot validation errors into "no snapshot".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// A card id appears more than once across the layout.
    DuplicateCardId(String),
    /// A row id appears more than once in the layout.
    DuplicateRowId(String),
    /// A row or card has an empty id.
    EmptyId,
    /// No row with this id exists.
    UnknownRow(String),
    /// The card is not in the named row.
    CardNotInRow {
        /// Card that was looked up.
        card_id: String,
        /// Row it was expected in.
        row_id: String,
    },
    /// A source index is outside the row.
    IndexOutOfRange {
        /// Row that was indexed.
        row_id: String,
        /// Offending index.
        index: usize,
        /// Number of cards in the row.
        len: usize,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCardId(id) => write!(f, "duplicate card id '{id}'"),
            Self::DuplicateRowId(id) => write!(f, "duplicate row id '{id}'"),
            Self::EmptyId => write!(f, "empty row or card id"),
            Self::UnknownRow(id) => write!(f, "unknown row '{id}'"),
            Self::CardNotInRow { card_id, row_id } => {
                write!(f, "card '{card_id}' not found in row '{row_id}'")
            }
            Self::IndexOutOfRange { row_id, index, len } => {
                write!(f, "index {index} out of range for row '{row_id}' ({len} cards)")
            }
        }
    }
}

impl std::error::Error for LayoutError {}
