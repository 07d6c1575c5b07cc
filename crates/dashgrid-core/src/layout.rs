//! Rows, the layout aggregate, and the edit primitives.
//!
//! [`LayoutState`] is the only place that touches card order.
//! Its `&mut self` methods are the complete set of edits; the runtime store
//! owns the single mutable instance and hands out `&LayoutState` to
//! everything else.
//!
//! # Edit semantics
//!
//! | Edit | Effect | Failure |
//! |------|--------|---------|
//! | `move_card` | remove from source row, insert into target row at a clamped index | unknown row, card not in source row |
//! | `reorder_cards_in_row` | array move-element within one row, target index clamped | unknown row, source index out of range |
//! | `delete_card` | remove exactly one card | unknown row, card not in row |
//!
//! Every failing edit leaves the state untouched.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::card::{Card, CardKind};
use crate::error::LayoutError;

/// Row ids of the default arrangement, top to bottom.
pub const DEFAULT_ROW_IDS: [&str; 3] = ["row-1", "row-2", "row-3"];

/// The hard-coded default arrangement.
///
/// ```
/// # use dashgrid_core::default_rows;
/// let rows = default_rows();
/// assert_eq!(rows.len(), 3);
/// assert_eq!(rows.iter().map(|r| r.len()).sum::<usize>(), 6);
/// ```
#[must_use]
pub fn default_rows() -> Vec<Row> {
    vec![
        Row::new(
            DEFAULT_ROW_IDS[0],
            vec![
                Card::of_kind(CardKind::Summary),
                Card::of_kind(CardKind::Orders),
                Card::of_kind(CardKind::TopProducts),
            ],
        ),
        Row::new(
            DEFAULT_ROW_IDS[1],
            vec![
                Card::of_kind(CardKind::SalesOverTime),
                Card::of_kind(CardKind::PaymentsHistory),
            ],
        ),
        Row::new(DEFAULT_ROW_IDS[2], vec![Card::of_kind(CardKind::LocationsMap)]),
    ]
}

/// An ordered band of cards rendered as one grid line.
///
/// The number of cards is also the row's grid column count. A row may be
/// empty after deletes; an empty row renders nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    id: String,
    cards: Vec<Card>,
}

impl Row {
    /// Create a row.
    #[must_use]
    pub fn new(id: impl Into<String>, cards: Vec<Card>) -> Self {
        Self {
            id: id.into(),
            cards,
        }
    }

    /// Row id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cards in render order.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Number of cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True when the row has no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Grid column count for this row.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.cards.len()
    }

    /// Index of the card with `card_id`, if present.
    #[must_use]
    pub fn position(&self, card_id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id() == card_id)
    }

    /// True if the row holds a card with `card_id`.
    #[must_use]
    pub fn contains(&self, card_id: &str) -> bool {
        self.position(card_id).is_some()
    }
}

/// Where a card currently sits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardLocation {
    /// Index of the row in the layout.
    pub row_index: usize,
    /// Id of the row.
    pub row_id: String,
    /// Index of the card within the row.
    pub index: usize,
}

/// The aggregate root: ordered rows plus the edit-mode flag.
///
/// `Default` is the hard-coded default arrangement with edit mode off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutState {
    rows: Vec<Row>,
    edit_mode: bool,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            edit_mode: false,
        }
    }
}

impl LayoutState {
    /// Build a state from rows after checking the id invariants.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self, LayoutError> {
        validate_rows(&rows)?;
        Ok(Self {
            rows,
            edit_mode: false,
        })
    }

    /// Rows in render order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume the state, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Whether drag handles and delete controls are active.
    #[must_use]
    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// Set the edit-mode flag.
    pub fn set_edit_mode(&mut self, on: bool) {
        self.edit_mode = on;
    }

    /// Flip the edit-mode flag, returning the new value.
    pub fn toggle_edit_mode(&mut self) -> bool {
        self.edit_mode = !self.edit_mode;
        self.edit_mode
    }

    /// Row with `row_id`.
    #[must_use]
    pub fn row(&self, row_id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == row_id)
    }

    /// Index of the row with `row_id`.
    #[must_use]
    pub fn row_index(&self, row_id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.id == row_id)
    }

    /// Find a card anywhere in the layout.
    #[must_use]
    pub fn locate(&self, card_id: &str) -> Option<CardLocation> {
        self.rows.iter().enumerate().find_map(|(row_index, row)| {
            row.position(card_id).map(|index| CardLocation {
                row_index,
                row_id: row.id.clone(),
                index,
            })
        })
    }

    /// Total number of cards across all rows.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.rows.iter().map(Row::len).sum()
    }

    /// All card ids in render order.
    pub fn card_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().flat_map(|r| r.cards.iter().map(Card::id))
    }

    /// Check the id invariants of the current rows.
    pub fn validate(&self) -> Result<(), LayoutError> {
        validate_rows(&self.rows)
    }

    /// Replace every row, keeping the edit-mode flag.
    pub fn replace_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
    }

    /// Move a card to another row at `target_index` (clamped to the row length).
    ///
    /// When `from_row == to_row` this is a reorder within the row, so a card
    /// can never be duplicated by a same-row move.
    pub fn move_card(
        &mut self,
        card_id: &str,
        from_row: &str,
        to_row: &str,
        target_index: usize,
    ) -> Result<(), LayoutError> {
        let from_idx = self
            .row_index(from_row)
            .ok_or_else(|| LayoutError::UnknownRow(from_row.to_string()))?;
        let position =
            self.rows[from_idx]
                .position(card_id)
                .ok_or_else(|| LayoutError::CardNotInRow {
                    card_id: card_id.to_string(),
                    row_id: from_row.to_string(),
                })?;

        if from_row == to_row {
            return self.reorder_cards_in_row(from_row, position, target_index);
        }

        let to_idx = self
            .row_index(to_row)
            .ok_or_else(|| LayoutError::UnknownRow(to_row.to_string()))?;

        let card = self.rows[from_idx].cards.remove(position);
        let dest = &mut self.rows[to_idx].cards;
        let at = target_index.min(dest.len());
        dest.insert(at, card);
        Ok(())
    }

    /// Move the card at `from_index` to `to_index` within one row.
    ///
    /// The card previously at `to_index` shifts aside; `to_index` is clamped
    /// to the last slot.
    pub fn reorder_cards_in_row(
        &mut self,
        row_id: &str,
        from_index: usize,
        to_index: usize,
    ) -> Result<(), LayoutError> {
        let idx = self
            .row_index(row_id)
            .ok_or_else(|| LayoutError::UnknownRow(row_id.to_string()))?;
        let cards = &mut self.rows[idx].cards;
        if from_index >= cards.len() {
            return Err(LayoutError::IndexOutOfRange {
                row_id: row_id.to_string(),
                index: from_index,
                len: cards.len(),
            });
        }
        let card = cards.remove(from_index);
        let at = to_index.min(cards.len());
        cards.insert(at, card);
        Ok(())
    }

    /// Remove a card permanently, returning it.
    pub fn delete_card(&mut self, card_id: &str, row_id: &str) -> Result<Card, LayoutError> {
        let idx = self
            .row_index(row_id)
            .ok_or_else(|| LayoutError::UnknownRow(row_id.to_string()))?;
        let position = self.rows[idx]
            .position(card_id)
            .ok_or_else(|| LayoutError::CardNotInRow {
                card_id: card_id.to_string(),
                row_id: row_id.to_string(),
            })?;
        Ok(self.rows[idx].cards.remove(position))
    }

    /// Drop rows that have no cards, returning how many were removed.
    pub fn prune_empty_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| !r.is_empty());
        before - self.rows.len()
    }
}

fn validate_rows(rows: &[Row]) -> Result<(), LayoutError> {
    let mut row_ids = HashSet::new();
    let mut card_ids = HashSet::new();
    for row in rows {
        if row.id.is_empty() {
            return Err(LayoutError::EmptyId);
        }
        if !row_ids.insert(row.id.as_str()) {
            return Err(LayoutError::DuplicateRowId(row.id.clone()));
        }
        for card in &row.cards {
            if card.id().is_empty() {
                return Err(LayoutError::EmptyId);
            }
            if !card_ids.insert(card.id()) {
                return Err(LayoutError::DuplicateCardId(card.id().to_string()));
            }
        }
    }
    Ok(())
}
