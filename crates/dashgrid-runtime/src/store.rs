#![forbid(unsafe_code)]

//! The layout store: single owner of the dashboard's [`LayoutState`].
//!
//! Every mutation runs to completion on the caller's thread and ends with an
//! explicit write-through:
//!
//! ```text
//! operation ──► LayoutState edit ──► commit ──► SnapshotStore::save
//!                    │                   └────► LayoutObserver::layout_changed
//!                    └─ error ──► warn! + return false (state untouched)
//! ```
//!
//! `reset_to_default` is the one exception: it clears the snapshot instead
//! of saving, so a reload does not resurrect the pre-reset arrangement.
//!
//! Consumers only ever get `&LayoutState`. Mutation goes through the named
//! operations or [`LayoutStore::update`].

use std::fmt;

use dashgrid_core::{CardLocation, LayoutError, LayoutState, Row, default_rows};

use crate::config::{DashboardConfig, EmptyRowPolicy};
use crate::state_persistence::{SnapshotStore, StorageBackend, StorageResult};

/// Receives the new state after every applied mutation.
pub trait LayoutObserver {
    /// Called after the state changed and the snapshot was written.
    fn layout_changed(&mut self, state: &LayoutState);
}

impl<F: FnMut(&LayoutState)> LayoutObserver for F {
    fn layout_changed(&mut self, state: &LayoutState) {
        self(state);
    }
}

/// A layout mutation as a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutMsg {
    /// Flip edit mode.
    ToggleEditMode,
    /// Set edit mode explicitly.
    SetEditMode(bool),
    /// Move a card between rows.
    MoveCard {
        /// Card to move.
        card_id: String,
        /// Row it is currently in.
        from_row: String,
        /// Destination row.
        to_row: String,
        /// Insert position in the destination row (clamped).
        target_index: usize,
    },
    /// Reorder within one row.
    ReorderCardsInRow {
        /// Row to reorder.
        row_id: String,
        /// Current position of the card.
        from_index: usize,
        /// New position (clamped).
        to_index: usize,
    },
    /// Delete a card.
    DeleteCard {
        /// Card to delete.
        card_id: String,
        /// Row it is in.
        row_id: String,
    },
    /// Restore the default arrangement and clear the snapshot.
    ResetToDefault,
}

/// Owns the layout state and keeps the persisted snapshot in step with it.
pub struct LayoutStore {
    state: LayoutState,
    snapshots: SnapshotStore,
    empty_rows: EmptyRowPolicy,
    observers: Vec<Box<dyn LayoutObserver>>,
}

impl LayoutStore {
    /// Open a store, restoring the persisted snapshot if there is a valid one.
    ///
    /// Edit mode always starts off.
    #[must_use]
    pub fn open(snapshots: SnapshotStore) -> Self {
        let state = match snapshots.load() {
            Some(rows) => LayoutState::from_rows(rows).unwrap_or_default(),
            None => LayoutState::default(),
        };
        tracing::debug!(
            backend = %snapshots.backend_name(),
            rows = state.rows().len(),
            cards = state.card_count(),
            "layout store opened"
        );
        Self {
            state,
            snapshots,
            empty_rows: EmptyRowPolicy::default(),
            observers: Vec::new(),
        }
    }

    /// Open a store over `backend` using the key and policies in `config`.
    #[must_use]
    pub fn with_config(backend: Box<dyn StorageBackend>, config: &DashboardConfig) -> Self {
        Self::open(SnapshotStore::new(backend, config.storage_key.clone()))
            .with_empty_rows(config.empty_rows)
    }

    /// Store over fresh memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(SnapshotStore::in_memory())
    }

    /// Set the empty row policy.
    #[must_use]
    pub fn with_empty_rows(mut self, policy: EmptyRowPolicy) -> Self {
        self.empty_rows = policy;
        self
    }

    /// Register an observer for applied mutations.
    pub fn subscribe(&mut self, observer: impl LayoutObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Read-only view of the current state.
    #[must_use]
    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    /// Rows in render order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        self.state.rows()
    }

    /// Whether edit mode is on.
    #[must_use]
    pub fn is_edit_mode(&self) -> bool {
        self.state.is_edit_mode()
    }

    /// Where a card currently is.
    #[must_use]
    pub fn find_card(&self, card_id: &str) -> Option<CardLocation> {
        self.state.locate(card_id)
    }

    /// The snapshot store this layout writes through to.
    #[must_use]
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Empty row policy in effect.
    #[must_use]
    pub fn empty_rows(&self) -> EmptyRowPolicy {
        self.empty_rows
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Flip edit mode and return the new value.
    pub fn toggle_edit_mode(&mut self) -> bool {
        let on = self.state.toggle_edit_mode();
        tracing::debug!(edit_mode = on, "edit mode toggled");
        self.commit();
        on
    }

    /// Set edit mode. Returns true if it changed.
    pub fn set_edit_mode(&mut self, on: bool) -> bool {
        if self.state.is_edit_mode() == on {
            return false;
        }
        self.toggle_edit_mode();
        true
    }

    /// Move a card to `to_row` at `target_index` (clamped).
    ///
    /// Returns false and leaves the state untouched when the card is not in
    /// `from_row` or either row is unknown.
    pub fn move_card(
        &mut self,
        card_id: &str,
        from_row: &str,
        to_row: &str,
        target_index: usize,
    ) -> bool {
        match self.state.move_card(card_id, from_row, to_row, target_index) {
            Ok(()) => {
                tracing::debug!(
                    card_id,
                    from_row,
                    to_row,
                    target_index,
                    "card moved"
                );
                self.apply_empty_row_policy();
                self.commit();
                true
            }
            Err(e) => no_op("move_card", &e),
        }
    }

    /// Move the card at `from_index` to `to_index` within `row_id`.
    pub fn reorder_cards_in_row(
        &mut self,
        row_id: &str,
        from_index: usize,
        to_index: usize,
    ) -> bool {
        match self.state.reorder_cards_in_row(row_id, from_index, to_index) {
            Ok(()) => {
                tracing::debug!(row_id, from_index, to_index, "row reordered");
                self.commit();
                true
            }
            Err(e) => no_op("reorder_cards_in_row", &e),
        }
    }

    /// Permanently remove a card from `row_id`.
    pub fn delete_card(&mut self, card_id: &str, row_id: &str) -> bool {
        match self.state.delete_card(card_id, row_id) {
            Ok(card) => {
                tracing::debug!(card_id = %card.id(), kind = %card.kind(), row_id, "card deleted");
                self.apply_empty_row_policy();
                self.commit();
                true
            }
            Err(e) => no_op("delete_card", &e),
        }
    }

    /// Restore the default rows, keep edit mode, and clear the snapshot.
    pub fn reset_to_default(&mut self) -> bool {
        self.state.replace_rows(default_rows());
        if let Err(e) = self.snapshots.clear() {
            tracing::warn!(key = %self.snapshots.key(), error = %e, "failed to clear layout snapshot");
        }
        tracing::debug!(edit_mode = self.state.is_edit_mode(), "layout reset to default");
        self.notify();
        true
    }

    /// Apply a message. Returns whether it was applied.
    pub fn update(&mut self, msg: LayoutMsg) -> bool {
        match msg {
            LayoutMsg::ToggleEditMode => {
                self.toggle_edit_mode();
                true
            }
            LayoutMsg::SetEditMode(on) => self.set_edit_mode(on),
            LayoutMsg::MoveCard {
                card_id,
                from_row,
                to_row,
                target_index,
            } => self.move_card(&card_id, &from_row, &to_row, target_index),
            LayoutMsg::ReorderCardsInRow {
                row_id,
                from_index,
                to_index,
            } => self.reorder_cards_in_row(&row_id, from_index, to_index),
            LayoutMsg::DeleteCard { card_id, row_id } => self.delete_card(&card_id, &row_id),
            LayoutMsg::ResetToDefault => self.reset_to_default(),
        }
    }

    fn apply_empty_row_policy(&mut self) {
        if self.empty_rows == EmptyRowPolicy::Prune {
            let pruned = self.state.prune_empty_rows();
            if pruned > 0 {
                tracing::debug!(pruned, "empty rows pruned");
            }
        }
    }

    /// Write the current rows to storage now, reporting failures.
    pub fn persist(&self) -> StorageResult<()> {
        self.snapshots.save(self.state.rows())
    }

    /// Write the rows through to storage, then notify observers.
    fn commit(&mut self) {
        if let Err(e) = self.persist() {
            tracing::warn!(key = %self.snapshots.key(), error = %e, "failed to save layout snapshot");
        }
        self.notify();
    }

    fn notify(&mut self) {
        for observer in &mut self.observers {
            observer.layout_changed(&self.state);
        }
    }
}

fn no_op(op: &'static str, error: &LayoutError) -> bool {
    tracing::warn!(op, error = %error, "layout mutation ignored");
    false
}

impl fmt::Debug for LayoutStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutStore")
            .field("state", &self.state)
            .field("snapshots", &self.snapshots)
            .field("empty_rows", &self.empty_rows)
            .field("observers", &self.observers.len())
            .finish()
    }
}
