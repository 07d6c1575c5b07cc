#![forbid(unsafe_code)]

//! Card drag-and-drop coordination.
//!
//! Defines the [`DragEvent`] capability interface that any pointer, touch or
//! native drag source reports through, the pure [`resolve_drop`] algorithm
//! that maps a drop to a single layout mutation, and the [`DragCoordinator`]
//! that applies it to a [`CardDropTarget`].
//!
//! # Design
//!
//! The drag source only has to know stable card ids. It reports:
//!
//! ```text
//! Begin{card_id} ─► Over{target_id}* ─► End{source_id, target_id} | Cancel
//! ```
//!
//! `End` carries everything needed to resolve the drop; the coordinator keeps
//! nothing across gestures beyond the one in progress.
//!
//! ## Invariants
//!
//! 1. A drop applies at most one mutation: one reorder or one move.
//! 2. Dropping a card on itself is a no-op, decided before any row lookup.
//! 3. A drag cannot begin outside edit mode, and a drop arriving after edit
//!    mode was exited is ignored.
//! 4. Resolution never panics: every unresolvable drop becomes
//!    [`DropResolution::Ignore`].
//!
//! ## Failure Modes
//!
//! | Failure | Cause | Fallback |
//! |---------|-------|----------|
//! | Source card not in any row | Stale event after delete/reset | `Ignore(UnknownSource)` |
//! | Nothing under the pointer | Drop outside the grid | `Ignore(NoTarget)` |
//! | Target is a row, not a card | Drop on a row's empty area | `Ignore(RowTarget)` unless `AppendToEnd` |
//! | Target id unknown | Stale or foreign element | `Ignore(UnknownTarget)` |
//! | Edit mode exited mid-drag | Toggle while dragging | `Ignore(NotEditing)` |

use std::fmt;

use dashgrid_core::Row;
use dashgrid_runtime::{LayoutStore, RowDropPolicy};

// ---------------------------------------------------------------------------
// DragEvent
// ---------------------------------------------------------------------------

/// A raw drag gesture event, keyed by element id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DragEvent {
    /// The user picked up a card.
    Begin {
        /// Card being dragged.
        card_id: String,
    },
    /// The pointer moved over an element.
    Over {
        /// Card or row id under the pointer.
        target_id: String,
    },
    /// The user released the card.
    End {
        /// Card that was dragged.
        source_id: String,
        /// Card or row id under the pointer, if any.
        target_id: Option<String>,
    },
    /// The gesture was abandoned.
    Cancel,
}

impl DragEvent {
    /// Begin dragging `card_id`.
    #[must_use]
    pub fn begin(card_id: impl Into<String>) -> Self {
        Self::Begin {
            card_id: card_id.into(),
        }
    }

    /// Hover over `target_id`.
    #[must_use]
    pub fn over(target_id: impl Into<String>) -> Self {
        Self::Over {
            target_id: target_id.into(),
        }
    }

    /// Drop `source_id` on `target_id`.
    #[must_use]
    pub fn end(source_id: impl Into<String>, target_id: Option<&str>) -> Self {
        Self::End {
            source_id: source_id.into(),
            target_id: target_id.map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// DragState
// ---------------------------------------------------------------------------

/// The gesture in progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragState {
    /// Card being dragged.
    pub source_id: String,
    /// Last element hovered.
    pub over_id: Option<String>,
    /// Number of hover events seen.
    pub hover_count: usize,
}

impl DragState {
    /// Start tracking a drag of `source_id`.
    #[must_use]
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            over_id: None,
            hover_count: 0,
        }
    }

    /// Record a hover.
    pub fn hover(&mut self, target_id: impl Into<String>) {
        self.over_id = Some(target_id.into());
        self.hover_count += 1;
    }

    /// True while hovering the source card itself.
    #[must_use]
    pub fn is_over_self(&self) -> bool {
        self.over_id.as_deref() == Some(self.source_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// DropResolution
// ---------------------------------------------------------------------------

/// Why a drop did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Nothing was under the pointer.
    NoTarget,
    /// The card was dropped on itself.
    DroppedOnSelf,
    /// The dragged card is not in the layout.
    UnknownSource,
    /// The target id names neither a card nor a row.
    UnknownTarget,
    /// The target is a row and row drops are ignored.
    RowTarget,
    /// The layout is not in edit mode.
    NotEditing,
    /// The layout refused the resolved mutation.
    Rejected,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoTarget => "no drop target",
            Self::DroppedOnSelf => "dropped on itself",
            Self::UnknownSource => "dragged card not in layout",
            Self::UnknownTarget => "unknown drop target",
            Self::RowTarget => "row drops are ignored",
            Self::NotEditing => "not in edit mode",
            Self::Rejected => "layout rejected the drop",
        };
        f.write_str(text)
    }
}

/// The single mutation a drop maps to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropResolution {
    /// Reorder within one row.
    Reorder {
        /// Row holding both cards.
        row_id: String,
        /// Current index of the dragged card.
        from_index: usize,
        /// Index it moves to.
        to_index: usize,
    },
    /// Move to another row.
    Move {
        /// Dragged card.
        card_id: String,
        /// Row it leaves.
        from_row: String,
        /// Row it joins.
        to_row: String,
        /// Insert position in `to_row`.
        target_index: usize,
    },
    /// Do nothing.
    Ignore(IgnoreReason),
}

impl DropResolution {
    /// Returns true unless this is [`DropResolution::Ignore`].
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Ignore(_))
    }
}

/// Resolve a drop of `source_id` on `target_id` against `rows`.
///
/// A target naming a card resolves to a reorder (same row) or a move
/// (different row) to that card's index. A target naming a row resolves to
/// the end of that row under [`RowDropPolicy::AppendToEnd`] and is ignored
/// otherwise.
#[must_use]
pub fn resolve_drop(
    rows: &[Row],
    source_id: &str,
    target_id: Option<&str>,
    row_drop: RowDropPolicy,
) -> DropResolution {
    let Some(target_id) = target_id else {
        return DropResolution::Ignore(IgnoreReason::NoTarget);
    };
    if source_id == target_id {
        return DropResolution::Ignore(IgnoreReason::DroppedOnSelf);
    }

    let Some((source_row, from_index)) = find_card(rows, source_id) else {
        return DropResolution::Ignore(IgnoreReason::UnknownSource);
    };

    let (target_row, target_index) = if let Some(found) = find_card(rows, target_id) {
        found
    } else if let Some(row) = rows.iter().find(|r| r.id() == target_id) {
        if row_drop != RowDropPolicy::AppendToEnd {
            return DropResolution::Ignore(IgnoreReason::RowTarget);
        }
        let end = if row.id() == source_row.id() {
            row.len() - 1
        } else {
            row.len()
        };
        (row, end)
    } else {
        return DropResolution::Ignore(IgnoreReason::UnknownTarget);
    };

    if source_row.id() == target_row.id() {
        DropResolution::Reorder {
            row_id: source_row.id().to_string(),
            from_index,
            to_index: target_index,
        }
    } else {
        DropResolution::Move {
            card_id: source_id.to_string(),
            from_row: source_row.id().to_string(),
            to_row: target_row.id().to_string(),
            target_index,
        }
    }
}

fn find_card<'a>(rows: &'a [Row], card_id: &str) -> Option<(&'a Row, usize)> {
    rows.iter()
        .find_map(|row| row.position(card_id).map(|index| (row, index)))
}

// ---------------------------------------------------------------------------
// CardDropTarget trait
// ---------------------------------------------------------------------------

/// A layout that drops can be applied to.
pub trait CardDropTarget {
    /// Current rows.
    fn rows(&self) -> &[Row];

    /// Whether drag interaction is enabled.
    fn is_edit_mode(&self) -> bool;

    /// Apply a same-row reorder. Returns whether it was applied.
    fn apply_reorder(&mut self, row_id: &str, from_index: usize, to_index: usize) -> bool;

    /// Apply a cross-row move. Returns whether it was applied.
    fn apply_move(&mut self, card_id: &str, from_row: &str, to_row: &str, target_index: usize)
    -> bool;
}

impl CardDropTarget for LayoutStore {
    fn rows(&self) -> &[Row] {
        LayoutStore::rows(self)
    }

    fn is_edit_mode(&self) -> bool {
        LayoutStore::is_edit_mode(self)
    }

    fn apply_reorder(&mut self, row_id: &str, from_index: usize, to_index: usize) -> bool {
        self.reorder_cards_in_row(row_id, from_index, to_index)
    }

    fn apply_move(
        &mut self,
        card_id: &str,
        from_row: &str,
        to_row: &str,
        target_index: usize,
    ) -> bool {
        self.move_card(card_id, from_row, to_row, target_index)
    }
}

// ---------------------------------------------------------------------------
// DropResult
// ---------------------------------------------------------------------------

/// Outcome of a drop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropResult {
    /// The resolved mutation was applied.
    Applied(DropResolution),
    /// Nothing changed.
    Ignored(IgnoreReason),
}

impl DropResult {
    /// Returns true if the drop changed the layout.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Why the drop was ignored, if it was.
    #[must_use]
    pub fn ignore_reason(&self) -> Option<IgnoreReason> {
        match self {
            Self::Applied(_) => None,
            Self::Ignored(reason) => Some(*reason),
        }
    }
}

// ---------------------------------------------------------------------------
// DragCoordinator
// ---------------------------------------------------------------------------

/// Turns drag events into layout mutations.
#[derive(Clone, Debug, Default)]
pub struct DragCoordinator {
    row_drop: RowDropPolicy,
    active: Option<DragState>,
}

impl DragCoordinator {
    /// Coordinator with the default (ignore) row drop policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how drops on a row's empty area resolve.
    #[must_use]
    pub fn with_row_drop(mut self, policy: RowDropPolicy) -> Self {
        self.row_drop = policy;
        self
    }

    /// Row drop policy in effect.
    #[must_use]
    pub fn row_drop(&self) -> RowDropPolicy {
        self.row_drop
    }

    /// The gesture in progress.
    #[must_use]
    pub fn active(&self) -> Option<&DragState> {
        self.active.as_ref()
    }

    /// True while a gesture is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Start a drag. Refused outside edit mode or for a card not in the layout.
    pub fn begin<T: CardDropTarget + ?Sized>(&mut self, target: &T, card_id: &str) -> bool {
        if !target.is_edit_mode() {
            tracing::trace!(card_id, "drag refused: not in edit mode");
            return false;
        }
        if find_card(target.rows(), card_id).is_none() {
            tracing::trace!(card_id, "drag refused: unknown card");
            return false;
        }
        if let Some(previous) = self.active.replace(DragState::new(card_id)) {
            tracing::trace!(previous = %previous.source_id, "drag replaced");
        }
        tracing::trace!(card_id, "drag begin");
        true
    }

    /// Record a hover. Returns false when no drag is active.
    pub fn over(&mut self, target_id: &str) -> bool {
        match self.active.as_mut() {
            Some(state) => {
                state.hover(target_id);
                tracing::trace!(target_id, "drag over");
                true
            }
            None => false,
        }
    }

    /// Abandon the gesture in progress.
    pub fn cancel(&mut self) {
        if let Some(state) = self.active.take() {
            tracing::trace!(source_id = %state.source_id, "drag cancelled");
        }
    }

    /// Finish a gesture and apply the drop.
    ///
    /// Resolution uses only the event payload and the target's current rows.
    pub fn end<T: CardDropTarget + ?Sized>(
        &mut self,
        target: &mut T,
        source_id: &str,
        target_id: Option<&str>,
    ) -> DropResult {
        self.active = None;
        if !target.is_edit_mode() {
            tracing::trace!(source_id, "drop ignored: not in edit mode");
            return DropResult::Ignored(IgnoreReason::NotEditing);
        }

        let resolution = resolve_drop(target.rows(), source_id, target_id, self.row_drop);
        let applied = match &resolution {
            DropResolution::Ignore(reason) => {
                tracing::trace!(source_id, target_id, reason = %reason, "drop ignored");
                return DropResult::Ignored(*reason);
            }
            DropResolution::Reorder {
                row_id,
                from_index,
                to_index,
            } => target.apply_reorder(row_id, *from_index, *to_index),
            DropResolution::Move {
                card_id,
                from_row,
                to_row,
                target_index,
            } => target.apply_move(card_id, from_row, to_row, *target_index),
        };

        if applied {
            tracing::debug!(source_id, target_id, resolution = ?resolution, "drop applied");
            DropResult::Applied(resolution)
        } else {
            DropResult::Ignored(IgnoreReason::Rejected)
        }
    }

    /// Feed one event. Returns the drop result for `End`.
    pub fn handle<T: CardDropTarget + ?Sized>(
        &mut self,
        target: &mut T,
        event: DragEvent,
    ) -> Option<DropResult> {
        match event {
            DragEvent::Begin { card_id } => {
                self.begin(target, &card_id);
                None
            }
            DragEvent::Over { target_id } => {
                self.over(&target_id);
                None
            }
            DragEvent::End {
                source_id,
                target_id,
            } => Some(self.end(target, &source_id, target_id.as_deref())),
            DragEvent::Cancel => {
                self.cancel();
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use dashgrid_core::{Card, CardKind, default_rows};
    use pretty_assertions::assert_eq;

    // --- resolve_drop ---

    #[test]
    fn drop_on_card_in_same_row_reorders() {
        let rows = default_rows();
        assert_eq!(
            resolve_drop(&rows, "summary", Some("topProducts"), RowDropPolicy::Ignore),
            DropResolution::Reorder {
                row_id: "row-1".into(),
                from_index: 0,
                to_index: 2,
            }
        );
    }

    #[test]
    fn drop_on_card_in_other_row_moves() {
        let rows = default_rows();
        assert_eq!(
            resolve_drop(&rows, "summary", Some("paymentsHistory"), RowDropPolicy::Ignore),
            DropResolution::Move {
                card_id: "summary".into(),
                from_row: "row-1".into(),
                to_row: "row-2".into(),
                target_index: 1,
            }
        );
    }

    #[test]
    fn drop_on_self_is_ignored_before_lookup() {
        // Not even in the layout: self-drop still wins
        let rows: Vec<Row> = Vec::new();
        assert_eq!(
            resolve_drop(&rows, "ghost", Some("ghost"), RowDropPolicy::Ignore),
            DropResolution::Ignore(IgnoreReason::DroppedOnSelf)
        );
    }

    #[test]
    fn unresolvable_drops_are_ignored() {
        let rows = default_rows();
        let cases = [
            ("summary", None, IgnoreReason::NoTarget),
            ("ghost", Some("orders"), IgnoreReason::UnknownSource),
            ("summary", Some("nowhere"), IgnoreReason::UnknownTarget),
            ("summary", Some("row-2"), IgnoreReason::RowTarget),
        ];
        for (source, target, reason) in cases {
            assert_eq!(
                resolve_drop(&rows, source, target, RowDropPolicy::Ignore),
                DropResolution::Ignore(reason),
                "source={source} target={target:?}"
            );
        }
    }

    #[test]
    fn row_drop_appends_when_configured() {
        let rows = default_rows();
        assert_eq!(
            resolve_drop(&rows, "summary", Some("row-3"), RowDropPolicy::AppendToEnd),
            DropResolution::Move {
                card_id: "summary".into(),
                from_row: "row-1".into(),
                to_row: "row-3".into(),
                target_index: 1,
            }
        );
        assert_eq!(
            resolve_drop(&rows, "summary", Some("row-1"), RowDropPolicy::AppendToEnd),
            DropResolution::Reorder {
                row_id: "row-1".into(),
                from_index: 0,
                to_index: 2,
            }
        );
    }

    #[test]
    fn row_drop_onto_empty_row_targets_index_zero() {
        let rows = vec![
            Row::new("a", vec![Card::of_kind(CardKind::Orders)]),
            Row::new("b", vec![]),
        ];
        assert_eq!(
            resolve_drop(&rows, "orders", Some("b"), RowDropPolicy::AppendToEnd),
            DropResolution::Move {
                card_id: "orders".into(),
                from_row: "a".into(),
                to_row: "b".into(),
                target_index: 0,
            }
        );
    }

    // --- DragState ---

    #[test]
    fn drag_state_tracks_hover() {
        let mut state = DragState::new("summary");
        assert!(state.over_id.is_none());
        state.hover("orders");
        state.hover("summary");
        assert_eq!(state.hover_count, 2);
        assert!(state.is_over_self());
    }

    // --- DragCoordinator ---

    /// Drop target fixture that records calls instead of mutating.
    struct RecordingTarget {
        rows: Vec<Row>,
        editing: bool,
        accept: bool,
        log: Vec<String>,
    }

    impl RecordingTarget {
        fn new() -> Self {
            Self {
                rows: default_rows(),
                editing: true,
                accept: true,
                log: Vec::new(),
            }
        }

        fn drain_log(&mut self) -> Vec<String> {
            std::mem::take(&mut self.log)
        }
    }

    impl CardDropTarget for RecordingTarget {
        fn rows(&self) -> &[Row] {
            &self.rows
        }

        fn is_edit_mode(&self) -> bool {
            self.editing
        }

        fn apply_reorder(&mut self, row_id: &str, from_index: usize, to_index: usize) -> bool {
            self.log.push(format!("reorder {row_id} {from_index}->{to_index}"));
            self.accept
        }

        fn apply_move(
            &mut self,
            card_id: &str,
            from_row: &str,
            to_row: &str,
            target_index: usize,
        ) -> bool {
            self.log.push(format!("move {card_id} {from_row}->{to_row}@{target_index}"));
            self.accept
        }
    }

    #[test]
    fn begin_refused_outside_edit_mode() {
        let mut target = RecordingTarget::new();
        target.editing = false;
        let mut coord = DragCoordinator::new();
        assert!(!coord.begin(&target, "summary"));
        assert!(!coord.is_dragging());
    }

    #[test]
    fn begin_refused_for_unknown_card() {
        let target = RecordingTarget::new();
        let mut coord = DragCoordinator::new();
        assert!(!coord.begin(&target, "ghost"));
    }

    #[test]
    fn over_without_drag_is_ignored() {
        let mut coord = DragCoordinator::new();
        assert!(!coord.over("orders"));
    }

    #[test]
    fn full_gesture_applies_one_mutation() {
        let mut target = RecordingTarget::new();
        let mut coord = DragCoordinator::new();

        let events = [
            DragEvent::begin("summary"),
            DragEvent::over("orders"),
            DragEvent::over("salesOverTime"),
            DragEvent::end("summary", Some("salesOverTime")),
        ];
        let mut results = Vec::new();
        for event in events {
            if let Some(result) = coord.handle(&mut target, event) {
                results.push(result);
            }
        }

        assert_eq!(results.len(), 1);
        assert!(results[0].is_applied());
        assert_eq!(target.drain_log(), vec!["move summary row-1->row-2@0"]);
        assert!(!coord.is_dragging());
    }

    #[test]
    fn hover_state_visible_mid_gesture() {
        let mut target = RecordingTarget::new();
        let mut coord = DragCoordinator::new();
        coord.handle(&mut target, DragEvent::begin("orders"));
        coord.handle(&mut target, DragEvent::over("summary"));
        let state = coord.active().unwrap();
        assert_eq!(state.source_id, "orders");
        assert_eq!(state.over_id.as_deref(), Some("summary"));
    }

    #[test]
    fn drop_after_edit_mode_exit_is_ignored() {
        let mut target = RecordingTarget::new();
        let mut coord = DragCoordinator::new();
        assert!(coord.begin(&target, "summary"));

        target.editing = false;
        let result = coord.end(&mut target, "summary", Some("orders"));
        assert_eq!(result, DropResult::Ignored(IgnoreReason::NotEditing));
        assert!(target.drain_log().is_empty());
        assert!(!coord.is_dragging());
    }

    #[test]
    fn cancel_clears_gesture_without_mutation() {
        let mut target = RecordingTarget::new();
        let mut coord = DragCoordinator::new();
        coord.handle(&mut target, DragEvent::begin("summary"));
        assert!(coord.handle(&mut target, DragEvent::Cancel).is_none());
        assert!(!coord.is_dragging());
        assert!(target.drain_log().is_empty());
    }

    #[test]
    fn rejected_mutation_reports_ignored() {
        let mut target = RecordingTarget::new();
        target.accept = false;
        let mut coord = DragCoordinator::new();
        let result = coord.end(&mut target, "summary", Some("orders"));
        assert_eq!(result.ignore_reason(), Some(IgnoreReason::Rejected));
        assert_eq!(target.drain_log(), vec!["reorder row-1 0->1"]);
    }

    #[test]
    fn coordinator_applies_row_drop_policy() {
        let mut target = RecordingTarget::new();
        let mut coord = DragCoordinator::new().with_row_drop(RowDropPolicy::AppendToEnd);
        assert_eq!(coord.row_drop(), RowDropPolicy::AppendToEnd);
        assert!(coord.end(&mut target, "locationsMap", Some("row-1")).is_applied());
        assert_eq!(target.drain_log(), vec!["move locationsMap row-3->row-1@3"]);
    }

    #[test]
    fn ignore_reason_display() {
        assert_eq!(IgnoreReason::DroppedOnSelf.to_string(), "dropped on itself");
        assert_eq!(IgnoreReason::NotEditing.to_string(), "not in edit mode");
    }
}
