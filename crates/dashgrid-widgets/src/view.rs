#![forbid(unsafe_code)]

//! Read-only rendering surface over a layout.
//!
//! A renderer walks [`LayoutView`] rows and cards and never sees a mutable
//! handle. In edit mode each card additionally exposes a [`DragHandle`] and a
//! [`DeleteControl`]; outside edit mode both are `None`.

use dashgrid_core::{Card, CardKind, LayoutState, Row};
use dashgrid_runtime::LayoutMsg;

/// Drag attributes for one card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragHandle {
    card_id: String,
}

impl DragHandle {
    /// Stable drag identity (the card id).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.card_id
    }

    /// Event reported when the user picks the card up.
    #[must_use]
    pub fn begin(&self) -> crate::drag::DragEvent {
        crate::drag::DragEvent::begin(self.card_id.clone())
    }
}

/// Delete affordance for one card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteControl {
    card_id: String,
    row_id: String,
}

impl DeleteControl {
    /// Message that deletes the card.
    #[must_use]
    pub fn message(&self) -> LayoutMsg {
        LayoutMsg::DeleteCard {
            card_id: self.card_id.clone(),
            row_id: self.row_id.clone(),
        }
    }
}

/// One card, positioned.
#[derive(Clone, Copy, Debug)]
pub struct CardView<'a> {
    card: &'a Card,
    row_id: &'a str,
    index: usize,
    edit_mode: bool,
}

impl<'a> CardView<'a> {
    /// Card id.
    #[must_use]
    pub fn id(&self) -> &'a str {
        self.card.id()
    }

    /// Card kind.
    #[must_use]
    pub fn kind(&self) -> &'a CardKind {
        self.card.kind()
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &'a str {
        self.card.title()
    }

    /// Row the card is in.
    #[must_use]
    pub fn row_id(&self) -> &'a str {
        self.row_id
    }

    /// Position within the row.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Drag attributes, present only in edit mode.
    #[must_use]
    pub fn drag_handle(&self) -> Option<DragHandle> {
        self.edit_mode.then(|| DragHandle {
            card_id: self.card.id().to_string(),
        })
    }

    /// Delete affordance, present only in edit mode.
    #[must_use]
    pub fn delete_control(&self) -> Option<DeleteControl> {
        self.edit_mode.then(|| DeleteControl {
            card_id: self.card.id().to_string(),
            row_id: self.row_id.to_string(),
        })
    }
}

/// One row of cards.
#[derive(Clone, Copy, Debug)]
pub struct RowView<'a> {
    row: &'a Row,
    edit_mode: bool,
}

impl<'a> RowView<'a> {
    /// Row id.
    #[must_use]
    pub fn id(&self) -> &'a str {
        self.row.id()
    }

    /// Grid column count.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.row.columns()
    }

    /// True when the row renders nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }

    /// Cards in render order.
    pub fn cards(&self) -> impl Iterator<Item = CardView<'a>> + use<'a> {
        let row_id = self.row.id();
        let edit_mode = self.edit_mode;
        self.row
            .cards()
            .iter()
            .enumerate()
            .map(move |(index, card)| CardView {
                card,
                row_id,
                index,
                edit_mode,
            })
    }
}

/// Read-only view of a whole layout.
#[derive(Clone, Copy, Debug)]
pub struct LayoutView<'a> {
    state: &'a LayoutState,
}

impl<'a> LayoutView<'a> {
    /// View `state`.
    #[must_use]
    pub fn new(state: &'a LayoutState) -> Self {
        Self { state }
    }

    /// Whether edit affordances are shown.
    #[must_use]
    pub fn is_edit_mode(&self) -> bool {
        self.state.is_edit_mode()
    }

    /// Every row, including empty ones.
    pub fn rows(&self) -> impl Iterator<Item = RowView<'a>> + use<'a> {
        let edit_mode = self.state.is_edit_mode();
        self.state
            .rows()
            .iter()
            .map(move |row| RowView { row, edit_mode })
    }

    /// Rows that render something. Empty rows collapse.
    pub fn visible_rows(&self) -> impl Iterator<Item = RowView<'a>> + use<'a> {
        self.rows().filter(|row| !row.is_empty())
    }
}

/// Maps a card to a rendered widget.
pub trait CardRenderer {
    /// Rendered form of one card.
    type Output;

    /// Render a card, or `None` to draw nothing for it.
    fn render(&self, card: &CardView<'_>) -> Option<Self::Output>;
}

/// One rendered grid line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedRow<O> {
    /// Row id.
    pub row_id: String,
    /// Grid column count.
    pub columns: usize,
    /// Rendered cards in order.
    pub cells: Vec<O>,
}

/// Render every visible row.
///
/// Cards whose kind this build does not recognize are skipped without
/// calling the renderer.
pub fn render_layout<R: CardRenderer + ?Sized>(
    view: &LayoutView<'_>,
    renderer: &R,
) -> Vec<RenderedRow<R::Output>> {
    view.visible_rows()
        .map(|row| RenderedRow {
            row_id: row.id().to_string(),
            columns: row.columns(),
            cells: row
                .cards()
                .filter(|card| card.kind().is_known())
                .filter_map(|card| renderer.render(&card))
                .collect(),
        })
        .collect()
}
