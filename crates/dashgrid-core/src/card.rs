//! Widget cards and the closed set of card kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of widget a card renders.
///
/// The set of kinds is closed. A persisted snapshot may still carry a name
/// this build does not know (written by a newer build, or hand-edited); such
/// names are kept verbatim in [`CardKind::Unknown`] so that a save does not
/// rewrite them, and the renderer draws nothing for them.
///
/// Serialized as the camelCase name string (`"topProducts"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CardKind {
    /// Headline summary metrics.
    Summary,
    /// Orders chart.
    Orders,
    /// Top products chart.
    TopProducts,
    /// Sales over time chart.
    SalesOverTime,
    /// Payment history table.
    PaymentsHistory,
    /// Geographic locations map.
    LocationsMap,
    /// A kind name this build does not recognize.
    Unknown(String),
}

impl CardKind {
    /// Every recognized kind, in default layout order.
    pub const KNOWN: [CardKind; 6] = [
        CardKind::Summary,
        CardKind::Orders,
        CardKind::TopProducts,
        CardKind::SalesOverTime,
        CardKind::PaymentsHistory,
        CardKind::LocationsMap,
    ];

    /// Parse a kind name. Never fails; unrecognized names become `Unknown`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "summary" => Self::Summary,
            "orders" => Self::Orders,
            "topProducts" => Self::TopProducts,
            "salesOverTime" => Self::SalesOverTime,
            "paymentsHistory" => Self::PaymentsHistory,
            "locationsMap" => Self::LocationsMap,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Summary => "summary",
            Self::Orders => "orders",
            Self::TopProducts => "topProducts",
            Self::SalesOverTime => "salesOverTime",
            Self::PaymentsHistory => "paymentsHistory",
            Self::LocationsMap => "locationsMap",
            Self::Unknown(name) => name,
        }
    }

    /// Display title derived from the kind.
    ///
    /// Unknown kinds fall back to their raw name.
    #[must_use]
    pub fn default_title(&self) -> &str {
        match self {
            Self::Summary => "Summary",
            Self::Orders => "Orders",
            Self::TopProducts => "Top Products",
            Self::SalesOverTime => "Sales Over Time",
            Self::PaymentsHistory => "Payments History",
            Self::LocationsMap => "Locations Map",
            Self::Unknown(name) => name,
        }
    }

    /// Returns true for every kind except [`CardKind::Unknown`].
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for CardKind {
    fn from(name: String) -> Self {
        match Self::from_name(&name) {
            Self::Unknown(_) => Self::Unknown(name),
            known => known,
        }
    }
}

impl From<CardKind> for String {
    fn from(kind: CardKind) -> Self {
        match kind {
            CardKind::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A widget placement unit.
///
/// The id is the card's identity for drag-and-drop and rendering keys and is
/// unique across the whole layout. The title is derived from the kind when a
/// card is created and is not user editable; restoring a snapshot keeps the
/// stored title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    id: String,
    #[serde(rename = "type")]
    kind: CardKind,
    title: String,
}

impl Card {
    /// Create a card with a title derived from `kind`.
    ///
    /// An `Unknown` kind carrying a known wire name is stored as that known
    /// kind, so the card reads back unchanged from a snapshot.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: CardKind) -> Self {
        let kind = CardKind::from(String::from(kind));
        let title = kind.default_title().to_string();
        Self {
            id: id.into(),
            kind,
            title,
        }
    }

    /// Create a card whose id is the kind's wire name.
    ///
    /// This is how the default layout names its cards.
    #[must_use]
    pub fn of_kind(kind: CardKind) -> Self {
        Self::new(kind.as_str().to_string(), kind)
    }

    /// Card id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Card kind.
    #[must_use]
    pub fn kind(&self) -> &CardKind {
        &self.kind
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}
