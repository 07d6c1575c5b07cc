#![forbid(unsafe_code)]

//! Dashboard configuration.
//!
//! Defaults keep empty rows, ignore drops on a row's background and poll
//! every five seconds with auto refresh on.

use crate::refresh::RefreshPolicy;
use crate::state_persistence::SnapshotStore;

/// What happens to a row once its last card has been deleted or moved out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmptyRowPolicy {
    /// Keep the row as an invisible placeholder (default).
    #[default]
    Keep,
    /// Remove the row from the layout.
    Prune,
}

/// How a drop whose target id names a row (not a card) is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowDropPolicy {
    /// Ignore the drop (default).
    #[default]
    Ignore,
    /// Append the dragged card to the end of the row.
    AppendToEnd,
}

/// Configuration for one dashboard session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Key the layout snapshot is stored under.
    pub storage_key: String,
    /// Empty row lifecycle.
    pub empty_rows: EmptyRowPolicy,
    /// Drop-on-row resolution.
    pub row_drop: RowDropPolicy,
    /// Data polling and retry.
    pub refresh: RefreshPolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            storage_key: SnapshotStore::DEFAULT_KEY.to_string(),
            empty_rows: EmptyRowPolicy::default(),
            row_drop: RowDropPolicy::default(),
            refresh: RefreshPolicy::default(),
        }
    }
}

impl DashboardConfig {
    /// Set the snapshot storage key.
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the empty row policy.
    #[must_use]
    pub fn with_empty_rows(mut self, policy: EmptyRowPolicy) -> Self {
        self.empty_rows = policy;
        self
    }

    /// Set the drop-on-row policy.
    #[must_use]
    pub fn with_row_drop(mut self, policy: RowDropPolicy) -> Self {
        self.row_drop = policy;
        self
    }

    /// Set the refresh policy.
    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }
}
