#![forbid(unsafe_code)]

//! One dashboard session: a layout store, its drag coordinator and the
//! configuration both were built from.

use dashgrid_core::CardLocation;
use dashgrid_runtime::{
    DashboardConfig, DataFeed, Fetcher, LayoutMsg, LayoutObserver, LayoutStore, MemoryStorage,
    StorageBackend,
};
use dashgrid_widgets::{DragCoordinator, DragEvent, DropResult, LayoutView};

use crate::Result;

/// A configured dashboard.
///
/// Owns the [`LayoutStore`] and routes drag gestures into it. Leaving edit
/// mode through [`Dashboard::update`] cancels any gesture in progress.
pub struct Dashboard {
    config: DashboardConfig,
    store: LayoutStore,
    drag: DragCoordinator,
}

impl Dashboard {
    /// Open a dashboard over `backend`, restoring any saved layout.
    #[must_use]
    pub fn new(backend: Box<dyn StorageBackend>, config: DashboardConfig) -> Self {
        let store = LayoutStore::with_config(backend, &config);
        let drag = DragCoordinator::new().with_row_drop(config.row_drop);
        Self {
            config,
            store,
            drag,
        }
    }

    /// Dashboard with default config and nothing persisted across sessions.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()), DashboardConfig::default())
    }

    /// Open the dashboard persisted in the per-user state directory for
    /// `app_name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the state directory cannot be
    /// created or written.
    #[cfg(feature = "file-storage")]
    pub fn open_for_app(app_name: &str, config: DashboardConfig) -> Result<Self> {
        let storage = dashgrid_runtime::FileStorage::default_for_app(app_name);
        if !storage.is_available() {
            return Err(dashgrid_runtime::StorageError::Unavailable(format!(
                "cannot write {}",
                storage.path().display()
            ))
            .into());
        }
        tracing::debug!(app_name, path = %storage.path().display(), "opening dashboard");
        Ok(Self::new(Box::new(storage), config))
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Underlying layout store.
    #[must_use]
    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    /// Read-only view for rendering.
    #[must_use]
    pub fn view(&self) -> LayoutView<'_> {
        LayoutView::new(self.store.state())
    }

    /// Whether drag handles and delete controls are active.
    #[must_use]
    pub fn is_edit_mode(&self) -> bool {
        self.store.is_edit_mode()
    }

    /// Row and index of `card_id`, if present.
    #[must_use]
    pub fn find_card(&self, card_id: &str) -> Option<CardLocation> {
        self.store.find_card(card_id)
    }

    /// True while a drag gesture is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Register a layout change observer.
    pub fn subscribe(&mut self, observer: impl LayoutObserver + 'static) {
        self.store.subscribe(observer);
    }

    /// Apply a layout message. Returns whether the layout changed.
    pub fn update(&mut self, msg: LayoutMsg) -> bool {
        let changed = self.store.update(msg);
        if !self.store.is_edit_mode() {
            self.drag.cancel();
        }
        changed
    }

    /// Feed one drag event. Returns the drop result for `End`.
    pub fn drag(&mut self, event: DragEvent) -> Option<DropResult> {
        self.drag.handle(&mut self.store, event)
    }

    /// Write the current layout to storage now.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] when the backend rejects the write.
    pub fn save(&self) -> Result<()> {
        self.store.persist()?;
        Ok(())
    }

    /// Re-check the layout invariants.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Layout`] naming the first violation.
    pub fn check(&self) -> Result<()> {
        self.store.state().validate()?;
        Ok(())
    }

    /// Idle data feed using this dashboard's refresh policy.
    #[must_use]
    pub fn data_feed<T: Send + 'static>(&self, fetcher: impl Fetcher<T> + 'static) -> DataFeed<T> {
        DataFeed::new(fetcher, self.config.refresh)
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("drag", &self.drag)
            .finish()
    }
}
