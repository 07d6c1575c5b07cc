#![forbid(unsafe_code)]

//! dashgrid Runtime
//!
//! This crate owns everything in the dashboard that has side effects.
//!
//! # Key Components
//!
//! - [`LayoutStore`] - Single owner of the layout; named mutations with write-through
//! - [`SnapshotStore`] - Load/save/clear of the persisted row list
//! - [`StorageBackend`] - Durable key/value trait ([`MemoryStorage`], `FileStorage`)
//! - [`DashboardConfig`] - Storage key and empty-row/drop policies
//! - [`DataFeed`] - Polling data provider with exponential retry
//! - [`Subscription`] - Background event sources driving the feed
//!
//! # How it fits in the system
//! `dashgrid-core` holds the pure model. This crate wraps it with
//! persistence and logging, and `dashgrid-widgets` drives it from drag
//! gestures. The data feed is independent of the layout store: the two only
//! meet in whatever renders them.

pub mod config;
pub mod refresh;
pub mod state_persistence;
pub mod store;
pub mod subscription;

pub use config::{DashboardConfig, EmptyRowPolicy, RowDropPolicy};
pub use refresh::{
    DataFeed, FeedMsg, FetchError, Fetcher, PollSubscription, RefreshPolicy, RetryPolicy,
    fetch_with_retry,
};
#[cfg(feature = "file-storage")]
pub use state_persistence::FileStorage;
pub use state_persistence::{
    MemoryStorage, SnapshotStore, StorageBackend, StorageError, StorageResult,
};
pub use store::{LayoutMsg, LayoutObserver, LayoutStore};
pub use subscription::{RunningSubscription, StopSignal, StopTrigger, SubId, Subscription};
