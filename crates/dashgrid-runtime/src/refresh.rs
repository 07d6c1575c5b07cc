#![forbid(unsafe_code)]

//! Polling data feed with exponential retry.
//!
//! This is the data provider the widget layer reads from. It is decoupled
//! from the layout store: the poll timer runs on a background
//! [`Subscription`] and the feed state only changes when the owner calls
//! [`DataFeed::pump`] (or feeds messages to [`DataFeed::update`] itself).
//!
//! # Retry schedule
//!
//! With the default [`RetryPolicy`] a failing fetch is attempted 3 times,
//! waiting `min(1000ms * 2^n, 30000ms)` after the n-th failure (0-based).
//! The waits go through the subscription's [`StopSignal`], so stopping the
//! poller cancels a pending retry immediately.
//!
//! # Example
//!
//! ```no_run
//! use dashgrid_runtime::refresh::{DataFeed, FetchError, RefreshPolicy};
//!
//! let mut feed = DataFeed::new(
//!     || -> Result<u32, FetchError> { Ok(42) },
//!     RefreshPolicy::default(),
//! );
//! feed.start();
//! // ... on every UI tick:
//! feed.pump();
//! if let Some(value) = feed.data() {
//!     println!("latest: {value}");
//! }
//! ```

use std::fmt;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use crate::subscription::{RunningSubscription, StopSignal, SubId, Subscription};

// ─────────────────────────────────────────────────────────────────────────────
// Policies
// ─────────────────────────────────────────────────────────────────────────────

/// Exponential backoff for failed fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Total fetch attempts, including the first. Zero behaves as one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Create a retry policy.
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Polling behavior of a [`DataFeed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Time between polls while auto refresh is on.
    pub interval: Duration,
    /// Whether polling starts enabled.
    pub auto_refresh: bool,
    /// Backoff for failed fetches.
    pub retry: RetryPolicy,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            auto_refresh: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl RefreshPolicy {
    /// Set the poll interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set whether polling starts enabled.
    #[must_use]
    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetching
// ─────────────────────────────────────────────────────────────────────────────

/// Why a fetch failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response.
    Transport(String),
    /// The backend answered with a non-success status.
    Status(u16),
    /// The response body did not match the expected shape.
    Decode(String),
    /// The fetch was abandoned because its poller stopped.
    Cancelled,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Status(code) => write!(f, "unexpected status {code}"),
            FetchError::Decode(msg) => write!(f, "decode error: {msg}"),
            FetchError::Cancelled => write!(f, "fetch cancelled"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}

/// Source of dashboard data. Called from background threads.
pub trait Fetcher<T>: Send + Sync {
    /// Fetch one value.
    fn fetch(&self) -> Result<T, FetchError>;
}

impl<T, F> Fetcher<T> for F
where
    F: Fn() -> Result<T, FetchError> + Send + Sync,
{
    fn fetch(&self) -> Result<T, FetchError> {
        self()
    }
}

/// Fetch with retries, sleeping through `stop` between attempts.
///
/// Returns the last error once attempts run out, or
/// [`FetchError::Cancelled`] if `stop` fires first.
pub fn fetch_with_retry<T, F>(
    fetcher: &F,
    retry: &RetryPolicy,
    stop: &StopSignal,
) -> Result<T, FetchError>
where
    F: Fetcher<T> + ?Sized,
{
    let attempts = retry.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        if stop.is_stopped() {
            return Err(FetchError::Cancelled);
        }
        match fetcher.fetch() {
            Ok(value) => return Ok(value),
            Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
            Err(e) => {
                attempt += 1;
                if attempt >= attempts {
                    tracing::warn!(attempts, error = %e, "fetch failed, giving up");
                    return Err(e);
                }
                let delay = retry.delay_for(attempt - 1);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "fetch failed, retrying"
                );
                if stop.wait_timeout(delay) {
                    return Err(FetchError::Cancelled);
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Poll Subscription
// ─────────────────────────────────────────────────────────────────────────────

/// Messages produced by a [`PollSubscription`].
#[derive(Clone, Debug, PartialEq)]
pub enum FeedMsg<T> {
    /// A fetch (with its retries) has begun.
    FetchStarted,
    /// A fetch produced a value.
    Fetched(T),
    /// A fetch failed after all retries.
    Failed(FetchError),
}

/// Fetches on a timer, or once.
pub struct PollSubscription<T> {
    id: SubId,
    fetcher: Arc<dyn Fetcher<T>>,
    retry: RetryPolicy,
    interval: Option<Duration>,
    fetch_first: bool,
}

impl<T> PollSubscription<T> {
    /// Fetch now, then every `policy.interval`.
    #[must_use]
    pub fn new(id: SubId, fetcher: Arc<dyn Fetcher<T>>, policy: &RefreshPolicy) -> Self {
        Self {
            id,
            fetcher,
            retry: policy.retry,
            interval: Some(policy.interval),
            fetch_first: true,
        }
    }

    /// Fetch exactly once.
    #[must_use]
    pub fn once(id: SubId, fetcher: Arc<dyn Fetcher<T>>, retry: RetryPolicy) -> Self {
        Self {
            id,
            fetcher,
            retry,
            interval: None,
            fetch_first: true,
        }
    }

    /// Wait one interval before the first fetch.
    #[must_use]
    pub fn delayed(mut self) -> Self {
        self.fetch_first = false;
        self
    }
}

impl<T: Send + 'static> Subscription<FeedMsg<T>> for PollSubscription<T> {
    fn id(&self) -> SubId {
        self.id
    }

    fn run(&self, sender: mpsc::Sender<FeedMsg<T>>, stop: StopSignal) {
        if !self.fetch_first {
            let Some(interval) = self.interval else {
                return;
            };
            if stop.wait_timeout(interval) {
                return;
            }
        }
        loop {
            if sender.send(FeedMsg::FetchStarted).is_err() {
                break;
            }
            let msg = match fetch_with_retry(&*self.fetcher, &self.retry, &stop) {
                Ok(value) => FeedMsg::Fetched(value),
                Err(e) => FeedMsg::Failed(e),
            };
            if sender.send(msg).is_err() {
                break;
            }
            match self.interval {
                Some(interval) if !stop.wait_timeout(interval) => {}
                _ => break,
            }
        }
        tracing::trace!(sub_id = self.id, "poll subscription finished");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Data Feed
// ─────────────────────────────────────────────────────────────────────────────

/// Cached result of polling a [`Fetcher`].
///
/// - `is_loading`: a fetch is in flight and no data has arrived yet
/// - `is_fetching`: any fetch is in flight
/// - `last_error`: the most recent failure, cleared by the next success
pub struct DataFeed<T> {
    fetcher: Arc<dyn Fetcher<T>>,
    policy: RefreshPolicy,
    auto_refresh: bool,
    data: Option<T>,
    last_error: Option<FetchError>,
    in_flight: usize,
    sender: mpsc::Sender<FeedMsg<T>>,
    receiver: mpsc::Receiver<FeedMsg<T>>,
    poller: Option<RunningSubscription>,
    one_shots: Vec<RunningSubscription>,
    next_id: SubId,
}

impl<T: Send + 'static> DataFeed<T> {
    /// Create an idle feed. Nothing is fetched until [`DataFeed::start`].
    #[must_use]
    pub fn new(fetcher: impl Fetcher<T> + 'static, policy: RefreshPolicy) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            fetcher: Arc::new(fetcher),
            auto_refresh: policy.auto_refresh,
            policy,
            data: None,
            last_error: None,
            in_flight: 0,
            sender,
            receiver,
            poller: None,
            one_shots: Vec::new(),
            next_id: 1,
        }
    }

    /// Begin fetching: poll if auto refresh is on, otherwise fetch once.
    pub fn start(&mut self) {
        if self.auto_refresh {
            self.start_poller(true);
        } else {
            self.manual_refresh();
        }
    }

    /// Fetch once now, independent of the poll timer.
    pub fn manual_refresh(&mut self) {
        self.one_shots.retain(|sub| !sub.is_finished());
        let id = self.allocate_id();
        let sub = PollSubscription::once(id, Arc::clone(&self.fetcher), self.policy.retry);
        self.one_shots.push(RunningSubscription::start(Box::new(sub), self.sender.clone()));
    }

    /// Flip auto refresh and return the new setting.
    ///
    /// Turning it on waits one interval before the next poll; turning it off
    /// signals the poller and cancels any pending retry. It does not wait for
    /// a fetch already in flight, whose result may still arrive through
    /// [`DataFeed::pump`].
    pub fn toggle_auto_refresh(&mut self) -> bool {
        self.auto_refresh = !self.auto_refresh;
        if self.auto_refresh {
            self.start_poller(false);
        } else {
            // Drop signals stop without joining the poll thread.
            self.poller = None;
        }
        tracing::debug!(enabled = self.auto_refresh, "auto refresh toggled");
        self.auto_refresh
    }

    /// Apply every message received so far. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.receiver.try_recv() {
            self.update(msg);
            applied += 1;
        }
        applied
    }

    fn start_poller(&mut self, fetch_first: bool) {
        if self.poller.is_some() {
            return;
        }
        let id = self.allocate_id();
        let mut sub = PollSubscription::new(id, Arc::clone(&self.fetcher), &self.policy);
        if !fetch_first {
            sub = sub.delayed();
        }
        self.poller = Some(RunningSubscription::start(Box::new(sub), self.sender.clone()));
    }

    fn allocate_id(&mut self) -> SubId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl<T> DataFeed<T> {
    /// Apply one message to the feed state.
    pub fn update(&mut self, msg: FeedMsg<T>) {
        match msg {
            FeedMsg::FetchStarted => self.in_flight += 1,
            FeedMsg::Fetched(value) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.data = Some(value);
                self.last_error = None;
            }
            FeedMsg::Failed(FetchError::Cancelled) => {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
            FeedMsg::Failed(e) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                tracing::warn!(error = %e, "data refresh failed");
                self.last_error = Some(e);
            }
        }
    }

    /// Latest fetched value.
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Derive a value from the latest data.
    #[must_use]
    pub fn summarize<S>(&self, f: impl FnOnce(&T) -> S) -> Option<S> {
        self.data.as_ref().map(f)
    }

    /// A fetch is in flight and nothing has been fetched yet.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.in_flight > 0
    }

    /// Any fetch is in flight.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.in_flight > 0
    }

    /// Most recent failure, if the last fetch failed.
    #[must_use]
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Whether the poll timer is enabled.
    #[must_use]
    pub fn is_auto_refresh_enabled(&self) -> bool {
        self.auto_refresh
    }

    /// Poll interval.
    #[must_use]
    pub fn refetch_interval(&self) -> Duration {
        self.policy.interval
    }
}

impl<T> fmt::Debug for DataFeed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFeed")
            .field("has_data", &self.data.is_some())
            .field("in_flight", &self.in_flight)
            .field("auto_refresh", &self.auto_refresh)
            .field("last_error", &self.last_error)
            .finish()
    }
}
