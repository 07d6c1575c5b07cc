#![forbid(unsafe_code)]

//! Background event sources for the data feed.
//!
//! A [`Subscription`] runs on its own thread and sends messages through a
//! channel until it is stopped or the receiver goes away. The layout engine
//! never uses this: it is the timer side of the data provider, which must not
//! be assumed to be synchronized with layout mutations.
//!
//! # How it works
//!
//! 1. [`RunningSubscription::start`] spawns the subscription's `run` loop
//! 2. The loop sleeps through [`StopSignal::wait_timeout`] between events
//! 3. Dropping the handle (or calling [`RunningSubscription::stop`]) wakes
//!    the loop and lets it exit

use std::sync::{Arc, Condvar, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::{Duration, Instant};

/// A unique identifier for a subscription.
pub type SubId = u64;

/// A subscription produces messages from an external event source.
pub trait Subscription<M: Send + 'static>: Send {
    /// Identifier used in logs.
    fn id(&self) -> SubId;

    /// Run the subscription, sending messages through the channel.
    ///
    /// This is called on a background thread. Implementations should loop
    /// until the channel is disconnected or the stop signal is received.
    fn run(&self, sender: mpsc::Sender<M>, stop: StopSignal);
}

type Shared = Arc<(Mutex<bool>, Condvar)>;

/// Signal for stopping a subscription.
///
/// The owner sets it through the paired [`StopTrigger`]. The subscription
/// checks it between events and exits its loop once set.
#[derive(Clone)]
pub struct StopSignal {
    inner: Shared,
}

impl StopSignal {
    /// Create a new stop signal pair (signal, trigger).
    #[must_use]
    pub fn new() -> (Self, StopTrigger) {
        let inner: Shared = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Self {
            inner: Arc::clone(&inner),
        };
        (signal, StopTrigger { inner })
    }

    /// Check if the stop signal has been triggered.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for either the stop signal or a timeout.
    ///
    /// Returns `true` if stopped, `false` if timed out. Spurious wakeups are
    /// absorbed by looping until the deadline.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if *stopped {
            return true;
        }

        let start = Instant::now();
        let mut remaining = duration;

        loop {
            let (guard, result) = cvar
                .wait_timeout(stopped, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            stopped = guard;
            if *stopped {
                return true;
            }
            if result.timed_out() {
                return false;
            }
            let elapsed = start.elapsed();
            if elapsed >= duration {
                return false;
            }
            remaining = duration - elapsed;
        }
    }
}

/// Owner side of a [`StopSignal`].
pub struct StopTrigger {
    inner: Shared,
}

impl StopTrigger {
    /// Signal the subscription to stop.
    pub fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        cvar.notify_all();
    }
}

/// A running subscription handle. Stops the subscription when dropped.
pub struct RunningSubscription {
    id: SubId,
    trigger: StopTrigger,
    thread: Option<thread::JoinHandle<()>>,
}

impl RunningSubscription {
    /// Spawn `sub` on a background thread.
    pub fn start<M: Send + 'static>(
        sub: Box<dyn Subscription<M>>,
        sender: mpsc::Sender<M>,
    ) -> Self {
        let id = sub.id();
        let (signal, trigger) = StopSignal::new();
        tracing::debug!(sub_id = id, "starting subscription");
        let thread = thread::spawn(move || {
            sub.run(sender, signal);
        });
        Self {
            id,
            trigger,
            thread: Some(thread),
        }
    }

    /// Subscription id.
    #[must_use]
    pub fn id(&self) -> SubId {
        self.id
    }

    /// True once the run loop has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(thread::JoinHandle::is_finished)
    }

    /// Stop the subscription and join its thread.
    pub fn stop(mut self) {
        tracing::debug!(sub_id = self.id, "stopping subscription");
        self.trigger.stop();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RunningSubscription {
    fn drop(&mut self) {
        self.trigger.stop();
        // Don't join in drop to avoid blocking
    }
}
