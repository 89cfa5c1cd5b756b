//! Time source abstraction.
//!
//! Everything time-dependent in the pipeline (retry deadlines, snapshot
//! freshness, event stamps) reads the time through a [`Clock`] so tests can
//! drive it with [`MockClock`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Wall-clock instant used throughout the pipeline.
pub type Timestamp = DateTime<Utc>;

/// A source of the current time and of timers.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;

    /// A future completing once the clock reaches `deadline`. Completes
    /// immediately if the deadline has passed.
    fn sleep_until(&self, deadline: Timestamp) -> BoxFuture<'static, ()>;
}

/// The system clock, with tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn sleep_until(&self, deadline: Timestamp) -> BoxFuture<'static, ()> {
        let delay = (deadline - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(delay).boxed()
    }
}

/// A manually advanced clock for tests.
#[derive(Debug)]
pub struct MockClock {
    state: Mutex<MockState>,
}

#[derive(Debug)]
struct MockState {
    now: Timestamp,
    waiters: BTreeMap<Timestamp, Vec<oneshot::Sender<()>>>,
}

impl MockClock {
    /// A clock frozen at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            state: Mutex::new(MockState {
                now,
                waiters: BTreeMap::new(),
            }),
        }
    }

    /// Move the clock forward by `interval`.
    pub fn advance(&self, interval: chrono::Duration) {
        let target = self.now() + interval;
        self.advance_to(target);
    }

    /// Move the clock to the latest outstanding timer deadline, completing
    /// every pending sleep. Does nothing if no sleeps are outstanding.
    pub fn advance_past_pending(&self) {
        let last = self.state.lock().waiters.keys().next_back().copied();
        if let Some(last) = last {
            self.advance_to(last);
        }
    }

    /// Move the clock to `target`, completing every sleep due by then. The
    /// clock never moves backwards.
    pub fn advance_to(&self, target: Timestamp) {
        let due = {
            let mut state = self.state.lock();
            if target < state.now {
                return;
            }
            state.now = target;
            let later = state.waiters.split_off(&next_instant(target));
            std::mem::replace(&mut state.waiters, later)
        };
        for sender in due.into_values().flatten() {
            let _ = sender.send(());
        }
    }

    /// Number of outstanding sleeps.
    pub fn pending_sleeps(&self) -> usize {
        self.state.lock().waiters.values().map(Vec::len).sum()
    }
}

fn next_instant(t: Timestamp) -> Timestamp {
    t + chrono::Duration::nanoseconds(1)
}

impl Clock for MockClock {
    fn now(&self) -> Timestamp {
        self.state.lock().now
    }

    fn sleep_until(&self, deadline: Timestamp) -> BoxFuture<'static, ()> {
        let mut state = self.state.lock();
        if deadline <= state.now {
            return futures::future::ready(()).boxed();
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.entry(deadline).or_default().push(tx);
        async move {
            let _ = rx.await;
        }
        .boxed()
    }
}
