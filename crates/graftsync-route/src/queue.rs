//! Deduplicating event queue with delayed retry admission.
//!
//! Each abstract path occupies at most one slot in the queue. A retry request
//! records a *pending* deadline for the path: while pending, any queued
//! instance of the path is discarded on dequeue, and once the deadline is
//! reached the path is re-admitted (keeping its original slot if it still
//! has one). When several retries are requested for the same path the
//! earliest deadline governs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Weak};

use graftsync_hier::AbstractPath;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::event::FileChangeEvent;
use crate::retry::RetryToken;

#[derive(Debug)]
struct PendingRetry {
    token: RetryToken,
    event: FileChangeEvent,
}

#[derive(Debug, Default)]
struct QueueState {
    queued_paths: HashSet<AbstractPath>,
    pending: HashMap<AbstractPath, PendingRetry>,
    queue: VecDeque<FileChangeEvent>,
}

impl QueueState {
    /// Returns true if the caller should signal availability.
    fn release(&mut self, path: &AbstractPath, token: RetryToken) -> bool {
        match self.pending.get(path) {
            Some(pending) if pending.token == token => {}
            _ => return false,
        }
        let Some(pending) = self.pending.remove(path) else {
            return false;
        };
        if self.queued_paths.insert(pending.event.abstract_path.clone()) {
            self.queue.push_back(pending.event);
        }
        true
    }
}

/// Queue of [`FileChangeEvent`]s keyed by abstract path.
pub struct FileChangeEventQueue {
    state: Mutex<QueueState>,
    queued: Notify,
    clock: Arc<dyn Clock>,
    this: Weak<FileChangeEventQueue>,
}

impl FileChangeEventQueue {
    /// Create a queue reading deadlines from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(QueueState::default()),
            queued: Notify::new(),
            clock,
            this: this.clone(),
        })
    }

    /// Append `event` unless its abstract path is already queued.
    pub fn enqueue(&self, event: FileChangeEvent) {
        {
            let mut state = self.state.lock();
            if !state.queued_paths.insert(event.abstract_path.clone()) {
                trace!(path = %event.abstract_path, "already queued");
                return;
            }
            state.queue.push_back(event);
        }
        self.queued.notify_one();
    }

    /// Re-admit `event` once `token` expires.
    ///
    /// An expired token behaves like [`Self::enqueue`]. Otherwise the token is
    /// merged earliest-wins into the path's pending deadline and a timer
    /// re-admits the path when it fires, unless superseded by an earlier
    /// registration in the meantime.
    pub fn enqueue_with_retry(&self, event: FileChangeEvent, token: RetryToken) {
        if token.has_expired(self.clock.as_ref()) {
            self.enqueue(event);
            return;
        }
        let path = event.abstract_path.clone();
        let effective = {
            let mut state = self.state.lock();
            let merged = match state.pending.get(&path) {
                Some(existing) => existing.token.combine_any(token),
                None => token,
            };
            state.pending.insert(path.clone(), PendingRetry { token: merged, event });
            merged
        };
        debug!(path = %path, deadline = ?effective.deadline(), "retry scheduled");
        self.schedule(path, token);
    }

    fn schedule(&self, path: AbstractPath, token: RetryToken) {
        let Some(deadline) = token.deadline() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(path = %path, "no runtime for retry timer; released on dequeue");
            return;
        };
        let sleep = self.clock.sleep_until(deadline);
        let queue = self.this.clone();
        runtime.spawn(async move {
            sleep.await;
            if let Some(queue) = queue.upgrade() {
                queue.deferred_enqueue(&path, token);
            }
        });
    }

    fn deferred_enqueue(&self, path: &AbstractPath, token: RetryToken) {
        let released = self.state.lock().release(path, token);
        if released {
            trace!(path = %path, "retry released");
            self.queued.notify_one();
        }
    }

    /// Pop the oldest deliverable event.
    ///
    /// Queued instances of paths with a pending retry are consumed and
    /// dropped. Pending retries whose deadline has passed are released first.
    pub fn try_dequeue(&self) -> Option<FileChangeEvent> {
        let mut state = self.state.lock();
        let expired: Vec<(AbstractPath, RetryToken)> = state
            .pending
            .iter()
            .filter(|(_, pending)| pending.token.has_expired(self.clock.as_ref()))
            .map(|(path, pending)| (path.clone(), pending.token))
            .collect();
        for (path, token) in expired {
            state.release(&path, token);
        }
        while let Some(event) = state.queue.pop_front() {
            state.queued_paths.remove(&event.abstract_path);
            if !state.pending.contains_key(&event.abstract_path) {
                return Some(event);
            }
            trace!(path = %event.abstract_path, "suppressed pending retry");
        }
        None
    }

    /// Number of queued slots, including ones that will be suppressed.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// True if no slots are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of paths with a pending retry.
    pub fn pending_retries(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Completes once an event has been queued or released since the last
    /// wait completed.
    pub async fn wait_for_work(&self) {
        self.queued.notified().await;
    }
}

impl std::fmt::Debug for FileChangeEventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FileChangeEventQueue")
            .field("queued", &state.queue.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}
