//! Deduplicating pool of raw OS paths reported by watchers.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct PoolState {
    order: VecDeque<String>,
    members: HashSet<String>,
}

/// A set of changed OS paths awaiting translation.
///
/// Paths are compared exactly: two spellings differing only by case are
/// distinct entries, since case rules belong to a root. Paths are taken in
/// the order they were first added.
#[derive(Debug, Default)]
pub struct FileSystemPathPool {
    state: Mutex<PoolState>,
    available: Notify,
}

impl FileSystemPathPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one path. Adding a path already present does nothing.
    pub fn add(&self, path: impl Into<String>) {
        let path = path.into();
        {
            let mut state = self.state.lock();
            if !state.members.insert(path.clone()) {
                return;
            }
            state.order.push_back(path);
        }
        self.available.notify_one();
    }

    /// Add several paths, signalling once.
    pub fn add_all<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = false;
        {
            let mut state = self.state.lock();
            for path in paths {
                let path = path.into();
                if state.members.insert(path.clone()) {
                    state.order.push_back(path);
                    added = true;
                }
            }
        }
        if added {
            self.available.notify_one();
        }
    }

    /// Remove and return the oldest path.
    pub fn try_take(&self) -> Option<String> {
        let mut state = self.state.lock();
        let path = state.order.pop_front()?;
        state.members.remove(&path);
        Some(path)
    }

    /// Number of paths waiting.
    pub fn len(&self) -> usize {
        self.state.lock().order.len()
    }

    /// True if no paths are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Completes once a path has been added since the last wait completed.
    pub async fn wait_for_work(&self) {
        self.available.notified().await;
    }
}
