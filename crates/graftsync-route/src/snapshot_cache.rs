//! Single-flight, freshness-aware cache in front of a [`SnapshotProvider`].
//!
//! Concurrent requests for the same path share one computation when it was
//! started recently enough for every caller. Results are promoted into the
//! cache monotonically: an entry is only replaced by a strictly newer one.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use graftsync_hier::QualifiedPath;
use parking_lot::Mutex;
use tracing::trace;

use crate::clock::{Clock, Timestamp};
use crate::error::{RouteError, RouteResult};
use crate::snapshot::{FileSnapshot, SnapshotProvider};

type SnapshotOutcome = Result<Option<FileSnapshot>, Arc<RouteError>>;
type SharedSnapshot = Shared<BoxFuture<'static, SnapshotOutcome>>;

#[derive(Debug, Clone)]
struct CachedSnapshot {
    timestamp: Timestamp,
    snapshot: Option<FileSnapshot>,
}

struct PendingSnapshot {
    requested: Timestamp,
    generation: u64,
    future: SharedSnapshot,
}

#[derive(Default)]
struct CacheState {
    cache: HashMap<QualifiedPath, CachedSnapshot>,
    pending: HashMap<QualifiedPath, PendingSnapshot>,
    next_generation: u64,
}

impl CacheState {
    fn promote(&mut self, path: &QualifiedPath, timestamp: Timestamp, snapshot: Option<FileSnapshot>) -> bool {
        if let Some(existing) = self.cache.get(path) {
            if existing.timestamp >= timestamp {
                return false;
            }
        }
        self.cache
            .insert(path.clone(), CachedSnapshot { timestamp, snapshot });
        true
    }
}

/// Caches snapshots from an inner provider and deduplicates in-flight work.
///
/// The `timestamp` passed to [`SnapshotProvider::snapshot`] is a *minimum*:
/// the result is never older than it but may be newer. Absence of a file is
/// cached like any other result.
pub struct CachingSnapshotService {
    inner: Arc<dyn SnapshotProvider>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<CacheState>>,
}

impl CachingSnapshotService {
    /// Wrap `inner`, stamping new requests with `clock`.
    pub fn new(inner: Arc<dyn SnapshotProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            clock,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Number of cached entries.
    pub fn cached_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Number of in-flight requests.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn lookup(&self, path: &QualifiedPath, minimum: Timestamp) -> Result<Option<FileSnapshot>, SharedSnapshot> {
        let mut state = self.state.lock();
        if let Some(cached) = state.cache.get(path) {
            if cached.timestamp >= minimum {
                trace!(path = %path, "snapshot cache hit");
                return Ok(cached.snapshot.clone());
            }
        }
        if let Some(pending) = state.pending.get(path) {
            if pending.requested >= minimum {
                trace!(path = %path, "joining in-flight snapshot");
                return Err(pending.future.clone());
            }
            if let Some(Ok(snapshot)) = pending.future.peek() {
                let snapshot = snapshot.clone();
                let requested = pending.requested;
                state.promote(path, requested, snapshot.clone());
                if requested >= minimum {
                    return Ok(snapshot);
                }
            }
        }
        Err(self.start_request(&mut state, path))
    }

    fn start_request(&self, state: &mut CacheState, path: &QualifiedPath) -> SharedSnapshot {
        let requested = self.clock.now();
        let generation = state.next_generation;
        state.next_generation += 1;

        let inner = Arc::clone(&self.inner);
        let shared_state = Arc::clone(&self.state);
        let task_path = path.clone();
        let handle = tokio::spawn(async move {
            let outcome = inner.snapshot(&task_path, requested).await.map_err(Arc::new);
            let mut state = shared_state.lock();
            if let Ok(snapshot) = &outcome {
                state.promote(&task_path, requested, snapshot.clone());
            }
            let ours = state
                .pending
                .get(&task_path)
                .is_some_and(|pending| pending.generation == generation);
            if ours {
                state.pending.remove(&task_path);
            }
            outcome
        });
        let future = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(Arc::new(RouteError::TaskFailed(e.to_string()))),
            }
        }
        .boxed()
        .shared();

        trace!(path = %path, "starting snapshot request");
        state.pending.insert(
            path.clone(),
            PendingSnapshot {
                requested,
                generation,
                future: future.clone(),
            },
        );
        future
    }
}

#[async_trait]
impl SnapshotProvider for CachingSnapshotService {
    async fn snapshot(&self, path: &QualifiedPath, minimum: Timestamp) -> RouteResult<Option<FileSnapshot>> {
        match self.lookup(path, minimum) {
            Ok(snapshot) => Ok(snapshot),
            Err(shared) => shared.await.map_err(|e| RouteError::Snapshot {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn read_snapshot(&self, snapshot: &FileSnapshot) -> RouteResult<Box<dyn Read + Send>> {
        self.inner.read_snapshot(snapshot)
    }
}
