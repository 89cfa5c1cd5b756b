//! Caps how many snapshots are computed at once.

use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use graftsync_hier::QualifiedPath;
use graftsync_route::{FileSnapshot, RouteError, RouteResult, SnapshotProvider, Timestamp};
use tokio::sync::Semaphore;

/// Wraps a provider so at most `limit` snapshots run concurrently.
pub struct ThrottledSnapshotProvider {
    inner: Arc<dyn SnapshotProvider>,
    permits: Semaphore,
}

impl ThrottledSnapshotProvider {
    /// A `limit` of zero is treated as one.
    pub fn new(inner: Arc<dyn SnapshotProvider>, limit: usize) -> Self {
        Self {
            inner,
            permits: Semaphore::new(limit.max(1)),
        }
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl SnapshotProvider for ThrottledSnapshotProvider {
    async fn snapshot(&self, path: &QualifiedPath, timestamp: Timestamp) -> RouteResult<Option<FileSnapshot>> {
        let _permit = self.permits.acquire().await.map_err(|_| RouteError::Cancelled)?;
        self.inner.snapshot(path, timestamp).await
    }

    fn read_snapshot(&self, snapshot: &FileSnapshot) -> RouteResult<Box<dyn Read + Send>> {
        self.inner.read_snapshot(snapshot)
    }
}
