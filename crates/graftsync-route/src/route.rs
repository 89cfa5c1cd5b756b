//! Replication routes: the destinations a change is dispatched to.

use async_trait::async_trait;
use graftsync_hier::AbstractPath;
use tokio_util::sync::CancellationToken;

use crate::error::RouteResult;
use crate::retry::{RetryCollector, RetryToken};
use crate::snapshot::FileSnapshot;

/// A destination for file changes.
#[async_trait]
pub trait ReplicationRoute: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// True if `path` is replicated via this route.
    fn accepts(&self, path: &AbstractPath) -> bool;

    /// True if this route has already met its replication target for
    /// `snapshot` at `path`. `None` describes a missing file.
    fn is_handled(&self, snapshot: Option<&FileSnapshot>, path: &AbstractPath) -> bool;

    /// Replicate `snapshot` as `path`.
    ///
    /// Retry causes may be reported through `retry` or returned; both are
    /// merged into the route's leg. Routes should observe `cancel` but are not
    /// forced to.
    async fn handle(
        &self,
        snapshot: Option<&FileSnapshot>,
        path: &AbstractPath,
        retry: RetryCollector,
        cancel: &CancellationToken,
    ) -> RouteResult<RetryToken>;
}
