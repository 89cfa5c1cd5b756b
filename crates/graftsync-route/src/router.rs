//! Dispatches queued events to replication routes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use graftsync_hier::{DiagnosticEvent, DiagnosticsSink, NullDiagnostics};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::RouteResult;
use crate::event::FileChangeEvent;
use crate::queue::FileChangeEventQueue;
use crate::retry::RetryGroup;
use crate::route::ReplicationRoute;
use crate::snapshot::SnapshotProvider;
use crate::worker::WorkerLoop;

/// Takes events off the queue, snapshots them and fans them out.
///
/// Each accepting route gets its own parallel leg of a [`RetryGroup`]. If the
/// combined token asks for a retry the event is re-enqueued with it.
pub struct FileChangeEventRouter {
    queue: Arc<FileChangeEventQueue>,
    snapshots: Arc<dyn SnapshotProvider>,
    routes: Vec<Arc<dyn ReplicationRoute>>,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl FileChangeEventRouter {
    /// Create a router.
    pub fn new(
        queue: Arc<FileChangeEventQueue>,
        snapshots: Arc<dyn SnapshotProvider>,
        routes: Vec<Arc<dyn ReplicationRoute>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            snapshots,
            routes,
            clock,
            diagnostics: NullDiagnostics::shared(),
        }
    }

    /// Report per-event failures to `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Route one event. Returns the group that collected retry requests, or
    /// `None` if no route accepted the event or cancellation intervened.
    pub async fn route_event(
        &self,
        event: &FileChangeEvent,
        cancel: &CancellationToken,
    ) -> RouteResult<Option<RetryGroup>> {
        let needed: Vec<&Arc<dyn ReplicationRoute>> = self
            .routes
            .iter()
            .filter(|route| route.accepts(&event.abstract_path))
            .collect();
        if needed.is_empty() {
            debug!(path = %event.abstract_path, "no route accepts path");
            return Ok(None);
        }

        let snapshot = self
            .snapshots
            .snapshot(&event.qualified_path, self.clock.now())
            .await?;
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let group = RetryGroup::new();
        let dispatches = needed.into_iter().map(|route| {
            let leg = group.parallel();
            let snapshot = snapshot.as_ref();
            async move {
                match route.handle(snapshot, &event.abstract_path, leg.clone(), cancel).await {
                    Ok(token) => leg.retry_with(token),
                    Err(e) => {
                        warn!(route = %route.name(), path = %event.abstract_path, error = %e, "route failed");
                        self.diagnostics.record(DiagnosticEvent::UnexpectedError {
                            context: format!("routing {} via {}", event.abstract_path, route.name()),
                            error: e.to_string(),
                        });
                    }
                }
            }
        });
        join_all(dispatches).await;

        if group.retry_requested() {
            debug!(path = %event.abstract_path, deadline = ?group.token().deadline(), "retry requested");
            self.queue.enqueue_with_retry(event.clone(), group.token());
        }
        Ok(Some(group))
    }
}

#[async_trait]
impl WorkerLoop for FileChangeEventRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn run_once(&self, cancel: &CancellationToken) -> RouteResult<()> {
        while let Some(event) = self.queue.try_dequeue() {
            if let Err(e) = self.route_event(&event, cancel).await {
                warn!(path = %event.qualified_path, error = %e, "failed to route event");
                self.diagnostics.record(DiagnosticEvent::UnexpectedError {
                    context: format!("routing {}", event.qualified_path),
                    error: e.to_string(),
                });
            }
            if cancel.is_cancelled() {
                break;
            }
        }
        Ok(())
    }

    async fn wait_for_work(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = self.queue.wait_for_work() => {}
            _ = cancel.cancelled() => {}
        }
    }
}
