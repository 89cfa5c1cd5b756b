//! Turns raw OS paths into queued [`FileChangeEvent`]s.

use std::sync::Arc;

use async_trait::async_trait;
use graftsync_hier::{DiagnosticEvent, DiagnosticsSink, NullDiagnostics, StorageHierarchies};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::RouteResult;
use crate::event::FileChangeEvent;
use crate::pool::FileSystemPathPool;
use crate::queue::FileChangeEventQueue;
use crate::worker::WorkerLoop;

/// Drains the path pool, resolving each path through the hierarchy.
///
/// Paths which do not resolve, are shadowed, or are filtered out are dropped.
/// A failure on one path is logged and does not affect the rest.
pub struct FileChangeEventTranslator {
    pool: Arc<FileSystemPathPool>,
    hierarchies: Arc<StorageHierarchies>,
    queue: Arc<FileChangeEventQueue>,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl FileChangeEventTranslator {
    /// Create a translator feeding `queue` from `pool`.
    pub fn new(
        pool: Arc<FileSystemPathPool>,
        hierarchies: Arc<StorageHierarchies>,
        queue: Arc<FileChangeEventQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            hierarchies,
            queue,
            clock,
            diagnostics: NullDiagnostics::shared(),
        }
    }

    /// Report per-path failures to `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Translate one path. `Ok(None)` if it was dropped.
    pub fn translate(&self, path: &str) -> RouteResult<Option<FileChangeEvent>> {
        let Some(qualified) = self.hierarchies.try_resolve_qualified_path(path)? else {
            debug!(path = %path, "path does not resolve to a root");
            return Ok(None);
        };
        let Some(abstract_path) = self.hierarchies.map_to_abstract_path(&qualified)? else {
            debug!(path = %path, "path filtered out");
            return Ok(None);
        };
        Ok(Some(FileChangeEvent::new(
            self.clock.now(),
            qualified,
            abstract_path,
        )))
    }
}

#[async_trait]
impl WorkerLoop for FileChangeEventTranslator {
    fn name(&self) -> &str {
        "translator"
    }

    async fn run_once(&self, cancel: &CancellationToken) -> RouteResult<()> {
        while let Some(path) = self.pool.try_take() {
            match self.translate(&path) {
                Ok(Some(event)) => self.queue.enqueue(event),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path, error = %e, "failed to translate path");
                    self.diagnostics.record(DiagnosticEvent::UnexpectedError {
                        context: format!("translating {path}"),
                        error: e.to_string(),
                    });
                }
            }
            if cancel.is_cancelled() {
                break;
            }
        }
        Ok(())
    }

    async fn wait_for_work(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = self.pool.wait_for_work() => {}
            _ = cancel.cancelled() => {}
        }
    }
}
