//! Process wiring: configuration in, running pipeline out.
//!
//! ```text
//! listeners -> path pool -> translator -> event queue -> router -> routes
//!                                              ^            |
//!                                              +-- retry ---+
//! ```

use std::future::Future;
use std::sync::Arc;

use graftsync_hier::{
    DiagnosticsSink, FileSystemApi, StorageHierarchies, StorageHierarchiesBuilder, TracingDiagnostics,
};
use graftsync_route::{
    CachingSnapshotService, Clock, FileChangeEventQueue, FileChangeEventRouter,
    FileChangeEventTranslator, FileSnapshotService, FileSystemPathPool, ReplicationRoute,
    SnapshotProvider, WorkerHandle, WorkerRunner,
};
use tracing::{info, warn};

use crate::config::{AgentConfig, WatcherConfig};
use crate::error::{AgentError, AgentResult};
use crate::listener::FileSystemListener;
use crate::storage_config::StorageConfigReader;
use crate::throttle::ThrottledSnapshotProvider;
use crate::tracing_route::TracingRoute;

/// Read the storage section of `config` into a hierarchy.
///
/// Every violation in the configuration is collected before failing, so the
/// error lists all of them.
pub fn load_hierarchies(
    config: &AgentConfig,
    fs: Arc<dyn FileSystemApi>,
    diagnostics: Arc<dyn DiagnosticsSink>,
) -> AgentResult<StorageHierarchies> {
    let mut builder = StorageHierarchiesBuilder::new(fs).with_diagnostics(diagnostics);
    let mut reader = StorageConfigReader::new();
    reader.read(&config.storage, &mut builder)?;
    let violations = reader.into_violations();
    if !violations.is_empty() {
        return Err(AgentError::InvalidConfiguration(
            violations.iter().map(ToString::to_string).collect(),
        ));
    }
    Ok(builder.build_hierarchies())
}

/// A configured but not yet running agent.
pub struct Agent {
    hierarchies: Arc<StorageHierarchies>,
    pool: Arc<FileSystemPathPool>,
    queue: Arc<FileChangeEventQueue>,
    translator: Arc<FileChangeEventTranslator>,
    router: Arc<FileChangeEventRouter>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    watcher: WatcherConfig,
}

impl Agent {
    /// Build the pipeline. `routes` are used in addition to the logging route
    /// when `routing.log_route` is set.
    pub fn new(
        config: &AgentConfig,
        fs: Arc<dyn FileSystemApi>,
        mut routes: Vec<Arc<dyn ReplicationRoute>>,
        clock: Arc<dyn Clock>,
    ) -> AgentResult<Self> {
        let diagnostics: Arc<dyn DiagnosticsSink> = Arc::new(TracingDiagnostics);
        let hierarchies = Arc::new(load_hierarchies(config, fs, Arc::clone(&diagnostics))?);

        if config.routing.log_route {
            routes.push(Arc::new(TracingRoute::new()));
        }
        if routes.is_empty() {
            warn!("no replication routes configured; changes will be discarded");
        }

        let files: Arc<dyn SnapshotProvider> = Arc::new(ThrottledSnapshotProvider::new(
            Arc::new(FileSnapshotService::new(Arc::clone(&hierarchies))),
            config.routing.snapshot_parallelism,
        ));
        let snapshots: Arc<dyn SnapshotProvider> =
            Arc::new(CachingSnapshotService::new(files, Arc::clone(&clock)));

        let pool = Arc::new(FileSystemPathPool::new());
        let queue = FileChangeEventQueue::new(Arc::clone(&clock));
        let translator = Arc::new(
            FileChangeEventTranslator::new(
                Arc::clone(&pool),
                Arc::clone(&hierarchies),
                Arc::clone(&queue),
                Arc::clone(&clock),
            )
            .with_diagnostics(Arc::clone(&diagnostics)),
        );
        let router = Arc::new(
            FileChangeEventRouter::new(Arc::clone(&queue), snapshots, routes, clock)
                .with_diagnostics(Arc::clone(&diagnostics)),
        );

        Ok(Self {
            hierarchies,
            pool,
            queue,
            translator,
            router,
            diagnostics,
            watcher: config.watcher.clone(),
        })
    }

    /// The frozen storage hierarchy.
    pub fn hierarchies(&self) -> &Arc<StorageHierarchies> {
        &self.hierarchies
    }

    /// Raw path intake. Anything added here is translated and routed.
    pub fn pool(&self) -> &Arc<FileSystemPathPool> {
        &self.pool
    }

    /// Queue of translated events awaiting routing.
    pub fn queue(&self) -> &Arc<FileChangeEventQueue> {
        &self.queue
    }

    /// Start the watchers and worker loops.
    pub fn start(&self) -> AgentResult<RunningAgent> {
        let mut listeners = Vec::new();
        if self.watcher.enabled {
            for root in self.hierarchies.all_roots() {
                listeners.push(FileSystemListener::start(
                    root.clone(),
                    Arc::clone(&self.pool),
                    Arc::clone(&self.diagnostics),
                    self.watcher.rescan_on_overflow,
                )?);
            }
        }

        let runner = WorkerRunner::new();
        let workers = vec![
            runner.spawn(self.translator.clone()),
            runner.spawn(self.router.clone()),
        ];
        info!(
            roots = self.hierarchies.all_roots().len(),
            watchers = listeners.len(),
            "agent started"
        );
        Ok(RunningAgent {
            runner,
            workers,
            listeners,
        })
    }

    /// Run until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> AgentResult<()>
    where
        F: Future<Output = ()>,
    {
        let running = self.start()?;
        shutdown.await;
        running.stop().await;
        Ok(())
    }
}

/// Handles to a started agent.
pub struct RunningAgent {
    runner: WorkerRunner,
    workers: Vec<WorkerHandle>,
    listeners: Vec<FileSystemListener>,
}

impl RunningAgent {
    /// Number of roots being watched.
    pub fn watched_roots(&self) -> usize {
        self.listeners.len()
    }

    /// True if any worker loop has exited.
    pub fn any_worker_finished(&self) -> bool {
        self.workers.iter().any(WorkerHandle::is_finished)
    }

    /// Stop watching, then stop the workers and wait for them.
    pub async fn stop(self) {
        info!("agent stopping");
        drop(self.listeners);
        self.runner.shutdown();
        for worker in self.workers {
            worker.stop().await;
        }
        info!("agent stopped");
    }
}
