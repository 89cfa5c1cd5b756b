//! Cooperative worker loops driven on tokio tasks.
//!
//! A loop repeatedly drains the work currently available, then waits for more,
//! until cancelled. If draining fails the error is logged and the loop stops;
//! it is not restarted.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::RouteResult;

/// A unit of background work.
#[async_trait]
pub trait WorkerLoop: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Process everything available now without waiting for more.
    async fn run_once(&self, cancel: &CancellationToken) -> RouteResult<()>;

    /// Wait until there may be more work, or until cancelled.
    async fn wait_for_work(&self, cancel: &CancellationToken);
}

/// Spawns worker loops sharing one shutdown signal.
#[derive(Debug, Clone, Default)]
pub struct WorkerRunner {
    shutdown: CancellationToken,
}

impl WorkerRunner {
    /// Create a runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `worker` on its own task.
    pub fn spawn(&self, worker: Arc<dyn WorkerLoop>) -> WorkerHandle {
        let cancel = self.shutdown.child_token();
        let task_cancel = cancel.clone();
        let name = worker.name().to_string();
        let join = tokio::spawn(run_loop(worker, task_cancel));
        info!(worker = %name, "worker started");
        WorkerHandle { name, cancel, join }
    }

    /// Signal every loop spawned by this runner to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// The runner's shutdown token.
    pub fn token(&self) -> &CancellationToken {
        &self.shutdown
    }
}

async fn run_loop(worker: Arc<dyn WorkerLoop>, cancel: CancellationToken) {
    while !cancel.is_cancelled() {
        if let Err(e) = worker.run_once(&cancel).await {
            error!(worker = %worker.name(), error = %e, "worker loop failed, stopping");
            return;
        }
        worker.wait_for_work(&cancel).await;
    }
    debug!(worker = %worker.name(), "worker loop cancelled");
}

/// A running worker loop.
#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// The loop's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            error!(worker = %self.name, error = %e, "worker task panicked");
        }
        info!(worker = %self.name, "worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouteError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct CountingLoop {
        runs: AtomicUsize,
        fail_after: Option<usize>,
        wake: Notify,
    }

    impl CountingLoop {
        fn new(fail_after: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                fail_after,
                wake: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl WorkerLoop for CountingLoop {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run_once(&self, _cancel: &CancellationToken) -> RouteResult<()> {
            let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            match self.fail_after {
                Some(limit) if runs >= limit => Err(RouteError::TaskFailed("boom".into())),
                _ => Ok(()),
            }
        }

        async fn wait_for_work(&self, cancel: &CancellationToken) {
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    #[tokio::test]
    async fn test_loop_runs_until_stopped() {
        let worker = CountingLoop::new(None);
        let handle = WorkerRunner::new().spawn(worker.clone());
        worker.wake.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(worker.runs.load(Ordering::SeqCst) >= 1);
        assert!(!handle.is_finished());
        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("loop should stop");
    }

    #[tokio::test]
    async fn test_failure_terminates_loop() {
        let worker = CountingLoop::new(Some(2));
        let handle = WorkerRunner::new().spawn(worker.clone());
        worker.wake.notify_one();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("loop should terminate after failure");
        assert_eq!(worker.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_runner_shutdown_cancels_all() {
        let runner = WorkerRunner::new();
        let a = runner.spawn(CountingLoop::new(None));
        let b = runner.spawn(CountingLoop::new(None));
        runner.shutdown();
        tokio::time::timeout(Duration::from_secs(1), async {
            a.stop().await;
            b.stop().await;
        })
        .await
        .expect("loops should stop");
    }
}
