//! Shared fixtures for agent integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graftsync_agent::{Agent, AgentConfig};
use graftsync_hier::{AbstractPath, LocalFileSystemApi};
use graftsync_route::{
    ContentHash, FileSnapshot, ReplicationRoute, RetryCollector, RetryToken, RouteResult,
    SystemClock,
};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Records every change routed to it.
#[derive(Default)]
pub struct RecordingRoute {
    pub handled: Mutex<Vec<(String, Option<ContentHash>)>>,
}

impl RecordingRoute {
    pub fn paths(&self) -> Vec<String> {
        self.handled.lock().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Poll until `path` (in `<root>:relative` form) has been handled.
    pub async fn wait_for(&self, path: &str) -> bool {
        for _ in 0..500 {
            if self.paths().iter().any(|p| p == path) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl ReplicationRoute for RecordingRoute {
    fn name(&self) -> &str {
        "recording"
    }

    fn accepts(&self, _path: &AbstractPath) -> bool {
        true
    }

    fn is_handled(&self, _snapshot: Option<&FileSnapshot>, _path: &AbstractPath) -> bool {
        false
    }

    async fn handle(
        &self,
        snapshot: Option<&FileSnapshot>,
        path: &AbstractPath,
        _retry: RetryCollector,
        _cancel: &CancellationToken,
    ) -> RouteResult<RetryToken> {
        self.handled
            .lock()
            .push((path.to_string(), snapshot.map(|s| s.sha256)));
        Ok(RetryToken::NONE)
    }
}

/// A temp directory with a `data` subdirectory to use as a root.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        Self { dir }
    }

    pub fn data(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn write(&self, relative: &str, content: &[u8]) -> String {
        let path = self.data().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    /// Write `text` as a config file named `name` and load it.
    pub fn config(&self, name: &str, text: &str) -> AgentConfig {
        let path = self.dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        AgentConfig::from_file(&path).unwrap()
    }
}

pub fn agent(config: &AgentConfig, route: Arc<RecordingRoute>) -> Agent {
    Agent::new(
        config,
        Arc::new(LocalFileSystemApi::new()),
        vec![route],
        Arc::new(SystemClock),
    )
    .unwrap()
}

pub fn json_path(path: &Path) -> String {
    serde_json::to_string(path.to_str().unwrap()).unwrap()
}
