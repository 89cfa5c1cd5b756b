//! Shared fixtures for routing integration tests.

#![allow(dead_code)]

use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use graftsync_hier::{
    AbstractPath, FileSystemCasing, FilterRule, LocalFileSystemApi, LocalRoot, QualifiedPath,
    RelativePathMatcher, StorageHierarchies, StorageHierarchiesBuilder,
};
use graftsync_route::{
    ContentHash, FileSnapshot, RetryCollector, RetryToken, RouteError, RouteResult,
    ReplicationRoute, SnapshotProvider, Timestamp,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub fn baseline() -> Timestamp {
    Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap()
}

/// `/data` named "data", excluding `*.bin`, with `/other` grafted at `sub/`.
pub fn hierarchies() -> (Arc<StorageHierarchies>, LocalRoot, LocalRoot) {
    let mut b = StorageHierarchiesBuilder::new(Arc::new(LocalFileSystemApi::new()));
    let data = b
        .create_node("/graftsync-test/data", FileSystemCasing::CaseSensitive)
        .unwrap();
    let other = b
        .create_node("/graftsync-test/other", FileSystemCasing::CaseSensitive)
        .unwrap();
    b.add_named_root("data", data.clone()).unwrap();
    b.add_graft_point(&data, "sub", other.clone()).unwrap();
    b.add_filter(
        &data,
        RelativePathMatcher::extension("bin", FilterRule::Exclude, FileSystemCasing::CaseSensitive)
            .unwrap(),
    )
    .unwrap();
    assert!(b.violations().is_empty());
    (Arc::new(b.build_hierarchies()), data, other)
}

/// Returns a fixed snapshot for every path.
pub struct FixedSnapshots;

#[async_trait]
impl SnapshotProvider for FixedSnapshots {
    async fn snapshot(&self, path: &QualifiedPath, timestamp: Timestamp) -> RouteResult<Option<FileSnapshot>> {
        Ok(Some(FileSnapshot {
            timestamp,
            qualified_path: path.clone(),
            length: 5,
            sha256: ContentHash::of(b"hello"),
        }))
    }

    fn read_snapshot(&self, _snapshot: &FileSnapshot) -> RouteResult<Box<dyn Read + Send>> {
        Ok(Box::new(std::io::Cursor::new(b"hello".to_vec())))
    }
}

/// What a [`ScriptedRoute`] does when handling a change.
#[derive(Clone)]
pub enum Outcome {
    Done,
    Retry(RetryToken),
    Fail,
}

/// A route recording every path it handles and answering from a script.
pub struct ScriptedRoute {
    name: String,
    prefix: String,
    outcomes: Mutex<Vec<Outcome>>,
    pub handled: Mutex<Vec<AbstractPath>>,
}

impl ScriptedRoute {
    /// Accepts paths whose relative part starts with `prefix`. Outcomes are
    /// used in order; once exhausted every change is `Done`.
    pub fn new(name: &str, prefix: &str, outcomes: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            outcomes: Mutex::new(outcomes),
            handled: Mutex::new(Vec::new()),
        })
    }

    pub fn handled_count(&self) -> usize {
        self.handled.lock().len()
    }
}

#[async_trait]
impl ReplicationRoute for ScriptedRoute {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, path: &AbstractPath) -> bool {
        path.relative_path().as_str().starts_with(&self.prefix)
    }

    fn is_handled(&self, _snapshot: Option<&FileSnapshot>, path: &AbstractPath) -> bool {
        self.handled.lock().contains(path)
    }

    async fn handle(
        &self,
        _snapshot: Option<&FileSnapshot>,
        path: &AbstractPath,
        _retry: RetryCollector,
        _cancel: &CancellationToken,
    ) -> RouteResult<RetryToken> {
        self.handled.lock().push(path.clone());
        let outcome = {
            let mut outcomes = self.outcomes.lock();
            if outcomes.is_empty() {
                Outcome::Done
            } else {
                outcomes.remove(0)
            }
        };
        match outcome {
            Outcome::Done => Ok(RetryToken::NONE),
            Outcome::Retry(token) => Ok(token),
            Outcome::Fail => Err(RouteError::Route {
                route: self.name.clone(),
                message: "scripted failure".to_string(),
            }),
        }
    }
}
