//! A route which logs every change it has not seen before.

use async_trait::async_trait;
use dashmap::DashMap;
use graftsync_hier::AbstractPath;
use graftsync_route::{
    ContentHash, FileSnapshot, ReplicationRoute, RetryCollector, RetryToken, RouteResult,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Logs new content per abstract path. Never asks for a retry.
///
/// Remembers the last content hash seen for each path, with `None` standing
/// for a missing file, so repeated notifications for unchanged content are
/// reported as already handled.
pub struct TracingRoute {
    name: String,
    roots: Option<Vec<String>>,
    seen: DashMap<AbstractPath, Option<ContentHash>>,
}

impl TracingRoute {
    /// Accept every path.
    pub fn new() -> Self {
        Self {
            name: "log".to_string(),
            roots: None,
            seen: DashMap::new(),
        }
    }

    /// Accept only paths under the named roots, compared ignoring case.
    pub fn for_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: Some(roots.into_iter().map(Into::into).collect()),
            ..Self::new()
        }
    }

    /// Number of distinct paths seen.
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}

impl Default for TracingRoute {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplicationRoute for TracingRoute {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, path: &AbstractPath) -> bool {
        match &self.roots {
            None => true,
            Some(roots) => {
                let name = path.root().name().to_lowercase();
                roots.iter().any(|root| root.to_lowercase() == name)
            }
        }
    }

    fn is_handled(&self, snapshot: Option<&FileSnapshot>, path: &AbstractPath) -> bool {
        let current = snapshot.map(|s| s.sha256);
        self.seen
            .get(path)
            .map_or(false, |last| *last.value() == current)
    }

    async fn handle(
        &self,
        snapshot: Option<&FileSnapshot>,
        path: &AbstractPath,
        _retry: RetryCollector,
        _cancel: &CancellationToken,
    ) -> RouteResult<RetryToken> {
        if self.is_handled(snapshot, path) {
            debug!(path = %path, "content already seen");
            return Ok(RetryToken::NONE);
        }
        match snapshot {
            Some(snapshot) => info!(
                path = %path,
                file = %snapshot.qualified_path,
                length = snapshot.length,
                sha256 = %snapshot.sha256,
                "file changed"
            ),
            None => info!(path = %path, "file missing"),
        }
        self.seen.insert(path.clone(), snapshot.map(|s| s.sha256));
        Ok(RetryToken::NONE)
    }
}
