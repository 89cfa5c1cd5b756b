//! Error types for the change-routing pipeline.

use graftsync_hier::HierError;
use thiserror::Error;

/// Result type alias for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;

/// Errors raised while translating, snapshotting or routing a change.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The storage hierarchy rejected an operation.
    #[error("hierarchy error: {0}")]
    Hier(#[from] HierError),

    /// Reading a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A shared snapshot computation failed.
    #[error("snapshot of {path} failed: {reason}")]
    Snapshot {
        /// The qualified path being snapshotted.
        path: String,
        /// Description of the failure.
        reason: String,
    },

    /// A replication route failed to handle a change.
    #[error("route {route} failed: {message}")]
    Route {
        /// Name of the route.
        route: String,
        /// Description of the failure.
        message: String,
    },

    /// A background task panicked or was aborted.
    #[error("background task failed: {0}")]
    TaskFailed(String),

    /// The operation observed cancellation.
    #[error("operation cancelled")]
    Cancelled,
}
