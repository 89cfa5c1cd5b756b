//! Error types for the agent.

use graftsync_hier::HierError;
use graftsync_route::RouteError;
use thiserror::Error;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised while assembling or running the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The storage configuration has violations; each is listed.
    #[error("invalid storage configuration:\n{}", .0.join("\n"))]
    InvalidConfiguration(Vec<String>),

    /// Hierarchy misuse.
    #[error(transparent)]
    Hier(#[from] HierError),

    /// Routing failure.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The OS watcher could not be set up.
    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Wraps standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
