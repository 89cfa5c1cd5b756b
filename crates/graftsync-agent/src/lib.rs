#![warn(missing_docs)]

//! graftsync agent: configuration loading, OS watchers, the logging route and
//! the wiring that runs the change-routing pipeline as a process.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod listener;
pub mod storage_config;
pub mod throttle;
pub mod tracing_route;

pub use agent::{load_hierarchies, Agent, RunningAgent};
pub use config::{AgentConfig, FilterConfig, LocationConfig, RoutingConfig, StorageRootConfig, WatcherConfig};
pub use error::{AgentError, AgentResult};
pub use listener::FileSystemListener;
pub use storage_config::{ConfigViolation, LocatedViolation, StorageConfigReader, RESERVED_GLOB};
pub use throttle::ThrottledSnapshotProvider;
pub use tracing_route::TracingRoute;
