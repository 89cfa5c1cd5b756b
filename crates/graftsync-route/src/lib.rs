#![warn(missing_docs)]

//! graftsync change routing: path pool, translator, deduplicating retry queue,
//! router, retry-token algebra and the single-flight snapshot cache.

pub mod clock;
pub mod error;
pub mod event;
pub mod pool;
pub mod queue;
pub mod retry;
pub mod route;
pub mod router;
pub mod snapshot;
pub mod snapshot_cache;
pub mod translator;
pub mod worker;

pub use clock::{Clock, MockClock, SystemClock, Timestamp};
pub use error::{RouteError, RouteResult};
pub use event::FileChangeEvent;
pub use pool::FileSystemPathPool;
pub use queue::FileChangeEventQueue;
pub use retry::{RetryCollector, RetryGroup, RetryToken};
pub use route::ReplicationRoute;
pub use router::FileChangeEventRouter;
pub use snapshot::{ContentHash, FileSnapshot, FileSnapshotService, SnapshotProvider};
pub use snapshot_cache::CachingSnapshotService;
pub use translator::FileChangeEventTranslator;
pub use worker::{WorkerHandle, WorkerLoop, WorkerRunner};
