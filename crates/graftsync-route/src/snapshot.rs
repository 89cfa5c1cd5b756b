//! Point-in-time file snapshots: length plus SHA-256 of the content.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use graftsync_hier::{QualifiedPath, StorageHierarchies};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::clock::Timestamp;
use crate::error::{RouteError, RouteResult};

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// A SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        ContentHash(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Digest of an in-memory buffer.
    pub fn of(data: &[u8]) -> Self {
        ContentHash(Sha256::digest(data).into())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

/// Length and content hash of a file at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// The time the snapshot is effective for.
    pub timestamp: Timestamp,
    /// The file.
    pub qualified_path: QualifiedPath,
    /// Bytes hashed.
    pub length: u64,
    /// SHA-256 of the first `length` bytes.
    pub sha256: ContentHash,
}

/// Computes and reads file snapshots.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Snapshot `path` as of `timestamp`, or `None` if the file does not
    /// exist.
    async fn snapshot(&self, path: &QualifiedPath, timestamp: Timestamp) -> RouteResult<Option<FileSnapshot>>;

    /// Open the content a snapshot describes, limited to its length.
    fn read_snapshot(&self, snapshot: &FileSnapshot) -> RouteResult<Box<dyn Read + Send>>;
}

/// Hashes files on the local filesystem.
pub struct FileSnapshotService {
    hierarchies: Arc<StorageHierarchies>,
}

impl FileSnapshotService {
    /// Resolve paths through `hierarchies`.
    pub fn new(hierarchies: Arc<StorageHierarchies>) -> Self {
        Self { hierarchies }
    }
}

#[async_trait]
impl SnapshotProvider for FileSnapshotService {
    async fn snapshot(&self, path: &QualifiedPath, timestamp: Timestamp) -> RouteResult<Option<FileSnapshot>> {
        let file = self.hierarchies.resolve_to_file(path)?;
        let hashed = tokio::task::spawn_blocking(move || hash_file(&file))
            .await
            .map_err(|e| RouteError::TaskFailed(e.to_string()))??;
        Ok(hashed.map(|(length, sha256)| {
            trace!(path = %path, length, sha256 = %sha256, "snapshot computed");
            FileSnapshot {
                timestamp,
                qualified_path: path.clone(),
                length,
                sha256,
            }
        }))
    }

    fn read_snapshot(&self, snapshot: &FileSnapshot) -> RouteResult<Box<dyn Read + Send>> {
        let file = self.hierarchies.resolve_to_file(&snapshot.qualified_path)?;
        let reader = File::open(file)?.take(snapshot.length);
        Ok(Box::new(reader))
    }
}

/// Hash the file's current length worth of bytes. `None` if the file is
/// missing, including when it disappears while being read.
fn hash_file(path: &Path) -> RouteResult<Option<(u64, ContentHash)>> {
    match try_hash_file(path) {
        Ok(hashed) => Ok(Some(hashed)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            if !path.is_file() {
                return Ok(None);
            }
            Err(e.into())
        }
    }
}

fn try_hash_file(path: &Path) -> io::Result<(u64, ContentHash)> {
    let file = File::open(path)?;
    let length = file.metadata()?.len();
    let mut reader = file.take(length);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    let mut read_total = 0u64;
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        read_total += n as u64;
    }
    Ok((read_total, ContentHash(hasher.finalize().into())))
}
