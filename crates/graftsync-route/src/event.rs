//! A change to a file, resolved to both its physical and logical address.

use std::fmt;

use graftsync_hier::{AbstractPath, QualifiedPath};

use crate::clock::Timestamp;

/// A change to one file, observed at `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    /// When the change was translated.
    pub timestamp: Timestamp,
    /// Where the file physically lives.
    pub qualified_path: QualifiedPath,
    /// The logical identity used for deduplication and routing.
    pub abstract_path: AbstractPath,
}

impl FileChangeEvent {
    /// Create an event.
    pub fn new(timestamp: Timestamp, qualified_path: QualifiedPath, abstract_path: AbstractPath) -> Self {
        Self {
            timestamp,
            qualified_path,
            abstract_path,
        }
    }
}

impl fmt::Display for FileChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.abstract_path, self.qualified_path)
    }
}
