//! Shared fixtures for hierarchy integration tests.

use std::sync::Arc;

use graftsync_hier::{
    FileSystemApi, FileSystemCasing, HierError, HierResult, LocalRoot, RelativePath,
    StorageHierarchiesBuilder,
};

/// Filesystem API which never touches the disk: paths are taken as given.
pub struct StubFileSystemApi;

impl FileSystemApi for StubFileSystemApi {
    fn create_storage_root(&self, path: &str, casing: FileSystemCasing) -> HierResult<LocalRoot> {
        if !path.starts_with('/') {
            return Err(HierError::NotAbsolute {
                path: path.to_string(),
            });
        }
        let casing = match casing {
            FileSystemCasing::Unspecified => FileSystemCasing::CaseSensitive,
            casing => casing,
        };
        LocalRoot::new(path, casing)
    }

    fn canonical_relative_path(&self, _root: &LocalRoot, segments: &[String]) -> HierResult<RelativePath> {
        RelativePath::from_segments(segments)
    }
}

pub fn builder() -> StorageHierarchiesBuilder {
    StorageHierarchiesBuilder::new(Arc::new(StubFileSystemApi))
}

#[allow(dead_code)]
pub fn rp(path: &str) -> RelativePath {
    let p = RelativePath::from_segments(path.trim_end_matches('/').split('/')).unwrap();
    if path.ends_with('/') {
        p.as_container()
    } else {
        p
    }
}
