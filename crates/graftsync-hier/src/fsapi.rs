//! Filesystem abstraction used to create roots and canonicalise paths.

use std::fs::{self, Metadata};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use tracing::debug;

use crate::casing::{eq_ignore_case, FileSystemCasing};
use crate::error::{HierError, HierResult};
use crate::path::RelativePath;
use crate::root::LocalRoot;

/// Creates local roots and canonical relative paths for a filesystem.
pub trait FileSystemApi: Send + Sync {
    /// Validate and normalise an absolute directory path into a root. When
    /// `casing` is [`FileSystemCasing::Unspecified`] the actual rules are
    /// determined from the filesystem.
    fn create_storage_root(&self, path: &str, casing: FileSystemCasing) -> HierResult<LocalRoot>;

    /// Build a relative path under `root`, adjusting segment casing to match
    /// what exists on disk where the root ignores case.
    fn canonical_relative_path(&self, root: &LocalRoot, segments: &[String]) -> HierResult<RelativePath>;
}

/// [`FileSystemApi`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystemApi;

impl LocalFileSystemApi {
    /// Create a new instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystemApi for LocalFileSystemApi {
    fn create_storage_root(&self, path: &str, casing: FileSystemCasing) -> HierResult<LocalRoot> {
        let normalised = normalise_absolute(path)?;
        let casing = match casing {
            FileSystemCasing::Unspecified => {
                let detected = detect_casing(Path::new(&normalised));
                debug!(path = %normalised, casing = ?detected, "detected filesystem casing");
                detected
            }
            casing => casing,
        };
        LocalRoot::new(normalised, casing)
    }

    fn canonical_relative_path(&self, root: &LocalRoot, segments: &[String]) -> HierResult<RelativePath> {
        if !root.casing().ignores_case() {
            return RelativePath::from_segments(segments);
        }
        let mut dir = PathBuf::from(root.path());
        let mut canonical = Vec::with_capacity(segments.len());
        for segment in segments {
            let actual = find_entry(&dir, segment).unwrap_or_else(|| segment.clone());
            dir.push(&actual);
            canonical.push(actual);
        }
        RelativePath::from_segments(canonical)
    }
}

/// Lexically normalise an absolute path, resolving `.` and `..`, and ensure
/// it ends with a separator.
pub fn normalise_absolute(path: &str) -> HierResult<String> {
    let original = Path::new(path);
    if !original.is_absolute() {
        return Err(HierError::NotAbsolute {
            path: path.to_string(),
        });
    }
    let mut out = PathBuf::new();
    for component in original.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    let mut normalised = out
        .to_str()
        .ok_or_else(|| HierError::InvalidSegment {
            segment: out.to_string_lossy().into_owned(),
        })?
        .to_string();
    if !normalised.ends_with(std::path::is_separator) {
        normalised.push(MAIN_SEPARATOR);
    }
    Ok(normalised)
}

fn find_entry(dir: &Path, segment: &str) -> Option<String> {
    let entries = fs::read_dir(dir).ok()?;
    let mut candidate = None;
    for entry in entries.flatten() {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name == segment {
            return Some(name);
        }
        if candidate.is_none() && eq_ignore_case(&name, segment) {
            candidate = Some(name);
        }
    }
    candidate
}

fn platform_default_casing() -> FileSystemCasing {
    if cfg!(any(windows, target_os = "macos")) {
        FileSystemCasing::CasePreservingInsensitive
    } else {
        FileSystemCasing::CaseSensitive
    }
}

/// Probe a case-swapped spelling of `path`: if it names the same file the
/// filesystem ignores case.
fn detect_casing(path: &Path) -> FileSystemCasing {
    let text = path.to_string_lossy();
    let swapped: String = text.chars().flat_map(swap_case).collect();
    if swapped == text {
        return platform_default_casing();
    }
    match (fs::metadata(path), fs::metadata(&swapped)) {
        (Ok(original), Ok(other)) if same_file(&original, &other) => {
            FileSystemCasing::CasePreservingInsensitive
        }
        (Ok(_), _) => FileSystemCasing::CaseSensitive,
        (Err(_), _) => platform_default_casing(),
    }
}

fn swap_case(c: char) -> Vec<char> {
    if c.is_lowercase() {
        c.to_uppercase().collect()
    } else if c.is_uppercase() {
        c.to_lowercase().collect()
    } else {
        vec![c]
    }
}

#[cfg(unix)]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    a.is_dir() == b.is_dir() && a.len() == b.len()
}
