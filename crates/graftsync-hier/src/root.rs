//! Physical and logical roots, and the paths qualified by them.
//!
//! A [`LocalRoot`] is identified by a process-unique [`RootId`] handle rather
//! than by its path: two roots naming the same directory are still distinct
//! objects unless compared with [`LocalRoot::same_location`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{is_separator, Path};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::casing::{eq_ignore_case, starts_with_ignore_case, FileSystemCasing};
use crate::error::{HierError, HierResult};
use crate::path::RelativePath;

static NEXT_ROOT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable handle identifying one [`LocalRoot`] for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(u64);

impl RootId {
    fn next() -> Self {
        RootId(NEXT_ROOT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw handle value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct LocalRootInner {
    path: String,
    casing: FileSystemCasing,
}

/// A directory on the OS filesystem with known casing rules.
///
/// Created once per configured directory and shared thereafter. Cloning is
/// cheap and preserves identity.
#[derive(Clone)]
pub struct LocalRoot {
    id: RootId,
    inner: Arc<LocalRootInner>,
}

impl LocalRoot {
    /// Create a root from an absolute, normalised directory path ending with a
    /// separator.
    pub fn new(path: impl Into<String>, casing: FileSystemCasing) -> HierResult<Self> {
        let path = path.into();
        if !Path::new(&path).is_absolute() {
            return Err(HierError::NotAbsolute { path });
        }
        if !path.ends_with(is_separator) {
            return Err(HierError::NotDirectory { path });
        }
        if casing == FileSystemCasing::Unspecified {
            return Err(HierError::UnspecifiedCasing);
        }
        Ok(Self {
            id: RootId::next(),
            inner: Arc::new(LocalRootInner { path, casing }),
        })
    }

    /// Identity handle.
    pub fn id(&self) -> RootId {
        self.id
    }

    /// Directory path, always ending with a separator.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Casing rules of the filesystem holding this root.
    pub fn casing(&self) -> FileSystemCasing {
        self.inner.casing
    }

    /// True if both roots name the same directory, ignoring identity.
    ///
    /// Physical locations are compared case-insensitively whatever the declared
    /// casing, so roots differing only by case are treated as the same place.
    pub fn same_location(&self, other: &LocalRoot) -> bool {
        eq_ignore_case(self.path(), other.path())
    }

    /// True if `other` lies strictly beneath this root's directory.
    pub fn is_ancestor_of(&self, other: &LocalRoot) -> bool {
        other.path().len() > self.path().len() && starts_with_ignore_case(other.path(), self.path())
    }

    /// Split an absolute OS path into segments relative to this root.
    ///
    /// Returns `None` if the path is not beneath the root. The flag reports
    /// whether the input ended with a separator.
    pub fn relative_segments(&self, absolute: &str) -> Option<(Vec<String>, bool)> {
        let root = self.path();
        let trimmed_root = root.trim_end_matches(is_separator);
        if !starts_with_ignore_case(absolute, trimmed_root) {
            return None;
        }
        let rest = skip_chars(absolute, trimmed_root.chars().count())?;
        if !rest.is_empty() && !rest.starts_with(is_separator) {
            return None;
        }
        let segments: Vec<String> = rest
            .split(is_separator)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Some((segments, rest.ends_with(is_separator)))
    }
}

fn skip_chars(s: &str, count: usize) -> Option<&str> {
    match s.char_indices().nth(count) {
        Some((idx, _)) => Some(&s[idx..]),
        None if s.chars().count() == count => Some(""),
        None => None,
    }
}

impl PartialEq for LocalRoot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LocalRoot {}

impl Hash for LocalRoot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for LocalRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRoot")
            .field("id", &self.id.0)
            .field("path", &self.inner.path)
            .field("casing", &self.inner.casing)
            .finish()
    }
}

impl fmt::Display for LocalRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A local root declared as the anchor of a named abstract hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedRoot {
    name: String,
    root: LocalRoot,
}

impl NamedRoot {
    /// Bind a non-blank name to a root.
    pub fn new(name: impl Into<String>, root: LocalRoot) -> HierResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HierError::EmptyName);
        }
        Ok(Self { name, root })
    }

    /// Logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical root.
    pub fn local_root(&self) -> &LocalRoot {
        &self.root
    }
}

impl fmt::Display for NamedRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.name, self.root)
    }
}

/// A path fully resolved to one physical root.
#[derive(Debug, Clone)]
pub struct QualifiedPath {
    root: LocalRoot,
    relative: RelativePath,
}

impl QualifiedPath {
    /// Pair a root with a path relative to it.
    pub fn new(root: LocalRoot, relative: RelativePath) -> Self {
        Self { root, relative }
    }

    /// The physical root.
    pub fn root(&self) -> &LocalRoot {
        &self.root
    }

    /// Path relative to the root.
    pub fn relative_path(&self) -> &RelativePath {
        &self.relative
    }
}

impl PartialEq for QualifiedPath {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self
                .relative
                .equals(&other.relative, self.root.casing())
                .unwrap_or(false)
    }
}

impl Eq for QualifiedPath {}

impl Hash for QualifiedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state);
        let _ = self.root.casing().hash_path(self.relative.as_str(), state);
    }
}

impl fmt::Display for QualifiedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.root, self.relative)
    }
}

/// The logical address of a path: a named root plus the path beneath it after
/// resolving every graft. Used as the identity for deduplication and routing.
#[derive(Debug, Clone)]
pub struct AbstractPath {
    root: NamedRoot,
    relative: RelativePath,
}

impl AbstractPath {
    /// Pair a named root with a path beneath it.
    pub fn new(root: NamedRoot, relative: RelativePath) -> Self {
        Self { root, relative }
    }

    /// The named root.
    pub fn root(&self) -> &NamedRoot {
        &self.root
    }

    /// Path relative to the named root.
    pub fn relative_path(&self) -> &RelativePath {
        &self.relative
    }
}

impl PartialEq for AbstractPath {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self
                .relative
                .equals(&other.relative, self.root.local_root().casing())
                .unwrap_or(false)
    }
}

impl Eq for AbstractPath {}

impl Hash for AbstractPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state);
        let _ = self
            .root
            .local_root()
            .casing()
            .hash_path(self.relative.as_str(), state);
    }
}

impl fmt::Display for AbstractPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>:{}", self.root.name(), self.relative)
    }
}

/// Mounts `child` at a container path inside another root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Graft {
    graft_point: QualifiedPath,
    child: LocalRoot,
}

impl Graft {
    /// Create a graft. The graft point must be a container.
    pub fn new(graft_point: QualifiedPath, child: LocalRoot) -> HierResult<Self> {
        if !graft_point.relative_path().is_container() {
            return Err(HierError::GraftPointNotContainer {
                path: graft_point.to_string(),
            });
        }
        Ok(Self { graft_point, child })
    }

    /// Location in the parent at which the child is mounted.
    pub fn graft_point(&self) -> &QualifiedPath {
        &self.graft_point
    }

    /// Root owning the graft point.
    pub fn parent(&self) -> &LocalRoot {
        self.graft_point.root()
    }

    /// Root mounted at the graft point.
    pub fn child(&self) -> &LocalRoot {
        &self.child
    }
}

impl fmt::Display for Graft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.graft_point, self.child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn root(path: &str, casing: FileSystemCasing) -> LocalRoot {
        LocalRoot::new(path, casing).unwrap()
    }

    fn rp(segments: &[&str]) -> RelativePath {
        RelativePath::from_segments(segments).unwrap()
    }

    mod local_root {
        use super::*;

        #[test]
        fn test_rejects_relative_path() {
            let result = LocalRoot::new("data/", FileSystemCasing::CaseSensitive);
            assert!(matches!(result, Err(HierError::NotAbsolute { .. })));
        }

        #[test]
        fn test_rejects_non_directory_path() {
            let result = LocalRoot::new("/data", FileSystemCasing::CaseSensitive);
            assert!(matches!(result, Err(HierError::NotDirectory { .. })));
        }

        #[test]
        fn test_rejects_unspecified_casing() {
            let result = LocalRoot::new("/data/", FileSystemCasing::Unspecified);
            assert!(matches!(result, Err(HierError::UnspecifiedCasing)));
        }

        #[test]
        fn test_identity_is_not_path_equality() {
            let a = root("/data/", FileSystemCasing::CaseSensitive);
            let b = root("/data/", FileSystemCasing::CaseSensitive);
            assert_ne!(a, b);
            assert_eq!(a, a.clone());
            assert!(a.same_location(&b));
        }

        #[test]
        fn test_same_location_ignores_case() {
            let a = root("/Data/A/", FileSystemCasing::CaseSensitive);
            let b = root("/data/a/", FileSystemCasing::CaseSensitive);
            assert!(a.same_location(&b));
        }

        #[test]
        fn test_ancestry_is_strict() {
            let parent = root("/data/", FileSystemCasing::CaseSensitive);
            let child = root("/data/sub/", FileSystemCasing::CaseSensitive);
            let sibling = root("/database/", FileSystemCasing::CaseSensitive);
            assert!(parent.is_ancestor_of(&child));
            assert!(!child.is_ancestor_of(&parent));
            assert!(!parent.is_ancestor_of(&sibling));
            assert!(!parent.is_ancestor_of(&parent.clone()));
        }

        #[test]
        fn test_relative_segments() {
            let r = root("/data/", FileSystemCasing::CaseSensitive);
            let (segments, trailing) = r.relative_segments("/data/test/log.txt").unwrap();
            assert_eq!(segments, vec!["test", "log.txt"]);
            assert!(!trailing);
            assert!(r.relative_segments("/database/x").is_none());
            assert!(r.relative_segments("/other/x").is_none());
            let (segments, trailing) = r.relative_segments("/DATA/dir/").unwrap();
            assert_eq!(segments, vec!["dir"]);
            assert!(trailing);
        }
    }

    mod qualified_path {
        use super::*;

        #[test]
        fn test_equality_follows_root_casing() {
            let insensitive = root("/data/", FileSystemCasing::CasePreservingInsensitive);
            let a = QualifiedPath::new(insensitive.clone(), rp(&["Some", "File.txt"]));
            let b = QualifiedPath::new(insensitive, rp(&["some", "file.txt"]));
            assert_eq!(a, b);

            let sensitive = root("/other/", FileSystemCasing::CaseSensitive);
            let c = QualifiedPath::new(sensitive.clone(), rp(&["Some", "File.txt"]));
            let d = QualifiedPath::new(sensitive, rp(&["some", "file.txt"]));
            assert_ne!(c, d);
        }

        #[test]
        fn test_equality_requires_same_root_object() {
            let a = root("/data/", FileSystemCasing::CaseSensitive);
            let b = root("/data/", FileSystemCasing::CaseSensitive);
            assert_ne!(
                QualifiedPath::new(a, rp(&["x"])),
                QualifiedPath::new(b, rp(&["x"]))
            );
        }

        #[test]
        fn test_hash_set_deduplicates_case_variants() {
            let r = root("/data/", FileSystemCasing::CasePreservingInsensitive);
            let mut set = HashSet::new();
            set.insert(QualifiedPath::new(r.clone(), rp(&["A.txt"])));
            set.insert(QualifiedPath::new(r, rp(&["a.TXT"])));
            assert_eq!(set.len(), 1);
        }
    }

    mod abstract_path {
        use super::*;

        #[test]
        fn test_display() {
            let r = root("/data/", FileSystemCasing::CaseSensitive);
            let named = NamedRoot::new("docs", r).unwrap();
            let path = AbstractPath::new(named, rp(&["sub", "a.txt"]));
            assert_eq!(path.to_string(), "<docs>:sub/a.txt");
        }

        #[test]
        fn test_named_root_rejects_blank_name() {
            let r = root("/data/", FileSystemCasing::CaseSensitive);
            assert!(matches!(NamedRoot::new("  ", r), Err(HierError::EmptyName)));
        }
    }

    mod graft {
        use super::*;

        #[test]
        fn test_graft_point_must_be_container() {
            let parent = root("/data/", FileSystemCasing::CaseSensitive);
            let child = root("/other/", FileSystemCasing::CaseSensitive);
            let point = QualifiedPath::new(parent, rp(&["sub"]));
            let result = Graft::new(point, child);
            assert!(matches!(result, Err(HierError::GraftPointNotContainer { .. })));
        }
    }
}
