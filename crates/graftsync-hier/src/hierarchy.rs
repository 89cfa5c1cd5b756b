//! Runtime mapping between OS paths, qualified paths and abstract paths.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::trace;

use crate::casing::eq_ignore_case;
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink};
use crate::error::{HierError, HierResult};
use crate::filter::{FilterRule, RelativePathFilter, RelativePathMatcher};
use crate::fsapi::FileSystemApi;
use crate::path::RelativePath;
use crate::root::{AbstractPath, Graft, LocalRoot, NamedRoot, QualifiedPath};

/// The immutable topology of named roots, grafts and filters.
///
/// Built once by [`crate::StorageHierarchiesBuilder`] and shared read-only.
pub struct StorageHierarchies {
    fs: Arc<dyn FileSystemApi>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    named_roots: Vec<NamedRoot>,
    grafts: Vec<Graft>,
    grafts_by_child: HashMap<LocalRoot, usize>,
    grafts_by_parent: HashMap<LocalRoot, Vec<usize>>,
    roots_longest_first: Vec<LocalRoot>,
    filters: HashMap<LocalRoot, RelativePathFilter>,
}

impl StorageHierarchies {
    pub(crate) fn new(
        fs: Arc<dyn FileSystemApi>,
        diagnostics: Arc<dyn DiagnosticsSink>,
        named_roots: Vec<NamedRoot>,
        grafts: Vec<Graft>,
        filters: HashMap<LocalRoot, Vec<RelativePathMatcher>>,
    ) -> Self {
        let mut grafts_by_child = HashMap::new();
        let mut grafts_by_parent: HashMap<LocalRoot, Vec<usize>> = HashMap::new();
        for (index, graft) in grafts.iter().enumerate() {
            grafts_by_child.insert(graft.child().clone(), index);
            grafts_by_parent
                .entry(graft.parent().clone())
                .or_default()
                .push(index);
        }

        let mut roots_longest_first: Vec<LocalRoot> = Vec::new();
        for root in named_roots
            .iter()
            .map(NamedRoot::local_root)
            .chain(grafts.iter().map(Graft::child))
        {
            if !roots_longest_first.contains(root) {
                roots_longest_first.push(root.clone());
            }
        }
        roots_longest_first.sort_by(|a, b| b.path().len().cmp(&a.path().len()));

        let filters = filters
            .into_iter()
            .map(|(root, matchers)| (root, RelativePathFilter::new(matchers)))
            .collect();

        Self {
            fs,
            diagnostics,
            named_roots,
            grafts,
            grafts_by_child,
            grafts_by_parent,
            roots_longest_first,
            filters,
        }
    }

    /// Every declared root, longest physical path first.
    pub fn all_roots(&self) -> &[LocalRoot] {
        &self.roots_longest_first
    }

    /// Named roots in declaration order.
    pub fn named_roots(&self) -> &[NamedRoot] {
        &self.named_roots
    }

    /// Grafts in declaration order.
    pub fn grafts(&self) -> &[Graft] {
        &self.grafts
    }

    /// Look up a named root by name, ignoring case.
    pub fn named_root(&self, name: &str) -> Option<&NamedRoot> {
        self.named_roots
            .iter()
            .find(|root| eq_ignore_case(root.name(), name))
    }

    /// The filter attached to `root`, if any matchers were declared.
    pub fn filter_for(&self, root: &LocalRoot) -> Option<&RelativePathFilter> {
        self.filters.get(root)
    }

    /// Express an absolute OS path as a qualified path under the innermost
    /// enclosing root.
    ///
    /// Returns `None` if no root encloses the path, if the path is the root
    /// itself, or if it lies at or beneath a graft point of its root and is
    /// therefore shadowed by the grafted subtree.
    pub fn try_resolve_qualified_path(&self, absolute_path: &str) -> HierResult<Option<QualifiedPath>> {
        for root in &self.roots_longest_first {
            let Some((segments, trailing_separator)) = root.relative_segments(absolute_path) else {
                continue;
            };
            if segments.is_empty() {
                return Ok(None);
            }
            let mut relative = self.fs.canonical_relative_path(root, &segments)?;
            if trailing_separator {
                relative = relative.as_container();
            }
            if self.is_shadowed(root, &relative)? {
                trace!(path = %absolute_path, root = %root, "path is shadowed by a graft");
                return Ok(None);
            }
            return Ok(Some(QualifiedPath::new(root.clone(), relative)));
        }
        Ok(None)
    }

    fn is_shadowed(&self, root: &LocalRoot, candidate: &RelativePath) -> HierResult<bool> {
        let Some(indices) = self.grafts_by_parent.get(root) else {
            return Ok(false);
        };
        let casing = root.casing();
        let as_container = candidate.as_container();
        for &index in indices {
            let point = self.grafts[index].graft_point().relative_path();
            if point.contains(candidate, casing)? || point.equals(&as_container, casing)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Map a qualified path up through any grafts to its named root.
    ///
    /// The filter of every root visited is evaluated against the path
    /// accumulated so far, and an exclusion at any level vetoes the mapping.
    /// Returns `None` when excluded or when the chain does not end at a named
    /// root.
    pub fn map_to_abstract_path(&self, qualified: &QualifiedPath) -> HierResult<Option<AbstractPath>> {
        self.assert_known(qualified.root())?;
        let mut current = qualified.root().clone();
        let mut visited = HashSet::from([current.id()]);
        // Innermost first.
        let mut parts = vec![qualified.relative_path().clone()];
        loop {
            let accumulated = RelativePath::combine(parts.iter().rev())?;
            if !self.is_included(&current, &accumulated) {
                return Ok(None);
            }
            let Some(&index) = self.grafts_by_child.get(&current) else {
                let named = self
                    .named_roots
                    .iter()
                    .find(|named| named.local_root() == &current);
                return Ok(named.map(|named| AbstractPath::new(named.clone(), accumulated)));
            };
            let graft = &self.grafts[index];
            current = graft.parent().clone();
            parts.push(graft.graft_point().relative_path().clone());
            if !visited.insert(current.id()) {
                return Err(HierError::GraftCycle {
                    root: current.to_string(),
                });
            }
        }
    }

    /// Map an abstract path down through grafts to the physical root which
    /// holds it.
    pub fn map_from_abstract_path(&self, path: &AbstractPath) -> HierResult<QualifiedPath> {
        let mut current = path.root().local_root().clone();
        self.assert_known(&current)?;
        let casing = current.casing();
        let mut relative = path.relative_path().clone();
        let mut visited = HashSet::from([current.id()]);
        while let Some(indices) = self.grafts_by_parent.get(&current) {
            let mut container = None;
            for &index in indices {
                if self.grafts[index]
                    .graft_point()
                    .relative_path()
                    .contains(&relative, casing)?
                {
                    container = Some(&self.grafts[index]);
                    break;
                }
            }
            let Some(graft) = container else {
                break;
            };
            relative = relative.remove_prefix(graft.graft_point().relative_path(), casing)?;
            current = graft.child().clone();
            if !visited.insert(current.id()) {
                return Err(HierError::GraftCycle {
                    root: current.to_string(),
                });
            }
        }
        Ok(QualifiedPath::new(current, relative))
    }

    /// The OS path of a qualified file path. Applies no filtering.
    pub fn resolve_to_file(&self, qualified: &QualifiedPath) -> HierResult<PathBuf> {
        self.assert_known(qualified.root())?;
        if qualified.relative_path().is_container() {
            return Err(HierError::ContainerNotFile {
                path: qualified.to_string(),
            });
        }
        let mut file = PathBuf::from(qualified.root().path());
        for segment in qualified.relative_path().segments() {
            file.push(segment);
        }
        Ok(file)
    }

    /// The named root which ultimately owns `qualified`, following grafts
    /// from child to parent. Applies no filtering.
    pub fn find_named_root(&self, qualified: &QualifiedPath) -> HierResult<Option<&NamedRoot>> {
        self.assert_known(qualified.root())?;
        let mut current = qualified.root();
        let mut visited = HashSet::from([current.id()]);
        while let Some(&index) = self.grafts_by_child.get(current) {
            current = self.grafts[index].parent();
            if !visited.insert(current.id()) {
                return Err(HierError::GraftCycle {
                    root: current.to_string(),
                });
            }
        }
        Ok(self
            .named_roots
            .iter()
            .find(|named| named.local_root() == current))
    }

    fn is_included(&self, root: &LocalRoot, path: &RelativePath) -> bool {
        let Some(filter) = self.filters.get(root) else {
            return true;
        };
        let matcher = filter.evaluate(path);
        match matcher.rule() {
            FilterRule::Exclude => {
                self.diagnostics.record(DiagnosticEvent::ExcludedByRule {
                    path: format!("{root}{path}"),
                    rule: matcher.to_string(),
                });
                false
            }
            FilterRule::Include => {
                if matcher.is_default() {
                    self.diagnostics.record(DiagnosticEvent::IncludedByDefault {
                        path: format!("{root}{path}"),
                    });
                }
                true
            }
        }
    }

    fn assert_known(&self, root: &LocalRoot) -> HierResult<()> {
        if self.roots_longest_first.contains(root) {
            return Ok(());
        }
        Err(HierError::UnknownRoot {
            root: root.to_string(),
        })
    }
}

impl fmt::Debug for StorageHierarchies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageHierarchies")
            .field("named_roots", &self.named_roots)
            .field("grafts", &self.grafts)
            .field("roots", &self.roots_longest_first.len())
            .finish_non_exhaustive()
    }
}
