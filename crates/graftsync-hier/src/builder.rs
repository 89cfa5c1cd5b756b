//! Accumulates root, graft and filter declarations into a [`StorageHierarchies`].
//!
//! Structural problems are recorded as [`Violation`]s and the offending
//! declaration is skipped, so one pass reports every problem. Referencing a
//! root that was never declared is a programmer error and is returned as
//! `Err` immediately.

use std::collections::HashMap;
use std::path::is_separator;
use std::sync::Arc;

use tracing::debug;

use crate::casing::{eq_ignore_case, FileSystemCasing};
use crate::diagnostics::{DiagnosticsSink, NullDiagnostics};
use crate::error::{HierError, HierResult};
use crate::filter::RelativePathMatcher;
use crate::fsapi::FileSystemApi;
use crate::hierarchy::StorageHierarchies;
use crate::root::{Graft, LocalRoot, NamedRoot, QualifiedPath};
use crate::violation::Violation;

/// Builder for [`StorageHierarchies`].
pub struct StorageHierarchiesBuilder {
    fs: Arc<dyn FileSystemApi>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    nodes: Vec<LocalRoot>,
    named_roots: Vec<NamedRoot>,
    grafts: Vec<Graft>,
    filters: HashMap<LocalRoot, Vec<RelativePathMatcher>>,
    violations: Vec<Violation>,
}

impl StorageHierarchiesBuilder {
    /// Create a builder using `fs` to create roots and canonicalise paths.
    pub fn new(fs: Arc<dyn FileSystemApi>) -> Self {
        Self {
            fs,
            diagnostics: NullDiagnostics::shared(),
            nodes: Vec::new(),
            named_roots: Vec::new(),
            grafts: Vec::new(),
            filters: HashMap::new(),
            violations: Vec::new(),
        }
    }

    /// Diagnostics sink handed to the built hierarchy.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Create a local root for an absolute directory path. This does not
    /// declare it.
    pub fn create_node(&self, absolute_path: &str, casing: FileSystemCasing) -> HierResult<LocalRoot> {
        if !std::path::Path::new(absolute_path).is_absolute() {
            return Err(HierError::NotAbsolute {
                path: absolute_path.to_string(),
            });
        }
        let mut directory = absolute_path.to_string();
        if !directory.ends_with(is_separator) {
            directory.push(std::path::MAIN_SEPARATOR);
        }
        self.fs.create_storage_root(&directory, casing)
    }

    /// Declare `root` under a logical name.
    pub fn add_named_root(&mut self, name: &str, root: LocalRoot) -> HierResult<Option<Violation>> {
        let named = NamedRoot::new(name, root)?;
        if let Some(original) = self
            .named_roots
            .iter()
            .find(|existing| eq_ignore_case(existing.name(), named.name()))
        {
            let violation = Violation::DuplicateNamedRoot {
                duplicate: named,
                original: original.clone(),
            };
            return Ok(Some(self.record(violation)));
        }
        if let Err(violation) = self.try_add_local_root(named.local_root()) {
            return Ok(Some(self.record(violation)));
        }
        debug!(name = %named.name(), root = %named.local_root(), "declared named root");
        self.named_roots.push(named);
        Ok(None)
    }

    /// Mount `child` at `relative_path` inside the already-declared `parent`.
    pub fn add_graft_point(
        &mut self,
        parent: &LocalRoot,
        relative_path: &str,
        child: LocalRoot,
    ) -> HierResult<Option<Violation>> {
        self.require_declared(parent)?;
        let graft = self.create_graft(parent, relative_path, child)?;
        if let Some(original) = self
            .grafts
            .iter()
            .find(|existing| existing.graft_point() == graft.graft_point())
        {
            let violation = Violation::DuplicateGraft {
                duplicate: graft,
                original: original.clone(),
            };
            return Ok(Some(self.record(violation)));
        }
        if graft.child().casing() != graft.parent().casing() {
            return Ok(Some(self.record(Violation::CasingConflict { graft })));
        }
        if let Err(violation) = self.try_add_local_root(graft.child()) {
            return Ok(Some(self.record(violation)));
        }
        debug!(graft = %graft, "declared graft");
        self.grafts.push(graft);
        Ok(None)
    }

    /// Append a matcher to the filter of the already-declared `owner`.
    pub fn add_filter(&mut self, owner: &LocalRoot, matcher: RelativePathMatcher) -> HierResult<()> {
        self.require_declared(owner)?;
        self.filters.entry(owner.clone()).or_default().push(matcher);
        Ok(())
    }

    /// True if `root` has been declared as a named root or graft child.
    pub fn is_declared(&self, root: &LocalRoot) -> bool {
        self.nodes.contains(root)
    }

    /// Every violation recorded so far, in order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Freeze the accepted declarations.
    pub fn build_hierarchies(&self) -> StorageHierarchies {
        StorageHierarchies::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.diagnostics),
            self.named_roots.clone(),
            self.grafts.clone(),
            self.filters.clone(),
        )
    }

    fn create_graft(&self, parent: &LocalRoot, relative_path: &str, child: LocalRoot) -> HierResult<Graft> {
        if relative_path.starts_with(is_separator) || std::path::Path::new(relative_path).is_absolute() {
            return Err(HierError::NotRelative {
                path: relative_path.to_string(),
            });
        }
        let segments: Vec<String> = relative_path
            .split(is_separator)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let graft_path = self.fs.canonical_relative_path(parent, &segments)?.as_container();
        Graft::new(QualifiedPath::new(parent.clone(), graft_path), child)
    }

    fn require_declared(&self, root: &LocalRoot) -> HierResult<()> {
        if self.is_declared(root) {
            return Ok(());
        }
        Err(HierError::UndeclaredRoot {
            root: root.to_string(),
        })
    }

    fn try_add_local_root(&mut self, node: &LocalRoot) -> Result<(), Violation> {
        if self
            .nodes
            .iter()
            .any(|existing| existing == node || existing.same_location(node))
        {
            return Err(Violation::DuplicateLocalRoot { node: node.clone() });
        }
        for existing in &self.nodes {
            if node.is_ancestor_of(existing) {
                return Err(Violation::OverlappingLocalRoot {
                    parent: node.clone(),
                    child: existing.clone(),
                });
            }
            if existing.is_ancestor_of(node) {
                return Err(Violation::OverlappingLocalRoot {
                    parent: existing.clone(),
                    child: node.clone(),
                });
            }
        }
        self.nodes.push(node.clone());
        Ok(())
    }

    fn record(&mut self, violation: Violation) -> Violation {
        debug!(violation = %violation, "configuration violation");
        self.violations.push(violation.clone());
        violation
    }
}
