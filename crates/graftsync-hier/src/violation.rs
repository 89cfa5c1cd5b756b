//! Structural configuration violations accumulated while building a hierarchy.

use std::fmt;

use crate::root::{Graft, LocalRoot, NamedRoot};

/// A structural problem with a declared configuration.
///
/// The builder records these instead of failing, so every problem in one
/// configuration can be reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Two named roots share a name, compared case-insensitively.
    DuplicateNamedRoot {
        /// The later declaration.
        duplicate: NamedRoot,
        /// The declaration it collided with.
        original: NamedRoot,
    },
    /// A local root was declared more than once, by identity or by location.
    DuplicateLocalRoot {
        /// The rejected root.
        node: LocalRoot,
    },
    /// One declared root lies inside another without a graft relating them.
    OverlappingLocalRoot {
        /// The enclosing root.
        parent: LocalRoot,
        /// The enclosed root.
        child: LocalRoot,
    },
    /// A graft point was used twice.
    DuplicateGraft {
        /// The later graft.
        duplicate: Graft,
        /// The graft already occupying the point.
        original: Graft,
    },
    /// A graft's child root uses different casing rules from its parent.
    CasingConflict {
        /// The rejected graft.
        graft: Graft,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DuplicateNamedRoot { duplicate, original } => write!(
                f,
                "named root '{}' is already declared as {}",
                duplicate.name(),
                original
            ),
            Violation::DuplicateLocalRoot { node } => {
                write!(f, "local root {} is declared more than once", node)
            }
            Violation::OverlappingLocalRoot { parent, child } => write!(
                f,
                "local root {} overlaps {} which contains it",
                child, parent
            ),
            Violation::DuplicateGraft { duplicate, original } => write!(
                f,
                "graft point {} is already used by {}",
                duplicate.graft_point(),
                original
            ),
            Violation::CasingConflict { graft } => write!(
                f,
                "graft {} joins roots with different casing rules ({:?} and {:?})",
                graft,
                graft.parent().casing(),
                graft.child().casing()
            ),
        }
    }
}
