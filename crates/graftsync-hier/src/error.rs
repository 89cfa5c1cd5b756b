//! Error types for the storage hierarchy subsystem.
//!
//! These cover programmer misuse only. Configuration problems detected while
//! building a hierarchy are [`crate::Violation`] values, never errors.

use thiserror::Error;

/// Result type alias for hierarchy operations.
pub type HierResult<T> = Result<T, HierError>;

/// Errors raised by the storage hierarchy model.
#[derive(Debug, Error)]
pub enum HierError {
    /// A path comparison was attempted before the casing rules were known.
    #[error("cannot compare paths when the casing rules are not known")]
    UnspecifiedCasing,

    /// A relative path was constructed with no segments.
    #[error("relative path must have at least one segment")]
    EmptyPath,

    /// A relative path segment was empty or contained a separator.
    #[error("invalid relative path segment: {segment:?}")]
    InvalidSegment {
        /// The offending segment.
        segment: String,
    },

    /// Only the last path of a concatenation may be a non-container.
    #[error("non-container path must be the last one combined: {path}")]
    NonContainerPrefix {
        /// The non-container path that was followed by another path.
        path: String,
    },

    /// `prefix` does not contain `path`.
    #[error("path '{prefix}' is not a prefix of '{path}'")]
    NotAPrefix {
        /// The expected prefix.
        prefix: String,
        /// The path being stripped.
        path: String,
    },

    /// A named root was given a blank name.
    #[error("root name cannot be empty or whitespace")]
    EmptyName,

    /// A path which must denote a directory did not end with a separator.
    #[error("not a directory path: {path}")]
    NotDirectory {
        /// The offending path.
        path: String,
    },

    /// A graft point was not a container path.
    #[error("graft point must be a container: {path}")]
    GraftPointNotContainer {
        /// Display form of the graft point.
        path: String,
    },

    /// A path which must be absolute was not.
    #[error("not an absolute path: {path}")]
    NotAbsolute {
        /// The offending path.
        path: String,
    },

    /// A path which must be relative was rooted.
    #[error("not a relative path: {path}")]
    NotRelative {
        /// The offending path.
        path: String,
    },

    /// A parent or filter owner was referenced before being declared.
    #[error("root is not yet declared: {root}")]
    UndeclaredRoot {
        /// Display form of the root.
        root: String,
    },

    /// A root which is not part of the built hierarchy was presented to it.
    #[error("unrecognised local root: {root}")]
    UnknownRoot {
        /// Display form of the root.
        root: String,
    },

    /// A container path cannot be resolved to a file.
    #[error("cannot resolve a container path to a file: {path}")]
    ContainerNotFile {
        /// Display form of the qualified path.
        path: String,
    },

    /// The graft relation contains a cycle. The builder makes this impossible.
    #[error("cycle detected in graft graph at {root}")]
    GraftCycle {
        /// The root visited twice.
        root: String,
    },

    /// Wraps standard I/O errors from the filesystem abstraction.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
