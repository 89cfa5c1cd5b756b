#![warn(missing_docs)]

//! graftsync storage hierarchies: logical/physical path addressing, grafts, filters
//! and the glob/extension compilers used to express them.

pub mod builder;
pub mod casing;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod fsapi;
pub mod glob;
pub mod hierarchy;
pub mod path;
pub mod root;
pub mod violation;

pub use builder::StorageHierarchiesBuilder;
pub use casing::FileSystemCasing;
pub use diagnostics::{DiagnosticEvent, DiagnosticsSink, NullDiagnostics, TracingDiagnostics};
pub use error::{HierError, HierResult};
pub use filter::{FilterRule, RelativePathFilter, RelativePathMatcher};
pub use fsapi::{FileSystemApi, LocalFileSystemApi};
pub use glob::{
    ExtensionCompiler, ExtensionFormatError, GlobCompiler, GlobFormatError, PatternError,
};
pub use hierarchy::StorageHierarchies;
pub use path::RelativePath;
pub use root::{AbstractPath, Graft, LocalRoot, NamedRoot, QualifiedPath, RootId};
pub use violation::Violation;
