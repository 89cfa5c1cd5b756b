//! Turns storage declarations from the configuration file into builder calls.
//!
//! Problems which can be seen by looking at one element alone (path forms,
//! filter syntax) are recorded here. Problems which need the whole hierarchy
//! (overlaps, duplicates, casing) come back from the builder and are recorded
//! alongside them, so the operator gets one complete list.
//!
//! When an element fails, its filters and nested locations are still checked
//! in isolation but nothing beneath it is declared.

use std::fmt;
use std::path::{is_separator, Path};

use graftsync_hier::{
    FileSystemCasing, FilterRule, HierResult, LocalRoot, PatternError, RelativePathMatcher,
    StorageHierarchiesBuilder, Violation,
};
use tracing::debug;

use crate::config::{FilterConfig, LocationConfig, StorageRootConfig};

/// Directory the agent keeps its own state in. Never replicated.
pub const RESERVED_GLOB: &str = "**/.graftsync/**";

/// A problem with one configuration element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigViolation {
    /// A storage root was given a blank name.
    NameRequired,
    /// A path which must be absolute was relative.
    AbsolutePathRequired {
        /// The path as written.
        path: String,
    },
    /// A path which must be relative was absolute or empty.
    RelativePathRequired {
        /// The path as written.
        path: String,
    },
    /// More than one of glob, extension and regex was set on one filter.
    MultipleMatchersSpecified,
    /// The glob could not be compiled.
    InvalidFilterGlob {
        /// The glob as written.
        glob: String,
        /// What is wrong with it.
        message: String,
        /// Byte offset of the problem.
        position: usize,
    },
    /// The extension could not be compiled.
    InvalidFilterExtension {
        /// The extension as written.
        extension: String,
        /// What is wrong with it.
        message: String,
    },
    /// The regex could not be compiled.
    InvalidFilterRegex {
        /// The regex as written.
        regex: String,
        /// What is wrong with it.
        message: String,
    },
    /// The builder rejected the declaration.
    Structural(Violation),
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigViolation::NameRequired => write!(f, "a storage root name is required"),
            ConfigViolation::AbsolutePathRequired { path } => {
                write!(f, "absolute path required: '{path}'")
            }
            ConfigViolation::RelativePathRequired { path } => {
                write!(f, "relative path required: '{path}'")
            }
            ConfigViolation::MultipleMatchersSpecified => {
                write!(f, "a filter may specify only one of glob, extension or regex")
            }
            ConfigViolation::InvalidFilterGlob {
                glob,
                message,
                position,
            } => write!(f, "invalid glob '{glob}' at position {position}: {message}"),
            ConfigViolation::InvalidFilterExtension { extension, message } => {
                write!(f, "invalid extension '{extension}': {message}")
            }
            ConfigViolation::InvalidFilterRegex { regex, message } => {
                write!(f, "invalid regex '{regex}': {message}")
            }
            ConfigViolation::Structural(violation) => violation.fmt(f),
        }
    }
}

/// A [`ConfigViolation`] together with the element it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedViolation {
    /// Human-readable path to the element, e.g. `storage 'data' > location 'sub'`.
    pub element: String,
    /// The problem.
    pub violation: ConfigViolation,
}

impl fmt::Display for LocatedViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.element, self.violation)
    }
}

/// Where declarations under the current element go.
#[derive(Clone)]
enum Context {
    /// The element was declared; children attach to this root.
    Build(LocalRoot),
    /// The element failed; children are only validated.
    Validate(FileSystemCasing),
}

impl Context {
    fn casing(&self) -> FileSystemCasing {
        match self {
            Context::Build(root) => root.casing(),
            Context::Validate(casing) => *casing,
        }
    }
}

/// Reads storage declarations into a [`StorageHierarchiesBuilder`].
#[derive(Debug, Default)]
pub struct StorageConfigReader {
    violations: Vec<LocatedViolation>,
}

impl StorageConfigReader {
    /// Create a reader with no recorded violations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every violation recorded so far, in declaration order.
    pub fn violations(&self) -> &[LocatedViolation] {
        &self.violations
    }

    /// Take ownership of the recorded violations.
    pub fn into_violations(self) -> Vec<LocatedViolation> {
        self.violations
    }

    /// Read every storage root.
    pub fn read(
        &mut self,
        roots: &[StorageRootConfig],
        builder: &mut StorageHierarchiesBuilder,
    ) -> HierResult<()> {
        for root in roots {
            self.read_root(root, builder)?;
        }
        Ok(())
    }

    /// Read one storage root with its filters and locations.
    pub fn read_root(
        &mut self,
        config: &StorageRootConfig,
        builder: &mut StorageHierarchiesBuilder,
    ) -> HierResult<()> {
        let element = format!("storage '{}'", config.name);
        let context = self.create_named_root(&element, config, builder)?;
        if let Context::Build(_) = context {
            let reserved = FilterConfig {
                rule: FilterRule::Exclude,
                glob: Some(RESERVED_GLOB.to_string()),
                ..FilterConfig::default()
            };
            self.read_filter(&element, &reserved, &context, builder)?;
        }
        self.read_filters(&element, &config.filters, &context, builder)?;
        self.read_locations(&element, &config.locations, &context, builder)
    }

    fn create_named_root(
        &mut self,
        element: &str,
        config: &StorageRootConfig,
        builder: &mut StorageHierarchiesBuilder,
    ) -> HierResult<Context> {
        let before = self.violations.len();
        if config.name.trim().is_empty() {
            self.record(element, ConfigViolation::NameRequired);
        }
        self.verify_absolute(element, &config.path);
        if self.violations.len() > before {
            return Ok(Context::Validate(FileSystemCasing::Unspecified));
        }

        let root = builder.create_node(&config.path, config.casing.unwrap_or_default())?;
        if let Some(violation) = builder.add_named_root(&config.name, root.clone())? {
            self.record(element, ConfigViolation::Structural(violation));
            return Ok(Context::Validate(root.casing()));
        }
        Ok(Context::Build(root))
    }

    fn read_locations(
        &mut self,
        parent_element: &str,
        locations: &[LocationConfig],
        context: &Context,
        builder: &mut StorageHierarchiesBuilder,
    ) -> HierResult<()> {
        for location in locations {
            let element = format!("{parent_element} > location '{}'", location.path);
            let child_context = self.create_graft_point(&element, location, context, builder)?;
            self.read_filters(&element, &location.filters, &child_context, builder)?;
            self.read_locations(&element, &location.locations, &child_context, builder)?;
        }
        Ok(())
    }

    fn create_graft_point(
        &mut self,
        element: &str,
        location: &LocationConfig,
        context: &Context,
        builder: &mut StorageHierarchiesBuilder,
    ) -> HierResult<Context> {
        let before = self.violations.len();
        self.verify_relative(element, &location.path);
        self.verify_absolute(element, &location.graft);
        let parent = match context {
            Context::Build(parent) if self.violations.len() == before => parent,
            _ => return Ok(Context::Validate(FileSystemCasing::Unspecified)),
        };

        let child = builder.create_node(&location.graft, FileSystemCasing::Unspecified)?;
        if let Some(violation) = builder.add_graft_point(parent, &location.path, child.clone())? {
            self.record(element, ConfigViolation::Structural(violation));
            return Ok(Context::Validate(child.casing()));
        }
        Ok(Context::Build(child))
    }

    fn read_filters(
        &mut self,
        element: &str,
        filters: &[FilterConfig],
        context: &Context,
        builder: &mut StorageHierarchiesBuilder,
    ) -> HierResult<()> {
        for filter in filters {
            self.read_filter(element, filter, context, builder)?;
        }
        Ok(())
    }

    fn read_filter(
        &mut self,
        element: &str,
        filter: &FilterConfig,
        context: &Context,
        builder: &mut StorageHierarchiesBuilder,
    ) -> HierResult<()> {
        match compile_filter(filter, context.casing()) {
            Ok(matcher) => {
                if let Context::Build(owner) = context {
                    builder.add_filter(owner, matcher)?;
                }
            }
            Err(violation) => self.record(element, violation),
        }
        Ok(())
    }

    fn verify_absolute(&mut self, element: &str, path: &str) {
        if !Path::new(path).is_absolute() {
            self.record(
                element,
                ConfigViolation::AbsolutePathRequired {
                    path: path.to_string(),
                },
            );
        }
    }

    fn verify_relative(&mut self, element: &str, path: &str) {
        if path.trim().is_empty() || path.starts_with(is_separator) || Path::new(path).is_absolute() {
            self.record(
                element,
                ConfigViolation::RelativePathRequired {
                    path: path.to_string(),
                },
            );
        }
    }

    fn record(&mut self, element: &str, violation: ConfigViolation) {
        debug!(element = %element, violation = %violation, "storage configuration violation");
        self.violations.push(LocatedViolation {
            element: element.to_string(),
            violation,
        });
    }
}

fn compile_filter(
    filter: &FilterConfig,
    casing: FileSystemCasing,
) -> Result<RelativePathMatcher, ConfigViolation> {
    let specified = [&filter.glob, &filter.extension, &filter.regex]
        .iter()
        .filter(|m| m.is_some())
        .count();
    if specified > 1 {
        return Err(ConfigViolation::MultipleMatchersSpecified);
    }

    if let Some(glob) = &filter.glob {
        return RelativePathMatcher::glob(glob, filter.rule, casing).map_err(|err| match err {
            PatternError::Glob(err) => ConfigViolation::InvalidFilterGlob {
                glob: glob.clone(),
                message: err.message,
                position: err.position,
            },
            other => ConfigViolation::InvalidFilterGlob {
                glob: glob.clone(),
                message: other.to_string(),
                position: 0,
            },
        });
    }
    if let Some(extension) = &filter.extension {
        return RelativePathMatcher::extension(extension, filter.rule, casing).map_err(|err| {
            ConfigViolation::InvalidFilterExtension {
                extension: extension.clone(),
                message: err.to_string(),
            }
        });
    }
    if let Some(regex) = &filter.regex {
        return RelativePathMatcher::regex(regex, filter.rule, casing).map_err(|err| {
            ConfigViolation::InvalidFilterRegex {
                regex: regex.clone(),
                message: err.to_string(),
            }
        });
    }
    Ok(RelativePathMatcher::any(filter.rule))
}
