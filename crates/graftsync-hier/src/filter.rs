//! Ordered include/exclude filtering of relative paths.
//!
//! A [`RelativePathFilter`] is evaluated last-declared-first: the most recently
//! declared matcher that matches a path decides its fate. When nothing matches,
//! the [`RelativePathMatcher::Default`] matcher includes the path, and callers can
//! tell that apart from an explicit include for diagnostics.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::casing::FileSystemCasing;
use crate::glob::{create_regex, ExtensionCompiler, GlobCompiler, PatternError};
use crate::path::RelativePath;

/// Whether a matching path is replicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterRule {
    /// Replicate the path.
    #[default]
    Include,
    /// Never replicate the path.
    Exclude,
}

/// One filter entry.
#[derive(Debug, Clone)]
pub enum RelativePathMatcher {
    /// The implicit fallthrough: matches everything and includes it.
    Default,
    /// An explicit matcher with no pattern, matching every path.
    Any {
        /// Rule applied to every path.
        rule: FilterRule,
    },
    /// A compiled pattern.
    Pattern {
        /// Anchored regex over the `/`-separated relative path.
        regex: Regex,
        /// Rule applied to matching paths.
        rule: FilterRule,
        /// Human-readable origin of the pattern.
        description: String,
    },
}

static DEFAULT_MATCHER: RelativePathMatcher = RelativePathMatcher::Default;

impl RelativePathMatcher {
    /// Match every path with `rule`.
    pub fn any(rule: FilterRule) -> Self {
        RelativePathMatcher::Any { rule }
    }

    /// Match paths against a glob.
    pub fn glob(glob: &str, rule: FilterRule, casing: FileSystemCasing) -> Result<Self, PatternError> {
        let regex = GlobCompiler::new().compile(glob, casing)?;
        Ok(RelativePathMatcher::Pattern {
            regex,
            rule,
            description: format!("glob '{glob}'"),
        })
    }

    /// Match paths by file extension.
    pub fn extension(
        extension: &str,
        rule: FilterRule,
        casing: FileSystemCasing,
    ) -> Result<Self, PatternError> {
        let regex = ExtensionCompiler::new().compile(extension, casing)?;
        Ok(RelativePathMatcher::Pattern {
            regex,
            rule,
            description: format!("extension '{extension}'"),
        })
    }

    /// Match paths against a raw regex.
    pub fn regex(pattern: &str, rule: FilterRule, casing: FileSystemCasing) -> Result<Self, PatternError> {
        let regex = create_regex(pattern, casing)?;
        Ok(RelativePathMatcher::Pattern {
            regex,
            rule,
            description: format!("regex '{pattern}'"),
        })
    }

    /// True if the matcher applies to `path`.
    pub fn matches(&self, path: &RelativePath) -> bool {
        match self {
            RelativePathMatcher::Default | RelativePathMatcher::Any { .. } => true,
            RelativePathMatcher::Pattern { regex, .. } => regex.is_match(path.as_str()),
        }
    }

    /// The rule applied to matching paths.
    pub fn rule(&self) -> FilterRule {
        match self {
            RelativePathMatcher::Default => FilterRule::Include,
            RelativePathMatcher::Any { rule } | RelativePathMatcher::Pattern { rule, .. } => *rule,
        }
    }

    /// True for the implicit fallthrough matcher.
    pub fn is_default(&self) -> bool {
        matches!(self, RelativePathMatcher::Default)
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        match self {
            RelativePathMatcher::Default => "default",
            RelativePathMatcher::Any { .. } => "all paths",
            RelativePathMatcher::Pattern { description, .. } => description,
        }
    }
}

impl fmt::Display for RelativePathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = match self.rule() {
            FilterRule::Include => "include",
            FilterRule::Exclude => "exclude",
        };
        write!(f, "{} {}", rule, self.description())
    }
}

/// Matchers attached to one local root.
#[derive(Debug, Clone, Default)]
pub struct RelativePathFilter {
    // Newest first.
    matchers: Vec<RelativePathMatcher>,
}

impl RelativePathFilter {
    /// Build a filter from matchers in declaration order.
    pub fn new(matchers: impl IntoIterator<Item = RelativePathMatcher>) -> Self {
        let mut matchers: Vec<_> = matchers.into_iter().collect();
        matchers.reverse();
        Self { matchers }
    }

    /// Find the matcher deciding `path`: the last declared one that matches,
    /// or [`RelativePathMatcher::Default`].
    pub fn evaluate(&self, path: &RelativePath) -> &RelativePathMatcher {
        self.matchers
            .iter()
            .find(|m| m.matches(path))
            .unwrap_or(&DEFAULT_MATCHER)
    }

    /// Number of declared matchers.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// True if no matchers were declared.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
