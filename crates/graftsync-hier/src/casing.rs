//! Filesystem casing rules and casing-aware string comparison.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{HierError, HierResult};

/// How a filesystem treats the case of path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileSystemCasing {
    /// Not yet known. Only valid before a concrete root's rules have been determined.
    #[default]
    Unspecified,
    /// Names differing only by case are distinct.
    CaseSensitive,
    /// Case is preserved but ignored when comparing names.
    CasePreservingInsensitive,
}

impl FileSystemCasing {
    /// Compare two path strings under these rules.
    pub fn paths_equal(self, a: &str, b: &str) -> HierResult<bool> {
        match self {
            FileSystemCasing::Unspecified => Err(HierError::UnspecifiedCasing),
            FileSystemCasing::CaseSensitive => Ok(a == b),
            FileSystemCasing::CasePreservingInsensitive => Ok(eq_ignore_case(a, b)),
        }
    }

    /// Feed a path string into `state` consistently with [`Self::paths_equal`].
    pub fn hash_path<H: Hasher>(self, path: &str, state: &mut H) -> HierResult<()> {
        match self {
            FileSystemCasing::Unspecified => Err(HierError::UnspecifiedCasing),
            FileSystemCasing::CaseSensitive => {
                path.hash(state);
                Ok(())
            }
            FileSystemCasing::CasePreservingInsensitive => {
                for c in path.chars().flat_map(char::to_lowercase) {
                    c.hash(state);
                }
                Ok(())
            }
        }
    }

    /// True if regexes compiled for this casing should ignore case.
    pub fn ignores_case(self) -> bool {
        self == FileSystemCasing::CasePreservingInsensitive
    }
}

/// Full-Unicode case-insensitive comparison.
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Case-insensitive prefix test, respecting char boundaries.
pub(crate) fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    let mut hay = haystack.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| hay.next() == Some(p))
}
