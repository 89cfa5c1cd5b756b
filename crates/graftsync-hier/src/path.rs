//! Normalised relative paths.

use std::fmt;

use crate::casing::FileSystemCasing;
use crate::error::{HierError, HierResult};

const SEPARATOR: char = '/';

/// A normalised, correctly-cased path relative to some root, using `/` as the
/// separator.
///
/// A path ending with a separator is a *container*. Only containers may be
/// followed by further paths when combining. The derived equality is ordinal;
/// use [`RelativePath::equals`] to compare under a root's casing rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath {
    path: String,
}

impl RelativePath {
    /// Build a path from non-empty segments, none containing a separator.
    pub fn from_segments<I, S>(segments: I) -> HierResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = String::new();
        let mut count = 0usize;
        for segment in segments {
            let segment = segment.as_ref();
            if segment.is_empty() || segment.contains(SEPARATOR) {
                return Err(HierError::InvalidSegment {
                    segment: segment.to_string(),
                });
            }
            if count > 0 {
                path.push(SEPARATOR);
            }
            path.push_str(segment);
            count += 1;
        }
        if count == 0 {
            return Err(HierError::EmptyPath);
        }
        Ok(Self { path })
    }

    /// Concatenate paths. Every path but the last must be a container.
    pub fn combine<'a, I>(paths: I) -> HierResult<Self>
    where
        I: IntoIterator<Item = &'a RelativePath>,
    {
        let mut iter = paths.into_iter();
        let first = iter.next().ok_or(HierError::EmptyPath)?;
        let mut path = first.path.clone();
        let mut last_was_container = first.is_container();
        for next in iter {
            if !last_was_container {
                return Err(HierError::NonContainerPrefix { path });
            }
            last_was_container = next.is_container();
            path.push_str(&next.path);
        }
        Ok(Self { path })
    }

    /// Returns the path text.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// True if the path ends with a separator.
    pub fn is_container(&self) -> bool {
        self.path.ends_with(SEPARATOR)
    }

    /// Returns this path as a container, appending a separator if needed.
    pub fn as_container(&self) -> Self {
        if self.is_container() {
            return self.clone();
        }
        Self {
            path: format!("{}{}", self.path, SEPARATOR),
        }
    }

    /// Iterate the non-empty segments of the path.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Compare under the given casing rules.
    pub fn equals(&self, other: &RelativePath, casing: FileSystemCasing) -> HierResult<bool> {
        casing.paths_equal(&self.path, &other.path)
    }

    /// True if this is a container and `other` lies strictly beneath it.
    pub fn contains(&self, other: &RelativePath, casing: FileSystemCasing) -> HierResult<bool> {
        if !self.is_container() {
            return Ok(false);
        }
        if other.path.len() <= self.path.len() || !other.path.is_char_boundary(self.path.len()) {
            return Ok(false);
        }
        casing.paths_equal(&other.path[..self.path.len()], &self.path)
    }

    /// Strip the container `prefix` from the front of this path.
    pub fn remove_prefix(&self, prefix: &RelativePath, casing: FileSystemCasing) -> HierResult<Self> {
        if !prefix.is_container() {
            return Err(HierError::NonContainerPrefix {
                path: prefix.path.clone(),
            });
        }
        if !prefix.contains(self, casing)? {
            return Err(HierError::NotAPrefix {
                prefix: prefix.path.clone(),
                path: self.path.clone(),
            });
        }
        Ok(Self {
            path: self.path[prefix.path.len()..].to_string(),
        })
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rp(segments: &[&str]) -> RelativePath {
        RelativePath::from_segments(segments).unwrap()
    }

    mod construction {
        use super::*;

        #[test]
        fn test_from_segments_joins_with_separator() {
            assert_eq!(rp(&["a", "b", "c.txt"]).as_str(), "a/b/c.txt");
        }

        #[test]
        fn test_rejects_separator_in_segment() {
            let result = RelativePath::from_segments(["a/b"]);
            assert!(matches!(result, Err(HierError::InvalidSegment { .. })));
        }

        #[test]
        fn test_rejects_empty_segment_list() {
            let result = RelativePath::from_segments(Vec::<String>::new());
            assert!(matches!(result, Err(HierError::EmptyPath)));
        }

        #[test]
        fn test_as_container_is_idempotent() {
            let container = rp(&["a"]).as_container();
            assert_eq!(container.as_str(), "a/");
            assert_eq!(container.as_container(), container);
            assert!(container.is_container());
        }
    }

    mod combination {
        use super::*;

        #[test]
        fn test_combine_containers_then_file() {
            let combined =
                RelativePath::combine([&rp(&["a"]).as_container(), &rp(&["b"]).as_container(), &rp(&["c"])])
                    .unwrap();
            assert_eq!(combined.as_str(), "a/b/c");
        }

        #[test]
        fn test_combine_rejects_non_container_prefix() {
            let result = RelativePath::combine([&rp(&["a"]), &rp(&["b"])]);
            assert!(matches!(result, Err(HierError::NonContainerPrefix { .. })));
        }
    }

    mod containment {
        use super::*;

        #[test]
        fn test_contains_is_strict() {
            let sub = rp(&["sub"]).as_container();
            let casing = FileSystemCasing::CaseSensitive;
            assert!(sub.contains(&rp(&["sub", "x"]), casing).unwrap());
            assert!(!sub.contains(&sub, casing).unwrap());
            assert!(!sub.contains(&rp(&["other", "x"]), casing).unwrap());
        }

        #[test]
        fn test_contains_respects_casing() {
            let sub = rp(&["Sub"]).as_container();
            let path = rp(&["sub", "x"]);
            assert!(!sub.contains(&path, FileSystemCasing::CaseSensitive).unwrap());
            assert!(sub
                .contains(&path, FileSystemCasing::CasePreservingInsensitive)
                .unwrap());
        }

        #[test]
        fn test_non_container_contains_nothing() {
            let casing = FileSystemCasing::CaseSensitive;
            assert!(!rp(&["sub"]).contains(&rp(&["sub", "x"]), casing).unwrap());
        }

        #[test]
        fn test_remove_prefix() {
            let casing = FileSystemCasing::CasePreservingInsensitive;
            let stripped = rp(&["Sub", "x", "y"])
                .remove_prefix(&rp(&["sub"]).as_container(), casing)
                .unwrap();
            assert_eq!(stripped.as_str(), "x/y");
        }

        #[test]
        fn test_remove_prefix_rejects_unrelated_path() {
            let casing = FileSystemCasing::CaseSensitive;
            let result = rp(&["a", "b"]).remove_prefix(&rp(&["c"]).as_container(), casing);
            assert!(matches!(result, Err(HierError::NotAPrefix { .. })));
        }
    }
}
