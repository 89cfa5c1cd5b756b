//! Glob and file-extension pattern compilers.
//!
//! Both produce anchored regexes over normalised relative paths, which always
//! use `/` as the separator. Matching is case-insensitive only for
//! [`FileSystemCasing::CasePreservingInsensitive`].

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::casing::FileSystemCasing;

/// A glob pattern could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GlobFormatError {
    /// Human-readable description.
    pub message: String,
    /// The pattern being compiled, after separator normalisation.
    pub pattern: String,
    /// Byte offset of the offending token in the pattern.
    pub position: usize,
}

/// A file extension could not be turned into a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExtensionFormatError {
    /// Human-readable description.
    pub message: String,
    /// The extension as given.
    pub extension: String,
}

/// Any failure to compile a filter pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    /// Malformed glob.
    #[error(transparent)]
    Glob(#[from] GlobFormatError),
    /// Malformed extension.
    #[error(transparent)]
    Extension(#[from] ExtensionFormatError),
    /// Malformed raw regex.
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),
}

/// Build a regex honouring the given casing rules.
pub fn create_regex(pattern: &str, casing: FileSystemCasing) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(casing.ignores_case())
        .build()
}

/// Compiles file extensions such as `.txt` into `^.*\.txt$`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionCompiler;

impl ExtensionCompiler {
    /// Create a compiler.
    pub fn new() -> Self {
        Self
    }

    /// Produce the regex source for an extension. At most one leading dot is
    /// stripped; the remainder is always a literal.
    pub fn compile_pattern(&self, extension: &str) -> Result<String, ExtensionFormatError> {
        let trimmed = extension.trim_start_matches('.');
        if extension.len() - trimmed.len() > 1 {
            return Err(ExtensionFormatError {
                message: "Multiple leading dots are not permitted.".to_string(),
                extension: extension.to_string(),
            });
        }
        Ok(format!(r"^.*\.{}$", regex::escape(trimmed)))
    }

    /// Compile an extension into a regex.
    pub fn compile(&self, extension: &str, casing: FileSystemCasing) -> Result<Regex, PatternError> {
        let pattern = self.compile_pattern(extension)?;
        Ok(create_regex(&pattern, casing)?)
    }
}

/// Compiles glob patterns into anchored regexes.
///
/// Supported syntax: `/**/` (zero or more directories), trailing `/**`
/// (optional subtree), leading `**/` (optional prefix), `*` (any run of
/// non-separator characters), `?` (one non-separator character), and `[abc]`,
/// `[!abc]`, `[a-c]`, `[!a-c]` character classes. Anything else is literal.
#[derive(Debug, Clone)]
pub struct GlobCompiler {
    extra_separators: Vec<char>,
}

impl Default for GlobCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobCompiler {
    /// A compiler treating the local platform's separators as `/`.
    pub fn new() -> Self {
        let mut separators = vec![std::path::MAIN_SEPARATOR];
        if cfg!(windows) {
            separators.push('/');
        }
        Self::with_separators(&separators)
    }

    /// A compiler treating each of `separators` as `/` when reading globs.
    pub fn with_separators(separators: &[char]) -> Self {
        let mut extra_separators: Vec<char> =
            separators.iter().copied().filter(|c| *c != '/').collect();
        extra_separators.dedup();
        Self { extra_separators }
    }

    /// Produce the regex source for a glob.
    pub fn compile_pattern(&self, glob: &str) -> Result<String, GlobFormatError> {
        let normalised: String = glob
            .chars()
            .map(|c| if self.extra_separators.contains(&c) { '/' } else { c })
            .collect();
        GlobTranslator::new(&normalised).translate()
    }

    /// Compile a glob into a regex.
    pub fn compile(&self, glob: &str, casing: FileSystemCasing) -> Result<Regex, PatternError> {
        let pattern = self.compile_pattern(glob)?;
        Ok(create_regex(&pattern, casing)?)
    }
}

const BEGIN_WILDCARD: &[char] = &['/', '*', '[', '?'];
const WILDCARD: &[char] = &['/', '*', '[', '?', ']'];

struct GlobTranslator<'a> {
    pattern: &'a str,
    position: usize,
    out: String,
}

impl<'a> GlobTranslator<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            position: 0,
            out: String::with_capacity(pattern.len() * 2 + 2),
        }
    }

    fn translate(mut self) -> Result<String, GlobFormatError> {
        self.out.push('^');
        loop {
            let literal = self.read_until_any(BEGIN_WILDCARD);
            self.out.push_str(&regex::escape(literal));
            if self.at_end() {
                break;
            }
            self.read_wildcard()?;
            if self.at_end() {
                break;
            }
        }
        self.out.push('$');
        Ok(self.out)
    }

    fn at_end(&self) -> bool {
        self.position >= self.pattern.len()
    }

    fn read_until_any(&mut self, terminators: &[char]) -> &'a str {
        let pattern = self.pattern;
        let rest = &pattern[self.position..];
        let len = rest.find(terminators).unwrap_or(rest.len());
        self.position += len;
        &rest[..len]
    }

    fn try_read(&mut self, token: &str) -> bool {
        if self.pattern[self.position..].starts_with(token) {
            self.position += token.len();
            return true;
        }
        false
    }

    fn read_wildcard(&mut self) -> Result<(), GlobFormatError> {
        let start = self.position;
        if self.try_read("/**/") {
            self.out.push_str("/(.+/)?");
        } else if self.try_read("/**") {
            self.out.push_str("(/.+)?");
        } else if self.try_read("/") {
            self.out.push('/');
        } else if self.try_read("**/") {
            self.out.push_str("(.+/)?");
        } else if self.try_read("*") {
            self.out.push_str("[^/]*");
        } else if self.try_read("?") {
            self.out.push_str("[^/]");
        } else if self.try_read("[") {
            self.read_class(start)?;
        } else {
            return Err(self.error(
                format!(
                    "Unable to parse wildcard expression at position {}: {}",
                    start,
                    self.snippet(start, 10)
                ),
                start,
            ));
        }
        Ok(())
    }

    fn read_class(&mut self, start: usize) -> Result<(), GlobFormatError> {
        let body = self.read_until_any(WILDCARD);
        if !self.try_read("]") {
            let message = if self.at_end() {
                format!(
                    "Range at position {} is not closed: {}",
                    start,
                    self.snippet(start, body.chars().count() + 1)
                )
            } else {
                format!(
                    "Range at position {} contains an invalid character: {}",
                    start,
                    self.snippet(self.position, 5)
                )
            };
            return Err(self.error(message, start));
        }
        let (negated, members) = match body.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        if members.is_empty() {
            return Err(self.error(
                format!("Range at position {} is empty: {}", start, self.snippet(start, 10)),
                start,
            ));
        }
        let class = match parse_class_members(members) {
            Some(class) => class,
            None => {
                return Err(self.error(
                    format!(
                        "Range at position {} is not valid: {}",
                        start,
                        self.snippet(start, body.chars().count() + 2)
                    ),
                    start,
                ))
            }
        };
        self.out.push('[');
        if negated {
            self.out.push('^');
        }
        self.out.push_str(&class);
        self.out.push(']');
        Ok(())
    }

    fn snippet(&self, start: usize, count: usize) -> String {
        let rest = &self.pattern[start..];
        let mut chars = rest.chars();
        let taken: String = chars.by_ref().take(count).collect();
        if chars.next().is_some() {
            format!("{taken}...")
        } else {
            taken
        }
    }

    fn error(&self, message: String, position: usize) -> GlobFormatError {
        GlobFormatError {
            message,
            pattern: self.pattern.to_string(),
            position,
        }
    }
}

/// Accepts either a single `x-y` range or a run of characters with no `-`.
/// A class may not itself begin with `!` once the negation has been removed.
fn parse_class_members(members: &str) -> Option<String> {
    if members.starts_with('!') {
        return None;
    }
    let chars: Vec<char> = members.chars().collect();
    if chars.len() == 3 && chars[1] == '-' && chars[0] != '-' && chars[2] != '-' {
        return Some(format!(
            "{}-{}",
            escape_class_char(chars[0]),
            escape_class_char(chars[2])
        ));
    }
    if chars.contains(&'-') {
        return None;
    }
    Some(chars.into_iter().map(escape_class_char).collect())
}

fn escape_class_char(c: char) -> String {
    let mut buf = [0u8; 4];
    regex::escape(c.encode_utf8(&mut buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Case {
        glob: &'static str,
        casing: FileSystemCasing,
        expected: &'static str,
        matches: &'static [&'static str],
        rejects: &'static [&'static str],
    }

    const SENSITIVE: FileSystemCasing = FileSystemCasing::CaseSensitive;
    const INSENSITIVE: FileSystemCasing = FileSystemCasing::CasePreservingInsensitive;

    const CASES: &[Case] = &[
        Case {
            glob: "filename",
            casing: SENSITIVE,
            expected: "^filename$",
            matches: &["filename"],
            rejects: &["filenames", "dir/filename", "Filename", "fIlEnAmE"],
        },
        Case {
            glob: "filename",
            casing: INSENSITIVE,
            expected: "^filename$",
            matches: &["filename", "Filename", "fIlEnAmE"],
            rejects: &["filenames", "dir/filename"],
        },
        Case {
            glob: "**/.graftsync/**",
            casing: SENSITIVE,
            expected: r"^(.+/)?\.graftsync(/.+)?$",
            matches: &[
                ".graftsync",
                "a/.graftsync",
                ".graftsync/a",
                "a/b/c/.graftsync",
                ".graftsync/d/e/f",
                "a/b/c/.graftsync/d/e/f",
            ],
            rejects: &[
                "a.graftsync",
                ".graftsynca",
                ".Graftsync",
                "a/b.graftsync",
                "a/.graftsynca",
                "a/.graftsynca/d/e",
            ],
        },
        Case {
            glob: "*/*.txt",
            casing: SENSITIVE,
            expected: r"^[^/]*/[^/]*\.txt$",
            matches: &["a/a.txt", "B/stuff.txt", "/stuff.txt", "a/.txt"],
            rejects: &["a/b/stuff.txt", "stuff.txt", "a/*.TXT"],
        },
        Case {
            glob: "*/subdir/*",
            casing: SENSITIVE,
            expected: r"^[^/]*/subdir/[^/]*$",
            matches: &["a/subdir/b.txt", "a/subdir/"],
            rejects: &["a/subdir", "a/b/subdir/d", "a/b/c"],
        },
        Case {
            glob: "subdir?/file.txt",
            casing: SENSITIVE,
            expected: r"^subdir[^/]/file\.txt$",
            matches: &["subdir1/file.txt", "subdir-/file.txt"],
            rejects: &["a/subdir", "subdir-1/file.txt", "subdir1/something.txt"],
        },
        Case {
            glob: "[abc].txt",
            casing: SENSITIVE,
            expected: r"^[abc]\.txt$",
            matches: &["a.txt", "b.txt", "c.txt"],
            rejects: &["a/b.txt", "stuff.txt", "a.TXT", ".txt", "A.txt", "abc.txt"],
        },
        Case {
            glob: "[abc].txt",
            casing: INSENSITIVE,
            expected: r"^[abc]\.txt$",
            matches: &["a.txt", "b.txt", "c.txt", "a.TXT", "A.txt"],
            rejects: &["a/b.txt", "stuff.txt", ".txt", "abc.txt"],
        },
        Case {
            glob: "[!abc].txt",
            casing: SENSITIVE,
            expected: r"^[^abc]\.txt$",
            matches: &["d.txt", "e.txt", "A.txt"],
            rejects: &["a.txt", "b.txt", "c.txt", "stuff.txt", ".txt", "abc.txt"],
        },
        Case {
            glob: "[!abc].txt",
            casing: INSENSITIVE,
            expected: r"^[^abc]\.txt$",
            matches: &["d.txt", "e.txt", "f.txt"],
            rejects: &["a.txt", "A.txt", "a.TXT", "stuff.txt"],
        },
        Case {
            glob: "[a-c].txt",
            casing: SENSITIVE,
            expected: r"^[a-c]\.txt$",
            matches: &["a.txt", "b.txt", "c.txt"],
            rejects: &["a/b.txt", "stuff.txt", "a.TXT", ".txt", "abc.txt", "-.txt"],
        },
        Case {
            glob: "[!a-c].txt",
            casing: SENSITIVE,
            expected: r"^[^a-c]\.txt$",
            matches: &["d.txt", "e.txt", "f.txt"],
            rejects: &["a.txt", "b.txt", "c.txt", "stuff.txt", ".txt"],
        },
    ];

    mod glob_compilation {
        use super::*;

        #[test]
        fn test_compiles_to_expected_regex() {
            let compiler = GlobCompiler::with_separators(&['/']);
            for case in CASES {
                let pattern = compiler.compile_pattern(case.glob).unwrap();
                assert_eq!(pattern, case.expected, "glob {}", case.glob);
            }
        }

        #[test]
        fn test_accepts_expected_paths() {
            let compiler = GlobCompiler::with_separators(&['/']);
            for case in CASES {
                let regex = compiler.compile(case.glob, case.casing).unwrap();
                for path in case.matches {
                    assert!(regex.is_match(path), "{} should match {}", case.glob, path);
                }
            }
        }

        #[test]
        fn test_rejects_expected_paths() {
            let compiler = GlobCompiler::with_separators(&['/']);
            for case in CASES {
                let regex = compiler.compile(case.glob, case.casing).unwrap();
                for path in case.rejects {
                    assert!(!regex.is_match(path), "{} should not match {}", case.glob, path);
                }
            }
        }

        #[test]
        fn test_normalises_extra_separators() {
            let compiler = GlobCompiler::with_separators(&['\\', '/']);
            let pattern = compiler.compile_pattern(r"**\logs\*.txt").unwrap();
            assert_eq!(pattern, r"^(.+/)?logs/[^/]*\.txt$");
        }

        #[test]
        fn test_literal_closing_bracket_is_escaped() {
            let compiler = GlobCompiler::with_separators(&['/']);
            assert_eq!(compiler.compile_pattern("a]b").unwrap(), r"^a\]b$");
        }
    }

    mod glob_errors {
        use super::*;

        const ERRORS: &[(&str, &str)] = &[
            ("test[a", "Range at position 4 is not closed: [a"),
            ("test[*", "Range at position 4 contains an invalid character: *"),
            ("test[]", "Range at position 4 is empty: []"),
            ("test[!]", "Range at position 4 is empty: [!]"),
            ("test[a-]", "Range at position 4 is not valid: [a-]"),
            ("test[-b]", "Range at position 4 is not valid: [-b]"),
            ("test[!-b]", "Range at position 4 is not valid: [!-b]"),
            ("test[ab-c]", "Range at position 4 is not valid: [ab-c]"),
        ];

        #[test]
        fn test_invalid_globs_report_message_and_position() {
            let compiler = GlobCompiler::new();
            for (glob, message) in ERRORS {
                let err = compiler.compile_pattern(glob).unwrap_err();
                assert_eq!(err.message, *message, "glob {glob}");
                assert_eq!(err.position, 4, "glob {glob}");
                assert_eq!(err.pattern, *glob);
            }
        }

        #[test]
        fn test_pattern_error_wraps_glob_error() {
            let err = GlobCompiler::new()
                .compile("test[a", SENSITIVE)
                .unwrap_err();
            assert!(matches!(err, PatternError::Glob(ref e) if e.position == 4));
            assert_eq!(err.to_string(), "Range at position 4 is not closed: [a");
        }

        #[test]
        fn test_long_snippets_are_truncated() {
            let err = GlobCompiler::new()
                .compile_pattern("x[]abcdefghijklmnop")
                .unwrap_err();
            assert_eq!(err.message, "Range at position 1 is empty: []abcdefgh...");
        }
    }

    mod extension_compilation {
        use super::*;

        #[test]
        fn test_strips_single_leading_dot() {
            let compiler = ExtensionCompiler::new();
            assert_eq!(compiler.compile_pattern(".txt").unwrap(), r"^.*\.txt$");
            assert_eq!(compiler.compile_pattern("txt").unwrap(), r"^.*\.txt$");
        }

        #[test]
        fn test_extension_is_literal() {
            let compiler = ExtensionCompiler::new();
            assert_eq!(compiler.compile_pattern("txt*").unwrap(), r"^.*\.txt\*$");
            let regex = compiler.compile("txt*", SENSITIVE).unwrap();
            assert!(regex.is_match("a/b/c.txt*"));
            assert!(!regex.is_match("a.txtsomething"));
        }

        #[test]
        fn test_casing_controls_matching() {
            let compiler = ExtensionCompiler::new();
            let sensitive = compiler.compile(".txt", SENSITIVE).unwrap();
            let insensitive = compiler.compile(".txt", INSENSITIVE).unwrap();
            assert!(sensitive.is_match("a/b/c.txt"));
            assert!(!sensitive.is_match("a.TXT"));
            assert!(insensitive.is_match("a.TXT"));
            assert!(!insensitive.is_match("a.log"));
        }

        #[test]
        fn test_rejects_multiple_leading_dots() {
            let err = ExtensionCompiler::new().compile_pattern("..txt").unwrap_err();
            assert_eq!(err.message, "Multiple leading dots are not permitted.");
            assert_eq!(err.extension, "..txt");
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_compilation_is_deterministic(glob in "[a-z*?/.]{0,24}") {
                let compiler = GlobCompiler::with_separators(&['/']);
                let first = compiler.compile_pattern(&glob);
                let second = compiler.compile_pattern(&glob);
                prop_assert_eq!(first, second);
            }

            #[test]
            fn prop_bracket_free_globs_always_compile(glob in "[a-zA-Z0-9*?/._-]{0,32}") {
                let compiler = GlobCompiler::with_separators(&['/']);
                let pattern = compiler.compile_pattern(&glob).unwrap();
                prop_assert!(create_regex(&pattern, SENSITIVE).is_ok());
            }

            #[test]
            fn prop_literal_globs_match_themselves(name in "[a-zA-Z0-9._-]{1,16}") {
                let regex = GlobCompiler::new().compile(&name, SENSITIVE).unwrap();
                prop_assert!(regex.is_match(&name));
            }
        }
    }
}
