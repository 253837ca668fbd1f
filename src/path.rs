//! Value paths and path filtering
//!
//! A [`ValuePath`] locates a node inside a values tree. It renders in the
//! dot/bracket notation users already know from Helm (`spec.containers[0].image`,
//! `podAnnotations["prometheus.io/scrape"]`) and parses back from it.
//!
//! [`PathFilter`] applies include/exclude globs to paths. Globs are written in
//! dot notation and matched against a slash-separated form of the path in
//! which every key and list index is one segment, so `*` stays inside a
//! single segment and `**` spans several.

use std::fmt;

use glob::{MatchOptions, Pattern};

use crate::error::{Error, Result};

/// One step in a path through a values tree
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// A named key for accessing map members
    Key(String),
    /// A numeric index for accessing list elements
    Index(usize),
}

/// A location inside a values tree.
///
/// The empty path is the root of the tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValuePath {
    segments: Vec<PathSegment>,
}

impl ValuePath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dot/bracket path expression.
    ///
    /// Supports:
    /// - Dot notation: `image.repository`
    /// - List indices: `containers[0].image`
    /// - Quoted keys: `annotations["a.b"]` or `annotations['a.b']`
    /// - Escaped dots: `annotations.a\.b`
    ///
    /// Unlike the lenient navigation used elsewhere, malformed expressions
    /// (empty segments, unterminated brackets or quotes) are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use irr::path::{PathSegment, ValuePath};
    ///
    /// let path = ValuePath::parse("spec.containers[0].image").unwrap();
    /// assert_eq!(path.segments().len(), 4);
    /// assert_eq!(path.segments()[2], PathSegment::Index(0));
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(path_error(text, "path is empty"));
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();
        let mut escaped = false;
        let mut after_bracket = false;

        while let Some(ch) = chars.next() {
            if escaped {
                current.push(ch);
                escaped = false;
                continue;
            }

            match ch {
                '\\' => {
                    escaped = true;
                }
                '.' => {
                    if current.is_empty() {
                        if !after_bracket {
                            return Err(path_error(text, "empty key segment"));
                        }
                    } else {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    }
                    after_bracket = false;
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    }

                    match chars.peek().copied() {
                        Some(quote @ ('"' | '\'')) => {
                            chars.next();
                            let mut key = String::new();
                            let mut bracket_escaped = false;
                            let mut closed = false;

                            while let Some(ch) = chars.next() {
                                if bracket_escaped {
                                    key.push(ch);
                                    bracket_escaped = false;
                                } else if ch == '\\' {
                                    bracket_escaped = true;
                                } else if ch == quote {
                                    if chars.peek() == Some(&']') {
                                        chars.next();
                                        closed = true;
                                        break;
                                    }
                                    key.push(ch);
                                } else {
                                    key.push(ch);
                                }
                            }

                            if !closed {
                                return Err(path_error(text, "unterminated quoted key"));
                            }
                            segments.push(PathSegment::Key(key));
                        }
                        _ => {
                            let mut content = String::new();
                            let mut closed = false;
                            for next_ch in chars.by_ref() {
                                if next_ch == ']' {
                                    closed = true;
                                    break;
                                }
                                content.push(next_ch);
                            }

                            if !closed {
                                return Err(path_error(text, "unterminated '['"));
                            }
                            let content = content.trim();
                            if let Ok(idx) = content.parse::<usize>() {
                                segments.push(PathSegment::Index(idx));
                            } else if content.is_empty() {
                                return Err(path_error(text, "empty brackets"));
                            } else {
                                segments.push(PathSegment::Key(content.to_string()));
                            }
                        }
                    }
                    after_bracket = true;
                }
                _ => {
                    after_bracket = false;
                    current.push(ch);
                }
            }
        }

        if escaped {
            return Err(path_error(text, "trailing escape character"));
        }
        if !current.is_empty() {
            segments.push(PathSegment::Key(current));
        } else if !after_bracket {
            return Err(path_error(text, "path ends with '.'"));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    /// A new path one key below this one.
    pub fn child_key(&self, key: &str) -> Self {
        let mut child = self.clone();
        child.push(PathSegment::Key(key.to_string()));
        child
    }

    /// The key of the last segment, if the path ends in a map key.
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Key(key)) => Some(key),
            _ => None,
        }
    }

    /// Iterate over every proper and improper prefix, shortest first, root excluded.
    pub fn prefixes(&self) -> impl Iterator<Item = ValuePath> + '_ {
        (1..=self.segments.len()).map(|len| ValuePath {
            segments: self.segments[..len].to_vec(),
        })
    }

    /// The slash-separated form used for glob matching.
    pub fn glob_form(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(key) => key.clone(),
                PathSegment::Index(idx) => idx.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if needs_quoting(key) => {
                    write!(f, "[\"{}\"]", key.replace('\\', "\\\\").replace('"', "\\\""))?;
                }
                PathSegment::Key(key) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

fn needs_quoting(key: &str) -> bool {
    key.is_empty() || key.contains(['.', '[', ']', '"', '\\'])
}

fn path_error(text: &str, reason: &str) -> Error {
    Error::Path {
        message: format!("invalid path '{}': {}", text, reason),
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compile a dot-notation glob into a [`glob::Pattern`] over slash-form paths.
///
/// `.` separates segments, `[N]` and `[*]` address list items, and any other
/// bracket expression is kept as a glob character class.
pub fn compile_glob(pattern: &str) -> Result<Pattern> {
    let translated = to_slash_glob(pattern);
    Pattern::new(&translated).map_err(|err| Error::DetectorConfig {
        message: format!("invalid glob '{}': {}", pattern, err),
    })
}

fn to_slash_glob(pattern: &str) -> String {
    let mut out = String::new();
    let mut chars = pattern.trim().chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '.' => out.push('/'),
            '[' => {
                let mut content = String::new();
                let mut closed = false;
                for next_ch in chars.by_ref() {
                    if next_ch == ']' {
                        closed = true;
                        break;
                    }
                    content.push(next_ch);
                }

                let is_index =
                    content == "*" || (!content.is_empty() && content.bytes().all(|b| b.is_ascii_digit()));
                if closed && is_index {
                    out.push('/');
                    out.push_str(&content);
                } else {
                    out.push('[');
                    out.push_str(&content);
                    if closed {
                        out.push(']');
                    }
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Match a path (in slash form) against a compiled glob.
pub fn glob_match(pattern: &Pattern, candidate: &str) -> bool {
    pattern.matches_with(candidate, MATCH_OPTIONS)
}

/// Include/exclude filter over value paths.
#[derive(Debug, Default, Clone)]
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PathFilter {
    /// Compile include and exclude globs. Any invalid glob fails the whole filter.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: include
                .iter()
                .map(|p| compile_glob(p))
                .collect::<Result<_>>()?,
            exclude: exclude
                .iter()
                .map(|p| compile_glob(p))
                .collect::<Result<_>>()?,
        })
    }

    /// True when the path, or the node's own key name, matches an exclude glob.
    pub fn is_excluded(&self, path: &ValuePath) -> bool {
        if self.exclude.is_empty() || path.is_root() {
            return false;
        }
        let full = path.glob_form();
        self.exclude.iter().any(|pattern| {
            glob_match(pattern, &full) || path.last_key().is_some_and(|key| glob_match(pattern, key))
        })
    }

    /// True when no include globs are configured, or the path or one of its
    /// ancestors matches one.
    pub fn is_included(&self, path: &ValuePath) -> bool {
        if self.include.is_empty() {
            return true;
        }
        path.prefixes().any(|prefix| {
            let form = prefix.glob_form();
            self.include.iter().any(|pattern| glob_match(pattern, &form))
        })
    }
}
