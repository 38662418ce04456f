use anyhow::Result;
use regex::Regex;

/// Structured result of parsing a versioned request URI.
///
/// `prefix` is everything up to and including the version marker, `version`
/// the dotted three-component version, `remainder` everything after it
/// (path plus any query string). Borrowed from the input; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath<'a> {
    pub prefix: &'a str,
    pub version: &'a str,
    pub remainder: &'a str,
}

/// Remainder split into a filesystem-checkable path and its query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRemainder<'a> {
    pub path: &'a str,
    /// Includes the leading `?`, or empty when the remainder has none.
    pub query: &'a str,
}

/// Parser for versioned request paths.
///
/// Compiled once at startup from the configured version marker. The pattern
/// is anchored to the full string so partial matches inside a longer URI
/// never count.
#[derive(Debug, Clone)]
pub struct PathParser {
    pattern: Regex,
}

impl PathParser {
    pub fn new(version_marker: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(
            r"^(.*{})(\d+\.\d+\.\d+)(/.*)$",
            regex::escape(version_marker)
        ))?;
        Ok(Self { pattern })
    }

    /// Extract prefix, version and remainder from a sanitized request URI.
    ///
    /// `None` means the URI does not fit the versioned-path shape. That is
    /// the common case for ordinary traffic, not an error.
    pub fn parse<'a>(&self, uri: &'a str) -> Option<ParsedPath<'a>> {
        let captures = self.pattern.captures(uri)?;
        Some(ParsedPath {
            prefix: captures.get(1)?.as_str(),
            version: captures.get(2)?.as_str(),
            remainder: captures.get(3)?.as_str(),
        })
    }
}

/// Split a remainder into path and query at the first `?`.
///
/// The query keeps its leading `?` so it can be reattached verbatim. A
/// remainder whose pre-`?` part does not start with `/` cannot be validated
/// against the filesystem, so the split falls back to treating the whole
/// remainder as the path with an empty query.
pub fn split_remainder(remainder: &str) -> SplitRemainder<'_> {
    if let Some(idx) = remainder.find('?') {
        let (path, query) = remainder.split_at(idx);
        if path.starts_with('/') {
            return SplitRemainder { path, query };
        }
    }
    SplitRemainder {
        path: remainder,
        query: "",
    }
}
