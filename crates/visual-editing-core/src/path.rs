//! Content paths.
//!
//! A content path is a dot-delimited list of segments addressing a value
//! inside a document, e.g. `sections[_key=="a1"].items[_key=="b2"].title`.
//! Segments holding `[_key==` address an array member by key; the member's
//! concrete type is unknown until a projection query reports it.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Marker that identifies a keyed array segment.
pub const KEY_MARKER: &str = "[_key==";

/// An ordered list of path segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ContentPath {
    segments: Vec<SmolStr>,
}

impl ContentPath {
    /// Split a raw path string into segments.
    ///
    /// Dots inside `[...]` do not split, so keys containing dots survive.
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;
        let mut quote: Option<char> = None;

        for (idx, ch) in raw.char_indices() {
            match ch {
                '"' | '\'' if depth > 0 => match quote {
                    Some(open) if open == ch => quote = None,
                    None => quote = Some(ch),
                    Some(_) => {}
                },
                '[' if quote.is_none() => depth += 1,
                ']' if quote.is_none() => depth = depth.saturating_sub(1),
                '.' if depth == 0 => {
                    segments.push(SmolStr::new(&raw[start..idx]));
                    start = idx + 1;
                }
                _ => {}
            }
        }
        if !raw.is_empty() {
            segments.push(SmolStr::new(&raw[start..]));
        }
        Self { segments }
    }

    pub fn from_segments(segments: Vec<SmolStr>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[SmolStr] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn has_key_marker(&self) -> bool {
        self.segments.iter().any(|s| is_keyed_segment(s))
    }

    /// Drop trailing segments after the last keyed segment.
    ///
    /// A path without keyed segments becomes empty.
    pub fn pop_unkeyed_segments(&self) -> ContentPath {
        match self.segments.iter().rposition(|s| is_keyed_segment(s)) {
            Some(last) => Self {
                segments: self.segments[..=last].to_vec(),
            },
            None => Self::default(),
        }
    }

    /// True if `self` is a proper prefix of `other`.
    pub fn is_proper_prefix_of(&self, other: &ContentPath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// The prefix of length `len`, joined back into a raw string.
    pub fn prefix(&self, len: usize) -> String {
        join(&self.segments[..len.min(self.segments.len())])
    }

    /// Path string as used in studio intent URLs.
    ///
    /// Keyed and numeric index segments keep their bracket form; a double
    /// quoted key is normalised, and leading dots on bracket segments are
    /// dropped so `a.[0]` reads `a[0]`.
    pub fn to_studio_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            if !out.is_empty() && !segment.starts_with('[') {
                out.push('.');
            }
            out.push_str(&segment.replace('\'', "\""));
        }
        out
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.segments))
    }
}

impl From<&str> for ContentPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for ContentPath {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ContentPath> for String {
    fn from(path: ContentPath) -> Self {
        path.to_string()
    }
}

pub fn is_keyed_segment(segment: &str) -> bool {
    segment.contains(KEY_MARKER)
}

/// The field name part of a segment, `items` for `items[_key=="x"]`.
pub fn segment_name(segment: &str) -> &str {
    match segment.find('[') {
        Some(idx) => &segment[..idx],
        None => segment,
    }
}

fn join(segments: &[SmolStr]) -> String {
    let mut out = String::new();
    for (idx, segment) in segments.iter().enumerate() {
        if idx > 0 {
            out.push('.');
        }
        out.push_str(segment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_join() {
        let path = ContentPath::parse(r#"sections[_key=="a"].items[_key=="b"].title"#);
        assert_eq!(path.len(), 3);
        assert_eq!(path.segments()[0], r#"sections[_key=="a"]"#);
        assert_eq!(
            path.to_string(),
            r#"sections[_key=="a"].items[_key=="b"].title"#
        );
    }

    #[test]
    fn test_dots_inside_keys_do_not_split() {
        let path = ContentPath::parse(r#"items[_key=="v1.2"].title"#);
        assert_eq!(path.len(), 2);
        assert_eq!(path.segments()[0], r#"items[_key=="v1.2"]"#);
    }

    #[test]
    fn test_empty_path() {
        let path = ContentPath::parse("");
        assert!(path.is_empty());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn test_pop_unkeyed_segments() {
        let path = ContentPath::parse(r#"a[_key=="x"].b.c"#);
        assert_eq!(path.pop_unkeyed_segments().to_string(), r#"a[_key=="x"]"#);

        let path = ContentPath::parse(r#"a[_key=="x"].b[_key=="y"].c"#);
        assert_eq!(
            path.pop_unkeyed_segments().to_string(),
            r#"a[_key=="x"].b[_key=="y"]"#
        );

        assert!(ContentPath::parse("a.b.c").pop_unkeyed_segments().is_empty());
    }

    #[test]
    fn test_has_key_marker() {
        assert!(ContentPath::parse(r#"a[_key=="x"]"#).has_key_marker());
        assert!(!ContentPath::parse("a[0].b").has_key_marker());
    }

    #[test]
    fn test_proper_prefix() {
        let short = ContentPath::parse("sections[_key=='a']");
        let long = ContentPath::parse("sections[_key=='a'].items[_key=='b']");
        assert!(short.is_proper_prefix_of(&long));
        assert!(!long.is_proper_prefix_of(&short));
        assert!(!short.is_proper_prefix_of(&short));
        assert!(ContentPath::default().is_proper_prefix_of(&short));
    }

    #[test]
    fn test_studio_path() {
        assert_eq!(
            ContentPath::parse(r#"a[_key=="x"].b"#).to_studio_path(),
            r#"a[_key=="x"].b"#
        );
        assert_eq!(ContentPath::parse("a[0]").to_studio_path(), "a[0]");
        assert_eq!(
            ContentPath::parse("a[_key=='x'].b").to_studio_path(),
            r#"a[_key=="x"].b"#
        );
    }

    #[test]
    fn test_segment_name() {
        assert_eq!(segment_name(r#"items[_key=="x"]"#), "items");
        assert_eq!(segment_name("title"), "title");
    }
}
