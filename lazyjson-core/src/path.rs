//! The path language: parsing, composing, splitting, and rendering structured
//! paths over a JSON document.
//!
//! A path is an ordered sequence of [`Segment`]s. Three surface spellings
//! exist for a member segment (`.name`, `{name}`) and one for an index
//! segment (`[n]`); [`Path::render`] always picks a canonical spelling so
//! that `Path::parse(&path.render()) == path`.

use std::fmt;

use crate::error::{NotAPrefixCtx, PathError, PathSyntaxCtx};

/// Characters that cannot appear unescaped in a dot-form member name.
const RESERVED: [char; 5] = ['.', '[', ']', '{', '}'];

/// A single step in a [`Path`]: either an object member by name or an array
/// element by index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Member(String),
    Index(usize),
}

impl Segment {
    #[must_use]
    pub fn as_member(&self) -> Option<&str> {
        match self {
            Segment::Member(name) => Some(name),
            Segment::Index(_) => None,
        }
    }

    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Member(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Member(name) => write_member(f, name),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

fn is_dot_safe(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    if !(first.is_ascii_alphanumeric() || matches!(first, '-' | '_' | '@' | '$')) {
        return false;
    }
    !name.chars().any(|c| RESERVED.contains(&c))
}

fn write_member(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if name.is_empty() {
        return f.write_str(".");
    }
    if is_dot_safe(name) {
        write!(f, ".{name}")
    } else {
        write!(f, "{{{name}}}")
    }
}

/// An ordered sequence of [`Segment`]s addressing a single node relative to a
/// document root. The empty path addresses the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(Vec<Segment>);

impl Path {
    /// The root path (no segments).
    #[must_use]
    pub fn root() -> Self {
        Path(Vec::new())
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Path(segments)
    }

    /// Parses `input` into a [`Path`], per the dot/bracket/curly grammar in
    /// the path language.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        let chars: Vec<char> = input.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '.' => {
                    i += 1;
                    let start = i;
                    while i < chars.len() && !RESERVED.contains(&chars[i]) {
                        i += 1;
                    }
                    let name: String = chars[start..i].iter().collect();
                    segments.push(Segment::Member(name));
                }
                '[' => {
                    i += 1;
                    let start = i;
                    while i < chars.len() && chars[i] != ']' {
                        i += 1;
                    }
                    if i >= chars.len() {
                        return PathSyntaxCtx {
                            message: format!(
                                "unterminated index segment starting at character {start}"
                            ),
                        }
                        .fail();
                    }
                    let digits: String = chars[start..i].iter().collect();
                    let index: usize = digits.parse().map_err(|_| {
                        PathSyntaxCtx {
                            message: format!("invalid array index `{digits}`"),
                        }
                        .build()
                    })?;
                    segments.push(Segment::Index(index));
                    i += 1; // consume ']'
                }
                '{' => {
                    i += 1;
                    let start = i;
                    let mut end = None;
                    while i < chars.len() {
                        if chars[i] == '}' {
                            let next = chars.get(i + 1);
                            if next.is_none() || matches!(next, Some('.' | '[' | '{')) {
                                end = Some(i);
                                break;
                            }
                        }
                        i += 1;
                    }
                    let Some(end) = end else {
                        return PathSyntaxCtx {
                            message: format!(
                                "unterminated curly segment starting at character {start}"
                            ),
                        }
                        .fail();
                    };
                    let name: String = chars[start..end].iter().collect();
                    segments.push(Segment::Member(name));
                    i = end + 1;
                }
                other => {
                    return PathSyntaxCtx {
                        message: format!(
                            "unexpected character `{other}` at position {i}, expected `.`, `[`, or `{{`"
                        ),
                    }
                    .fail();
                }
            }
        }
        Ok(Path(segments))
    }

    /// Renders the canonical spelling of this path.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// The path with its final segment removed. Fails for the root path.
    pub fn parent(&self) -> Result<Path, PathError> {
        if self.0.is_empty() {
            return crate::error::RootHasNoParentCtx.fail();
        }
        let mut segments = self.0.clone();
        segments.pop();
        Ok(Path(segments))
    }

    /// The first segment, or `None` for the root path.
    #[must_use]
    pub fn head(&self) -> Option<&Segment> {
        self.0.first()
    }

    /// The path with its first segment removed. Fails for the root path.
    pub fn tail(&self) -> Result<Path, PathError> {
        if self.0.is_empty() {
            return crate::error::RootHasNoParentCtx.fail();
        }
        Ok(Path(self.0[1..].to_vec()))
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn extend(&self, segment: Segment) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment);
        Path(segments)
    }

    /// Returns a new path with `other`'s segments appended.
    #[must_use]
    pub fn extend_path(&self, other: &Path) -> Path {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Path(segments)
    }

    /// Removes `prefix` from the start of this path, returning the
    /// remainder, or `NotAPrefix` if `prefix` does not match.
    pub fn shorten_by(&self, prefix: &Path) -> Result<Path, PathError> {
        if self.0.len() < prefix.0.len() || &self.0[..prefix.0.len()] != prefix.0.as_slice() {
            return NotAPrefixCtx {
                path: self.clone(),
                prefix: prefix.clone(),
            }
            .fail();
        }
        Ok(Path(self.0[prefix.0.len()..].to_vec()))
    }

    /// If this path starts with an [`Segment::Index`], returns it.
    #[must_use]
    pub fn array_index_at_start(&self) -> Option<usize> {
        self.head().and_then(Segment::as_index)
    }

    /// If this path starts with a [`Segment::Member`], returns its name.
    #[must_use]
    pub fn object_member_at_start(&self) -> Option<&str> {
        self.head().and_then(Segment::as_member)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            segment.fmt(f)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

/// Renders a path rooted at `$`, the form used in diff and schema error
/// messages (§4.8, §4.10).
#[must_use]
pub fn render_rooted(path: &Path) -> String {
    let mut out = String::from("$");
    out.push_str(&path.render());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_empty() {
        assert!(Path::parse("").unwrap().is_root());
    }

    #[test]
    fn dot_and_index_segments() {
        let path = Path::parse(".a.b[1]").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Member("a".into()),
                Segment::Member("b".into()),
                Segment::Index(1),
            ]
        );
    }

    #[test]
    fn curly_escape_with_dot() {
        let path = Path::parse("{some.thing}").unwrap();
        assert_eq!(path.segments(), &[Segment::Member("some.thing".into())]);
    }

    #[test]
    fn curly_closing_only_at_segment_boundary() {
        let path = Path::parse("{a}b}.c").unwrap();
        assert_eq!(path.segments(), &[Segment::Member("a}b".into())]);
    }

    #[test]
    fn empty_member_name_via_single_dot() {
        let path = Path::parse(".").unwrap();
        assert_eq!(path.segments(), &[Segment::Member(String::new())]);
        assert_eq!(path.render(), ".");
    }

    #[test]
    fn round_trip_through_render() {
        for raw in [".a.b[1]", "{some.thing}", ".", "", ".a[0]{b.c}[9]"] {
            let parsed = Path::parse(raw).unwrap();
            let rendered = parsed.render();
            let reparsed = Path::parse(&rendered).unwrap();
            assert_eq!(parsed, reparsed, "round trip failed for {raw:?}");
        }
    }

    #[test]
    fn parent_and_extend_invert() {
        let path = Path::parse(".a.b").unwrap();
        let seg = path.segments().last().unwrap().clone();
        let parent = path.parent().unwrap();
        assert_eq!(parent.extend(seg), path);
    }

    #[test]
    fn parent_of_root_fails() {
        assert!(Path::root().parent().is_err());
    }

    #[test]
    fn shorten_by_prefix() {
        let path = Path::parse(".a.b[2]").unwrap();
        let prefix = Path::parse(".a").unwrap();
        let rest = path.shorten_by(&prefix).unwrap();
        assert_eq!(rest, Path::parse(".b[2]").unwrap());
    }

    #[test]
    fn shorten_by_non_prefix_fails() {
        let path = Path::parse(".a.b").unwrap();
        let prefix = Path::parse(".x").unwrap();
        assert!(path.shorten_by(&prefix).is_err());
    }
}
