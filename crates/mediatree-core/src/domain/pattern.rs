//! User-supplied remote path patterns
//!
//! A [`PathPattern`] is the parsed form of strings such as `/Trips/*/Rome`,
//! `../2023` or `.`. Parsing only splits and classifies segments; how a
//! [`PatternSegment::Name`] is matched (exact, glob, regex) is decided by
//! the resolver.

use std::fmt::{self, Display, Formatter};

use super::newtypes::RemotePath;

/// One segment of a path pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    /// `.`
    Current,
    /// `..`
    Parent,
    /// Name that always matches exactly, used for the working directory prefix
    Literal(String),
    /// User-typed name, literal or wildcard depending on the match mode
    Name(String),
}

impl PatternSegment {
    /// Text of the segment as it would appear in a path
    pub fn text(&self) -> &str {
        match self {
            PatternSegment::Current => ".",
            PatternSegment::Parent => "..",
            PatternSegment::Literal(name) | PatternSegment::Name(name) => name,
        }
    }

    /// Returns true for `.` and `..`
    pub fn is_navigation(&self) -> bool {
        matches!(self, PatternSegment::Current | PatternSegment::Parent)
    }
}

impl Display for PatternSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Parsed remote path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    absolute: bool,
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Parse a pattern string
    ///
    /// A leading `/` makes the pattern absolute. Empty segments produced by
    /// repeated or trailing separators are dropped, so `""` and `"."` both
    /// designate the starting directory.
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "." => PatternSegment::Current,
                ".." => PatternSegment::Parent,
                name => PatternSegment::Name(name.to_string()),
            })
            .collect();
        Self {
            absolute: pattern.starts_with('/'),
            segments,
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Segments to walk from the tree root
    ///
    /// Relative patterns are prefixed with the names of `cwd` when one is
    /// given; `None` means the pattern is walked from the root as-is.
    ///
    /// # Arguments
    /// * `cwd` - Working directory applicable to this tree, if any
    pub fn anchored(&self, cwd: Option<&RemotePath>) -> Vec<PatternSegment> {
        let mut anchored = Vec::new();
        if let (false, Some(cwd)) = (self.absolute, cwd) {
            anchored.extend(
                cwd.segments()
                    .iter()
                    .map(|name| PatternSegment::Literal(name.clone())),
            );
        }
        anchored.extend(self.segments.iter().cloned());
        anchored
    }
}

impl Display for PathPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let joined = self
            .segments
            .iter()
            .map(PatternSegment::text)
            .collect::<Vec<_>>()
            .join("/");
        if self.absolute {
            write!(f, "/{joined}")
        } else {
            f.write_str(&joined)
        }
    }
}
