// crates/regolib-patch/src/path.rs
// ============================================================================
// Module: Path Expressions
// Description: Parsing and canonical rendering of document path expressions.
// Purpose: Normalize dotted, bracketed, and mixed paths into typed segments.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Fix suggestions address document locations with loosely formatted paths
//! such as `spec.containers[0].securityContext` or
//! `metadata.annotations[kubernetes.io/name]`. This module parses those
//! spellings into a non-empty sequence of [`Segment`] values and renders the
//! canonical slash-delimited pointer consumed by the single-level patch
//! primitives.
//!
//! Invariants:
//! - A [`PathExpression`] holds between one and [`MAX_PATH_SEGMENTS`]
//!   segments.
//! - Bracket contents are always exactly one segment; digits inside brackets
//!   are indices, everything else is a field name.
//! - Dot-separated tokens outside brackets are always field names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of segments in a path expression.
pub const MAX_PATH_SEGMENTS: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing or manipulating path expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path is empty, malformed, or has no segments left.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

// ============================================================================
// SECTION: Segments
// ============================================================================

/// A single addressing step inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object field name.
    Field(String),
    /// Array index.
    Index(usize),
}

impl Segment {
    /// Returns the textual form of the segment as used in pointers.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Field(name) => Cow::Borrowed(name.as_str()),
            Self::Index(index) => Cow::Owned(index.to_string()),
        }
    }

    /// Returns true when the segment was written as a bracketed index.
    #[must_use]
    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

// ============================================================================
// SECTION: Path Expression
// ============================================================================

/// Parsed, non-empty path expression.
///
/// # Invariants
/// - `segments` is never empty and never exceeds [`MAX_PATH_SEGMENTS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpression {
    /// Ordered addressing steps from the document root.
    segments: Vec<Segment>,
}

impl PathExpression {
    /// Parses a dotted, bracketed, or mixed path string.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidPath`] when the input is empty, contains an
    /// unbalanced bracket, collapses to zero segments, or exceeds
    /// [`MAX_PATH_SEGMENTS`].
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::InvalidPath("path must not be empty".to_string()));
        }
        let mut segments = Vec::new();
        let mut token = String::new();
        let mut chars = raw.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '.' => flush_field(&mut token, &mut segments),
                '[' => {
                    flush_field(&mut token, &mut segments);
                    let mut inner = String::new();
                    let mut closed = false;
                    for next in chars.by_ref() {
                        if next == ']' {
                            closed = true;
                            break;
                        }
                        inner.push(next);
                    }
                    if !closed {
                        return Err(PathError::InvalidPath(format!(
                            "unterminated bracket in `{raw}`"
                        )));
                    }
                    if let Some(segment) = bracket_segment(&inner) {
                        segments.push(segment);
                    }
                }
                ']' => {
                    return Err(PathError::InvalidPath(format!("unbalanced bracket in `{raw}`")));
                }
                _ => token.push(ch),
            }
        }
        flush_field(&mut token, &mut segments);
        Self::from_segments(segments)
    }

    /// Builds a path expression from pre-parsed segments.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidPath`] when `segments` is empty or longer
    /// than [`MAX_PATH_SEGMENTS`].
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self, PathError> {
        if segments.is_empty() {
            return Err(PathError::InvalidPath("path has no segments".to_string()));
        }
        if segments.len() > MAX_PATH_SEGMENTS {
            return Err(PathError::InvalidPath(format!(
                "path has {} segments; limit is {MAX_PATH_SEGMENTS}",
                segments.len()
            )));
        }
        Ok(Self {
            segments,
        })
    }

    /// Returns the ordered segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the final segment.
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Splits the path into its final segment and the (possibly empty) parent.
    #[must_use]
    pub fn split_last(&self) -> Option<(&Segment, &[Segment])> {
        self.segments.split_last()
    }

    /// Returns the parent path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidPath`] when the path has a single segment,
    /// since the document root is not itself a path expression.
    pub fn parent(&self) -> Result<Self, PathError> {
        match self.segments.split_last() {
            Some((_, parent)) if !parent.is_empty() => Self::from_segments(parent.to_vec()),
            _ => Err(PathError::InvalidPath(format!("`{self}` has no parent path"))),
        }
    }

    /// Renders the canonical slash-delimited pointer (`/a/b/0`).
    #[must_use]
    pub fn to_pointer(&self) -> String {
        pointer_of(&self.segments)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Field(name) if is_plain_token(name) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                Segment::Field(name) => write!(f, "[{name}]")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for PathExpression {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

// ============================================================================
// SECTION: Pointer Rendering
// ============================================================================

/// Renders a pointer for an arbitrary segment slice; the empty slice is the root.
#[must_use]
pub fn pointer_of(segments: &[Segment]) -> String {
    let mut pointer = String::new();
    for segment in segments {
        pointer.push('/');
        pointer.push_str(&escape_token(&segment.as_text()));
    }
    pointer
}

/// Escapes a pointer token (`~` becomes `~0`, `/` becomes `~1`).
fn escape_token(token: &str) -> Cow<'_, str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

// ============================================================================
// SECTION: Parsing Helpers
// ============================================================================

/// Pushes the pending dotted token as a field segment, skipping empty tokens.
fn flush_field(token: &mut String, segments: &mut Vec<Segment>) {
    if !token.is_empty() {
        segments.push(Segment::Field(std::mem::take(token)));
    }
}

/// Interprets bracket contents as an index, a quoted field, or a bare field.
fn bracket_segment(inner: &str) -> Option<Segment> {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(unquoted) = strip_quotes(trimmed) {
        return Some(Segment::Field(unquoted.to_string()));
    }
    if trimmed.bytes().all(|byte| byte.is_ascii_digit())
        && let Ok(index) = trimmed.parse::<usize>()
    {
        return Some(Segment::Index(index));
    }
    Some(Segment::Field(trimmed.to_string()))
}

/// Strips one layer of matching single or double quotes.
fn strip_quotes(value: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        value.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote))
    })
}

/// Returns true when a field can be rendered in dotted form and re-parsed.
fn is_plain_token(name: &str) -> bool {
    !name.is_empty() && !name.contains(['.', '[', ']'])
}

// ============================================================================
// SECTION: Tests
// ============================================================================
