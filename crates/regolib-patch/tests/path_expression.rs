// crates/regolib-patch/tests/path_expression.rs
// ============================================================================
// Module: Path Expression Tests
// Description: Parsing, canonicalization, and parent derivation checks.
// Purpose: Ensure every path spelling normalizes to the same segments.
// ============================================================================

//! ## Overview
//! Covers dotted, bracketed, and mixed spellings, the bracket-precedence rule
//! for numeric tokens, pointer rendering, and invalid inputs.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use regolib_patch::MAX_PATH_SEGMENTS;
use regolib_patch::PathError;
use regolib_patch::PathExpression;
use regolib_patch::Segment;

/// Shorthand for a field segment.
fn field(name: &str) -> Segment {
    Segment::Field(name.to_string())
}

// ============================================================================
// SECTION: Spellings
// ============================================================================

#[test]
fn dotted_path_yields_fields() {
    let path = PathExpression::parse("a.b.c").unwrap();
    assert_eq!(path.segments(), &[field("a"), field("b"), field("c")]);
}

#[test]
fn bracketed_and_dotted_spellings_coincide() {
    let dotted = PathExpression::parse("a.b[0]").unwrap();
    let bracketed = PathExpression::parse("a[b][0]").unwrap();
    assert_eq!(dotted, bracketed);
    assert_eq!(dotted.segments(), &[field("a"), field("b"), Segment::Index(0)]);
}

#[test]
fn dotted_numeric_token_stays_a_field() {
    let path = PathExpression::parse("a.b.0").unwrap();
    assert_eq!(path.segments(), &[field("a"), field("b"), field("0")]);
    assert_ne!(path, PathExpression::parse("a.b[0]").unwrap());
}

#[test]
fn bracket_contents_keep_dots_and_slashes() {
    let path =
        PathExpression::parse("metadata.annotations[container.apparmor.io/nginx]").unwrap();
    assert_eq!(
        path.segments(),
        &[field("metadata"), field("annotations"), field("container.apparmor.io/nginx")]
    );
    assert_eq!(path.to_pointer(), "/metadata/annotations/container.apparmor.io~1nginx");
}

#[test]
fn consecutive_separators_collapse() {
    let path = PathExpression::parse("a..b[][1].c").unwrap();
    assert_eq!(path.segments(), &[field("a"), field("b"), Segment::Index(1), field("c")]);
}

#[test]
fn pointer_is_slash_joined() {
    let path = PathExpression::parse("spec.containers[0].securityContext").unwrap();
    assert_eq!(path.to_pointer(), "/spec/containers/0/securityContext");
}

#[test]
fn display_round_trips() {
    for raw in ["a.b[0].c", "a[x.y].z", "a.0"] {
        let path = PathExpression::parse(raw).unwrap();
        let rendered = path.to_string();
        assert_eq!(PathExpression::parse(&rendered).unwrap(), path, "round trip of {raw}");
    }
}

// ============================================================================
// SECTION: Invalid Inputs
// ============================================================================

#[test]
fn empty_path_is_rejected() {
    assert!(matches!(PathExpression::parse(""), Err(PathError::InvalidPath(_))));
}

#[test]
fn separator_only_path_is_rejected() {
    assert!(matches!(PathExpression::parse("..[]."), Err(PathError::InvalidPath(_))));
}

#[test]
fn segment_count_is_bounded() {
    let at_limit = vec!["a"; MAX_PATH_SEGMENTS].join(".");
    assert_eq!(PathExpression::parse(&at_limit).unwrap().segments().len(), MAX_PATH_SEGMENTS);
    let over_limit = format!("{at_limit}[0]");
    assert!(matches!(PathExpression::parse(&over_limit), Err(PathError::InvalidPath(_))));
    let segments = vec![field("a"); MAX_PATH_SEGMENTS + 1];
    assert!(matches!(PathExpression::from_segments(segments), Err(PathError::InvalidPath(_))));
}

#[test]
fn unbalanced_brackets_are_rejected() {
    assert!(PathExpression::parse("a[0").is_err());
    assert!(PathExpression::parse("a]0").is_err());
}

// ============================================================================
// SECTION: Parent Derivation
// ============================================================================

#[test]
fn parent_drops_last_segment() {
    let path = PathExpression::parse("a.b[2]").unwrap();
    let parent = path.parent().unwrap();
    assert_eq!(parent.segments(), &[field("a"), field("b")]);
}

#[test]
fn single_segment_has_no_parent() {
    let path = PathExpression::parse("a").unwrap();
    assert!(matches!(path.parent(), Err(PathError::InvalidPath(_))));
}
