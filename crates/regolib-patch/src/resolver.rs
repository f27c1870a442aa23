// crates/regolib-patch/src/resolver.rs
// ============================================================================
// Module: Patch Resolver
// Description: Structural insert/replace of values at possibly-missing paths.
// Purpose: Turn (path, value) fix suggestions into a patched document copy.
// Dependencies: crate::{path, query}, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`PatchResolver::apply`] places a value at a path, synthesizing every
//! missing intermediate object or array. Resolution walks toward the root:
//! when an address is absent, the value is wrapped in the container implied
//! by the final segment and the wrapper is placed at the parent instead,
//! until an existing ancestor is found.
//!
//! Invariants:
//! - The caller's document is never mutated; a new root is returned.
//! - A full path matching exactly one value is replaced in place.
//! - A full path matching several values is rejected as ambiguous.
//! - An existing array parent is extended by append when the final segment
//!   is an index or a numeric field; any other field on an array is rejected.
//! - An existing object parent gains a field; a `null` parent is treated as
//!   absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::path::PathError;
use crate::path::PathExpression;
use crate::path::Segment;
use crate::path::pointer_of;
use crate::query::ExistenceQuery;
use crate::query::JsonPathQuery;
use crate::query::QueryError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure classes for a single patch application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchErrorKind {
    /// The path expression is empty or malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// A single-level add/replace was rejected by the target container.
    #[error("patch rejected: {0}")]
    PatchFailed(String),
    /// The path resolved to more than one value.
    #[error("path matches {matches} values; multi-valued targets are unsupported")]
    AmbiguousPath {
        /// Number of values matched.
        matches: usize,
    },
    /// The existence query failed.
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl From<PathError> for PatchErrorKind {
    fn from(err: PathError) -> Self {
        match err {
            PathError::InvalidPath(message) => Self::InvalidPath(message),
        }
    }
}

/// Patch failure carrying the inputs for diagnostics.
///
/// Callers applying several fix suggestions are expected to log this error
/// and continue with the next suggestion.
#[derive(Debug, Clone, Error)]
#[error("failed to patch `{path}`: {kind}")]
pub struct PatchError {
    /// Failure class.
    pub kind: PatchErrorKind,
    /// Document the patch was applied to.
    pub document: Value,
    /// Raw path expression as supplied.
    pub path: String,
    /// Value that was to be placed.
    pub value: Value,
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Structural patch resolver parameterized by its existence query.
#[derive(Debug, Clone, Default)]
pub struct PatchResolver<Q = JsonPathQuery> {
    /// Query used to test whether an address already exists.
    query: Q,
}

impl PatchResolver<JsonPathQuery> {
    /// Creates a resolver backed by the `JSONPath` existence query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            query: JsonPathQuery,
        }
    }
}

impl<Q: ExistenceQuery> PatchResolver<Q> {
    /// Creates a resolver with a custom existence query.
    #[must_use]
    pub const fn with_query(query: Q) -> Self {
        Self {
            query,
        }
    }

    /// Returns the existence query backing this resolver.
    #[must_use]
    pub const fn query(&self) -> &Q {
        &self.query
    }

    /// Returns a copy of `document` with `value` present at `raw_path`.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError`] when the path is invalid or ambiguous, the
    /// query fails, or the target container rejects the operation.
    pub fn apply(
        &self,
        document: &Value,
        raw_path: &str,
        value: Value,
    ) -> Result<Value, PatchError> {
        let outcome = PathExpression::parse(raw_path)
            .map_err(PatchErrorKind::from)
            .and_then(|path| self.resolve(document, path.segments(), value.clone()));
        outcome.map_err(|kind| PatchError {
            kind,
            document: document.clone(),
            path: raw_path.to_string(),
            value,
        })
    }

    /// Places `value` at `segments`, walking toward the root while absent.
    ///
    /// Each level's parent query becomes the next level's own match set.
    fn resolve(
        &self,
        document: &Value,
        segments: &[Segment],
        value: Value,
    ) -> Result<Value, PatchErrorKind> {
        let mut current = segments;
        let mut value = value;
        let mut found = self.query.matches(document, current)?;
        loop {
            let Some((tail, parent)) = current.split_last() else {
                // Reached the root through synthesis: the wrapper becomes the document.
                return Ok(value);
            };

            match found.len() {
                0 => {}
                1 => return replace(document, current, value),
                matches => {
                    return Err(PatchErrorKind::AmbiguousPath {
                        matches,
                    });
                }
            }

            let parent_found = if parent.is_empty() {
                Vec::new()
            } else {
                self.query.matches(document, parent)?
            };
            if parent_found.len() > 1 {
                return Err(PatchErrorKind::AmbiguousPath {
                    matches: parent_found.len(),
                });
            }
            let parent_value =
                if parent.is_empty() { Some(document) } else { parent_found.first() };

            match parent_value {
                Some(Value::Array(items)) => {
                    return append_element(document, parent, tail, items, value);
                }
                Some(Value::Object(_)) => return add_field(document, parent, tail, value),
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(PatchErrorKind::PatchFailed(format!(
                        "cannot place a child under {} at `{}`",
                        kind_name(other),
                        pointer_of(parent)
                    )));
                }
            }

            tracing::debug!(
                pointer = %pointer_of(parent),
                "parent missing; synthesizing container"
            );
            value = wrap(tail, value);
            current = parent;
            found = parent_found;
        }
    }
}

/// Applies a patch with the default `JSONPath`-backed resolver.
///
/// # Errors
///
/// Returns [`PatchError`] when the patch cannot be applied.
pub fn apply_patch(document: &Value, raw_path: &str, value: Value) -> Result<Value, PatchError> {
    PatchResolver::new().apply(document, raw_path, value)
}

// ============================================================================
// SECTION: Single-Level Primitives
// ============================================================================

/// Replaces the existing value at `segments` in a copy of `document`.
fn replace(document: &Value, segments: &[Segment], value: Value) -> Result<Value, PatchErrorKind> {
    let pointer = pointer_of(segments);
    let mut next = document.clone();
    let slot = next.pointer_mut(&pointer).ok_or_else(|| {
        PatchErrorKind::PatchFailed(format!("replace target `{pointer}` does not exist"))
    })?;
    *slot = value;
    Ok(next)
}

/// Appends `value` to the array at `parent` when `tail` addresses an element.
///
/// Field tails are rejected unless their text is numeric.
fn append_element(
    document: &Value,
    parent: &[Segment],
    tail: &Segment,
    items: &[Value],
    value: Value,
) -> Result<Value, PatchErrorKind> {
    if let Segment::Field(name) = tail
        && name.parse::<usize>().is_err()
    {
        return Err(PatchErrorKind::PatchFailed(format!(
            "cannot add field `{name}` to an array at `{}`",
            pointer_of(parent)
        )));
    }
    let mut extended = items.to_vec();
    extended.push(value);
    replace(document, parent, Value::Array(extended))
}

/// Adds `tail` under the object at `parent` in a copy of `document`.
fn add_field(
    document: &Value,
    parent: &[Segment],
    tail: &Segment,
    value: Value,
) -> Result<Value, PatchErrorKind> {
    let pointer = pointer_of(parent);
    let mut next = document.clone();
    match next.pointer_mut(&pointer) {
        Some(Value::Object(map)) => {
            map.insert(tail.as_text().into_owned(), value);
            Ok(next)
        }
        Some(other) => Err(PatchErrorKind::PatchFailed(format!(
            "add target `{pointer}` is {}, not an object",
            kind_name(other)
        ))),
        None => Err(PatchErrorKind::PatchFailed(format!("add target `{pointer}` does not exist"))),
    }
}

/// Wraps `value` in the container implied by the segment that addressed it.
fn wrap(tail: &Segment, value: Value) -> Value {
    match tail {
        Segment::Index(_) => Value::Array(vec![value]),
        Segment::Field(name) => {
            let mut map = Map::new();
            map.insert(name.clone(), value);
            Value::Object(map)
        }
    }
}

/// Describes a JSON value kind for diagnostics.
const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
