// crates/regolib-patch/src/query.rs
// ============================================================================
// Module: Existence Query
// Description: Path existence checks against JSON documents.
// Purpose: Tell the resolver whether an address already resolves to values.
// Dependencies: jsonpath_lib, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The resolver only needs one capability from a query engine: given a
//! document and a path, return the values found there. [`ExistenceQuery`] is
//! that seam, and [`JsonPathQuery`] implements it by rendering the typed
//! segments as a bracket-notation `JSONPath` selector and evaluating it with
//! `jsonpath_lib`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use jsonpath_lib::select;
use serde_json::Value;
use thiserror::Error;

use crate::path::Segment;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error raised when the underlying selector engine rejects a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("existence query failed for `{selector}`: {reason}")]
pub struct QueryError {
    /// Selector that was evaluated.
    pub selector: String,
    /// Engine-provided failure description.
    pub reason: String,
}

// ============================================================================
// SECTION: Query Interface
// ============================================================================

/// Evaluates a path against a document and returns every matched value.
pub trait ExistenceQuery {
    /// Returns the values found at `segments`; an empty list means "absent".
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the selector cannot be evaluated.
    fn matches(&self, document: &Value, segments: &[Segment]) -> Result<Vec<Value>, QueryError>;
}

// ============================================================================
// SECTION: JSONPath Implementation
// ============================================================================

/// `JSONPath`-backed existence query.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathQuery;

impl ExistenceQuery for JsonPathQuery {
    fn matches(&self, document: &Value, segments: &[Segment]) -> Result<Vec<Value>, QueryError> {
        let selector = to_jsonpath(segments);
        let found = select(document, &selector).map_err(|err| QueryError {
            selector: selector.clone(),
            reason: err.to_string(),
        })?;
        Ok(found.into_iter().cloned().collect())
    }
}

/// Renders segments as a bracket-notation selector (`$['a'][0]`).
///
/// A literal `*` field is rendered as a wildcard so multi-valued addresses
/// are detected rather than silently treated as absent.
#[must_use]
pub fn to_jsonpath(segments: &[Segment]) -> String {
    let mut selector = String::from("$");
    for segment in segments {
        match segment {
            Segment::Index(index) => {
                selector.push('[');
                selector.push_str(&index.to_string());
                selector.push(']');
            }
            Segment::Field(name) if name == "*" => selector.push_str("[*]"),
            Segment::Field(name) => {
                let quote = if name.contains('\'') && !name.contains('"') { '"' } else { '\'' };
                selector.push('[');
                selector.push(quote);
                for ch in name.chars() {
                    if ch == quote || ch == '\\' {
                        selector.push('\\');
                    }
                    selector.push(ch);
                }
                selector.push(quote);
                selector.push(']');
            }
        }
    }
    selector
}

// ============================================================================
// SECTION: Tests
// ============================================================================
