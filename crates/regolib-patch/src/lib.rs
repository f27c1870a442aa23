// crates/regolib-patch/src/lib.rs
// ============================================================================
// Module: Regolib Patch
// Description: Path expressions and structural patch resolution for documents.
// Purpose: Apply remediation suggestions at paths that may not exist yet.
// Dependencies: jsonpath_lib, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! This crate turns `(path, value)` fix suggestions into patched JSON
//! documents. Paths are parsed by [`PathExpression`], existence is tested via
//! an [`ExistenceQuery`], and [`PatchResolver`] synthesizes missing objects
//! and arrays on the way to the target.
//! Invariants:
//! - Patching is copy-on-write; inputs are never mutated.
//! - Empty paths fail with [`PatchErrorKind::InvalidPath`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod path;
pub mod query;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use path::MAX_PATH_SEGMENTS;
pub use path::PathError;
pub use path::PathExpression;
pub use path::Segment;
pub use path::pointer_of;
pub use query::ExistenceQuery;
pub use query::JsonPathQuery;
pub use query::QueryError;
pub use resolver::PatchError;
pub use resolver::PatchErrorKind;
pub use resolver::PatchResolver;
pub use resolver::apply_patch;
