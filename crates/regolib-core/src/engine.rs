// crates/regolib-core/src/engine.rs
// ============================================================================
// Module: Policy Engine Interfaces
// Description: Backend-agnostic contract for compiled policy evaluation.
// Purpose: Decouple the library from any specific policy bytecode runtime.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! The library never interprets policy bytecode itself. A [`PolicyRuntime`]
//! turns the bundle's policy module into a [`PolicyEngine`], which exposes
//! its entry points, accepts a data document, and evaluates inputs.
//!
//! Evaluation contract: the input is always a sequence and the engine returns
//! a sequence of `{ "result": ... }` items. Only the first item is consulted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Integer handle the engine assigns to each entry point.
pub type EntrypointHandle = u32;

/// Field of each evaluation item that carries the policy result.
const RESULT_ITEM_FIELD: &str = "result";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy engine errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The runtime rejected the policy module.
    #[error("policy module rejected: {0}")]
    Instantiate(String),
    /// The engine rejected a data document.
    #[error("policy data rejected: {0}")]
    Data(String),
    /// Evaluation failed inside the engine.
    #[error("policy evaluation failed: {0}")]
    Evaluation(String),
    /// Evaluation produced no usable result item.
    #[error("policy evaluation of `{0}` returned no result")]
    EmptyResult(String),
}

// ============================================================================
// SECTION: Interfaces
// ============================================================================

/// Factory for policy engines built from compiled policy modules.
pub trait PolicyRuntime {
    /// Instantiates an engine from a compiled policy module.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Instantiate`] when the module is not loadable.
    fn instantiate(&self, module: &[u8]) -> Result<Box<dyn PolicyEngine>, EngineError>;
}

/// A loaded policy ready for evaluation.
///
/// Implementations that need mutable state during evaluation are expected to
/// use interior mutability; evaluation must not alter the data document.
pub trait PolicyEngine {
    /// Returns every entry point name mapped to its handle.
    fn entrypoints(&self) -> &BTreeMap<String, EntrypointHandle>;

    /// Replaces the engine's data document with the given JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Data`] when the document is rejected.
    fn set_data(&mut self, data: &[u8]) -> Result<(), EngineError>;

    /// Evaluates the input sequence against one entry point.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Evaluation`] when the engine fails.
    fn evaluate(
        &self,
        input: &Value,
        entrypoint: EntrypointHandle,
    ) -> Result<Vec<Value>, EngineError>;
}

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// Evaluates `entrypoint` and returns the first item's result.
///
/// Non-sequence inputs are wrapped into a single-element sequence.
pub(crate) fn invoke(
    engine: &dyn PolicyEngine,
    entrypoint: &str,
    handle: EntrypointHandle,
    input: &Value,
) -> Result<Value, EngineError> {
    let results = if input.is_array() {
        engine.evaluate(input, handle)?
    } else {
        engine.evaluate(&Value::Array(vec![input.clone()]), handle)?
    };
    match results.into_iter().next() {
        Some(Value::Object(mut item)) => item
            .remove(RESULT_ITEM_FIELD)
            .ok_or_else(|| EngineError::EmptyResult(entrypoint.to_string())),
        _ => Err(EngineError::EmptyResult(entrypoint.to_string())),
    }
}
