// crates/regolib-core/src/data.rs
// ============================================================================
// Module: Data Channel
// Description: Write-through cache over the engine's data document.
// Purpose: Keep the engine and the library's view of policy data in lockstep.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! The bundle's data bytes are retained verbatim and decoded only on first
//! read or write. Every mutation goes through [`DataChannel::update`], which
//! edits a copy, hands the serialized copy to the engine, and commits it
//! only when the engine accepts it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::OnceCell;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::engine::EngineError;
use crate::engine::PolicyEngine;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Data channel errors.
#[derive(Debug, Error)]
pub enum DataError {
    /// Retained data bytes are not valid JSON.
    #[error("policy data is not valid json: {0}")]
    Decode(String),
    /// The updated document could not be serialized.
    #[error("policy data could not be serialized: {0}")]
    Encode(String),
    /// The data document root is not an object.
    #[error("policy data root must be an object")]
    NotAnObject,
    /// The engine rejected the updated document.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ============================================================================
// SECTION: Channel
// ============================================================================

/// Retained data bytes plus their lazily decoded document.
#[derive(Debug, Default)]
pub(crate) struct DataChannel {
    /// Bytes last accepted by the engine.
    raw: Vec<u8>,
    /// Decoded form of `raw`.
    decoded: OnceCell<Value>,
}

impl DataChannel {
    /// Creates a channel over bytes the engine already holds.
    pub(crate) fn new(raw: Option<Vec<u8>>) -> Self {
        Self {
            raw: raw.unwrap_or_default(),
            decoded: OnceCell::new(),
        }
    }

    /// Returns the decoded document; absent data reads as `{}`.
    pub(crate) fn document(&self) -> Result<&Value, DataError> {
        if let Some(document) = self.decoded.get() {
            return Ok(document);
        }
        let document = if self.raw.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(&self.raw).map_err(|err| DataError::Decode(err.to_string()))?
        };
        Ok(self.decoded.get_or_init(|| document))
    }

    /// Applies `mutate` to a copy of the document and re-primes the engine.
    pub(crate) fn update<F>(
        &mut self,
        engine: &mut dyn PolicyEngine,
        mutate: F,
    ) -> Result<(), DataError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut next = self.document()?.clone();
        let Value::Object(root) = &mut next else {
            return Err(DataError::NotAnObject);
        };
        mutate(root);
        let bytes = serde_json::to_vec(&next).map_err(|err| DataError::Encode(err.to_string()))?;
        engine.set_data(&bytes)?;
        self.raw = bytes;
        self.decoded = OnceCell::from(next);
        Ok(())
    }
}
