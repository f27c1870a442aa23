// crates/regolib-core/src/metadata.rs
// ============================================================================
// Module: Metadata Loader
// Description: Introspection catalogs, rule annotations, and control inputs.
// Purpose: Attach human-facing metadata to every evaluable library object.
// Dependencies: regolib-patch, serde, serde_json, serde_yaml, thiserror, tracing
// ============================================================================

//! ## Overview
//! Controls and frameworks are discovered by evaluating one introspection
//! entry point per kind. Each introspection result maps a normalized object
//! name to that object's own result; the metadata is the result field minus
//! its findings. Catalogs are keyed by the human identifier inside the
//! metadata, so a later entry with the same identifier replaces an earlier one.
//!
//! Rules carry metadata in a `# METADATA` comment block. Annotation failures
//! never abort a load; the rule is kept without metadata.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use regolib_patch::PathExpression;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::engine::EngineError;
use crate::engine::PolicyEngine;
use crate::engine::invoke;
use crate::entrypoint::EntrypointKind;
use crate::entrypoint::NAMESPACE;
use crate::entrypoint::RESULT_FIELD;
use crate::entrypoint::format_entrypoint;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Marker line opening a rule annotation block.
const METADATA_MARKER: &str = "# METADATA";
/// Width, in characters, of the comment prefix stripped from annotation lines.
const COMMENT_PREFIX_WIDTH: usize = 2;
/// Annotation field holding the rule metadata record.
const CUSTOM_FIELD: &str = "custom";
/// Result field holding raw findings, stripped from catalog metadata.
const FINDINGS_FIELD: &str = "results";
/// Rule metadata field listing configurable inputs.
const CONTROL_CONFIG_INPUTS: &str = "controlConfigInputs";
/// Configurable input field holding its data path.
const INPUT_PATH_FIELD: &str = "path";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rule annotation errors. These are logged, never propagated by a load.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The source has no `# METADATA` marker.
    #[error("no metadata block")]
    MissingMarker,
    /// The annotation block is not valid YAML.
    #[error("metadata block unparseable: {0}")]
    Yaml(String),
    /// The annotation block has no `custom` record.
    #[error("metadata block has no `custom` record")]
    MissingCustom,
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Catalog entry for one evaluable object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Human-facing name used for evaluation.
    pub name: String,
    /// Metadata record without raw findings.
    pub metadata: Map<String, Value>,
}

/// User-configurable control input discovered from rule annotations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlInputOption {
    /// Option name: the last segment of its data path.
    pub name: String,
    /// Rules declaring this option, in discovery order.
    pub rules: Vec<String>,
    /// Declaration record from the first declaring rule.
    pub metadata: Map<String, Value>,
}

// ============================================================================
// SECTION: Introspection
// ============================================================================

/// Loads the catalog for `kind` through its introspection entry point.
///
/// A missing introspection entry point yields an empty catalog.
pub(crate) fn load_catalog(
    engine: &dyn PolicyEngine,
    kind: EntrypointKind,
) -> Result<BTreeMap<String, CatalogEntry>, EngineError> {
    let entrypoint = format_entrypoint([NAMESPACE, kind.as_str()]);
    let Some(handle) = engine.entrypoints().get(&entrypoint).copied() else {
        tracing::warn!(%entrypoint, "introspection entry point missing; catalog is empty");
        return Ok(BTreeMap::new());
    };
    let result = invoke(engine, &entrypoint, handle, &Value::Array(Vec::new()))?;
    let Value::Object(objects) = result else {
        tracing::warn!(%entrypoint, "introspection result is not an object; catalog is empty");
        return Ok(BTreeMap::new());
    };
    let mut catalog = BTreeMap::new();
    for (scan_key, nested) in objects {
        let Some(metadata) = catalog_metadata(nested) else {
            tracing::warn!(%entrypoint, key = %scan_key, "introspection entry has no metadata");
            continue;
        };
        let name = human_key(kind, &metadata).unwrap_or(scan_key);
        catalog.insert(
            name.clone(),
            CatalogEntry {
                name,
                metadata,
            },
        );
    }
    tracing::debug!(kind = %kind, objects = catalog.len(), "catalog loaded");
    Ok(catalog)
}

/// Returns the nested result field without its findings.
fn catalog_metadata(nested: Value) -> Option<Map<String, Value>> {
    let Value::Object(mut nested) = nested else {
        return None;
    };
    let Some(Value::Object(mut metadata)) = nested.remove(RESULT_FIELD) else {
        return None;
    };
    metadata.remove(FINDINGS_FIELD);
    Some(metadata)
}

/// Returns the human identifier recorded inside a metadata payload.
fn human_key(kind: EntrypointKind, metadata: &Map<String, Value>) -> Option<String> {
    let fields: &[&str] = match kind {
        EntrypointKind::Controls => &["controlID", "id", "name"],
        EntrypointKind::Frameworks | EntrypointKind::Rules => &["name"],
    };
    fields
        .iter()
        .find_map(|field| metadata.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

// ============================================================================
// SECTION: Rule Annotations
// ============================================================================

/// Extracts the `custom` metadata record from a rule's annotation block.
///
/// The block is every line after the `# METADATA` marker up to the first
/// blank or non-comment line, each with its two-character prefix removed.
///
/// # Errors
///
/// Returns [`MetadataError`] when the marker is absent, the block is not
/// YAML, or the block has no `custom` record.
pub fn extract_rule_metadata(source: &str) -> Result<Value, MetadataError> {
    let mut lines = source.lines().map(|line| line.trim_end_matches('\r'));
    if !lines.any(|line| line.trim_end() == METADATA_MARKER) {
        return Err(MetadataError::MissingMarker);
    }
    let block = lines
        .take_while(|line| !line.trim().is_empty() && line.starts_with('#'))
        .map(strip_comment_prefix)
        .collect::<Vec<_>>()
        .join("\n");
    let document: Value =
        serde_yaml::from_str(&block).map_err(|err| MetadataError::Yaml(err.to_string()))?;
    match document {
        Value::Object(mut fields) => {
            fields.remove(CUSTOM_FIELD).ok_or(MetadataError::MissingCustom)
        }
        _ => Err(MetadataError::MissingCustom),
    }
}

/// Removes the comment prefix from an annotation line, counting characters.
fn strip_comment_prefix(line: &str) -> &str {
    line.char_indices()
        .nth(COMMENT_PREFIX_WIDTH)
        .and_then(|(start, _)| line.get(start..))
        .unwrap_or("")
}

/// Returns rule metadata, logging and discarding annotation failures.
pub fn rule_metadata(rule: &str, source: &[u8]) -> Map<String, Value> {
    let Ok(text) = std::str::from_utf8(source) else {
        tracing::warn!(rule, "rule source is not utf-8; registered without metadata");
        return Map::new();
    };
    match extract_rule_metadata(text) {
        Ok(Value::Object(metadata)) => metadata,
        Ok(_) => {
            tracing::warn!(rule, "rule metadata is not an object; registered without metadata");
            Map::new()
        }
        Err(MetadataError::MissingMarker) => {
            tracing::debug!(rule, "rule has no metadata block");
            Map::new()
        }
        Err(err) => {
            tracing::warn!(rule, error = %err, "rule registered without metadata");
            Map::new()
        }
    }
}

// ============================================================================
// SECTION: Control Inputs
// ============================================================================

/// Discovers control inputs declared by rule metadata.
pub fn discover_controls_inputs<'a, I>(rules: I) -> BTreeMap<String, ControlInputOption>
where
    I: IntoIterator<Item = &'a CatalogEntry>,
{
    let mut options: BTreeMap<String, ControlInputOption> = BTreeMap::new();
    for rule in rules {
        let Some(Value::Array(inputs)) = rule.metadata.get(CONTROL_CONFIG_INPUTS) else {
            continue;
        };
        for input in inputs {
            let Some(declaration) = input.as_object() else {
                continue;
            };
            let Some(name) = option_name(declaration) else {
                tracing::warn!(rule = %rule.name, "control input without a usable path skipped");
                continue;
            };
            let option = options.entry(name.clone()).or_insert_with(|| ControlInputOption {
                name,
                rules: Vec::new(),
                metadata: declaration.clone(),
            });
            if !option.rules.contains(&rule.name) {
                option.rules.push(rule.name.clone());
            }
        }
    }
    options
}

/// Returns the last segment of a declaration's data path.
fn option_name(declaration: &Map<String, Value>) -> Option<String> {
    let raw = declaration.get(INPUT_PATH_FIELD)?.as_str()?;
    let path = PathExpression::parse(raw).ok()?;
    path.last().map(|segment| segment.as_text().into_owned())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
