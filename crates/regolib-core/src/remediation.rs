// crates/regolib-core/src/remediation.rs
// ============================================================================
// Module: Remediation
// Description: Scan status derivation and fix suggestion application.
// Purpose: Turn evaluation findings into a patched resource document.
// Dependencies: regolib-patch, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Evaluation results carry violation records. A rule yields a list of
//! violations, a control wraps its list in `results`, and a framework maps
//! each control identifier to that control's result under `results`. Any
//! violation means the scan failed.
//!
//! Fix suggestions are applied one by one with the patch resolver. A
//! suggestion that cannot be applied is skipped and reported; the remaining
//! suggestions still apply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regolib_patch::ExistenceQuery;
use regolib_patch::PatchResolver;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::entrypoint::EntrypointKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field listing violations inside control and framework results.
const RESULTS_FIELD: &str = "results";
/// Shared null used for absent results.
static NULL: Value = Value::Null;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Remediation input errors.
#[derive(Debug, Error)]
pub enum RemediationError {
    /// The result does not have the shape expected for its kind.
    #[error("unexpected {kind} result shape: {reason}")]
    Shape {
        /// Result kind.
        kind: EntrypointKind,
        /// Mismatch description.
        reason: String,
    },
    /// A violation record could not be decoded.
    #[error("invalid violation record: {0}")]
    Violation(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    /// No violations.
    Pass,
    /// At least one violation.
    Fail,
}

/// Suggested value for a document path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixPath {
    /// Path expression to patch.
    pub path: String,
    /// Value to place at the path.
    pub value: Value,
}

/// Violation record produced by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Human-readable alert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
    /// Alert score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_score: Option<f64>,
    /// Severity as reported by the rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Value>,
    /// Fix suggestions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_paths: Option<Vec<FixPath>>,
    /// Paths that caused the violation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_paths: Option<Vec<String>>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Violation {
    /// Returns the fix suggestions.
    #[must_use]
    pub fn fixes(&self) -> &[FixPath] {
        self.fix_paths.as_deref().unwrap_or_default()
    }

    /// Returns the failed paths.
    #[must_use]
    pub fn failed(&self) -> &[String] {
        self.failed_paths.as_deref().unwrap_or_default()
    }
}

/// Fix suggestion that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFix {
    /// The suggestion.
    #[serde(flatten)]
    pub fix: FixPath,
    /// Why it was skipped.
    pub reason: String,
}

/// Result of applying every fix suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationReport {
    /// Scan status before remediation.
    pub status: ScanStatus,
    /// Patched document.
    pub document: Value,
    /// Suggestions applied, in order.
    pub applied: Vec<FixPath>,
    /// Suggestions skipped.
    pub skipped: Vec<SkippedFix>,
    /// Failed paths of violations with no suggestions.
    pub unresolved: Vec<String>,
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Collects violation records from a narrowed evaluation result.
///
/// # Errors
///
/// Returns [`RemediationError`] when the result shape does not match `kind`
/// or a violation record cannot be decoded.
pub fn collect_violations(
    kind: EntrypointKind,
    result: &Value,
) -> Result<Vec<Violation>, RemediationError> {
    let mut violations = Vec::new();
    match kind {
        EntrypointKind::Rules => push_violations(kind, result, &mut violations)?,
        EntrypointKind::Controls => {
            push_violations(kind, results_of(kind, result)?, &mut violations)?;
        }
        EntrypointKind::Frameworks => match results_of(kind, result)? {
            Value::Null => {}
            Value::Object(controls) => {
                for control in controls.values() {
                    let findings = if control.is_array() {
                        control
                    } else {
                        results_of(EntrypointKind::Controls, control)?
                    };
                    push_violations(kind, findings, &mut violations)?;
                }
            }
            _ => {
                return Err(RemediationError::Shape {
                    kind,
                    reason: "`results` is not an object".to_string(),
                });
            }
        },
    }
    Ok(violations)
}

/// Derives the scan status from a narrowed evaluation result.
///
/// # Errors
///
/// See [`collect_violations`].
pub fn scan_status(kind: EntrypointKind, result: &Value) -> Result<ScanStatus, RemediationError> {
    if collect_violations(kind, result)?.is_empty() {
        Ok(ScanStatus::Pass)
    } else {
        Ok(ScanStatus::Fail)
    }
}

/// Returns the `results` field of an object result; null reads as null.
fn results_of(kind: EntrypointKind, result: &Value) -> Result<&Value, RemediationError> {
    match result {
        Value::Null => Ok(&NULL),
        Value::Object(fields) => Ok(fields.get(RESULTS_FIELD).unwrap_or(&NULL)),
        _ => Err(RemediationError::Shape {
            kind,
            reason: "result is not an object".to_string(),
        }),
    }
}

/// Decodes a violation list, treating null as empty.
fn push_violations(
    kind: EntrypointKind,
    findings: &Value,
    out: &mut Vec<Violation>,
) -> Result<(), RemediationError> {
    match findings {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                let violation = Violation::deserialize(item)
                    .map_err(|err| RemediationError::Violation(err.to_string()))?;
                out.push(violation);
            }
            Ok(())
        }
        _ => Err(RemediationError::Shape {
            kind,
            reason: "violations are not a list".to_string(),
        }),
    }
}

// ============================================================================
// SECTION: Fix Application
// ============================================================================

/// Applies every fix suggestion with the default resolver.
#[must_use]
pub fn remediate(document: &Value, violations: &[Violation]) -> RemediationReport {
    remediate_with(&PatchResolver::new(), document, violations)
}

/// Applies every fix suggestion with `resolver`.
///
/// Violations without suggestions report their first failed path as
/// unresolved.
#[must_use]
pub fn remediate_with<Q: ExistenceQuery>(
    resolver: &PatchResolver<Q>,
    document: &Value,
    violations: &[Violation],
) -> RemediationReport {
    let status = if violations.is_empty() { ScanStatus::Pass } else { ScanStatus::Fail };
    let mut current = document.clone();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();
    let mut unresolved = Vec::new();
    for violation in violations {
        if violation.fixes().is_empty() {
            if let Some(path) = violation.failed().first() {
                unresolved.push(path.clone());
            }
            continue;
        }
        for fix in violation.fixes() {
            match resolver.apply(&current, &fix.path, fix.value.clone()) {
                Ok(patched) => {
                    current = patched;
                    applied.push(fix.clone());
                }
                Err(err) => {
                    tracing::warn!(path = %fix.path, error = %err, "fix suggestion skipped");
                    skipped.push(SkippedFix {
                        fix: fix.clone(),
                        reason: err.kind.to_string(),
                    });
                }
            }
        }
    }
    RemediationReport {
        status,
        document: current,
        applied,
        skipped,
        unresolved,
    }
}
