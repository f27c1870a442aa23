// crates/regolib-core/tests/remediation.rs
// ============================================================================
// Module: Remediation Tests
// Description: Violation collection, scan status, and fix application.
// Purpose: Ensure one bad fix never blocks the others.
// Dependencies: regolib-core, serde_json
// ============================================================================

//! ## Overview
//! Collects violations from each result shape, derives Pass/Fail, and applies
//! fix suggestions to a pod document, including skipped and unresolved cases.

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

mod common;

use common::fixable_violation;
use common::loaded_library;
use regolib_core::EntrypointKind;
use regolib_core::RemediationError;
use regolib_core::ScanStatus;
use regolib_core::collect_violations;
use regolib_core::remediate;
use regolib_core::scan_status;
use serde_json::Value;
use serde_json::json;

/// Pod without a security context.
fn pod() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "web"},
        "spec": {"containers": [{"name": "web", "image": "nginx"}]}
    })
}

// ============================================================================
// SECTION: Collection
// ============================================================================

#[test]
fn each_result_shape_yields_violations() {
    let rule = json!([fixable_violation()]);
    let control = json!({"controlID": "C-0001", "results": [fixable_violation()]});
    let framework = json!({"results": {
        "C-0001": {"results": [fixable_violation()]},
        "C-0002": {"results": []},
        "C-0003": [fixable_violation()]
    }});
    assert_eq!(collect_violations(EntrypointKind::Rules, &rule).unwrap().len(), 1);
    assert_eq!(collect_violations(EntrypointKind::Controls, &control).unwrap().len(), 1);
    assert_eq!(collect_violations(EntrypointKind::Frameworks, &framework).unwrap().len(), 2);
}

#[test]
fn violation_fields_decode() {
    let violations =
        collect_violations(EntrypointKind::Rules, &json!([fixable_violation()])).unwrap();
    let violation = &violations[0];
    assert_eq!(violation.alert_message.as_deref(), Some("container is privileged"));
    assert_eq!(violation.alert_score, Some(7.0));
    assert_eq!(violation.fixes()[0].value, json!("false"));
    assert_eq!(violation.failed(), ["spec.containers[0].securityContext.privileged".to_string()]);
}

#[test]
fn status_follows_findings() {
    assert_eq!(
        scan_status(EntrypointKind::Controls, &json!({"results": []})).unwrap(),
        ScanStatus::Pass
    );
    assert_eq!(scan_status(EntrypointKind::Controls, &Value::Null).unwrap(), ScanStatus::Pass);
    assert_eq!(
        scan_status(EntrypointKind::Frameworks, &json!({"results": {}})).unwrap(),
        ScanStatus::Pass
    );
    assert_eq!(
        scan_status(EntrypointKind::Rules, &json!([fixable_violation()])).unwrap(),
        ScanStatus::Fail
    );
}

#[test]
fn mismatched_shapes_are_errors() {
    let err = collect_violations(EntrypointKind::Controls, &json!([1])).unwrap_err();
    assert!(matches!(err, RemediationError::Shape { kind: EntrypointKind::Controls, .. }));
    let err = collect_violations(EntrypointKind::Frameworks, &json!({"results": []})).unwrap_err();
    assert!(matches!(err, RemediationError::Shape { .. }));
    let err =
        collect_violations(EntrypointKind::Rules, &json!([{"fixPaths": "nope"}])).unwrap_err();
    assert!(matches!(err, RemediationError::Violation(_)));
}

// ============================================================================
// SECTION: Fix Application
// ============================================================================

#[test]
fn fixes_are_applied_in_order() {
    let violations = collect_violations(EntrypointKind::Rules, &json!([fixable_violation(), {
        "fixPaths": [
            {"path": "spec.containers[0].securityContext.runAsNonRoot", "value": "true"},
            {"path": "metadata.labels.team", "value": "platform"}
        ]
    }]))
    .unwrap();
    let report = remediate(&pod(), &violations);
    assert_eq!(report.status, ScanStatus::Fail);
    assert_eq!(report.applied.len(), 3);
    assert!(report.skipped.is_empty());
    assert_eq!(
        report.document["spec"]["containers"][0]["securityContext"],
        json!({"privileged": "false", "runAsNonRoot": "true"})
    );
    assert_eq!(report.document["metadata"], json!({"name": "web", "labels": {"team": "platform"}}));
}

#[test]
fn failing_fix_is_skipped_and_others_apply() {
    let violations = collect_violations(EntrypointKind::Rules, &json!([{
        "fixPaths": [
            {"path": "kind.nested", "value": "x"},
            {"path": "", "value": "x"},
            {"path": "metadata.namespace", "value": "default"}
        ]
    }]))
    .unwrap();
    let report = remediate(&pod(), &violations);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.skipped[0].fix.path, "kind.nested");
    assert_eq!(report.applied.len(), 1);
    assert_eq!(report.document["metadata"]["namespace"], json!("default"));
    assert_eq!(report.document["kind"], json!("Pod"));
}

#[test]
fn violations_without_fixes_are_unresolved() {
    let violations = collect_violations(EntrypointKind::Rules, &json!([{
        "failedPaths": ["spec.hostNetwork", "spec.hostPID"],
        "fixPaths": []
    }, {
        "failedPaths": null
    }]))
    .unwrap();
    let report = remediate(&pod(), &violations);
    assert_eq!(report.unresolved, vec!["spec.hostNetwork".to_string()]);
    assert_eq!(report.document, pod());
}

#[test]
fn passing_scan_leaves_document_untouched() {
    let report = remediate(&pod(), &[]);
    assert_eq!(report.status, ScanStatus::Pass);
    assert_eq!(report.document, pod());
}

#[test]
fn control_evaluation_feeds_remediation() {
    let (library, _) = loaded_library();
    let result = library.evaluate_control("C-0001", &pod()).unwrap();
    let violations = collect_violations(EntrypointKind::Controls, &result).unwrap();
    let report = remediate(&pod(), &violations);
    assert_eq!(
        report.document["spec"]["containers"][0]["securityContext"]["privileged"],
        json!("false")
    );
}
