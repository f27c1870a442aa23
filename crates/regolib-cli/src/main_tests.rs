// crates/regolib-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for bounded reads, document formats, and parsing.
// Purpose: Ensure CLI inputs fail closed and render in their own format.
// Dependencies: regolib-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `read_bytes_with_limit` size limits, format selection by file
//! extension, command-line value parsing, and argument parsing.
//!
//! Security posture: CLI inputs are untrusted; size limits must fail closed.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use clap::Parser;
use regolib_core::EntrypointKind;
use serde_json::json;

use super::Cli;
use super::Commands;
use super::KindArg;
use super::document::DocumentError;
use super::document::DocumentFormat;
use super::document::parse_value;
use super::document::read_bytes_with_limit;
use super::document::read_document;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_accepts_within_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.bin");
    fs::write(&path, b"abc").unwrap();
    assert_eq!(read_bytes_with_limit(&path, 3).unwrap(), b"abc".to_vec());
}

#[test]
fn read_bytes_with_limit_rejects_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.bin");
    fs::write(&path, b"abcd").unwrap();
    let err = read_bytes_with_limit(&path, 3).unwrap_err();
    assert!(matches!(
        err,
        DocumentError::TooLarge {
            size: 4,
            limit: 3,
            ..
        }
    ));
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_bytes_with_limit(&dir.path().join("absent.bin"), 8).unwrap_err();
    assert!(matches!(err, DocumentError::Io { .. }));
}

#[test]
fn format_follows_extension() {
    assert_eq!(DocumentFormat::from_path(Path::new("pod.yaml")), DocumentFormat::Yaml);
    assert_eq!(DocumentFormat::from_path(Path::new("pod.YML")), DocumentFormat::Yaml);
    assert_eq!(DocumentFormat::from_path(Path::new("pod.json")), DocumentFormat::Json);
    assert_eq!(DocumentFormat::from_path(Path::new("pod")), DocumentFormat::Json);
}

#[test]
fn yaml_documents_parse_into_json_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pod.yaml");
    fs::write(&path, "kind: Pod\nspec:\n  replicas: 2\n").unwrap();
    let (value, format) = read_document(&path).unwrap();
    assert_eq!(format, DocumentFormat::Yaml);
    assert_eq!(value, json!({"kind": "Pod", "spec": {"replicas": 2}}));
}

#[test]
fn malformed_documents_report_their_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pod.json");
    fs::write(&path, "{not json").unwrap();
    let err = read_document(&path).unwrap_err();
    assert!(err.to_string().contains("as json"), "unexpected error: {err}");
}

#[test]
fn values_parse_as_json_then_fall_back_to_strings() {
    assert_eq!(parse_value("false"), json!(false));
    assert_eq!(parse_value("[1, 2]"), json!([1, 2]));
    assert_eq!(parse_value("\"quoted\""), json!("quoted"));
    assert_eq!(parse_value("nginx:1.25"), json!("nginx:1.25"));
}

#[test]
fn remediate_kind_defaults_to_rule() {
    let cli = Cli::try_parse_from(["regolib", "remediate", "--document", "d", "--result", "r"])
        .unwrap();
    let Commands::Remediate {
        kind,
        ..
    } = cli.command
    else {
        panic!("expected remediate command");
    };
    assert_eq!(kind, KindArg::Rule);
    assert_eq!(EntrypointKind::from(KindArg::Framework), EntrypointKind::Frameworks);
}
