// crates/regolib-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Validation Tests
// Description: Loading, defaulting, and rejection of Regolib configuration.
// Purpose: Ensure configuration fails closed on invalid input.
// ============================================================================

//! ## Overview
//! Loads TOML from temporary files and strings, checking defaults and every
//! validation rule.

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

use std::fs;

use regolib_config::ConfigError;
use regolib_config::RegolibConfig;
use regolib_config::ResultLevel;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn empty_config_uses_conventional_layout() {
    let config = RegolibConfig::from_toml_str("").unwrap();
    assert_eq!(config, RegolibConfig::default());
    assert_eq!(config.bundle.policy_entry, "/policy.wasm");
    assert_eq!(config.bundle.data_entry, "/data.json");
    assert_eq!(config.bundle.rules_prefix, "/rules/");
    assert_eq!(config.bundle.rules_suffix, "/raw.rego");
    assert_eq!(config.library.controls_inputs_key, "postureControlInputs");
    assert_eq!(config.library.result_level, None);
}

#[test]
fn load_reads_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("regolib.toml");
    fs::write(
        &path,
        r#"
[bundle]
policy_entry = "/bundle/policy.wasm"
max_entry_bytes = 1024
max_total_bytes = 4096

[library]
result_level = "verbose"
"#,
    )
    .unwrap();
    let config = RegolibConfig::load(Some(&path)).unwrap();
    assert_eq!(config.bundle.policy_entry, "/bundle/policy.wasm");
    assert_eq!(config.bundle.max_entry_bytes, 1024);
    assert_eq!(config.library.result_level, Some(ResultLevel::Verbose));
}

#[test]
fn load_optional_honors_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[library]\ncontrols_inputs_key = \"inputs\"\n").unwrap();
    let config = RegolibConfig::load_optional(Some(&path)).unwrap();
    assert_eq!(config.library.controls_inputs_key, "inputs");
    let err = RegolibConfig::load_optional(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

// ============================================================================
// SECTION: Rejections
// ============================================================================

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RegolibConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn unknown_fields_are_rejected() {
    let err = RegolibConfig::from_toml_str("[bundle]\nunknown = 1\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn relative_entry_names_are_rejected() {
    let err = RegolibConfig::from_toml_str("[bundle]\ndata_entry = \"data.json\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn identical_policy_and_data_entries_are_rejected() {
    let err = RegolibConfig::from_toml_str(
        "[bundle]\npolicy_entry = \"/x\"\ndata_entry = \"/x\"\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn entry_limit_above_total_is_rejected() {
    let err = RegolibConfig::from_toml_str(
        "[bundle]\nmax_entry_bytes = 10\nmax_total_bytes = 5\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn zero_limits_are_rejected() {
    let err = RegolibConfig::from_toml_str("[bundle]\nmax_entry_bytes = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn blank_controls_inputs_key_is_rejected() {
    let err =
        RegolibConfig::from_toml_str("[library]\ncontrols_inputs_key = \" \"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn unknown_result_level_is_rejected() {
    let err = RegolibConfig::from_toml_str("[library]\nresult_level = \"loud\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
