// crates/regolib-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Fake policy runtime and bundle builders for core tests.
// Purpose: Exercise the library without a real policy bytecode runtime.
// Dependencies: flate2, regolib-core, serde_json, tar
// ============================================================================

//! ## Overview
//! [`FakeRuntime`] serves canned results per entry point and records every
//! data document and evaluation input it receives. [`build_bundle`] writes
//! gzip + tar archives in memory.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
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

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use flate2::Compression;
use flate2::write::GzEncoder;
use regolib_config::RegolibConfig;
use regolib_core::EngineError;
use regolib_core::EntrypointHandle;
use regolib_core::PolicyEngine;
use regolib_core::PolicyLibrary;
use regolib_core::PolicyRuntime;
use serde_json::Value;
use serde_json::json;
use tar::EntryType;
use tar::Header;

// ============================================================================
// SECTION: Fake Runtime
// ============================================================================

/// Module bytes the fake runtime accepts.
pub const POLICY_MODULE: &[u8] = b"\0asm-fake-policy";

/// Shared record of engine interactions.
#[derive(Debug, Default)]
pub struct EngineLog {
    /// Every data document passed to `set_data`, decoded.
    pub data: Vec<Value>,
    /// Every evaluation as `(entrypoint, input)`.
    pub evaluations: Vec<(String, Value)>,
}

/// Runtime producing engines with canned results.
#[derive(Clone)]
pub struct FakeRuntime {
    /// Result per entry point name.
    pub responses: BTreeMap<String, Value>,
    /// Reject every `set_data` call.
    pub reject_data: bool,
    /// Shared interaction log.
    pub log: Rc<RefCell<EngineLog>>,
}

impl FakeRuntime {
    /// Creates a runtime serving `responses`.
    pub fn new(responses: BTreeMap<String, Value>) -> Self {
        Self {
            responses,
            reject_data: false,
            log: Rc::new(RefCell::new(EngineLog::default())),
        }
    }
}

impl PolicyRuntime for FakeRuntime {
    fn instantiate(&self, module: &[u8]) -> Result<Box<dyn PolicyEngine>, EngineError> {
        if module != POLICY_MODULE {
            return Err(EngineError::Instantiate("not a policy module".to_string()));
        }
        let entrypoints = self
            .responses
            .keys()
            .enumerate()
            .map(|(index, name)| (name.clone(), EntrypointHandle::try_from(index).unwrap()))
            .collect();
        Ok(Box::new(FakeEngine {
            entrypoints,
            responses: self.responses.values().cloned().collect(),
            reject_data: self.reject_data,
            log: Rc::clone(&self.log),
        }))
    }
}

/// Engine serving canned results by handle.
struct FakeEngine {
    entrypoints: BTreeMap<String, EntrypointHandle>,
    responses: Vec<Value>,
    reject_data: bool,
    log: Rc<RefCell<EngineLog>>,
}

impl PolicyEngine for FakeEngine {
    fn entrypoints(&self) -> &BTreeMap<String, EntrypointHandle> {
        &self.entrypoints
    }

    fn set_data(&mut self, data: &[u8]) -> Result<(), EngineError> {
        if self.reject_data {
            return Err(EngineError::Data("rejected".to_string()));
        }
        let document =
            serde_json::from_slice(data).map_err(|err| EngineError::Data(err.to_string()))?;
        self.log.borrow_mut().data.push(document);
        Ok(())
    }

    fn evaluate(
        &self,
        input: &Value,
        entrypoint: EntrypointHandle,
    ) -> Result<Vec<Value>, EngineError> {
        let name = self
            .entrypoints
            .iter()
            .find(|(_, handle)| **handle == entrypoint)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| EngineError::Evaluation("unknown handle".to_string()))?;
        self.log.borrow_mut().evaluations.push((name, input.clone()));
        let response = self.responses[usize::try_from(entrypoint).unwrap()].clone();
        Ok(vec![json!({ "result": response })])
    }
}

// ============================================================================
// SECTION: Bundles
// ============================================================================

/// Builds a gzip + tar archive with regular file entries in order.
pub fn build_bundle(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, bytes) in entries {
        if name.ends_with('/') {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            header.set_mode(0o755);
            builder.append_data(&mut header, name, std::io::empty()).unwrap();
            continue;
        }
        let mut header = Header::new_gnu();
        header.set_size(u64::try_from(bytes.len()).unwrap());
        header.set_mode(0o644);
        builder.append_data(&mut header, name, *bytes).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Seed data document of the sample bundle.
pub fn sample_data() -> Value {
    json!({
        "postureControlInputs": {
            "allowedRepos": ["docker.io"]
        },
        "settings": {
            "verbose": false,
            "metadata": false
        }
    })
}

/// Rule source declaring a configurable input.
pub const ALLOWED_REPOS_RULE: &str = "package armo_builtins

# METADATA
# custom:
#   name: rule-allowed-repos
#   controlConfigInputs:
#     - path: settings.postureControlInputs.allowedRepos
#       name: Allowed repositories
#       description: Registries images may be pulled from

deny[msga] {
  true
}
";

/// Rule source without annotations.
pub const PRIVILEGED_RULE: &str = "package armo_builtins

deny[msga] {
  true
}
";

/// Sample bundle: directory, data, two rules, then the policy module.
pub fn sample_bundle() -> Vec<u8> {
    let data = serde_json::to_vec(&sample_data()).unwrap();
    build_bundle(&[
        ("rules/", b"".as_slice()),
        ("data.json", data.as_slice()),
        ("rules/rule-allowed-repos/raw.rego", ALLOWED_REPOS_RULE.as_bytes()),
        ("rules/rule-privileged/raw.rego", PRIVILEGED_RULE.as_bytes()),
        ("policy.wasm", POLICY_MODULE),
    ])
}

/// Violation with one fix suggestion.
pub fn fixable_violation() -> Value {
    json!({
        "alertMessage": "container is privileged",
        "alertScore": 7,
        "failedPaths": ["spec.containers[0].securityContext.privileged"],
        "fixPaths": [
            {"path": "spec.containers[0].securityContext.privileged", "value": "false"}
        ]
    })
}

/// Canned results for the sample bundle's entry points.
pub fn sample_responses() -> BTreeMap<String, Value> {
    let mut responses = BTreeMap::new();
    responses.insert(
        "armo_builtins/rules/rule_allowed_repos/raw".to_string(),
        json!({"deny": [fixable_violation()]}),
    );
    responses.insert("armo_builtins/rules/rule_privileged/raw".to_string(), json!({"deny": []}));
    responses.insert("armo_builtins/rules/rule_privileged/filter".to_string(), json!({}));
    responses.insert(
        "armo_builtins/controls/C_0001".to_string(),
        json!({"deny": {"controlID": "C-0001", "results": [fixable_violation()]}}),
    );
    responses.insert(
        "armo_builtins/frameworks/NSA".to_string(),
        json!({"deny": {"name": "NSA", "results": {"C-0001": {"results": [fixable_violation()]}}}}),
    );
    responses.insert(
        "armo_builtins/controls".to_string(),
        json!({
            "C_0001": {"deny": {"controlID": "C-0001", "name": "Forbidden registries", "results": []}},
            "C_0002": {"deny": {"controlID": "C-0002", "name": "Privileged container", "results": []}}
        }),
    );
    responses.insert(
        "armo_builtins/frameworks".to_string(),
        json!({"NSA": {"deny": {"name": "NSA", "description": "hardening guidance", "results": {}}}}),
    );
    responses.insert("other_namespace/rules/ignored/raw".to_string(), json!({}));
    responses
}

/// Returns a loaded library over the sample bundle and its engine log.
pub fn loaded_library() -> (PolicyLibrary, Rc<RefCell<EngineLog>>) {
    let runtime = FakeRuntime::new(sample_responses());
    let log = Rc::clone(&runtime.log);
    let mut library = PolicyLibrary::new(Box::new(runtime), RegolibConfig::default());
    library.load(&sample_bundle()).unwrap();
    (library, log)
}
