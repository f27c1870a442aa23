// crates/regolib-core/src/lib.rs
// ============================================================================
// Module: Regolib Core
// Description: Policy library loading, catalogs, evaluation, and remediation.
// Purpose: Evaluate resource documents against compiled policy bundles.
// Dependencies: flate2, regolib-config, regolib-patch, serde, tar, tracing
// ============================================================================

//! ## Overview
//! The core crate loads a gzip + tar policy bundle into a [`PolicyLibrary`],
//! exposes its rules, controls, and frameworks as evaluable objects, manages
//! user-configurable control inputs, and applies fix suggestions from failed
//! evaluations. Policy bytecode is executed by an external [`PolicyRuntime`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bundle;
mod data;
pub mod engine;
pub mod entrypoint;
pub mod library;
pub mod metadata;
pub mod remediation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bundle::Bundle;
pub use bundle::BundleEntry;
pub use bundle::BundleError;
pub use bundle::EntryRole;
pub use bundle::RuleSource;
pub use data::DataError;
pub use engine::EngineError;
pub use engine::EntrypointHandle;
pub use engine::PolicyEngine;
pub use engine::PolicyRuntime;
pub use entrypoint::EntrypointId;
pub use entrypoint::EntrypointKind;
pub use entrypoint::EntrypointRegistry;
pub use entrypoint::NAMESPACE;
pub use entrypoint::format_entrypoint;
pub use entrypoint::normalize_name;
pub use library::ControlInput;
pub use library::ControlInputMut;
pub use library::Evaluable;
pub use library::LibraryError;
pub use library::LibraryState;
pub use library::PolicyLibrary;
pub use metadata::CatalogEntry;
pub use metadata::ControlInputOption;
pub use metadata::MetadataError;
pub use metadata::discover_controls_inputs;
pub use metadata::extract_rule_metadata;
pub use metadata::rule_metadata;
pub use remediation::FixPath;
pub use remediation::RemediationError;
pub use remediation::RemediationReport;
pub use remediation::ScanStatus;
pub use remediation::SkippedFix;
pub use remediation::Violation;
pub use remediation::collect_violations;
pub use remediation::remediate;
pub use remediation::remediate_with;
pub use remediation::scan_status;
