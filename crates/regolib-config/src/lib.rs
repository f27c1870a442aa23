// crates/regolib-config/src/lib.rs
// ============================================================================
// Module: Regolib Config
// Description: Canonical configuration model for bundle loading and library behavior.
// Purpose: Single source of truth for Regolib configuration semantics.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! This crate defines the configuration model consumed by the policy library
//! and the CLI: bundle entry names, decompression limits, the data key for
//! control inputs, and the initial result verbosity.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::BundleConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::LibraryConfig;
pub use config::RegolibConfig;
pub use config::ResultLevel;
