// crates/regolib-config/src/config.rs
// ============================================================================
// Module: Regolib Configuration
// Description: Configuration loading and validation for Regolib.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every field has a default matching the conventional policy bundle layout,
//! so an absent section behaves like an empty one. Invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "regolib.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "REGOLIB_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default name of the compiled policy module inside a bundle.
pub(crate) const DEFAULT_POLICY_ENTRY: &str = "/policy.wasm";
/// Default name of the seed data document inside a bundle.
pub(crate) const DEFAULT_DATA_ENTRY: &str = "/data.json";
/// Default directory prefix of rule sources inside a bundle.
pub(crate) const DEFAULT_RULES_PREFIX: &str = "/rules/";
/// Default filename suffix of rule sources inside a bundle.
pub(crate) const DEFAULT_RULES_SUFFIX: &str = "/raw.rego";
/// Default maximum decompressed size of a single bundle entry.
pub(crate) const DEFAULT_MAX_ENTRY_BYTES: usize = 64 * 1024 * 1024;
/// Default maximum decompressed size of a whole bundle.
pub(crate) const DEFAULT_MAX_TOTAL_BYTES: usize = 256 * 1024 * 1024;
/// Default data document key holding user-configurable control inputs.
pub(crate) const DEFAULT_CONTROLS_INPUTS_KEY: &str = "postureControlInputs";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Regolib configuration root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegolibConfig {
    /// Bundle layout and size limits.
    #[serde(default)]
    pub bundle: BundleConfig,
    /// Library behavior settings.
    #[serde(default)]
    pub library: LibraryConfig,
}

impl RegolibConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then [`CONFIG_ENV_VAR`], then
    /// `regolib.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Loads configuration, falling back to defaults when no file is named.
    ///
    /// An explicit path or [`CONFIG_ENV_VAR`] must point at a readable file;
    /// only the implicit `regolib.toml` may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a named file cannot be read, parsed, or
    /// validated.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        let implicit = path.is_none() && env::var_os(CONFIG_ENV_VAR).is_none();
        if implicit && !Path::new(DEFAULT_CONFIG_NAME).exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bundle.validate()?;
        self.library.validate()
    }
}

/// Bundle archive layout and decompression limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BundleConfig {
    /// Archive entry holding the compiled policy module.
    #[serde(default = "default_policy_entry")]
    pub policy_entry: String,
    /// Archive entry holding the seed data document.
    #[serde(default = "default_data_entry")]
    pub data_entry: String,
    /// Directory prefix of rule source entries.
    #[serde(default = "default_rules_prefix")]
    pub rules_prefix: String,
    /// Filename suffix of rule source entries.
    #[serde(default = "default_rules_suffix")]
    pub rules_suffix: String,
    /// Maximum decompressed size of a single entry, in bytes.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,
    /// Maximum decompressed size of the whole archive, in bytes.
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: usize,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            policy_entry: default_policy_entry(),
            data_entry: default_data_entry(),
            rules_prefix: default_rules_prefix(),
            rules_suffix: default_rules_suffix(),
            max_entry_bytes: default_max_entry_bytes(),
            max_total_bytes: default_max_total_bytes(),
        }
    }
}

impl BundleConfig {
    /// Validates entry names and limits.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_entry_name("bundle.policy_entry", &self.policy_entry)?;
        validate_entry_name("bundle.data_entry", &self.data_entry)?;
        validate_entry_name("bundle.rules_prefix", &self.rules_prefix)?;
        if self.policy_entry == self.data_entry {
            return Err(ConfigError::Invalid(
                "bundle.policy_entry and bundle.data_entry must differ".to_string(),
            ));
        }
        if self.rules_suffix.trim().is_empty() {
            return Err(ConfigError::Invalid("bundle.rules_suffix must be non-empty".to_string()));
        }
        if self.max_entry_bytes == 0 || self.max_total_bytes == 0 {
            return Err(ConfigError::Invalid(
                "bundle size limits must be greater than zero".to_string(),
            ));
        }
        if self.max_entry_bytes > self.max_total_bytes {
            return Err(ConfigError::Invalid(
                "bundle.max_entry_bytes exceeds bundle.max_total_bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Library behavior settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Data document key under which control inputs live.
    #[serde(default = "default_controls_inputs_key")]
    pub controls_inputs_key: String,
    /// Result verbosity applied right after a bundle loads.
    #[serde(default)]
    pub result_level: Option<ResultLevel>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            controls_inputs_key: default_controls_inputs_key(),
            result_level: None,
        }
    }
}

impl LibraryConfig {
    /// Validates library settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let key = self.controls_inputs_key.trim();
        if key.is_empty() {
            return Err(ConfigError::Invalid(
                "library.controls_inputs_key must be non-empty".to_string(),
            ));
        }
        if key.len() != self.controls_inputs_key.len() {
            return Err(ConfigError::Invalid(
                "library.controls_inputs_key must not contain surrounding whitespace".to_string(),
            ));
        }
        Ok(())
    }
}

/// Amount of detail the policy attaches to evaluation results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultLevel {
    /// Full findings plus metadata.
    Verbose,
    /// Findings plus metadata, without verbose detail.
    Normal,
    /// Findings only.
    Minimal,
}

impl ResultLevel {
    /// Returns whether the policy should emit verbose findings.
    #[must_use]
    pub const fn verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Returns whether the policy should attach metadata to findings.
    #[must_use]
    pub const fn metadata(self) -> bool {
        matches!(self, Self::Verbose | Self::Normal)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates an archive entry name.
fn validate_entry_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') || value.len() < 2 {
        return Err(ConfigError::Invalid(format!(
            "{field} must start with '/' and name an entry"
        )));
    }
    if value.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Default policy entry name.
fn default_policy_entry() -> String {
    DEFAULT_POLICY_ENTRY.to_string()
}

/// Default data entry name.
fn default_data_entry() -> String {
    DEFAULT_DATA_ENTRY.to_string()
}

/// Default rules prefix.
fn default_rules_prefix() -> String {
    DEFAULT_RULES_PREFIX.to_string()
}

/// Default rules suffix.
fn default_rules_suffix() -> String {
    DEFAULT_RULES_SUFFIX.to_string()
}

/// Default per-entry size limit.
const fn default_max_entry_bytes() -> usize {
    DEFAULT_MAX_ENTRY_BYTES
}

/// Default whole-bundle size limit.
const fn default_max_total_bytes() -> usize {
    DEFAULT_MAX_TOTAL_BYTES
}

/// Default control inputs key.
fn default_controls_inputs_key() -> String {
    DEFAULT_CONTROLS_INPUTS_KEY.to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
