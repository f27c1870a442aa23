// crates/regolib-cli/src/main.rs
// ============================================================================
// Module: Regolib CLI
// Description: Command-line entry point for bundle inspection and patching.
// Purpose: Inspect policy bundles, patch documents, and apply remediations.
// Dependencies: clap, regolib-config, regolib-core, regolib-patch, tracing
// ============================================================================

//! ## Overview
//! The `regolib` binary works on artifacts without a policy runtime:
//! `inspect` reports a bundle's layout, rule annotations, and configurable
//! control inputs; `patch` applies one structural patch to a document; and
//! `remediate` applies the fix suggestions from a stored evaluation result.
//!
//! Security posture: every input file is untrusted and read under a hard size
//! limit before parsing.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod document;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use regolib_config::RegolibConfig;
use regolib_core::Bundle;
use regolib_core::CatalogEntry;
use regolib_core::ControlInputOption;
use regolib_core::EntryRole;
use regolib_core::EntrypointKind;
use regolib_core::collect_violations;
use regolib_core::discover_controls_inputs;
use regolib_core::remediate;
use regolib_core::rule_metadata;
use regolib_patch::apply_patch;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::document::DocumentFormat;
use crate::document::parse_value;
use crate::document::read_bytes_with_limit;
use crate::document::read_document;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter directive.
const LOG_ENV_VAR: &str = "REGOLIB_LOG";
/// Log filter used when [`LOG_ENV_VAR`] is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "regolib", version, about = "Policy bundle and remediation tooling")]
struct Cli {
    /// Optional config file path (defaults to `regolib.toml` or `REGOLIB_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Report a bundle's entries, rule metadata, and control inputs.
    Inspect {
        /// Path to the gzip + tar policy bundle.
        #[arg(long, value_name = "FILE")]
        bundle: PathBuf,
    },
    /// Set one value in a JSON or YAML document.
    Patch {
        /// Path to the document.
        #[arg(long, value_name = "FILE")]
        document: PathBuf,
        /// Path expression to set, such as `spec.containers[0].image`.
        #[arg(long, value_name = "EXPR")]
        path: String,
        /// Value to place; parsed as JSON, otherwise taken as a string.
        #[arg(long, value_name = "VALUE")]
        value: String,
    },
    /// Apply the fix suggestions from a stored evaluation result.
    Remediate {
        /// Path to the resource document.
        #[arg(long, value_name = "FILE")]
        document: PathBuf,
        /// Path to the narrowed evaluation result.
        #[arg(long, value_name = "FILE")]
        result: PathBuf,
        /// Kind of object that produced the result.
        #[arg(long, value_enum, default_value_t = KindArg::Rule)]
        kind: KindArg,
    },
}

/// Evaluable object kind accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum KindArg {
    /// A single rule.
    Rule,
    /// A control.
    Control,
    /// A framework.
    Framework,
}

impl From<KindArg> for EntrypointKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Rule => Self::Rules,
            KindArg::Control => Self::Controls,
            KindArg::Framework => Self::Frameworks,
        }
    }
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Bundle inspection report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    /// Policy module entry name.
    policy: String,
    /// Seed data entry name, if present.
    data: Option<String>,
    /// Entries in archive order.
    entries: Vec<EntryReport>,
    /// Control inputs declared by rule metadata.
    controls_inputs: BTreeMap<String, ControlInputOption>,
}

/// One bundle entry in an inspection report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryReport {
    /// Entry name.
    name: String,
    /// Entry role label.
    role: &'static str,
    /// Entry size in bytes.
    size: usize,
    /// Rule name for rule sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
    /// Rule metadata for rule sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Error message to display.
    message: String,
}

impl CliError {
    /// Creates a new CLI error with the provided message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Convenience alias for CLI results.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI workflow and returns an exit code.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_tracing();
    let config = RegolibConfig::load_optional(cli.config.as_deref())
        .map_err(|err| CliError::new(err.to_string()))?;
    match cli.command {
        Commands::Inspect {
            bundle,
        } => command_inspect(&config, &bundle),
        Commands::Patch {
            document,
            path,
            value,
        } => command_patch(&document, &path, &value),
        Commands::Remediate {
            document,
            result,
            kind,
        } => command_remediate(&document, &result, kind.into()),
    }
}

/// Installs a stderr log subscriber filtered by [`LOG_ENV_VAR`].
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `inspect` command.
fn command_inspect(config: &RegolibConfig, path: &Path) -> CliResult<ExitCode> {
    let bytes = read_bytes_with_limit(path, config.bundle.max_total_bytes)
        .map_err(|err| CliError::new(err.to_string()))?;
    let bundle = Bundle::from_archive(&bytes, &config.bundle)
        .map_err(|err| CliError::new(format!("failed to load bundle: {err}")))?;
    let report = inspect_bundle(&bundle);
    tracing::info!(entries = report.entries.len(), "bundle inspected");
    let value = serde_json::to_value(&report).map_err(|err| CliError::new(err.to_string()))?;
    write_document(&value, DocumentFormat::Json)?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the inspection report for an unpacked bundle.
fn inspect_bundle(bundle: &Bundle) -> InspectReport {
    let rules: Vec<CatalogEntry> = bundle
        .rule_sources()
        .map(|source| CatalogEntry {
            name: source.name.to_string(),
            metadata: rule_metadata(source.name, source.source),
        })
        .collect();
    let entries = bundle
        .entries()
        .iter()
        .map(|entry| {
            let role = bundle.role_of(entry);
            let rule = match role {
                EntryRole::Rule(name) => rules.iter().find(|rule| rule.name == name),
                _ => None,
            };
            EntryReport {
                name: entry.name.clone(),
                role: role_label(role),
                size: entry.bytes.len(),
                rule: rule.map(|rule| rule.name.clone()),
                metadata: rule.map(|rule| rule.metadata.clone()),
            }
        })
        .collect();
    InspectReport {
        policy: bundle.policy().name.clone(),
        data: bundle.data().map(|entry| entry.name.clone()),
        entries,
        controls_inputs: discover_controls_inputs(&rules),
    }
}

/// Returns the report label for an entry role.
const fn role_label(role: EntryRole<'_>) -> &'static str {
    match role {
        EntryRole::Policy => "policy",
        EntryRole::Data => "data",
        EntryRole::Rule(_) => "rule",
        EntryRole::Other => "other",
    }
}

/// Executes the `patch` command.
fn command_patch(path: &Path, expression: &str, raw_value: &str) -> CliResult<ExitCode> {
    let (document, format) = read_document(path).map_err(|err| CliError::new(err.to_string()))?;
    let patched = apply_patch(&document, expression, parse_value(raw_value))
        .map_err(|err| CliError::new(err.to_string()))?;
    write_document(&patched, format)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `remediate` command.
fn command_remediate(
    document_path: &Path,
    result_path: &Path,
    kind: EntrypointKind,
) -> CliResult<ExitCode> {
    let (document, _) =
        read_document(document_path).map_err(|err| CliError::new(err.to_string()))?;
    let (result, _) = read_document(result_path).map_err(|err| CliError::new(err.to_string()))?;
    let violations =
        collect_violations(kind, &result).map_err(|err| CliError::new(err.to_string()))?;
    let report = remediate(&document, &violations);
    tracing::info!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        unresolved = report.unresolved.len(),
        "remediation finished"
    );
    let value = serde_json::to_value(&report).map_err(|err| CliError::new(err.to_string()))?;
    write_document(&value, DocumentFormat::Json)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Renders a value and writes it to stdout.
fn write_document(value: &Value, format: DocumentFormat) -> CliResult<()> {
    let mut rendered = format.render(value).map_err(|err| CliError::new(err.to_string()))?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    write_stdout_bytes(rendered.as_bytes())
}

/// Writes raw bytes to stdout.
fn write_stdout_bytes(bytes: &[u8]) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(bytes)
        .map_err(|err| CliError::new(format!("failed to write output: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod main_tests;
