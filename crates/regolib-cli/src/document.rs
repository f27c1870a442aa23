// crates/regolib-cli/src/document.rs
// ============================================================================
// Module: CLI Documents
// Description: Bounded file reads and JSON/YAML document handling.
// Purpose: Read untrusted inputs safely and render results.
// Dependencies: serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! Resource documents and stored results may be JSON or YAML, chosen by file
//! extension. Every read is bounded so oversized inputs fail closed before
//! they are parsed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a resource document or stored result.
pub(crate) const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Document read and parse errors.
#[derive(Debug, Error)]
pub(crate) enum DocumentError {
    /// File I/O failure.
    #[error("failed to read {path}: {error}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        error: std::io::Error,
    },
    /// File exceeds the size limit.
    #[error("{path} is {size} bytes; limit is {limit}")]
    TooLarge {
        /// File path.
        path: String,
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
    /// File contents could not be parsed.
    #[error("failed to parse {path} as {format}: {error}")]
    Parse {
        /// File path.
        path: String,
        /// Expected format.
        format: DocumentFormat,
        /// Parser message.
        error: String,
    },
    /// Document could not be rendered.
    #[error("failed to render {format}: {error}")]
    Render {
        /// Output format.
        format: DocumentFormat,
        /// Serializer message.
        error: String,
    },
}

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Document serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentFormat {
    /// JSON text.
    Json,
    /// YAML text.
    Yaml,
}

impl DocumentFormat {
    /// Selects the format from a file extension; anything but YAML is JSON.
    pub(crate) fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }

    /// Parses bytes in this format.
    pub(crate) fn parse(self, bytes: &[u8]) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|err| err.to_string()),
            Self::Yaml => serde_yaml::from_slice(bytes).map_err(|err| err.to_string()),
        }
    }

    /// Renders a value in this format.
    pub(crate) fn render(self, value: &Value) -> Result<String, DocumentError> {
        let rendered = match self {
            Self::Json => serde_json::to_string_pretty(value).map_err(|err| err.to_string()),
            Self::Yaml => serde_yaml::to_string(value).map_err(|err| err.to_string()),
        };
        rendered.map_err(|error| DocumentError::Render {
            format: self,
            error,
        })
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
        }
    }
}

// ============================================================================
// SECTION: Reads
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
pub(crate) fn read_bytes_with_limit(
    path: &Path,
    max_bytes: usize,
) -> Result<Vec<u8>, DocumentError> {
    let io_error = |error| DocumentError::Io {
        path: path.display().to_string(),
        error,
    };
    let too_large = |size| DocumentError::TooLarge {
        path: path.display().to_string(),
        size,
        limit: max_bytes,
    };
    let file = File::open(path).map_err(io_error)?;
    let size = file.metadata().map_err(io_error)?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| too_large(size))?;
    if size > limit {
        return Err(too_large(size));
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(io_error)?;
    if bytes.len() > max_bytes {
        return Err(too_large(u64::try_from(bytes.len()).unwrap_or(u64::MAX)));
    }
    Ok(bytes)
}

/// Reads and parses a JSON or YAML document.
pub(crate) fn read_document(path: &Path) -> Result<(Value, DocumentFormat), DocumentError> {
    let format = DocumentFormat::from_path(path);
    let bytes = read_bytes_with_limit(path, MAX_DOCUMENT_BYTES)?;
    let value = format.parse(&bytes).map_err(|error| DocumentError::Parse {
        path: path.display().to_string(),
        format,
        error,
    })?;
    Ok((value, format))
}

/// Parses a command-line value as JSON, falling back to a plain string.
pub(crate) fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
