// crates/regolib-core/src/bundle.rs
// ============================================================================
// Module: Policy Bundle
// Description: Gzip + tar policy bundle unpacking and entry lookup.
// Purpose: Turn archive bytes into named blobs with bounded decompression.
// Dependencies: flate2, regolib-config, tar, thiserror, tracing
// ============================================================================

//! ## Overview
//! A bundle is a gzip-compressed tar archive holding one compiled policy
//! module, an optional seed data document, and optional rule sources. Entry
//! names are normalized to a leading `/`. Decompression is bounded by the
//! per-entry and total limits in [`BundleConfig`]; exceeding either fails
//! closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;

use flate2::read::GzDecoder;
use regolib_config::BundleConfig;
use tar::Archive;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Bundle unpacking errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The archive could not be decompressed or unpacked.
    #[error("bundle archive unreadable: {0}")]
    Archive(String),
    /// A single entry exceeded the per-entry limit.
    #[error("bundle entry `{name}` exceeds {limit} bytes")]
    EntryTooLarge {
        /// Entry name.
        name: String,
        /// Configured limit in bytes.
        limit: usize,
    },
    /// The archive exceeded the total size limit.
    #[error("bundle exceeds {limit} bytes")]
    TooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },
    /// No policy module was found after a full scan.
    #[error("policy module `{entry}` not found in bundle")]
    MissingPolicy {
        /// Expected policy entry name.
        entry: String,
    },
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Named blob unpacked from a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Entry name with a leading `/`.
    pub name: String,
    /// Entry contents.
    pub bytes: Vec<u8>,
}

/// Role an entry plays inside a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole<'a> {
    /// The compiled policy module.
    Policy,
    /// The seed data document.
    Data,
    /// A rule source, with the rule name.
    Rule(&'a str),
    /// Any other entry.
    Other,
}

/// Rule source entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSource<'a> {
    /// Rule name as it appears in the archive path.
    pub name: &'a str,
    /// Raw source bytes.
    pub source: &'a [u8],
}

/// Unpacked policy bundle.
///
/// # Invariants
/// - `policy` always indexes an entry named after the configured policy entry.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Entries in archive order.
    entries: Vec<BundleEntry>,
    /// Index of the policy module entry.
    policy: usize,
    /// Index of the seed data entry.
    data: Option<usize>,
    /// Rule source directory prefix.
    rules_prefix: String,
    /// Rule source filename suffix.
    rules_suffix: String,
}

impl Bundle {
    /// Unpacks a gzip + tar archive.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError`] when the archive is unreadable, exceeds a
    /// size limit, or has no policy module.
    pub fn from_archive(bytes: &[u8], config: &BundleConfig) -> Result<Self, BundleError> {
        let entries = unpack(bytes, config)?;
        let policy = locate_policy(&entries, &config.policy_entry).ok_or_else(|| {
            BundleError::MissingPolicy {
                entry: config.policy_entry.clone(),
            }
        })?;
        let data = entries.iter().position(|entry| entry.name == config.data_entry);
        tracing::debug!(
            entries = entries.len(),
            has_data = data.is_some(),
            "policy bundle unpacked"
        );
        Ok(Self {
            entries,
            policy,
            data,
            rules_prefix: config.rules_prefix.clone(),
            rules_suffix: config.rules_suffix.clone(),
        })
    }

    /// Returns all entries in archive order.
    #[must_use]
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Returns the policy module entry.
    #[must_use]
    pub fn policy(&self) -> &BundleEntry {
        &self.entries[self.policy]
    }

    /// Returns the seed data entry, if present.
    #[must_use]
    pub fn data(&self) -> Option<&BundleEntry> {
        self.data.map(|index| &self.entries[index])
    }

    /// Returns every rule source in archive order.
    pub fn rule_sources(&self) -> impl Iterator<Item = RuleSource<'_>> {
        self.entries.iter().filter_map(|entry| {
            self.rule_name(&entry.name).map(|name| RuleSource {
                name,
                source: &entry.bytes,
            })
        })
    }

    /// Classifies an entry by its role in this bundle.
    #[must_use]
    pub fn role_of<'a>(&self, entry: &'a BundleEntry) -> EntryRole<'a> {
        if entry.name == self.policy().name {
            return EntryRole::Policy;
        }
        if self.data().is_some_and(|data| data.name == entry.name) {
            return EntryRole::Data;
        }
        self.rule_name(&entry.name).map_or(EntryRole::Other, EntryRole::Rule)
    }

    /// Extracts the rule name from a rule source entry name.
    fn rule_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        let rule = name.strip_prefix(&self.rules_prefix)?.strip_suffix(&self.rules_suffix)?;
        (!rule.is_empty()).then_some(rule)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decompresses and unpacks every regular file entry.
fn unpack(bytes: &[u8], config: &BundleConfig) -> Result<Vec<BundleEntry>, BundleError> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let iter = archive.entries().map_err(|err| BundleError::Archive(err.to_string()))?;
    let read_limit = u64::try_from(config.max_entry_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut entries = Vec::new();
    let mut total = 0usize;
    for entry in iter {
        let mut entry = entry.map_err(|err| BundleError::Archive(err.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = {
            let path = entry.path().map_err(|err| BundleError::Archive(err.to_string()))?;
            normalize_entry_name(&path.to_string_lossy())
        };
        let mut contents = Vec::new();
        (&mut entry)
            .take(read_limit)
            .read_to_end(&mut contents)
            .map_err(|err| BundleError::Archive(err.to_string()))?;
        if contents.len() > config.max_entry_bytes {
            return Err(BundleError::EntryTooLarge {
                name,
                limit: config.max_entry_bytes,
            });
        }
        total = total.saturating_add(contents.len());
        if total > config.max_total_bytes {
            return Err(BundleError::TooLarge {
                limit: config.max_total_bytes,
            });
        }
        entries.push(BundleEntry {
            name,
            bytes: contents,
        });
    }
    Ok(entries)
}

/// Finds the policy module, checking the last entry before a full scan.
fn locate_policy(entries: &[BundleEntry], policy_entry: &str) -> Option<usize> {
    if entries.last().is_some_and(|entry| entry.name == policy_entry) {
        return Some(entries.len() - 1);
    }
    tracing::debug!("policy module is not the last bundle entry; scanning");
    entries.iter().position(|entry| entry.name == policy_entry)
}

/// Normalizes an archive path to a single leading `/`.
fn normalize_entry_name(raw: &str) -> String {
    let mut name = raw;
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    format!("/{}", name.trim_start_matches('/'))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
