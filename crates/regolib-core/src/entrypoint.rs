// crates/regolib-core/src/entrypoint.rs
// ============================================================================
// Module: Entrypoint Registry
// Description: Naming rules for policy entry points and rule discovery.
// Purpose: Map human-facing object names to engine entry point identifiers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Entry points are addressed as `armo_builtins/<kind>/<name>[/...]`. Every
//! part is normalized by replacing characters outside `[A-Za-z0-9]` with `_`,
//! so the engine only ever sees normalized names. Only rules are discovered
//! from the engine's entry point list; controls and frameworks come from
//! introspection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed namespace of every library entry point.
pub const NAMESPACE: &str = "armo_builtins";
/// Trailing segment of a rule's evaluable entry point.
pub const RAW_RULE: &str = "raw";
/// Result field every convenience evaluation narrows to.
pub const RESULT_FIELD: &str = "deny";

// ============================================================================
// SECTION: Kinds
// ============================================================================

/// Kind of an evaluable library object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrypointKind {
    /// Single policy rule.
    Rules,
    /// Control composed of rules.
    Controls,
    /// Framework composed of controls.
    Frameworks,
}

impl EntrypointKind {
    /// All kinds in catalog order.
    pub const ALL: [Self; 3] = [Self::Rules, Self::Controls, Self::Frameworks];

    /// Returns the entry point segment for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Controls => "controls",
            Self::Frameworks => "frameworks",
        }
    }

    /// Returns the singular label used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rules => "rule",
            Self::Controls => "control",
            Self::Frameworks => "framework",
        }
    }

    /// Parses an entry point segment into a kind.
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == segment)
    }

    /// Returns the unnormalized entry point parts evaluating `name`.
    #[must_use]
    pub fn entrypoint_parts(self, name: &str) -> Vec<&str> {
        match self {
            Self::Rules => vec![NAMESPACE, self.as_str(), name, RAW_RULE],
            Self::Controls | Self::Frameworks => vec![NAMESPACE, self.as_str(), name],
        }
    }
}

impl fmt::Display for EntrypointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Naming
// ============================================================================

/// Replaces every character outside `[A-Za-z0-9]` with `_`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.chars().map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' }).collect()
}

/// Normalizes each part and joins them with `/`.
#[must_use]
pub fn format_entrypoint<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts.into_iter().map(|part| normalize_name(part.as_ref())).collect::<Vec<_>>().join("/")
}

/// Parsed library entry point.
///
/// # Invariants
/// - `namespace` is always [`NAMESPACE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointId {
    /// Object kind.
    pub kind: EntrypointKind,
    /// Normalized object name.
    pub name: String,
    /// Remaining segments after the name.
    pub rest: Vec<String>,
}

impl EntrypointId {
    /// Parses an engine entry point name.
    ///
    /// Returns `None` for foreign namespaces, unknown kinds, and names with
    /// fewer than three segments.
    #[must_use]
    pub fn parse(entrypoint: &str) -> Option<Self> {
        let mut segments = entrypoint.split('/');
        if segments.next()? != NAMESPACE {
            return None;
        }
        let kind = EntrypointKind::from_segment(segments.next()?)?;
        let name = segments.next()?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            name: name.to_string(),
            rest: segments.map(str::to_string).collect(),
        })
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Rule names discovered from the engine's entry points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrypointRegistry {
    /// Normalized rule names.
    rules: BTreeSet<String>,
}

impl EntrypointRegistry {
    /// Registers every rule entry point among `entrypoints`.
    pub fn scan<'a, I>(entrypoints: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let rules = entrypoints
            .into_iter()
            .filter_map(EntrypointId::parse)
            .filter(|id| id.kind == EntrypointKind::Rules)
            .map(|id| id.name)
            .collect();
        Self {
            rules,
        }
    }

    /// Returns registered rule names in sorted order.
    pub fn rules(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(String::as_str)
    }

    /// Returns true when `name` is a registered rule.
    #[must_use]
    pub fn contains_rule(&self, name: &str) -> bool {
        self.rules.contains(name)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use super::EntrypointId;
    use super::EntrypointKind;
    use super::format_entrypoint;
    use super::normalize_name;

    #[test]
    fn normalize_replaces_non_alphanumerics() {
        assert_eq!(normalize_name("C-0001"), "C_0001");
        assert_eq!(normalize_name("NSA CISA v1.0"), "NSA_CISA_v1_0");
        assert_eq!(normalize_name("ok123"), "ok123");
    }

    #[test]
    fn rules_use_raw_entrypoint() {
        let parts = EntrypointKind::Rules.entrypoint_parts("rule-privilege-escalation");
        assert_eq!(
            format_entrypoint(parts),
            "armo_builtins/rules/rule_privilege_escalation/raw"
        );
    }

    #[test]
    fn parse_requires_namespace_and_three_segments() {
        assert!(EntrypointId::parse("armo_builtins/controls").is_none());
        assert!(EntrypointId::parse("other/rules/x").is_none());
        assert!(EntrypointId::parse("armo_builtins/widgets/x").is_none());
        let id = EntrypointId::parse("armo_builtins/rules/x/raw").unwrap();
        assert_eq!(id.kind, EntrypointKind::Rules);
        assert_eq!(id.name, "x");
        assert_eq!(id.rest, vec!["raw".to_string()]);
    }
}
