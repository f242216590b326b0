//! Namespace registry: prefix → namespace IRI, with a derived display color.
//!
//! The registry is the single source of truth for prefix resolution.
//! Registration is idempotent: mapping a prefix to the namespace it already
//! has is a no-op. Mapping it to a *different* namespace is a conflict,
//! resolved by the configured [`ConflictPolicy`] (first registration wins by
//! default) and always logged.
//!
//! Consumers never read the registry directly; they read a
//! [`RegistrySnapshot`], rebuilt wholesale whenever the fat-map index is
//! published.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::iri;

/// What to do when a prefix is re-registered with a different namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the existing mapping and log the conflict.
    #[default]
    FirstWins,
    /// Replace the existing mapping and log the replacement.
    Overwrite,
}

/// Result of a single registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The prefix was new.
    Added,
    /// The prefix already mapped to this namespace.
    Unchanged,
    /// The prefix maps to another namespace, which was kept.
    Conflict {
        /// The namespace that stays registered.
        existing: String,
    },
    /// The prefix mapped to another namespace, which was replaced.
    Overwritten {
        /// The namespace that was replaced.
        previous: String,
    },
    /// The namespace is not an absolute IRI; nothing was registered.
    Rejected,
}

/// Counts from merging a batch of declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Newly registered prefixes.
    pub added: usize,
    /// Declarations that were already registered identically.
    pub unchanged: usize,
    /// Conflicting declarations (kept or overwritten per policy).
    pub conflicts: usize,
    /// Declarations with a non-absolute namespace.
    pub rejected: usize,
}

/// One prefix mapping as published to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceEntry {
    /// The prefix (may be empty for the default `:` prefix).
    pub prefix: String,
    /// The namespace IRI.
    pub namespace: String,
    /// Display color derived from the namespace, as `#rrggbb`.
    pub color: String,
}

/// Mutable prefix registry.
#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    by_prefix: BTreeMap<String, String>,
    policy: ConflictPolicy,
}

impl NamespaceRegistry {
    /// Creates an empty registry with the given conflict policy.
    #[must_use]
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            by_prefix: BTreeMap::new(),
            policy,
        }
    }

    /// Creates a registry seeded with the well-known ontology prefixes.
    #[must_use]
    pub fn with_well_known(policy: ConflictPolicy) -> Self {
        let mut registry = Self::new(policy);
        for entry in crate::catalog::WELL_KNOWN {
            registry.register(entry.prefix, entry.namespace);
        }
        registry
    }

    /// Registers `prefix → namespace`.
    pub fn register(&mut self, prefix: &str, namespace: &str) -> MergeOutcome {
        let Ok(namespace) = iri::canonicalize(namespace) else {
            debug!(prefix, namespace, "ignoring prefix with non-absolute namespace");
            return MergeOutcome::Rejected;
        };
        match self.by_prefix.get(prefix) {
            None => {
                self.by_prefix.insert(prefix.to_owned(), namespace);
                MergeOutcome::Added
            }
            Some(existing) if *existing == namespace => MergeOutcome::Unchanged,
            Some(existing) => match self.policy {
                ConflictPolicy::FirstWins => {
                    warn!(
                        prefix,
                        existing = %existing,
                        rejected = %namespace,
                        "prefix already registered to a different namespace; keeping the first"
                    );
                    MergeOutcome::Conflict {
                        existing: existing.clone(),
                    }
                }
                ConflictPolicy::Overwrite => {
                    warn!(
                        prefix,
                        previous = %existing,
                        namespace = %namespace,
                        "prefix re-registered to a different namespace; overwriting"
                    );
                    let previous = existing.clone();
                    self.by_prefix.insert(prefix.to_owned(), namespace);
                    MergeOutcome::Overwritten { previous }
                }
            },
        }
    }

    /// Registers every declaration, in order.
    pub fn merge<'a, I>(&mut self, declarations: I) -> MergeSummary
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut summary = MergeSummary::default();
        for (prefix, namespace) in declarations {
            match self.register(prefix, namespace) {
                MergeOutcome::Added => summary.added += 1,
                MergeOutcome::Unchanged => summary.unchanged += 1,
                MergeOutcome::Conflict { .. } | MergeOutcome::Overwritten { .. } => {
                    summary.conflicts += 1;
                }
                MergeOutcome::Rejected => summary.rejected += 1,
            }
        }
        summary
    }

    /// Returns the namespace registered for `prefix`.
    #[must_use]
    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }

    /// Returns the first prefix (alphabetically) registered for `namespace`.
    #[must_use]
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.by_prefix
            .iter()
            .find(|(_, ns)| ns.as_str() == namespace)
            .map(|(p, _)| p.as_str())
    }

    /// Expands a prefixed name.
    #[must_use]
    pub fn expand(&self, curie: &str) -> Option<String> {
        iri::expand(curie, |p| self.namespace(p))
    }

    /// Compacts an IRI to a prefixed name.
    #[must_use]
    pub fn compact(&self, iri_str: &str) -> Option<String> {
        iri::compact(iri_str, self.iter())
    }

    /// Iterates `(prefix, namespace)` pairs in prefix order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_prefix.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    /// Number of registered prefixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_prefix.len()
    }

    /// Returns true if no prefix is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }

    /// Conflict policy in force.
    #[must_use]
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Builds a snapshot covering every registered prefix plus `required`
    /// namespaces. Required namespaces with no registered prefix get a
    /// synthesized `nsN` prefix, numbered in namespace order.
    #[must_use]
    pub fn snapshot<'a, I>(&self, required: I) -> RegistrySnapshot
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries: BTreeMap<String, String> = self.by_prefix.clone();
        let covered: BTreeSet<&str> = self.by_prefix.values().map(String::as_str).collect();
        let missing: BTreeSet<&str> = required
            .into_iter()
            .filter(|ns| !ns.is_empty() && !covered.contains(ns))
            .collect();

        let mut counter = 0usize;
        for namespace in missing {
            let prefix = loop {
                counter += 1;
                let candidate = format!("ns{counter}");
                if !entries.contains_key(&candidate) {
                    break candidate;
                }
            };
            entries.insert(prefix, namespace.to_owned());
        }

        RegistrySnapshot {
            entries: entries
                .into_iter()
                .map(|(prefix, namespace)| NamespaceEntry {
                    color: namespace_color(&namespace),
                    prefix,
                    namespace,
                })
                .collect(),
        }
    }
}

/// Immutable, published view of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    entries: Vec<NamespaceEntry>,
}

impl RegistrySnapshot {
    /// All entries, in prefix order.
    #[must_use]
    pub fn entries(&self) -> &[NamespaceEntry] {
        &self.entries
    }

    /// Returns the namespace for `prefix`.
    #[must_use]
    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.prefix == prefix)
            .map(|e| e.namespace.as_str())
    }

    /// Returns the entry for `namespace`.
    #[must_use]
    pub fn entry_for_namespace(&self, namespace: &str) -> Option<&NamespaceEntry> {
        self.entries.iter().find(|e| e.namespace == namespace)
    }

    /// Returns true if some prefix maps to `namespace`.
    #[must_use]
    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.entry_for_namespace(namespace).is_some()
    }

    /// Compacts an IRI to a prefixed name.
    #[must_use]
    pub fn compact(&self, iri_str: &str) -> Option<String> {
        iri::compact(
            iri_str,
            self.entries
                .iter()
                .map(|e| (e.prefix.as_str(), e.namespace.as_str())),
        )
    }

    /// Expands a prefixed name.
    #[must_use]
    pub fn expand(&self, curie: &str) -> Option<String> {
        iri::expand(curie, |p| self.namespace(p))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derives a stable pastel display color for a namespace.
///
/// The hue comes from the namespace's SHA-256 digest, so the same namespace
/// always gets the same color across sessions.
#[must_use]
pub fn namespace_color(namespace: &str) -> String {
    let digest = Sha256::digest(namespace.as_bytes());
    let hue = f64::from(u16::from_be_bytes([digest[0], digest[1]]) % 360);
    let (r, g, b) = hsl_to_rgb(hue, 0.65, 0.75);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r1), channel(g1), channel(b1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_is_idempotent() {
        let mut registry = NamespaceRegistry::new(ConflictPolicy::FirstWins);
        assert_eq!(registry.register("ex", "http://example.org/"), MergeOutcome::Added);
        assert_eq!(registry.register("ex", "http://example.org/"), MergeOutcome::Unchanged);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot([]).len(), 1);
    }

    #[test]
    fn first_registration_wins_by_default() {
        let mut registry = NamespaceRegistry::new(ConflictPolicy::FirstWins);
        registry.register("ex", "http://example.org/");
        let outcome = registry.register("ex", "http://other.org/");
        assert_eq!(
            outcome,
            MergeOutcome::Conflict {
                existing: "http://example.org/".to_owned()
            }
        );
        assert_eq!(registry.namespace("ex"), Some("http://example.org/"));
    }

    #[test]
    fn overwrite_policy_replaces() {
        let mut registry = NamespaceRegistry::new(ConflictPolicy::Overwrite);
        registry.register("ex", "http://example.org/");
        registry.register("ex", "http://other.org/");
        assert_eq!(registry.namespace("ex"), Some("http://other.org/"));
    }

    #[test]
    fn relative_namespaces_are_rejected() {
        let mut registry = NamespaceRegistry::default();
        assert_eq!(registry.register("rel", "relative#"), MergeOutcome::Rejected);
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_synthesizes_prefixes_for_unregistered_namespaces() {
        let mut registry = NamespaceRegistry::default();
        registry.register("ex", "http://example.org/");
        registry.register("ns1", "http://taken.org/");
        let snapshot = registry.snapshot(["http://b.org/", "http://a.org/", "http://example.org/"]);
        assert_eq!(snapshot.namespace("ns2"), Some("http://a.org/"));
        assert_eq!(snapshot.namespace("ns3"), Some("http://b.org/"));
        assert_eq!(snapshot.len(), 4);
        assert!(snapshot.contains_namespace("http://example.org/"));
    }

    #[test]
    fn colors_are_stable_hex() {
        let a = namespace_color("http://example.org/");
        assert_eq!(a, namespace_color("http://example.org/"));
        assert_eq!(a.len(), 7);
        assert!(a.starts_with('#'));
    }

    #[test]
    fn merge_counts_outcomes() {
        let mut registry = NamespaceRegistry::default();
        let summary = registry.merge([
            ("ex", "http://example.org/"),
            ("ex", "http://example.org/"),
            ("ex", "http://elsewhere.org/"),
            ("bad", "nope"),
        ]);
        assert_eq!(
            summary,
            MergeSummary {
                added: 1,
                unchanged: 1,
                conflicts: 1,
                rejected: 1
            }
        );
    }
}
