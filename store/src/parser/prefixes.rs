//! Prefix declarations reported alongside the quad stream.
//!
//! Parsers consume prefix directives without exposing them, so they are
//! recovered from the raw text here. Only absolute namespaces are reported.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use super::format::RdfFormat;
use crate::iri;

fn turtle_prefix_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^\s*@?prefix\s+([A-Za-z_][\w.\-]*)?:\s*<([^>\s]*)>").ok())
        .as_ref()
}

fn xmlns_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"xmlns:([A-Za-z_][\w.\-]*)\s*=\s*["']([^"']*)["']"#).ok())
        .as_ref()
}

/// Extracts `prefix → namespace` declarations from a document.
///
/// Later declarations of the same prefix within one document win, matching
/// how the parsers themselves resolve redefinitions.
#[must_use]
pub fn extract(format: RdfFormat, text: &str) -> BTreeMap<String, String> {
    let mut found = BTreeMap::new();
    match format {
        RdfFormat::Turtle | RdfFormat::TriG => {
            if let Some(re) = turtle_prefix_re() {
                for caps in re.captures_iter(text) {
                    let prefix = caps.get(1).map_or("", |m| m.as_str());
                    let namespace = caps.get(2).map_or("", |m| m.as_str());
                    keep(&mut found, prefix, namespace);
                }
            }
        }
        RdfFormat::RdfXml => {
            if let Some(re) = xmlns_re() {
                for caps in re.captures_iter(text) {
                    let prefix = caps.get(1).map_or("", |m| m.as_str());
                    let namespace = caps.get(2).map_or("", |m| m.as_str());
                    keep(&mut found, prefix, namespace);
                }
            }
        }
        RdfFormat::JsonLd => {
            if let Ok(doc) = serde_json::from_str::<serde_json::Value>(text) {
                collect_contexts(&doc, &mut found);
            }
        }
        RdfFormat::NTriples | RdfFormat::NQuads => {}
    }
    found
}

fn keep(found: &mut BTreeMap<String, String>, prefix: &str, namespace: &str) {
    if iri::is_absolute(namespace) {
        found.insert(prefix.to_owned(), namespace.to_owned());
    }
}

fn collect_contexts(value: &serde_json::Value, found: &mut BTreeMap<String, String>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(ctx) = map.get("@context") {
                collect_context_members(ctx, found);
            }
            if let Some(graph) = map.get("@graph") {
                collect_contexts(graph, found);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_contexts(item, found);
            }
        }
        _ => {}
    }
}

fn collect_context_members(ctx: &serde_json::Value, found: &mut BTreeMap<String, String>) {
    match ctx {
        serde_json::Value::Object(members) => {
            for (term, definition) in members {
                if term.starts_with('@') {
                    continue;
                }
                // Only plain `"prefix": "namespace"` members declare prefixes.
                if let serde_json::Value::String(namespace) = definition {
                    if namespace.ends_with(['/', '#', ':']) {
                        keep(found, term, namespace);
                    }
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_context_members(item, found);
            }
        }
        _ => {}
    }
}
