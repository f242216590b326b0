//! IRI utilities: validation, local names, namespaces, prefixed-name
//! expansion/compaction and URL normalization.
//!
//! Everything here is a pure function over strings.

use crate::error::TermError;

/// Characters that may never appear inside an IRI reference.
const FORBIDDEN: &[char] = &['<', '>', '"', '{', '}', '|', '^', '`', '\\'];

/// Validates an absolute IRI and returns it in canonical form.
///
/// Surrounding whitespace and angle brackets are stripped, so `<http://x/a>`
/// and ` http://x/a ` both canonicalize to `http://x/a`.
///
/// # Errors
///
/// Returns [`TermError`] if the input is empty, has no scheme, or contains
/// whitespace or characters forbidden in IRIs.
pub fn canonicalize(raw: &str) -> Result<String, TermError> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed);
    if inner.is_empty() {
        return Err(TermError::EmptyIri);
    }
    if inner.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(TermError::InvalidIri {
            iri: inner.to_owned(),
            reason: "contains whitespace",
        });
    }
    if inner.contains(FORBIDDEN) {
        return Err(TermError::InvalidIri {
            iri: inner.to_owned(),
            reason: "contains a forbidden character",
        });
    }
    if scheme_of(inner).is_none() {
        return Err(TermError::InvalidIri {
            iri: inner.to_owned(),
            reason: "not absolute (missing scheme)",
        });
    }
    Ok(inner.to_owned())
}

/// Returns true if `s` is an absolute IRI.
#[must_use]
pub fn is_absolute(s: &str) -> bool {
    canonicalize(s).is_ok()
}

/// Returns the scheme of an IRI (without the colon), if it has one.
#[must_use]
pub fn scheme_of(iri: &str) -> Option<&str> {
    let colon = iri.find(':')?;
    let scheme = &iri[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        Some(scheme)
    } else {
        None
    }
}

/// Byte offset just past the namespace part of `iri`.
fn split_point(iri: &str) -> usize {
    match iri.rfind(['#', '/']) {
        Some(i) => i + 1,
        None => iri.rfind(':').map_or(0, |i| i + 1),
    }
}

/// Returns the namespace of an IRI: everything up to and including the last
/// `#` or `/` (or the last `:` for IRIs such as URNs that have neither).
#[must_use]
pub fn namespace_of(iri: &str) -> &str {
    &iri[..split_point(iri)]
}

/// Returns the local name of an IRI: the substring after the last `#` or `/`.
///
/// Falls back to the whole IRI when the local part is empty.
#[must_use]
pub fn local_name(iri: &str) -> &str {
    let local = &iri[split_point(iri)..];
    if local.is_empty() {
        iri
    } else {
        local
    }
}

/// Expands a prefixed name (`ex:Thing`) using `lookup` to resolve the prefix.
///
/// Returns `None` when the input has no colon, the prefix is unknown, or the
/// input already looks like an absolute IRI with an authority (`http://...`).
pub fn expand<'a, F>(curie: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let (prefix, local) = curie.split_once(':')?;
    if local.starts_with("//") {
        return None;
    }
    let namespace = lookup(prefix)?;
    Some(format!("{namespace}{local}"))
}

/// Compacts `iri` to a prefixed name using the longest matching namespace.
///
/// Returns `None` when no namespace matches or the remaining local part is
/// not a valid Turtle local name.
pub fn compact<'a, I>(iri: &str, mappings: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    mappings
        .into_iter()
        .filter(|(_, ns)| !ns.is_empty() && iri.starts_with(ns))
        .filter(|(_, ns)| is_local_name(&iri[ns.len()..]))
        .max_by_key(|(prefix, ns)| (ns.len(), std::cmp::Reverse(*prefix)))
        .map(|(prefix, ns)| format!("{prefix}:{}", &iri[ns.len()..]))
}

/// Returns true if `s` can be written as the local part of a prefixed name.
#[must_use]
pub fn is_local_name(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphanumeric() || first == '_')
        && s.chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !s.ends_with('.')
}

/// Normalizes a source URL for load deduplication.
///
/// `http` is upgraded to `https`, the scheme and host are lower-cased and the
/// fragment is dropped (it is never sent to a server). Path, trailing slash and
/// query are preserved. Non-URL input is returned trimmed.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
    let Some(scheme) = scheme_of(without_fragment) else {
        return without_fragment.to_owned();
    };
    let rest = &without_fragment[scheme.len() + 1..];
    let scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" => "https".to_owned(),
        other => other.to_owned(),
    };
    match rest.strip_prefix("//") {
        Some(after) => {
            let (authority, path) = match after.find(['/', '?']) {
                Some(i) => after.split_at(i),
                None => (after, ""),
            };
            format!("{scheme}://{}{path}", authority.to_ascii_lowercase())
        }
        None => format!("{scheme}:{rest}"),
    }
}

/// Normalizes an ontology IRI found by discovery: [`normalize_url`] plus
/// removal of trailing `/` and `#`.
#[must_use]
pub fn normalize_ontology_iri(iri: &str) -> String {
    let trimmed = iri.trim().trim_end_matches(['#', '/']);
    normalize_url(trimmed)
        .trim_end_matches('/')
        .to_owned()
}

/// Scheme-agnostic identity key: `http://x/onto`, `https://x/onto/` and
/// `https://X/onto#` all map to the same key.
#[must_use]
pub fn equivalence_key(url: &str) -> String {
    let normalized = normalize_ontology_iri(url);
    match normalized.split_once("://") {
        Some((_, rest)) => rest.to_owned(),
        None => normalized,
    }
}

/// Returns true if the two URLs identify the same source, ignoring scheme,
/// trailing separators and fragments.
#[must_use]
pub fn same_source(a: &str, b: &str) -> bool {
    equivalence_key(a) == equivalence_key(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_strips_brackets() {
        assert_eq!(
            canonicalize(" <http://example.org/a> ").as_deref(),
            Ok("http://example.org/a")
        );
    }

    #[test]
    fn canonicalize_rejects_relative_and_spaces() {
        assert!(canonicalize("relative/path").is_err());
        assert!(canonicalize("http://example.org/a b").is_err());
        assert_eq!(canonicalize("  "), Err(TermError::EmptyIri));
    }

    #[test]
    fn local_name_and_namespace() {
        assert_eq!(local_name("http://example.org/test#MyClass"), "MyClass");
        assert_eq!(namespace_of("http://example.org/test#MyClass"), "http://example.org/test#");
        assert_eq!(local_name("http://xmlns.com/foaf/0.1/Person"), "Person");
        assert_eq!(namespace_of("urn:isbn:12345"), "urn:isbn:");
        assert_eq!(local_name("http://example.org/onto/"), "http://example.org/onto/");
    }

    #[test]
    fn expand_and_compact() {
        let lookup = |p: &str| (p == "ex").then_some("http://example.org/");
        assert_eq!(
            expand("ex:Thing", lookup).as_deref(),
            Some("http://example.org/Thing")
        );
        assert_eq!(expand("http://example.org/x", lookup), None);
        assert_eq!(expand("nope:Thing", lookup), None);

        let mappings = [
            ("ex", "http://example.org/"),
            ("exs", "http://example.org/sub/"),
        ];
        assert_eq!(
            compact("http://example.org/sub/Item", mappings).as_deref(),
            Some("exs:Item")
        );
        assert_eq!(compact("http://other.org/Item", mappings), None);
        assert_eq!(compact("http://example.org/a/b", [("ex", "http://example.org/")]), None);
    }

    #[test]
    fn normalize_url_prefers_https_and_keeps_path() {
        assert_eq!(
            normalize_url("HTTP://Example.org/onto/?v=1#frag"),
            "https://example.org/onto/?v=1"
        );
        assert_eq!(normalize_url("file:///tmp/a.ttl"), "file:///tmp/a.ttl");
    }

    #[test]
    fn ontology_iris_trim_trailing_separators() {
        assert_eq!(
            normalize_ontology_iri("http://purl.org/dc/terms/"),
            "https://purl.org/dc/terms"
        );
        assert_eq!(
            normalize_ontology_iri("http://www.w3.org/ns/prov#"),
            "https://www.w3.org/ns/prov"
        );
    }

    #[test]
    fn scheme_agnostic_equivalence() {
        assert!(same_source("http://x/onto", "https://x/onto"));
        assert!(same_source("http://x/onto/", "https://x/onto"));
        assert!(!same_source("http://x/onto", "http://x/other"));
    }
}
