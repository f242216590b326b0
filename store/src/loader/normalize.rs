//! Source identifiers: URL vs inline content, and the keys used for
//! in-flight deduplication.

use sha2::{Digest, Sha256};

use crate::iri;

/// What a load reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// A document to fetch.
    Url(String),
    /// Document text supplied by the caller.
    Content {
        /// The text.
        text: String,
        /// Declared media type, if known.
        media_type: Option<String>,
        /// Display name.
        name: Option<String>,
    },
}

impl LoadSource {
    /// Classifies a raw identifier. Absolute `http`, `https` and `file` IRIs
    /// without whitespace are URLs; anything else is inline content.
    #[must_use]
    pub fn from_identifier(identifier: &str) -> Self {
        let trimmed = identifier.trim();
        let is_url = !trimmed.chars().any(char::is_whitespace)
            && iri::scheme_of(trimmed)
                .is_some_and(|s| matches!(s.to_ascii_lowercase().as_str(), "http" | "https" | "file"));
        if is_url {
            LoadSource::Url(trimmed.to_owned())
        } else {
            LoadSource::Content {
                text: identifier.to_owned(),
                media_type: None,
                name: None,
            }
        }
    }

    /// Inline content with a declared media type.
    #[must_use]
    pub fn content(text: impl Into<String>, media_type: Option<&str>) -> Self {
        LoadSource::Content {
            text: text.into(),
            media_type: media_type.map(str::to_owned),
            name: None,
        }
    }

    /// Normalized key: the normalized URL, or `content:<sha256-hex>`.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            LoadSource::Url(url) => fetch_url(url),
            LoadSource::Content { text, .. } => content_key(text),
        }
    }

    /// Display name for records and logs.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            LoadSource::Url(url) => crate::catalog::lookup(url).map_or_else(
                || {
                    let trimmed = url.trim_end_matches(['/', '#']);
                    iri::local_name(trimmed).to_owned()
                },
                |entry| entry.name.to_owned(),
            ),
            LoadSource::Content { name, .. } => name.clone().unwrap_or_else(|| "inline content".to_owned()),
        }
    }

    /// Returns true for URL sources.
    #[must_use]
    pub fn is_url(&self) -> bool {
        matches!(self, LoadSource::Url(_))
    }
}

/// The URL actually requested for `url`. Upgrades `http` to `https`, except
/// for `file` URLs which are kept as they are.
#[must_use]
pub fn fetch_url(url: &str) -> String {
    iri::normalize_url(url)
}

/// Deduplication key of inline content.
#[must_use]
pub fn content_key(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("content:{hex}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_content_are_told_apart() {
        assert!(LoadSource::from_identifier("https://example.org/onto.ttl").is_url());
        assert!(LoadSource::from_identifier(" file:///tmp/a.ttl ").is_url());
        assert!(!LoadSource::from_identifier("@prefix ex: <http://ex/> .").is_url());
        assert!(!LoadSource::from_identifier("urn:isbn:123").is_url());
    }

    #[test]
    fn keys_normalize_scheme_but_keep_path() {
        let a = LoadSource::Url("http://Example.org/onto/".into());
        let b = LoadSource::Url("https://example.org/onto/".into());
        let c = LoadSource::Url("https://example.org/onto".into());
        assert_eq!(a.key(), b.key());
        assert_ne!(b.key(), c.key());
    }

    #[test]
    fn identical_content_shares_a_key() {
        let a = LoadSource::content("<a> <b> <c> .", None);
        let b = LoadSource::content("<a> <b> <c> .", Some("application/n-triples"));
        assert_eq!(a.key(), b.key());
        assert!(a.key().starts_with("content:"));
        assert_eq!(a.key().len(), "content:".len() + 64);
    }

    #[test]
    fn display_names_prefer_the_catalog() {
        assert_eq!(LoadSource::Url("http://xmlns.com/foaf/0.1/".into()).display_name(), "FOAF");
        assert_eq!(
            LoadSource::Url("https://example.org/onto/pizza.owl".into()).display_name(),
            "pizza.owl"
        );
    }
}
