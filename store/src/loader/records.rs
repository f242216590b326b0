//! Loaded-source records: per-source load status for display and for
//! discovery's "already loaded" check.
//!
//! Records are keyed by the scheme-agnostic equivalence key of their URL, so
//! `http://x/onto` and `https://x/onto/` share one record. They are a cache
//! over the store and can be cleared at any time.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::iri;

/// How a source came to be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    /// Inline content handed over by the caller.
    Requested,
    /// A URL the caller asked for.
    Fetched,
    /// An ontology found by discovery.
    Discovered,
    /// A core vocabulary.
    Core,
}

/// Load status of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadStatus {
    /// Loading has started.
    Pending,
    /// Quads were inserted and indexed.
    Ok,
    /// Loading failed; see `load_error`.
    Fail,
}

/// One loaded (or loading, or failed) source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    /// The URL as requested (normalized).
    pub url: String,
    /// The ontology IRI declared by the document, when it differs from `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    /// Display name.
    pub name: String,
    /// Origin of the source.
    pub source: SourceKind,
    /// Graph the quads were written to.
    pub graph_name: String,
    /// Current status.
    pub load_status: LoadStatus,
    /// Failure message when `load_status` is `fail`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

/// Thread-safe table of [`SourceRecord`]s.
#[derive(Debug, Default)]
pub struct SourceRecords {
    inner: RwLock<BTreeMap<String, SourceRecord>>,
}

impl SourceRecords {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or resets the record for `url` to `pending`.
    pub fn mark_pending(&self, url: &str, name: &str, source: SourceKind, graph_name: &str) {
        let record = SourceRecord {
            url: url.to_owned(),
            canonical_url: None,
            name: name.to_owned(),
            source,
            graph_name: graph_name.to_owned(),
            load_status: LoadStatus::Pending,
            load_error: None,
        };
        self.inner.write().insert(iri::equivalence_key(url), record);
    }

    /// Marks `url` as loaded, creating the record if the load was not
    /// announced as pending.
    pub fn mark_ok(
        &self,
        url: &str,
        canonical_url: Option<&str>,
        name: &str,
        source: SourceKind,
        graph_name: &str,
    ) {
        let mut inner = self.inner.write();
        let record = inner
            .entry(iri::equivalence_key(url))
            .or_insert_with(|| SourceRecord {
                url: url.to_owned(),
                canonical_url: None,
                name: name.to_owned(),
                source,
                graph_name: graph_name.to_owned(),
                load_status: LoadStatus::Pending,
                load_error: None,
            });
        record.load_status = LoadStatus::Ok;
        record.load_error = None;
        // A reload that declares nothing keeps what an earlier load declared.
        if let Some(canonical) = canonical_url.filter(|c| !iri::same_source(c, url)) {
            record.canonical_url = Some(canonical.to_owned());
        }
    }

    /// Marks an existing record as failed. Returns false, leaving the table
    /// untouched, when there is no record for `url`.
    pub fn mark_failed(&self, url: &str, error: &str) -> bool {
        match self.inner.write().get_mut(&iri::equivalence_key(url)) {
            Some(record) => {
                record.load_status = LoadStatus::Fail;
                record.load_error = Some(error.to_owned());
                true
            }
            None => false,
        }
    }

    /// Returns the record for `url`.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<SourceRecord> {
        self.inner.read().get(&iri::equivalence_key(url)).cloned()
    }

    /// Every record, ordered by key.
    #[must_use]
    pub fn list(&self) -> Vec<SourceRecord> {
        self.inner.read().values().cloned().collect()
    }

    /// Returns true if `url` is loaded or loading, by request URL or by the
    /// canonical URL a document declared.
    #[must_use]
    pub fn is_loaded(&self, url: &str) -> bool {
        let key = iri::equivalence_key(url);
        let inner = self.inner.read();
        let live = |r: &SourceRecord| matches!(r.load_status, LoadStatus::Ok | LoadStatus::Pending);
        if inner.get(&key).is_some_and(live) {
            return true;
        }
        inner.values().any(|r| {
            live(r)
                && r.canonical_url
                    .as_deref()
                    .is_some_and(|c| iri::equivalence_key(c) == key)
        })
    }

    /// Removes the record for `url`.
    pub fn forget(&self, url: &str) -> Option<SourceRecord> {
        self.inner.write().remove(&iri::equivalence_key(url))
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_then_fail_stays_visible() {
        let records = SourceRecords::new();
        records.mark_pending("https://xmlns.com/foaf/0.1/", "FOAF", SourceKind::Fetched, "urn:g");
        assert!(records.mark_failed("http://xmlns.com/foaf/0.1", "boom"));
        let record = records.get("https://xmlns.com/foaf/0.1/").unwrap();
        assert_eq!(record.load_status, LoadStatus::Fail);
        assert_eq!(record.load_error.as_deref(), Some("boom"));
        assert!(!records.is_loaded("https://xmlns.com/foaf/0.1/"));
    }

    #[test]
    fn failing_an_unknown_source_creates_nothing() {
        let records = SourceRecords::new();
        assert!(!records.mark_failed("https://example.org/missing", "boom"));
        assert!(records.is_empty());
    }

    #[test]
    fn scheme_variants_share_a_record() {
        let records = SourceRecords::new();
        records.mark_ok("http://x/onto", None, "onto", SourceKind::Fetched, "urn:g");
        assert!(records.is_loaded("https://x/onto"));
        assert!(records.is_loaded("https://x/onto/"));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn canonical_url_counts_as_loaded() {
        let records = SourceRecords::new();
        records.mark_ok(
            "https://x/onto.ttl",
            Some("http://x/ns/onto"),
            "onto",
            SourceKind::Fetched,
            "urn:g",
        );
        assert!(records.is_loaded("https://x/ns/onto#"));
        let record = records.get("https://x/onto.ttl").unwrap();
        assert_eq!(record.canonical_url.as_deref(), Some("http://x/ns/onto"));
    }

    #[test]
    fn reload_without_a_declaration_keeps_the_canonical_url() {
        let records = SourceRecords::new();
        records.mark_ok("https://x/onto.ttl", Some("http://x/ns/onto"), "onto", SourceKind::Fetched, "urn:g");
        records.mark_ok("https://x/onto.ttl", None, "onto", SourceKind::Fetched, "urn:g");
        let record = records.get("https://x/onto.ttl").unwrap();
        assert_eq!(record.canonical_url.as_deref(), Some("http://x/ns/onto"));
        assert!(records.is_loaded("http://x/ns/onto"));
    }

    #[test]
    fn forget_removes_the_record() {
        let records = SourceRecords::new();
        records.mark_ok("https://x/onto", None, "onto", SourceKind::Fetched, "urn:g");
        assert!(records.forget("http://x/onto").is_some());
        assert!(!records.is_loaded("https://x/onto"));
    }
}
