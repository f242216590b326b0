//! Fat-map index: derived summaries of the classes and properties found in
//! the store.
//!
//! The index keeps, per subject, the facts that matter for classification
//! (`rdf:type`, `rdfs:label`, `rdfs:domain`, `rdfs:range`). A full rebuild
//! recomputes those facts from every quad in the store; an incremental upsert
//! folds a delta of new quads into the facts it already holds and reclassifies
//! only the subjects the delta touches. Entries are never deleted by an
//! upsert. Because both paths classify from the same accumulated facts, a
//! rebuild and any sequence of upserts over the same quads agree.
//!
//! Each publication pairs the fat-map with a fresh [`RegistrySnapshot`]
//! behind a single `Arc` swap, so readers never see entries whose namespace
//! is missing from the registry they read alongside.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::error::IndexError;
use crate::namespace::{NamespaceRegistry, RegistrySnapshot};
use crate::store::QuadStore;
use crate::term::{Iri, Quad, Term};
use crate::vocab;

/// Whether an entry is a class or a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    /// A class.
    Class,
    /// A property.
    Property,
}

/// Which path produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntrySource {
    /// Upserted from freshly parsed quads.
    Parsed,
    /// Computed by a full rebuild over the store.
    Store,
}

/// Summary of one class or property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FatMapEntry {
    /// Entry IRI.
    pub iri: String,
    /// Display label: the preferred `rdfs:label`, else the local name.
    pub label: String,
    /// Language of the chosen label, if it had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_language: Option<String>,
    /// Namespace of the IRI.
    pub namespace: String,
    /// `rdfs:domain` values (properties only).
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub domain: BTreeSet<String>,
    /// `rdfs:range` values (properties only).
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub range: BTreeSet<String>,
    /// Class or property.
    pub kind: EntryKind,
    /// Path that produced the entry.
    pub source: EntrySource,
}

impl FatMapEntry {
    /// The identifying triple `(iri, label, namespace)`.
    #[must_use]
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.iri, &self.label, &self.namespace)
    }
}

/// Classes and properties keyed by IRI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FatMap {
    /// Available classes.
    pub available_classes: BTreeMap<String, FatMapEntry>,
    /// Available properties.
    pub available_properties: BTreeMap<String, FatMapEntry>,
}

impl FatMap {
    /// Class entry for `iri`.
    #[must_use]
    pub fn class(&self, iri: &str) -> Option<&FatMapEntry> {
        self.available_classes.get(iri)
    }

    /// Property entry for `iri`.
    #[must_use]
    pub fn property(&self, iri: &str) -> Option<&FatMapEntry> {
        self.available_properties.get(iri)
    }

    /// `(iri, label, namespace)` of every entry, classes then properties.
    #[must_use]
    pub fn identities(&self) -> Vec<(EntryKind, String, String, String)> {
        self.available_classes
            .values()
            .chain(self.available_properties.values())
            .map(|e| (e.kind, e.iri.clone(), e.label.clone(), e.namespace.clone()))
            .collect()
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.available_classes.len() + self.available_properties.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.available_classes
            .values()
            .chain(self.available_properties.values())
            .map(|e| e.namespace.as_str())
    }
}

/// What readers see: a fat-map and the registry snapshot it was published
/// with.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    fat_map: FatMap,
    registry: RegistrySnapshot,
    generation: u64,
}

impl IndexSnapshot {
    /// The fat-map.
    #[must_use]
    pub fn fat_map(&self) -> &FatMap {
        &self.fat_map
    }

    /// The registry snapshot published with this fat-map.
    #[must_use]
    pub fn registry(&self) -> &RegistrySnapshot {
        &self.registry
    }

    /// Publication counter; increases with every publication.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Label candidates order by language preference, then by value, so the
/// choice does not depend on insertion order.
type LabelKey = (u8, String, Option<String>);

#[derive(Debug, Clone, Default)]
struct SubjectFacts {
    types: BTreeSet<String>,
    labels: BTreeSet<LabelKey>,
    domain: BTreeSet<String>,
    range: BTreeSet<String>,
}

impl SubjectFacts {
    fn absorb(&mut self, quad: &Quad) {
        match (quad.predicate().as_str(), quad.object()) {
            (vocab::RDF_TYPE, Term::Iri(t)) => {
                self.types.insert(t.as_str().to_owned());
            }
            (vocab::RDFS_LABEL, Term::Literal(lit)) => {
                let rank = match lit.language() {
                    None => 0,
                    Some(lang) if lang == "en" || lang.starts_with("en-") => 1,
                    Some(_) => 2,
                };
                self.labels
                    .insert((rank, lit.value().to_owned(), lit.language().map(str::to_owned)));
            }
            (vocab::RDFS_DOMAIN, Term::Iri(d)) => {
                self.domain.insert(d.as_str().to_owned());
            }
            (vocab::RDFS_RANGE, Term::Iri(r)) => {
                self.range.insert(r.as_str().to_owned());
            }
            _ => {}
        }
    }

    fn kinds(&self) -> impl Iterator<Item = EntryKind> + '_ {
        let is_class = self.types.iter().any(|t| {
            t == vocab::OWL_CLASS || crate::iri::local_name(t).ends_with("Class")
        });
        let is_property = self.types.iter().any(|t| {
            t == vocab::OWL_OBJECT_PROPERTY
                || t == vocab::OWL_DATATYPE_PROPERTY
                || crate::iri::local_name(t).ends_with("Property")
        });
        is_class
            .then_some(EntryKind::Class)
            .into_iter()
            .chain(is_property.then_some(EntryKind::Property))
    }

    fn entry(&self, iri: &Iri, kind: EntryKind, source: EntrySource) -> FatMapEntry {
        let (label, label_language) = match self.labels.first() {
            Some((_, value, lang)) => (value.clone(), lang.clone()),
            None => (iri.local_name().to_owned(), None),
        };
        let is_property = kind == EntryKind::Property;
        FatMapEntry {
            iri: iri.as_str().to_owned(),
            label,
            label_language,
            namespace: iri.namespace().to_owned(),
            domain: if is_property { self.domain.clone() } else { BTreeSet::new() },
            range: if is_property { self.range.clone() } else { BTreeSet::new() },
            kind,
            source,
        }
    }
}

#[derive(Debug, Default)]
struct IndexState {
    facts: HashMap<Iri, SubjectFacts>,
    fat_map: FatMap,
    generation: u64,
}

/// Maintains the fat-map and publishes [`IndexSnapshot`]s.
///
/// Rebuilds and upserts are serialized; readers take the current snapshot
/// without blocking writers for longer than an `Arc` swap.
#[derive(Debug, Default)]
pub struct FatMapIndexer {
    current: RwLock<Arc<IndexSnapshot>>,
    state: Mutex<IndexState>,
}

impl FatMapIndexer {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Recomputes everything from every quad in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the result fails validation against the
    /// registry; the previous snapshot stays published.
    #[instrument(level = "debug", skip_all, fields(quads = store.len()))]
    pub fn rebuild(
        &self,
        store: &QuadStore,
        registry: &NamespaceRegistry,
    ) -> Result<Arc<IndexSnapshot>, IndexError> {
        let mut state = self.state.lock();

        let mut facts: HashMap<Iri, SubjectFacts> = HashMap::new();
        for quad in store.iter() {
            if let Some(subject) = quad.subject().as_iri().filter(|_| is_fact(quad)) {
                facts.entry(subject.clone()).or_default().absorb(quad);
            }
        }

        let mut fat_map = FatMap::default();
        for (iri, subject_facts) in &facts {
            for kind in subject_facts.kinds() {
                place(&mut fat_map, subject_facts.entry(iri, kind, EntrySource::Store));
            }
        }

        let snapshot = self.publish(&mut state, fat_map, registry).inspect_err(|e| {
            error!(error = %e, "fat-map rebuild failed; keeping previous snapshot");
        })?;
        state.facts = facts;
        debug!(
            classes = snapshot.fat_map.available_classes.len(),
            properties = snapshot.fat_map.available_properties.len(),
            "fat-map rebuilt"
        );
        Ok(snapshot)
    }

    /// Folds `delta` into the index without reading the store.
    ///
    /// Only subjects that appear in the delta are reclassified, and existing
    /// entries are overwritten by IRI, never removed. An empty delta only
    /// republishes the registry snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the result fails validation against the
    /// registry; the previous snapshot stays published.
    pub fn upsert(
        &self,
        delta: &[Quad],
        registry: &NamespaceRegistry,
    ) -> Result<Arc<IndexSnapshot>, IndexError> {
        let mut state = self.state.lock();

        let mut touched: HashMap<Iri, SubjectFacts> = HashMap::new();
        for quad in delta {
            let Some(subject) = quad.subject().as_iri().filter(|_| is_fact(quad)) else {
                continue;
            };
            touched
                .entry(subject.clone())
                .or_insert_with(|| state.facts.get(subject).cloned().unwrap_or_default())
                .absorb(quad);
        }

        let mut fat_map = state.fat_map.clone();
        for (iri, subject_facts) in &touched {
            for kind in subject_facts.kinds() {
                place(&mut fat_map, subject_facts.entry(iri, kind, EntrySource::Parsed));
            }
        }

        let snapshot = self.publish(&mut state, fat_map, registry).inspect_err(|e| {
            error!(error = %e, "fat-map upsert failed; keeping previous snapshot");
        })?;
        debug!(subjects = touched.len(), "fat-map upserted");
        state.facts.extend(touched);
        Ok(snapshot)
    }

    /// Validates and publishes `fat_map` with a fresh registry snapshot.
    fn publish(
        &self,
        state: &mut IndexState,
        fat_map: FatMap,
        registry: &NamespaceRegistry,
    ) -> Result<Arc<IndexSnapshot>, IndexError> {
        let registry = registry.snapshot(fat_map.namespaces());
        for entry in fat_map
            .available_classes
            .values()
            .chain(fat_map.available_properties.values())
        {
            if !registry.contains_namespace(&entry.namespace) {
                return Err(IndexError::UnregisteredNamespace {
                    iri: entry.iri.clone(),
                    namespace: entry.namespace.clone(),
                });
            }
        }
        state.generation += 1;
        state.fat_map = fat_map.clone();
        let snapshot = Arc::new(IndexSnapshot {
            fat_map,
            registry,
            generation: state.generation,
        });
        *self.current.write() = Arc::clone(&snapshot);
        Ok(snapshot)
    }
}

fn is_fact(quad: &Quad) -> bool {
    matches!(
        (quad.predicate().as_str(), quad.object()),
        (vocab::RDF_TYPE | vocab::RDFS_DOMAIN | vocab::RDFS_RANGE, Term::Iri(_))
            | (vocab::RDFS_LABEL, Term::Literal(_))
    )
}

fn place(fat_map: &mut FatMap, entry: FatMapEntry) {
    let target = match entry.kind {
        EntryKind::Class => &mut fat_map.available_classes,
        EntryKind::Property => &mut fat_map.available_properties,
    };
    target.insert(entry.iri.clone(), entry);
}
