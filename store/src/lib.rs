//! Multi-graph RDF knowledge store.
//!
//! The `onto-store` crate holds RDF/OWL knowledge as quads in named graphs
//! and keeps a derived summary of the classes and properties it contains.
//! Documents arrive through the [`GraphLoader`], which fetches a URL or takes
//! inline text, streams it through a parsing worker in acknowledged batches,
//! inserts the quads, merges the document's prefix declarations into the
//! namespace registry and updates the fat-map index. The [`Reconciler`] finds
//! `owl:imports` and ontology declarations in a graph and loads what is not
//! loaded yet.
//!
//! # Entry Point
//!
//! [`KnowledgeBase`] is the application root. Construct one per independent
//! store; nothing in this crate is global.
//!
//! ```no_run
//! use std::sync::Arc;
//! use onto_store::{GraphLoader, GraphName, KnowledgeBase, LoadRequest, StoreConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let kb = Arc::new(KnowledgeBase::new(StoreConfig::default()));
//! let loader = GraphLoader::with_http(Arc::clone(&kb))?;
//! let request = LoadRequest::from_identifier("https://www.w3.org/ns/prov-o", GraphName::ontologies());
//! let outcome = loader.load(request).await?;
//! println!("{} quads", outcome.quads_inserted);
//! # Ok(())
//! # }
//! ```
//!
//! # Export
//!
//! ```
//! use onto_store::{ExportFormat, KnowledgeBase};
//!
//! let kb = KnowledgeBase::default();
//! let turtle = kb.export(None, ExportFormat::Turtle).unwrap();
//! assert!(turtle.is_empty());
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fatmap;
pub mod iri;
pub mod loader;
pub mod namespace;
pub mod parser;
pub mod serializer;
pub mod store;
pub mod term;
pub mod tests;
pub mod vocab;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

pub use config::{IndexMode, LoadMode, StoreConfig};
pub use discovery::{DiscoverOptions, DiscoveryReport, Reconciler};
pub use error::{ConfigError, ExportError, IndexError, LoadError, ParseFailure, TermError};
pub use fatmap::{EntryKind, FatMap, FatMapEntry, FatMapIndexer, IndexSnapshot};
pub use loader::{GraphLoader, LoadOutcome, LoadReport, LoadRequest, LoadSource, SourceRecord};
pub use namespace::{ConflictPolicy, MergeOutcome, MergeSummary, NamespaceRegistry, RegistrySnapshot};
pub use parser::RdfFormat;
pub use serializer::ExportFormat;
pub use store::{QuadPattern, QuadStore, SharedStore};
pub use term::{BlankNode, GraphName, Iri, Literal, Quad, Subject, Term};

use loader::SourceRecords;

/// The application root: quad store, namespace registry, fat-map index and
/// loaded-source records, configured once.
///
/// Store and index mutations go through this type so the index always
/// follows the store. Share it behind an [`Arc`].
#[derive(Debug)]
pub struct KnowledgeBase {
    store: SharedStore,
    namespaces: RwLock<NamespaceRegistry>,
    indexer: FatMapIndexer,
    sources: SourceRecords,
    config: StoreConfig,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl KnowledgeBase {
    /// Creates an empty knowledge base. The registry starts with the
    /// well-known prefixes.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let policy = config.namespaces.conflict_policy;
        Self {
            store: SharedStore::new(),
            namespaces: RwLock::new(NamespaceRegistry::with_well_known(policy)),
            indexer: FatMapIndexer::new(),
            sources: SourceRecords::default(),
            config,
        }
    }

    /// The quad store.
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Loaded-source records.
    #[must_use]
    pub fn sources(&self) -> &SourceRecords {
        &self.sources
    }

    /// Configuration this instance was built with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The currently published index snapshot.
    #[must_use]
    pub fn index(&self) -> Arc<IndexSnapshot> {
        self.indexer.snapshot()
    }

    /// A snapshot of every registered prefix.
    #[must_use]
    pub fn namespaces(&self) -> RegistrySnapshot {
        self.namespaces.read().snapshot(std::iter::empty())
    }

    /// Registers one prefix under the configured conflict policy.
    pub fn register_prefix(&self, prefix: &str, namespace: &str) -> MergeOutcome {
        self.namespaces.write().register(prefix, namespace)
    }

    /// Merges a document's prefix declarations.
    pub fn merge_namespaces(&self, prefixes: &BTreeMap<String, String>) -> MergeSummary {
        let summary = self
            .namespaces
            .write()
            .merge(prefixes.iter().map(|(p, ns)| (p.as_str(), ns.as_str())));
        debug!(
            added = summary.added,
            conflicts = summary.conflicts,
            rejected = summary.rejected,
            "merged prefix declarations"
        );
        summary
    }

    /// Inserts quads and indexes the ones that were new. Returns how many
    /// were new.
    pub fn insert<I>(&self, quads: I) -> usize
    where
        I: IntoIterator<Item = Quad>,
    {
        let delta = self.store.write().insert_all(quads);
        if !delta.is_empty() {
            self.index_delta(&delta);
        }
        delta.len()
    }

    /// Drops every quad in `graph` and rebuilds the index. Returns the number
    /// of quads removed.
    pub fn remove_graph(&self, graph: &GraphName) -> usize {
        let removed = self.store.write().remove_graph(graph);
        if removed > 0 {
            if let Err(e) = self.rebuild_index() {
                warn!(graph = %graph.as_str(), error = %e, "index not rebuilt after graph removal");
            }
        }
        removed
    }

    /// Resets to the freshly constructed state: no quads, no source records,
    /// well-known prefixes only.
    pub fn clear(&self) {
        self.store.write().clear();
        self.sources.clear();
        *self.namespaces.write() = NamespaceRegistry::with_well_known(self.config.namespaces.conflict_policy);
        if let Err(e) = self.rebuild_index() {
            warn!(error = %e, "index not rebuilt after clear");
        }
    }

    /// Recomputes the fat-map from the whole store.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the result fails validation; the previous
    /// snapshot stays published.
    #[instrument(level = "debug", skip(self))]
    pub fn rebuild_index(&self) -> Result<Arc<IndexSnapshot>, IndexError> {
        let store = self.store.read();
        let namespaces = self.namespaces.read();
        self.indexer.rebuild(&store, &namespaces)
    }

    /// Folds `delta` into the fat-map.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the result fails validation; the previous
    /// snapshot stays published.
    pub fn upsert_index(&self, delta: &[Quad]) -> Result<Arc<IndexSnapshot>, IndexError> {
        let namespaces = self.namespaces.read();
        self.indexer.upsert(delta, &namespaces)
    }

    /// Brings the index up to date after `delta` was inserted, following the
    /// configured [`IndexMode`]. Index failures are logged; the store is
    /// already updated and stays so.
    pub fn index_delta(&self, delta: &[Quad]) {
        let result = match self.config.index.mode {
            IndexMode::Incremental => self.upsert_index(delta),
            IndexMode::Full => self.rebuild_index(),
        };
        if let Err(e) = result {
            warn!(quads = delta.len(), error = %e, "index not updated");
        }
    }

    /// Serializes the store, or one graph of it.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if the chosen serialization cannot express the
    /// data.
    pub fn export(&self, graph: Option<&GraphName>, format: ExportFormat) -> Result<String, ExportError> {
        let registry = self.namespaces();
        let store = self.store.read();
        serializer::export(&store, &registry, graph, format)
    }
}
