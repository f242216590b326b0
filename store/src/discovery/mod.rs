//! Ontology discovery and reconciliation.
//!
//! Discovery scans a graph for subjects typed `owl:Ontology` and for
//! `owl:imports` objects, normalizes what it finds and drops everything that
//! is already loaded, disabled by the user, or a core vocabulary. The
//! remaining candidates can be reported only, loaded in the background, or
//! loaded while the caller waits for per-candidate results.

pub mod report;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

pub use crate::config::LoadMode;
pub use report::{BackgroundLoads, CandidateResult, CandidateStatus, DiscoveryReport};

use crate::config::StoreConfig;
use crate::iri;
use crate::loader::{GraphLoader, LoadRequest, LoadSource, SourceKind};
use crate::store::QuadPattern;
use crate::term::{GraphName, Iri, Term};
use crate::vocab;

/// Parameters of one discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverOptions {
    /// Graph to scan.
    pub graph: GraphName,
    /// What to do with the candidates.
    pub load_mode: LoadMode,
    /// Maximum parallel loads.
    pub concurrency_limit: usize,
    /// Fetch timeout per candidate.
    pub timeout: Duration,
    /// Also collect `owl:imports` from every other graph.
    pub imports_from_all_graphs: bool,
    /// Graph candidates are loaded into.
    pub target_graph: GraphName,
    /// Delay between background load starts.
    pub stagger: Duration,
}

impl DiscoverOptions {
    /// Options for scanning `graph`, with defaults from `config`.
    #[must_use]
    pub fn from_config(graph: GraphName, config: &StoreConfig) -> Self {
        let target_graph = config.graphs.ontology_graph().unwrap_or_else(|e| {
            warn!(error = %e, "invalid ontology graph name in config; using the default");
            GraphName::ontologies()
        });
        Self {
            graph,
            load_mode: config.discovery.load_mode,
            concurrency_limit: config.discovery.concurrency_limit,
            timeout: config.loader.timeout(),
            imports_from_all_graphs: config.discovery.imports_from_all_graphs,
            target_graph,
            stagger: Duration::from_millis(config.discovery.stagger_ms),
        }
    }

    /// Sets the load mode.
    #[must_use]
    pub fn with_load_mode(mut self, load_mode: LoadMode) -> Self {
        self.load_mode = load_mode;
        self
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Sets the per-candidate timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Finds and loads referenced ontologies.
#[derive(Debug)]
pub struct Reconciler {
    loader: Arc<GraphLoader>,
    disabled: RwLock<BTreeSet<String>>,
    blacklist: Vec<String>,
}

impl Reconciler {
    /// Creates a reconciler seeded with the configured disabled list and
    /// blacklist.
    #[must_use]
    pub fn new(loader: Arc<GraphLoader>) -> Self {
        let config = loader.knowledge_base().config();
        let disabled = config
            .discovery
            .disabled
            .iter()
            .map(|url| iri::equivalence_key(url))
            .collect();
        let blacklist = vocab::CORE_NAMESPACES
            .iter()
            .copied()
            .chain(config.discovery.blacklist.iter().map(String::as_str))
            .map(iri::equivalence_key)
            .collect();
        Self {
            loader,
            disabled: RwLock::new(disabled),
            blacklist,
        }
    }

    /// The loader candidates are loaded with.
    #[must_use]
    pub fn loader(&self) -> &Arc<GraphLoader> {
        &self.loader
    }

    /// Excludes `url` from discovery. Scheme and trailing separators are
    /// ignored.
    pub fn disable(&self, url: &str) {
        self.disabled.write().insert(iri::equivalence_key(url));
    }

    /// Re-enables a disabled `url`.
    pub fn enable(&self, url: &str) -> bool {
        self.disabled.write().remove(&iri::equivalence_key(url))
    }

    /// Returns true if `url` is disabled.
    #[must_use]
    pub fn is_disabled(&self, url: &str) -> bool {
        self.disabled.read().contains(&iri::equivalence_key(url))
    }

    fn is_blacklisted(&self, url: &str) -> bool {
        let key = iri::equivalence_key(url);
        self.blacklist
            .iter()
            .any(|b| key == *b || key.strip_prefix(b.as_str()).is_some_and(|rest| rest.starts_with(['#', '/'])))
    }

    /// Computes the candidate list for `graph` without loading anything.
    #[must_use]
    pub fn candidates(&self, graph: &GraphName, imports_from_all_graphs: bool) -> Vec<String> {
        let found = {
            let store = self.loader.knowledge_base().store().read();
            scan(&store, graph, imports_from_all_graphs)
        };
        let sources = self.loader.knowledge_base().sources();

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for raw in found {
            let url = iri::normalize_ontology_iri(&raw);
            if !is_loadable(&url) {
                debug!(%url, "skipping non-dereferenceable ontology IRI");
                continue;
            }
            if !seen.insert(iri::equivalence_key(&url)) {
                continue;
            }
            if self.is_blacklisted(&url) || self.is_disabled(&url) || sources.is_loaded(&url) {
                continue;
            }
            candidates.push(url);
        }
        candidates
    }

    /// Scans `options.graph` and loads the candidates as `options.load_mode`
    /// says.
    ///
    /// A candidate's failure never aborts its siblings; in `sync` mode each
    /// failure is reported in the results.
    #[instrument(
        name = "discover",
        skip_all,
        fields(graph = %options.graph.as_str(), mode = ?options.load_mode)
    )]
    pub async fn discover(&self, options: &DiscoverOptions) -> DiscoveryReport {
        let candidates = self.candidates(&options.graph, options.imports_from_all_graphs);
        info!(candidates = candidates.len(), "discovery scan complete");

        match options.load_mode {
            LoadMode::None => DiscoveryReport {
                candidates,
                ..DiscoveryReport::default()
            },
            LoadMode::Sync => {
                let results = self.load_all(&candidates, options).await;
                DiscoveryReport {
                    candidates,
                    results: Some(results),
                    background: None,
                }
            }
            LoadMode::Async => {
                let background = self.spawn_all(&candidates, options);
                DiscoveryReport {
                    candidates,
                    results: None,
                    background: Some(background),
                }
            }
        }
    }

    async fn load_all(&self, candidates: &[String], options: &DiscoverOptions) -> Vec<CandidateResult> {
        let limit = options.concurrency_limit.max(1);
        stream::iter(candidates.iter().cloned())
            .map(|url| {
                let request = candidate_request(&url, options);
                async move {
                    let result = self.loader.load(request).await;
                    if let Err(e) = &result {
                        debug!(%url, error = %e, "candidate failed");
                    }
                    CandidateResult::from_load(url, &result)
                }
            })
            .buffered(limit)
            .collect()
            .await
    }

    fn spawn_all(&self, candidates: &[String], options: &DiscoverOptions) -> BackgroundLoads {
        let permits = Arc::new(Semaphore::new(options.concurrency_limit.max(1)));
        let mut delay = Duration::ZERO;
        let mut tasks = Vec::with_capacity(candidates.len());
        for url in candidates {
            let loader = Arc::clone(&self.loader);
            let permits = Arc::clone(&permits);
            let request = candidate_request(url, options);
            let task_url = url.clone();
            let start_after = delay;
            let task = tokio::spawn(async move {
                tokio::time::sleep(start_after).await;
                let _permit = permits.acquire_owned().await;
                let result = loader.load(request).await;
                match &result {
                    Ok(outcome) => info!(url = %task_url, inserted = outcome.quads_inserted, "background ontology load complete"),
                    Err(e) => warn!(url = %task_url, error = %e, "background ontology load failed"),
                }
                CandidateResult::from_load(task_url, &result)
            });
            tasks.push((url.clone(), task));
            delay += options.stagger;
        }
        BackgroundLoads { tasks }
    }
}

fn candidate_request(url: &str, options: &DiscoverOptions) -> LoadRequest {
    LoadRequest::new(LoadSource::Url(url.to_owned()), options.target_graph.clone())
        .with_timeout(options.timeout)
        .with_origin(SourceKind::Discovered)
}

fn is_loadable(url: &str) -> bool {
    matches!(iri::scheme_of(url), Some("https" | "http" | "file"))
}

/// Ontology declarations and imports, in store insertion order.
fn scan(store: &crate::store::QuadStore, graph: &GraphName, imports_from_all_graphs: bool) -> Vec<String> {
    let rdf_type = Iri::from_static(vocab::RDF_TYPE);
    let imports = Iri::from_static(vocab::OWL_IMPORTS);
    let ontology = Term::Iri(Iri::from_static(vocab::OWL_ONTOLOGY));

    let mut found = Vec::new();
    for quad in store.matching(QuadPattern::any().graph(graph)) {
        if quad.predicate() == &rdf_type && quad.object() == &ontology {
            if let Some(subject) = quad.subject().as_iri() {
                found.push(subject.as_str().to_owned());
            }
        } else if quad.predicate() == &imports {
            if let Term::Iri(target) = quad.object() {
                found.push(target.as_str().to_owned());
            }
        }
    }
    if imports_from_all_graphs {
        for quad in store.matching(QuadPattern::any().predicate(&imports)) {
            if quad.graph() == graph {
                continue;
            }
            if let Term::Iri(target) = quad.object() {
                found.push(target.as_str().to_owned());
            }
        }
    }
    found
}
