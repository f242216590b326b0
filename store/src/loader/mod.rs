//! Graph loader: fetch or accept a document, parse it, insert the quads into
//! a named graph, merge its prefixes and update the fat-map.
//!
//! Loads are deduplicated by normalized source key: while one load of a key
//! is in flight, further requests for the same key wait for it and receive
//! its result. Within one load, quad insertion happens before the namespace
//! merge, which happens before the index update, which happens before the
//! source record turns `ok`.

pub mod fetch;
pub mod normalize;
pub mod records;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

pub use fetch::{FetchedDocument, Fetcher, HttpFetcher, StaticFetcher};
pub use normalize::LoadSource;
pub use records::{LoadStatus, SourceKind, SourceRecord, SourceRecords};

use crate::catalog;
use crate::error::LoadError;
use crate::parser::{canonicalize_quad, ParseWorker, WorkerMessage};
use crate::term::{GraphName, Quad, Term};
use crate::vocab;
use crate::KnowledgeBase;

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fetch timeout; the configured default when `None`.
    pub timeout: Option<Duration>,
    /// Media type overriding whatever the source declares.
    pub media_type: Option<String>,
    /// Base IRI for relative references; the fetched URL when `None`.
    pub base_iri: Option<String>,
    /// Origin recorded on the source record.
    pub origin: Option<SourceKind>,
}

/// A request to load one source into one graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// What to load.
    pub source: LoadSource,
    /// Where the quads go.
    pub target_graph: GraphName,
    /// Options.
    pub options: LoadOptions,
}

impl LoadRequest {
    /// Creates a request with default options.
    #[must_use]
    pub fn new(source: LoadSource, target_graph: GraphName) -> Self {
        Self {
            source,
            target_graph,
            options: LoadOptions::default(),
        }
    }

    /// Creates a request from a raw identifier (URL or inline content).
    #[must_use]
    pub fn from_identifier(identifier: &str, target_graph: GraphName) -> Self {
        Self::new(LoadSource::from_identifier(identifier), target_graph)
    }

    /// Sets the fetch timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Sets the media type.
    #[must_use]
    pub fn with_media_type(mut self, media_type: &str) -> Self {
        self.options.media_type = Some(media_type.to_owned());
        self
    }

    /// Sets the base IRI.
    #[must_use]
    pub fn with_base_iri(mut self, base_iri: &str) -> Self {
        self.options.base_iri = Some(base_iri.to_owned());
        self
    }

    /// Sets the recorded origin.
    #[must_use]
    pub fn with_origin(mut self, origin: SourceKind) -> Self {
        self.options.origin = Some(origin);
        self
    }
}

/// Result of a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    /// Normalized URL, or `content:<sha256>` for inline content.
    pub url: String,
    /// Ontology IRI declared by the document, when it differs from `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    /// Graph the quads went to.
    pub graph: String,
    /// Quads that were new to the store.
    pub quads_inserted: usize,
    /// Quads the parser produced.
    pub quads_parsed: usize,
    /// Prefixes the document declared.
    pub prefixes: BTreeMap<String, String>,
    /// True when this caller waited on another caller's in-flight load.
    pub deduplicated: bool,
}

/// Wire-level summary of a load: `{success, url, canonicalUrl?, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Whether the load succeeded.
    pub success: bool,
    /// The source.
    pub url: String,
    /// Declared ontology IRI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadReport {
    /// Summarizes `result` for the source `url`.
    #[must_use]
    pub fn new(url: &str, result: &Result<LoadOutcome, LoadError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                url: outcome.url.clone(),
                canonical_url: outcome.canonical_url.clone(),
                error: None,
            },
            Err(e) => Self {
                success: false,
                url: url.to_owned(),
                canonical_url: None,
                error: Some(e.to_string()),
            },
        }
    }
}

type LoadResult = Result<LoadOutcome, LoadError>;
type InFlightSender = Arc<watch::Sender<Option<LoadResult>>>;
type InFlightMap = DashMap<String, InFlightSender>;

/// Removes the in-flight entry if the leading load is dropped before it
/// finishes, so waiters see the channel close and retry.
struct InFlightGuard<'a> {
    key: String,
    map: &'a InFlightMap,
    tx: InFlightSender,
    finished: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(key: String, map: &'a InFlightMap, tx: InFlightSender) -> Self {
        Self {
            key,
            map,
            tx,
            finished: false,
        }
    }

    fn finish(mut self, result: LoadResult) {
        // Send before removing so late subscribers still observe the result.
        let _ = self.tx.send(Some(result));
        self.map.remove(&self.key);
        self.finished = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.map.remove(&self.key);
        }
    }
}

/// Orchestrates loads into one [`KnowledgeBase`].
#[derive(Debug)]
pub struct GraphLoader {
    kb: Arc<KnowledgeBase>,
    worker: ParseWorker,
    fetcher: Arc<dyn Fetcher>,
    in_flight: InFlightMap,
    cancels: DashMap<String, Arc<AtomicBool>>,
}

impl GraphLoader {
    /// Creates a loader that fetches with `fetcher`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::WorkerUnavailable`] if the parse worker cannot be
    /// started.
    pub fn new(kb: Arc<KnowledgeBase>, fetcher: Arc<dyn Fetcher>) -> Result<Self, LoadError> {
        Ok(Self {
            kb,
            worker: ParseWorker::spawn()?,
            fetcher,
            in_flight: DashMap::new(),
            cancels: DashMap::new(),
        })
    }

    /// Creates a loader that fetches over HTTP(S) and from `file://` URLs.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the HTTP client or the parse worker cannot be
    /// created.
    pub fn with_http(kb: Arc<KnowledgeBase>) -> Result<Self, LoadError> {
        let fetcher = HttpFetcher::new(&kb.config().loader.user_agent)?;
        Self::new(kb, Arc::new(fetcher))
    }

    /// The knowledge base loads go into.
    #[must_use]
    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    /// Number of loads currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Asks the in-flight load of `identifier` to stop after its current
    /// batch. Quads already inserted stay. Returns false if no such load is
    /// running.
    pub fn cancel(&self, identifier: &str) -> bool {
        let key = LoadSource::from_identifier(identifier).key();
        match self.cancels.get(&key) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Loads one source.
    ///
    /// Concurrent requests for the same normalized source share one parse and
    /// insert; the waiting callers get the same outcome with `deduplicated`
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when fetching, parsing or inserting fails. Quads
    /// of batches inserted before a failure stay in the target graph.
    #[instrument(
        name = "load",
        skip_all,
        fields(source = %request.source.key(), graph = %request.target_graph.as_str())
    )]
    pub async fn load(&self, request: LoadRequest) -> Result<LoadOutcome, LoadError> {
        let key = request.source.key();

        let tx = loop {
            let waiter = match self.in_flight.entry(key.clone()) {
                Entry::Occupied(entry) => entry.get().subscribe(),
                Entry::Vacant(entry) => {
                    let (tx, _rx) = watch::channel(None::<LoadResult>);
                    let tx = Arc::new(tx);
                    entry.insert(Arc::clone(&tx));
                    break tx;
                }
            };
            debug!("load already in flight; waiting");
            if let Some(result) = wait_for(waiter).await {
                return result.map(|outcome| LoadOutcome {
                    deduplicated: true,
                    ..outcome
                });
            }
            debug!("in-flight load was abandoned; retrying");
        };

        let guard = InFlightGuard::new(key.clone(), &self.in_flight, tx);
        let result = self.run(&request, &key).await;
        guard.finish(result.clone());
        result
    }

    async fn run(&self, request: &LoadRequest, key: &str) -> LoadResult {
        let started = Instant::now();
        let graph = request.target_graph.as_str();
        let name = request.source.display_name();
        let origin = request.options.origin.unwrap_or(if request.source.is_url() {
            SourceKind::Fetched
        } else {
            SourceKind::Requested
        });

        let recognized = match &request.source {
            LoadSource::Url(url) => catalog::is_recognized(url),
            LoadSource::Content { .. } => false,
        };
        if recognized {
            self.kb.sources().mark_pending(key, &name, origin, graph);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancels.insert(key.to_owned(), Arc::clone(&cancel));
        let result = self.fetch_parse_insert(request, key, &name, &cancel).await;
        self.cancels.remove(key);

        match result {
            Ok(outcome) => {
                self.kb
                    .sources()
                    .mark_ok(key, outcome.canonical_url.as_deref(), &name, origin, graph);
                info!(
                    inserted = outcome.quads_inserted,
                    parsed = outcome.quads_parsed,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "load complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                let recorded = self.kb.sources().mark_failed(key, &e.to_string());
                warn!(error = %e, kind = e.kind(), recorded, "load failed");
                Err(e)
            }
        }
    }

    async fn fetch_parse_insert(
        &self,
        request: &LoadRequest,
        key: &str,
        name: &str,
        cancel: &AtomicBool,
    ) -> LoadResult {
        let options = &request.options;
        let graph = &request.target_graph;

        let (text, media_type, base_iri) = match &request.source {
            LoadSource::Url(_) => {
                let timeout = options.timeout.unwrap_or_else(|| self.kb.config().loader.timeout());
                let doc = tokio::time::timeout(timeout, self.fetcher.fetch(key, timeout))
                    .await
                    .map_err(|_| LoadError::Timeout {
                        url: key.to_owned(),
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    })??;
                debug!(bytes = doc.body.len(), media_type = ?doc.media_type, "fetched");
                (
                    doc.body,
                    options.media_type.clone().or(doc.media_type),
                    options.base_iri.clone().or(Some(doc.final_url)),
                )
            }
            LoadSource::Content {
                text, media_type, ..
            } => (
                text.clone(),
                options.media_type.clone().or_else(|| media_type.clone()),
                options.base_iri.clone(),
            ),
        };
        if cancel.load(Ordering::SeqCst) {
            return Err(LoadError::Cancelled(name.to_owned()));
        }

        // The worker runs one request at a time and blocks on each batch until
        // it is acked, so the graph must be held before the request is queued.
        let store = self.kb.store();
        let graph_guard = store.lock_graph(graph).await;
        let batch_size = self.kb.config().pipeline.batch_size;
        let mut session = self.worker.submit(text, media_type, base_iri, batch_size)?;

        let mut prefixes = BTreeMap::new();
        let mut delta: Vec<Quad> = Vec::new();
        let mut declared: Option<String> = None;
        let mut parsed = 0usize;
        loop {
            match session.next_event().await {
                Some(WorkerMessage::Prefix { prefixes: found, .. }) => prefixes.extend(found),
                Some(WorkerMessage::Quads { quads, .. }) => {
                    parsed += quads.len();
                    let typed = quads
                        .iter()
                        .map(|wire| canonicalize_quad(wire, graph))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| LoadError::Parse {
                            source_name: name.to_owned(),
                            message: e.to_string(),
                        })?;
                    if declared.is_none() {
                        declared = declared_ontology(&typed);
                    }
                    delta.extend(store.write().insert_all(typed));
                    if cancel.load(Ordering::SeqCst) {
                        session.cancel();
                    } else {
                        session.ack()?;
                    }
                }
                Some(WorkerMessage::End {
                    cancelled: true, ..
                }) => return Err(LoadError::Cancelled(name.to_owned())),
                Some(WorkerMessage::End { .. }) => break,
                Some(WorkerMessage::Error { error, .. }) => {
                    return Err(LoadError::from_parse_failure(name, error))
                }
                None => return Err(LoadError::WorkerUnavailable),
            }
        }
        drop(graph_guard);

        self.kb.merge_namespaces(&prefixes);
        self.kb.index_delta(&delta);

        Ok(LoadOutcome {
            url: key.to_owned(),
            canonical_url: declared.filter(|c| !crate::iri::same_source(c, key)),
            graph: graph.as_str().to_owned(),
            quads_inserted: delta.len(),
            quads_parsed: parsed,
            prefixes,
            deduplicated: false,
        })
    }
}

/// Waits for the leader's result. `None` means the leader was dropped.
async fn wait_for(mut rx: watch::Receiver<Option<LoadResult>>) -> Option<LoadResult> {
    loop {
        let current = rx.borrow().clone();
        if current.is_some() {
            return current;
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
    }
}

/// First subject typed `owl:Ontology` in `quads`.
fn declared_ontology(quads: &[Quad]) -> Option<String> {
    quads
        .iter()
        .filter(|q| q.predicate().as_str() == vocab::RDF_TYPE)
        .filter(|q| matches!(q.object(), Term::Iri(o) if o.as_str() == vocab::OWL_ONTOLOGY))
        .find_map(|q| q.subject().as_iri().map(|s| s.as_str().to_owned()))
}
