//! Dedicated parse worker thread with batch/ack flow control.
//!
//! The host submits `parseText` requests over a channel; the worker parses
//! one request at a time and streams the result back as `prefix`, `quads`,
//! `end` or `error` messages routed by request id. After each `quads`
//! message the worker blocks until the host acknowledges it or cancels the
//! request, so at most one batch per request is ever in flight.
//!
//! Requests that arrive while the worker is waiting for an ack are queued
//! and processed in arrival order once the current request finishes.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use parking_lot::Mutex;
use sophia_api::parser::{QuadParser, TripleParser};
use sophia_api::quad::Quad as _;
use sophia_api::source::{QuadSource, StreamError, TripleSource};
use sophia_api::term::{Term as SophiaTerm, TermKind};
use sophia_api::triple::Triple as _;
use sophia_iri::Iri as SophiaIri;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use super::format::RdfFormat;
use super::prefixes;
use super::protocol::{HostMessage, RequestId, WireQuad, WireTerm, WorkerMessage};
use crate::error::{LoadError, ParseFailure};

type Routes = Arc<Mutex<HashMap<RequestId, UnboundedSender<WorkerMessage>>>>;

/// Default maximum number of quads per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Handle to the parse worker thread.
///
/// Dropping the handle and every open [`ParseSession`] shuts the thread down.
#[derive(Debug)]
pub struct ParseWorker {
    inbox: Sender<HostMessage>,
    routes: Routes,
    next_id: AtomicU64,
}

impl ParseWorker {
    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::WorkerUnavailable`] if the thread cannot be spawned.
    pub fn spawn() -> Result<Self, LoadError> {
        let (inbox, rx) = mpsc::channel();
        let routes: Routes = Arc::default();
        let worker = Worker {
            inbox: rx,
            queue: VecDeque::new(),
            routes: RoutesGuard(Arc::clone(&routes)),
        };
        std::thread::Builder::new()
            .name("rdf-parse-worker".into())
            .spawn(move || worker.run())
            .map_err(|e| {
                warn!(error = %e, "failed to spawn parse worker");
                LoadError::WorkerUnavailable
            })?;
        Ok(Self {
            inbox,
            routes,
            next_id: AtomicU64::new(1),
        })
    }

    /// Submits a document for parsing and returns the session that receives
    /// its messages.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::WorkerUnavailable`] if the worker thread is gone.
    pub fn submit(
        &self,
        text: String,
        media_type: Option<String>,
        base_iri: Option<String>,
        batch_size: usize,
    ) -> Result<ParseSession, LoadError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded_channel();
        self.routes.lock().insert(id, tx);
        let request = HostMessage::ParseText {
            id,
            text,
            media_type,
            base_iri,
            batch_size: batch_size.max(1),
        };
        if self.inbox.send(request).is_err() {
            self.routes.lock().remove(&id);
            return Err(LoadError::WorkerUnavailable);
        }
        debug!(request = id, "parse request submitted");
        Ok(ParseSession {
            id,
            events: rx,
            inbox: self.inbox.clone(),
            routes: Arc::clone(&self.routes),
            finished: false,
        })
    }
}

/// Host side of one parse request.
///
/// The host must call [`ack`](Self::ack) once per `quads` message before the
/// worker will produce the next one. Dropping an unfinished session cancels
/// the request.
#[derive(Debug)]
pub struct ParseSession {
    id: RequestId,
    events: UnboundedReceiver<WorkerMessage>,
    inbox: Sender<HostMessage>,
    routes: Routes,
    finished: bool,
}

impl ParseSession {
    /// Request id.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Waits for the next message. Returns `None` once the request is
    /// finished or the worker is gone.
    pub async fn next_event(&mut self) -> Option<WorkerMessage> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        match &event {
            Some(msg) if msg.is_terminal() => self.finished = true,
            None => self.finished = true,
            Some(_) => {}
        }
        event
    }

    /// Acknowledges the last `quads` message.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::WorkerUnavailable`] if the worker thread is gone.
    pub fn ack(&self) -> Result<(), LoadError> {
        self.inbox
            .send(HostMessage::Ack { id: self.id })
            .map_err(|_| LoadError::WorkerUnavailable)
    }

    /// Asks the worker to stop after the current batch.
    pub fn cancel(&self) {
        // A closed inbox means the worker already stopped.
        let _ = self.inbox.send(HostMessage::Cancel { id: self.id });
    }
}

impl Drop for ParseSession {
    fn drop(&mut self) {
        self.routes.lock().remove(&self.id);
        if !self.finished {
            let _ = self.inbox.send(HostMessage::Cancel { id: self.id });
        }
    }
}

/// Clears every route when the worker thread exits, so sessions observe the
/// closed channel instead of waiting forever.
struct RoutesGuard(Routes);

impl Drop for RoutesGuard {
    fn drop(&mut self) {
        self.0.lock().clear();
    }
}

struct Job {
    id: RequestId,
    text: String,
    media_type: Option<String>,
    base_iri: Option<String>,
    batch_size: usize,
}

/// Why the quad sink stopped the parser early.
#[derive(Debug, thiserror::Error)]
enum SinkStop {
    #[error("request cancelled")]
    Cancelled,
    #[error("host disconnected")]
    Shutdown,
    #[error("{0}")]
    Term(String),
}

/// What the worker does with a message received while it waits for an ack.
enum Control {
    Acked,
    Cancelled,
    Continue,
}

struct Worker {
    inbox: Receiver<HostMessage>,
    queue: VecDeque<Job>,
    routes: RoutesGuard,
}

impl Worker {
    fn run(mut self) {
        loop {
            let job = match self.queue.pop_front() {
                Some(job) => job,
                None => match self.inbox.recv() {
                    Ok(HostMessage::ParseText {
                        id,
                        text,
                        media_type,
                        base_iri,
                        batch_size,
                    }) => Job {
                        id,
                        text,
                        media_type,
                        base_iri,
                        batch_size,
                    },
                    Ok(stray) => {
                        trace!(?stray, "ignoring message for an idle request");
                        continue;
                    }
                    Err(_) => break,
                },
            };
            if !self.process(job) {
                break;
            }
        }
        debug!("parse worker stopped");
    }

    /// Sends a message to the session of `id`. Returns false if nobody is
    /// listening any more.
    fn send(&self, msg: WorkerMessage) -> bool {
        let id = msg.id();
        let routes = self.routes.0.lock();
        match routes.get(&id) {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Parses one job. Returns false if the host side is gone entirely.
    fn process(&mut self, job: Job) -> bool {
        let Job {
            id,
            text,
            media_type,
            base_iri,
            batch_size,
        } = job;

        let format = match RdfFormat::resolve(media_type.as_deref(), &text) {
            Ok(format) => format,
            Err(failure) => {
                self.send(WorkerMessage::Error { id, error: failure });
                return true;
            }
        };
        debug!(request = id, ?format, bytes = text.len(), "parsing");

        let prefixes = prefixes::extract(format, &text);
        if !self.send(WorkerMessage::Prefix { id, prefixes }) {
            return true;
        }

        let base = base_iri.and_then(|b| SophiaIri::new(b).ok());
        let bnode_scope = format!("r{id}_");
        let mut batch: Vec<WireQuad> = Vec::with_capacity(batch_size.min(DEFAULT_BATCH_SIZE));
        let mut total = 0usize;

        let drained = {
            let mut emit = |quad: WireQuad| -> Result<(), SinkStop> {
                batch.push(quad);
                total += 1;
                if batch.len() >= batch_size {
                    self.flush(id, &mut batch)
                } else {
                    Ok(())
                }
            };
            parse_document(format, &text, base, &bnode_scope, &mut emit)
        };

        let stopped = match drained {
            Drained::Done => {
                if batch.is_empty() {
                    None
                } else {
                    self.flush(id, &mut batch).err()
                }
            }
            Drained::Stopped(stop) => Some(stop),
            Drained::Failed(failure) => {
                debug!(request = id, error = %failure, "parse failed");
                self.send(WorkerMessage::Error { id, error: failure });
                return true;
            }
        };

        // Quads still buffered were never sent.
        let total = total - batch.len();
        match stopped {
            None => {
                self.send(WorkerMessage::End {
                    id,
                    total,
                    cancelled: false,
                });
                true
            }
            Some(SinkStop::Cancelled) => {
                debug!(request = id, total, "parse cancelled");
                self.send(WorkerMessage::End {
                    id,
                    total,
                    cancelled: true,
                });
                true
            }
            Some(SinkStop::Term(message)) => {
                self.send(WorkerMessage::Error {
                    id,
                    error: ParseFailure::term(message),
                });
                true
            }
            Some(SinkStop::Shutdown) => false,
        }
    }

    /// Emits the pending batch and blocks until it is acknowledged.
    fn flush(&mut self, id: RequestId, batch: &mut Vec<WireQuad>) -> Result<(), SinkStop> {
        // Honour a cancel that arrived while the batch was being filled.
        loop {
            match self.inbox.try_recv() {
                Ok(msg) => match self.interleaved(id, msg) {
                    Control::Cancelled => return Err(SinkStop::Cancelled),
                    Control::Acked | Control::Continue => {}
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(SinkStop::Shutdown),
            }
        }

        let quads = std::mem::take(batch);
        trace!(request = id, quads = quads.len(), "sending batch");
        if !self.send(WorkerMessage::Quads { id, quads }) {
            return Err(SinkStop::Cancelled);
        }

        loop {
            let msg = self.inbox.recv().map_err(|_| SinkStop::Shutdown)?;
            match self.interleaved(id, msg) {
                Control::Acked => return Ok(()),
                Control::Cancelled => return Err(SinkStop::Cancelled),
                Control::Continue => {}
            }
        }
    }

    fn interleaved(&mut self, current: RequestId, msg: HostMessage) -> Control {
        match msg {
            HostMessage::Ack { id } if id == current => Control::Acked,
            HostMessage::Cancel { id } if id == current => Control::Cancelled,
            HostMessage::Cancel { id } => {
                if let Some(pos) = self.queue.iter().position(|job| job.id == id) {
                    self.queue.remove(pos);
                    self.send(WorkerMessage::End {
                        id,
                        total: 0,
                        cancelled: true,
                    });
                }
                Control::Continue
            }
            HostMessage::ParseText {
                id,
                text,
                media_type,
                base_iri,
                batch_size,
            } => {
                self.queue.push_back(Job {
                    id,
                    text,
                    media_type,
                    base_iri,
                    batch_size,
                });
                Control::Continue
            }
            HostMessage::Ack { .. } => Control::Continue,
        }
    }
}

enum Drained {
    Done,
    Stopped(SinkStop),
    Failed(ParseFailure),
}

fn parse_document(
    format: RdfFormat,
    text: &str,
    base: Option<SophiaIri<String>>,
    bnode_scope: &str,
    emit: &mut dyn FnMut(WireQuad) -> Result<(), SinkStop>,
) -> Drained {
    use sophia_turtle::parser::{nq, nt, trig, turtle};

    match format {
        RdfFormat::Turtle => drain_triples(turtle::TurtleParser { base }.parse_str(text), bnode_scope, emit),
        RdfFormat::NTriples => drain_triples(nt::NTriplesParser {}.parse_str(text), bnode_scope, emit),
        RdfFormat::RdfXml => drain_triples(
            sophia_xml::parser::RdfXmlParser { base }.parse_str(text),
            bnode_scope,
            emit,
        ),
        RdfFormat::NQuads => drain_quads(nq::NQuadsParser {}.parse_str(text), bnode_scope, emit),
        RdfFormat::TriG => drain_quads(trig::TriGParser { base }.parse_str(text), bnode_scope, emit),
        RdfFormat::JsonLd => drain_quads(
            sophia_jsonld::JsonLdParser::new().parse_str(text),
            bnode_scope,
            emit,
        ),
    }
}

fn drain_triples<S: TripleSource>(
    mut source: S,
    scope: &str,
    emit: &mut dyn FnMut(WireQuad) -> Result<(), SinkStop>,
) -> Drained {
    let result = source.try_for_each_triple(|t| {
        let quad = WireQuad {
            subject: wire_term(t.s(), scope)?,
            predicate: wire_term(t.p(), scope)?,
            object: wire_term(t.o(), scope)?,
            graph: None,
        };
        emit(quad)
    });
    settle(result)
}

fn drain_quads<S: QuadSource>(
    mut source: S,
    scope: &str,
    emit: &mut dyn FnMut(WireQuad) -> Result<(), SinkStop>,
) -> Drained {
    let result = source.try_for_each_quad(|q| {
        let graph = match q.g() {
            Some(g) => Some(wire_term(g, scope)?),
            None => None,
        };
        let quad = WireQuad {
            subject: wire_term(q.s(), scope)?,
            predicate: wire_term(q.p(), scope)?,
            object: wire_term(q.o(), scope)?,
            graph,
        };
        emit(quad)
    });
    settle(result)
}

fn settle<E: std::error::Error>(result: Result<(), StreamError<E, SinkStop>>) -> Drained {
    match result {
        Ok(()) => Drained::Done,
        Err(StreamError::SourceError(e)) => Drained::Failed(ParseFailure::syntax(e.to_string())),
        Err(StreamError::SinkError(stop)) => Drained::Stopped(stop),
    }
}

/// Converts a parser term to the wire form. Blank node labels are scoped to
/// the request so documents never share blank nodes.
fn wire_term<T: SophiaTerm>(term: T, scope: &str) -> Result<WireTerm, SinkStop> {
    match term.kind() {
        TermKind::Iri => term
            .iri()
            .map(|iri| WireTerm::named(iri.as_str()))
            .ok_or_else(|| SinkStop::Term("IRI term without IRI".into())),
        TermKind::BlankNode => term
            .bnode_id()
            .map(|b| WireTerm::blank(format!("{scope}{}", b.as_str())))
            .ok_or_else(|| SinkStop::Term("blank node without label".into())),
        TermKind::Literal => {
            let value = term
                .lexical_form()
                .ok_or_else(|| SinkStop::Term("literal without lexical form".into()))?;
            let language = term.language_tag().map(|tag| tag.as_str().to_owned());
            let datatype = if language.is_some() {
                None
            } else {
                term.datatype().map(|dt| dt.as_str().to_owned())
            };
            Ok(WireTerm::literal(String::from(&*value), datatype, language))
        }
        TermKind::Triple | TermKind::Variable => Err(SinkStop::Term(
            "quoted triples and variables are not supported".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::tests::fixtures;

    async fn collect(session: &mut ParseSession) -> (Vec<WorkerMessage>, usize) {
        let mut events = Vec::new();
        let mut quads = 0;
        while let Some(event) = session.next_event().await {
            if let WorkerMessage::Quads { quads: batch, .. } = &event {
                quads += batch.len();
                session.ack().unwrap();
            }
            events.push(event);
        }
        (events, quads)
    }

    #[tokio::test]
    async fn prefix_comes_before_batches_and_end_is_last() {
        let worker = ParseWorker::spawn().unwrap();
        let mut session = worker
            .submit(fixtures::PREFIXED_TURTLE.to_owned(), Some("text/turtle".into()), None, 2)
            .unwrap();
        let (events, quads) = collect(&mut session).await;

        assert!(matches!(events.first(), Some(WorkerMessage::Prefix { .. })));
        assert!(matches!(
            events.last(),
            Some(WorkerMessage::End { cancelled: false, .. })
        ));
        assert!(quads > 0);
        for event in &events {
            if let WorkerMessage::Quads { quads, .. } = event {
                assert!(quads.len() <= 2);
            }
        }
        if let Some(WorkerMessage::End { total, .. }) = events.last() {
            assert_eq!(*total, quads);
        }
    }

    #[tokio::test]
    async fn withheld_ack_blocks_the_next_batch() {
        let worker = ParseWorker::spawn().unwrap();
        let doc = fixtures::many_triples(10);
        let mut session = worker
            .submit(doc, Some("application/n-triples".into()), None, 3)
            .unwrap();

        assert!(matches!(session.next_event().await, Some(WorkerMessage::Prefix { .. })));
        assert!(matches!(session.next_event().await, Some(WorkerMessage::Quads { .. })));

        let second = tokio::time::timeout(Duration::from_millis(200), session.next_event()).await;
        assert!(second.is_err(), "a second batch arrived without an ack");

        session.ack().unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), session.next_event())
            .await
            .unwrap();
        assert!(matches!(second, Some(WorkerMessage::Quads { .. })));
    }

    #[tokio::test]
    async fn cancel_stops_further_batches() {
        let worker = ParseWorker::spawn().unwrap();
        let mut session = worker
            .submit(fixtures::many_triples(10), Some("application/n-triples".into()), None, 2)
            .unwrap();
        assert!(matches!(session.next_event().await, Some(WorkerMessage::Prefix { .. })));
        assert!(matches!(session.next_event().await, Some(WorkerMessage::Quads { .. })));
        session.cancel();
        let end = session.next_event().await;
        assert!(matches!(
            end,
            Some(WorkerMessage::End {
                cancelled: true,
                total: 2,
                ..
            })
        ));
        assert!(session.next_event().await.is_none());
    }

    #[tokio::test]
    async fn malformed_input_reports_an_error_instead_of_a_final_batch() {
        let worker = ParseWorker::spawn().unwrap();
        let mut session = worker
            .submit(fixtures::BROKEN_TURTLE.to_owned(), Some("text/turtle".into()), None, 1000)
            .unwrap();
        let (events, _) = collect(&mut session).await;
        assert!(!events.iter().any(|e| matches!(e, WorkerMessage::Quads { .. })));
        assert!(matches!(events.last(), Some(WorkerMessage::Error { .. })));
    }

    #[tokio::test]
    async fn unsupported_media_type_is_an_error() {
        let worker = ParseWorker::spawn().unwrap();
        let mut session = worker
            .submit("\u{1}\u{2}".to_owned(), Some("image/png".into()), None, 10)
            .unwrap();
        let event = session.next_event().await;
        assert!(matches!(
            event,
            Some(WorkerMessage::Error { error, .. }) if error.kind == crate::error::ParseFailureKind::UnsupportedFormat
        ));
    }

    #[tokio::test]
    async fn requests_queue_behind_an_unacknowledged_batch() {
        let worker = ParseWorker::spawn().unwrap();
        let mut first = worker
            .submit(fixtures::many_triples(4), Some("application/n-triples".into()), None, 2)
            .unwrap();
        assert!(matches!(first.next_event().await, Some(WorkerMessage::Prefix { .. })));
        assert!(matches!(first.next_event().await, Some(WorkerMessage::Quads { .. })));

        let mut second = worker
            .submit(fixtures::many_triples(1), Some("application/n-triples".into()), None, 2)
            .unwrap();
        let early = tokio::time::timeout(Duration::from_millis(100), second.next_event()).await;
        assert!(early.is_err());

        first.ack().unwrap();
        let (_, rest) = collect(&mut first).await;
        assert_eq!(rest, 2);
        let (_, quads) = collect(&mut second).await;
        assert_eq!(quads, 1);
    }
}
