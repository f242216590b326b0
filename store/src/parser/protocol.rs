//! Messages exchanged between the host and the parse worker.
//!
//! Every message carries the request id it belongs to. The worker emits at
//! most one unacknowledged `quads` message per request: after sending one it
//! waits for the matching `ack` (or `cancel`) before producing more.
//!
//! Quads cross the boundary as plain objects ([`WireQuad`]). Terms may be
//! structured (`{"termType": "NamedNode", "value": ...}`) or plain strings
//! (`"<http://...>"`, `"_:b0"`, `"\"lit\"@en"`); [`canonicalize_quad`] is the
//! only place that turns either shape into a typed [`Quad`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ParseFailure, TermError};
use crate::term::{BlankNode, GraphName, Iri, Literal, Quad, Subject, Term};
use crate::vocab;

/// Correlation id of one parse request.
pub type RequestId = u64;

/// Host → worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    /// Start parsing a document.
    #[serde(rename_all = "camelCase")]
    ParseText {
        /// Request id.
        id: RequestId,
        /// Document text.
        text: String,
        /// Declared media type, if any.
        media_type: Option<String>,
        /// Base IRI for relative references.
        base_iri: Option<String>,
        /// Maximum quads per `quads` message.
        batch_size: usize,
    },
    /// The host consumed the last `quads` message of a request.
    Ack {
        /// Request id.
        id: RequestId,
    },
    /// Stop producing batches for a request.
    Cancel {
        /// Request id.
        id: RequestId,
    },
}

/// Worker → host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerMessage {
    /// One batch of quads. Must be acknowledged before the next is sent.
    Quads {
        /// Request id.
        id: RequestId,
        /// At most `batch_size` quads.
        quads: Vec<WireQuad>,
    },
    /// Prefix declarations found in the document. Sent once, before any batch.
    Prefix {
        /// Request id.
        id: RequestId,
        /// `prefix → namespace`.
        prefixes: BTreeMap<String, String>,
    },
    /// The request finished. No further messages follow for this id.
    End {
        /// Request id.
        id: RequestId,
        /// Quads emitted in total.
        total: usize,
        /// True when the request stopped because of a cancel.
        cancelled: bool,
    },
    /// Parsing failed. No further messages follow for this id.
    Error {
        /// Request id.
        id: RequestId,
        /// What went wrong.
        error: ParseFailure,
    },
}

impl WorkerMessage {
    /// The request this message belongs to.
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            WorkerMessage::Quads { id, .. }
            | WorkerMessage::Prefix { id, .. }
            | WorkerMessage::End { id, .. }
            | WorkerMessage::Error { id, .. } => *id,
        }
    }

    /// Returns true for the messages that close a request.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerMessage::End { .. } | WorkerMessage::Error { .. })
    }
}

/// Kind tag of a structured wire term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireTermType {
    /// An IRI.
    NamedNode,
    /// A blank node.
    BlankNode,
    /// A literal.
    Literal,
    /// The default graph.
    DefaultGraph,
}

/// A term as it crosses the pipeline boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTerm {
    /// Structured form.
    #[serde(rename_all = "camelCase")]
    Structured {
        /// Kind of term.
        term_type: WireTermType,
        /// IRI, blank node label or lexical value.
        value: String,
        /// Literal datatype IRI.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        /// Literal language tag.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    /// Plain-string form, see [`Term::parse_plain`].
    Plain(String),
}

impl WireTerm {
    /// Structured IRI term.
    #[must_use]
    pub fn named(value: impl Into<String>) -> Self {
        WireTerm::Structured {
            term_type: WireTermType::NamedNode,
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    /// Structured blank node term.
    #[must_use]
    pub fn blank(label: impl Into<String>) -> Self {
        WireTerm::Structured {
            term_type: WireTermType::BlankNode,
            value: label.into(),
            datatype: None,
            language: None,
        }
    }

    /// Structured literal term.
    #[must_use]
    pub fn literal(value: impl Into<String>, datatype: Option<String>, language: Option<String>) -> Self {
        WireTerm::Structured {
            term_type: WireTermType::Literal,
            value: value.into(),
            datatype,
            language,
        }
    }

    fn to_term(&self) -> Result<Option<Term>, TermError> {
        match self {
            WireTerm::Plain(s) => Term::parse_plain(s).map(Some),
            WireTerm::Structured {
                term_type,
                value,
                datatype,
                language,
            } => match term_type {
                WireTermType::NamedNode => Iri::new(value).map(|i| Some(Term::Iri(i))),
                WireTermType::BlankNode => BlankNode::new(value).map(|b| Some(Term::BlankNode(b))),
                WireTermType::DefaultGraph => Ok(None),
                WireTermType::Literal => {
                    let literal = match (language.as_deref(), datatype.as_deref()) {
                        (Some(lang), _) if !lang.is_empty() => Literal::lang(value, lang)?,
                        (_, Some(dt)) if dt != vocab::RDF_LANG_STRING => {
                            Literal::typed(value, Iri::new(dt)?)
                        }
                        _ => Literal::simple(value),
                    };
                    Ok(Some(Term::Literal(literal)))
                }
            },
        }
    }
}

impl From<&Term> for WireTerm {
    fn from(term: &Term) -> Self {
        match term {
            Term::Iri(iri) => WireTerm::named(iri.as_str()),
            Term::BlankNode(b) => WireTerm::blank(b.label()),
            Term::Literal(l) => WireTerm::literal(
                l.value(),
                l.datatype().map(|d| d.as_str().to_owned()),
                l.language().map(str::to_owned),
            ),
        }
    }
}

/// A quad as it crosses the pipeline boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireQuad {
    /// Subject term.
    pub subject: WireTerm,
    /// Predicate term.
    pub predicate: WireTerm,
    /// Object term.
    pub object: WireTerm,
    /// Graph term as written in the document, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<WireTerm>,
}

impl From<&Quad> for WireQuad {
    fn from(quad: &Quad) -> Self {
        let subject = Term::from(quad.subject().clone());
        Self {
            subject: WireTerm::from(&subject),
            predicate: WireTerm::named(quad.predicate().as_str()),
            object: WireTerm::from(quad.object()),
            graph: (!quad.graph().is_default()).then(|| WireTerm::named(quad.graph().as_str())),
        }
    }
}

/// Turns a wire quad into a typed quad placed in `target`.
///
/// Loads always write into the caller's target graph, so a graph term the
/// document may carry is validated but otherwise ignored.
///
/// # Errors
///
/// Returns [`TermError`] if any term is malformed, the subject is a literal,
/// or the predicate is not an IRI.
pub fn canonicalize_quad(wire: &WireQuad, target: &GraphName) -> Result<Quad, TermError> {
    let subject = wire
        .subject
        .to_term()?
        .ok_or_else(|| TermError::Malformed("default graph used as subject".to_owned()))?;
    let subject = Subject::try_from(subject)?;
    let predicate = match wire.predicate.to_term()? {
        Some(Term::Iri(iri)) => iri,
        Some(other) => return Err(TermError::NotAnIri(other.to_string())),
        None => return Err(TermError::Malformed("default graph used as predicate".to_owned())),
    };
    let object = wire
        .object
        .to_term()?
        .ok_or_else(|| TermError::Malformed("default graph used as object".to_owned()))?;
    if let Some(graph) = &wire.graph {
        graph.to_term()?;
    }
    Ok(Quad::new(subject, predicate, object, target.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> GraphName {
        GraphName::new("urn:data").unwrap()
    }

    #[test]
    fn host_messages_use_type_tags() {
        let msg = HostMessage::ParseText {
            id: 7,
            text: "<a> <b> <c> .".into(),
            media_type: Some("text/turtle".into()),
            base_iri: None,
            batch_size: 1000,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "parseText");
        assert_eq!(json["mediaType"], "text/turtle");
        assert_eq!(json["batchSize"], 1000);

        let ack: HostMessage = serde_json::from_str(r#"{"type":"ack","id":7}"#).unwrap();
        assert_eq!(ack, HostMessage::Ack { id: 7 });
    }

    #[test]
    fn worker_messages_use_type_tags() {
        let msg = WorkerMessage::End {
            id: 3,
            total: 10,
            cancelled: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "end");
        assert!(msg.is_terminal());
        assert_eq!(msg.id(), 3);
    }

    #[test]
    fn structured_and_plain_terms_canonicalize_identically() {
        let structured = WireQuad {
            subject: WireTerm::named("http://example.org/s"),
            predicate: WireTerm::named("http://example.org/p"),
            object: WireTerm::literal("hi", None, Some("EN".into())),
            graph: None,
        };
        let plain: WireQuad = serde_json::from_str(
            r#"{"subject":"<http://example.org/s>","predicate":"http://example.org/p","object":"\"hi\"@en"}"#,
        )
        .unwrap();
        assert_eq!(
            canonicalize_quad(&structured, &target()).unwrap(),
            canonicalize_quad(&plain, &target()).unwrap()
        );
    }

    #[test]
    fn document_graph_is_replaced_by_target() {
        let wire = WireQuad {
            subject: WireTerm::blank("b0"),
            predicate: WireTerm::named("http://example.org/p"),
            object: WireTerm::named("http://example.org/o"),
            graph: Some(WireTerm::named("http://example.org/elsewhere")),
        };
        let quad = canonicalize_quad(&wire, &target()).unwrap();
        assert_eq!(quad.graph(), &target());
    }

    #[test]
    fn malformed_quads_are_rejected() {
        let literal_subject = WireQuad {
            subject: WireTerm::literal("x", None, None),
            predicate: WireTerm::named("http://example.org/p"),
            object: WireTerm::named("http://example.org/o"),
            graph: None,
        };
        assert!(canonicalize_quad(&literal_subject, &target()).is_err());

        let blank_predicate = WireQuad {
            subject: WireTerm::named("http://example.org/s"),
            predicate: WireTerm::blank("p"),
            object: WireTerm::named("http://example.org/o"),
            graph: None,
        };
        assert!(matches!(
            canonicalize_quad(&blank_predicate, &target()),
            Err(TermError::NotAnIri(_))
        ));
    }

    #[test]
    fn typed_literal_wire_round_trip() {
        let term = Term::Literal(Literal::typed(
            "5",
            Iri::new("http://www.w3.org/2001/XMLSchema#integer").unwrap(),
        ));
        let wire = WireTerm::from(&term);
        assert_eq!(wire.to_term().unwrap(), Some(term));
    }
}
