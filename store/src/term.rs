//! RDF terms and quads.
//!
//! Terms are a strict tagged union validated at construction time:
//! - [`Iri`] is always absolute and canonical
//! - [`BlankNode`] has a non-empty label without whitespace
//! - [`Literal`] carries a datatype or a language tag, never both
//!
//! Quads are immutable; an update is a remove followed by an insert.

use std::fmt;
use std::sync::Arc;

use crate::error::TermError;
use crate::iri;
use crate::vocab;

/// An absolute IRI.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri(Arc<str>);

impl Iri {
    /// Validates and canonicalizes an IRI.
    ///
    /// # Errors
    ///
    /// Returns [`TermError`] if the input is not an absolute IRI.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TermError> {
        iri::canonicalize(raw.as_ref()).map(|s| Self(Arc::from(s)))
    }

    /// Returns the IRI string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the local name (after the last `#` or `/`).
    #[must_use]
    pub fn local_name(&self) -> &str {
        iri::local_name(&self.0)
    }

    /// Returns the namespace (up to and including the last `#` or `/`).
    #[must_use]
    pub fn namespace(&self) -> &str {
        iri::namespace_of(&self.0)
    }

    /// Builds an IRI from a compile-time vocabulary constant.
    pub(crate) fn from_static(s: &'static str) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// A blank node with a document-scoped label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlankNode(Arc<str>);

impl BlankNode {
    /// Creates a blank node. A leading `_:` is accepted and stripped.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::InvalidBlankNode`] if the label is empty or
    /// contains whitespace.
    pub fn new(label: impl AsRef<str>) -> Result<Self, TermError> {
        let raw = label.as_ref();
        let label = raw.strip_prefix("_:").unwrap_or(raw);
        if label.is_empty() || label.chars().any(char::is_whitespace) {
            return Err(TermError::InvalidBlankNode(raw.to_owned()));
        }
        Ok(Self(Arc::from(label)))
    }

    /// Returns the label without the `_:` prefix.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.0)
    }
}

/// An RDF literal.
///
/// Simple literals and `xsd:string` literals are the same term: both are
/// stored without a datatype.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    value: Arc<str>,
    datatype: Option<Iri>,
    language: Option<Arc<str>>,
}

impl Literal {
    /// Creates a simple (`xsd:string`) literal.
    pub fn simple(value: impl AsRef<str>) -> Self {
        Self {
            value: Arc::from(value.as_ref()),
            datatype: None,
            language: None,
        }
    }

    /// Creates a typed literal.
    pub fn typed(value: impl AsRef<str>, datatype: Iri) -> Self {
        let datatype = (datatype.as_str() != vocab::XSD_STRING).then_some(datatype);
        Self {
            value: Arc::from(value.as_ref()),
            datatype,
            language: None,
        }
    }

    /// Creates a language-tagged literal. Tags are stored lower-cased.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::InvalidLanguageTag`] if the tag is not made of
    /// `-`-separated alphanumeric subtags with an alphabetic primary subtag.
    pub fn lang(value: impl AsRef<str>, tag: impl AsRef<str>) -> Result<Self, TermError> {
        let tag = tag.as_ref();
        let mut subtags = tag.split('-');
        let primary_ok = subtags
            .next()
            .is_some_and(|p| !p.is_empty() && p.len() <= 8 && p.chars().all(|c| c.is_ascii_alphabetic()));
        let rest_ok = subtags.all(|s| !s.is_empty() && s.len() <= 8 && s.chars().all(|c| c.is_ascii_alphanumeric()));
        if !primary_ok || !rest_ok {
            return Err(TermError::InvalidLanguageTag(tag.to_owned()));
        }
        Ok(Self {
            value: Arc::from(value.as_ref()),
            datatype: None,
            language: Some(Arc::from(tag.to_ascii_lowercase())),
        })
    }

    /// Returns the lexical value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the datatype IRI, or `None` for simple and language-tagged literals.
    #[must_use]
    pub fn datatype(&self) -> Option<&Iri> {
        self.datatype.as_ref()
    }

    /// Returns the language tag, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_literal(&self.value))?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^{dt}")
        } else {
            Ok(())
        }
    }
}

/// Escapes a literal value for N-Triples / Turtle short strings.
#[must_use]
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Any RDF term.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// An IRI.
    Iri(Iri),
    /// A blank node.
    BlankNode(BlankNode),
    /// A literal.
    Literal(Literal),
}

impl Term {
    /// Returns the IRI if this term is one.
    #[must_use]
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Returns the literal if this term is one.
    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Reads a term written in the plain-string form used by loosely typed
    /// producers: `<iri>`, a bare absolute IRI, `_:label`, `"value"`,
    /// `"value"@lang` or `"value"^^<datatype>`.
    ///
    /// # Errors
    ///
    /// Returns [`TermError`] if the string is none of those forms.
    pub fn parse_plain(s: &str) -> Result<Self, TermError> {
        let s = s.trim();
        if let Some(label) = s.strip_prefix("_:") {
            return BlankNode::new(label).map(Term::BlankNode);
        }
        if s.starts_with('"') {
            return parse_quoted_literal(s).map(Term::Literal);
        }
        Iri::new(s).map(Term::Iri)
    }
}

fn parse_quoted_literal(s: &str) -> Result<Literal, TermError> {
    let malformed = || TermError::Malformed(s.to_owned());
    let body = s.strip_prefix('"').ok_or_else(malformed)?;
    let mut value = String::new();
    let mut chars = body.char_indices();
    let mut close = None;
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                close = Some(i);
                break;
            }
            '\\' => match chars.next().map(|(_, e)| e) {
                Some('n') => value.push('\n'),
                Some('r') => value.push('\r'),
                Some('t') => value.push('\t'),
                Some(e @ ('"' | '\\' | '\'')) => value.push(e),
                _ => return Err(malformed()),
            },
            other => value.push(other),
        }
    }
    let close = close.ok_or_else(malformed)?;
    let suffix = &body[close + 1..];
    if suffix.is_empty() {
        Ok(Literal::simple(value))
    } else if let Some(tag) = suffix.strip_prefix('@') {
        Literal::lang(value, tag)
    } else if let Some(dt) = suffix.strip_prefix("^^") {
        Ok(Literal::typed(value, Iri::new(dt)?))
    } else {
        Err(malformed())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => iri.fmt(f),
            Term::BlankNode(b) => b.fmt(f),
            Term::Literal(l) => l.fmt(f),
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Term::Iri(iri)
    }
}

impl From<BlankNode> for Term {
    fn from(b: BlankNode) -> Self {
        Term::BlankNode(b)
    }
}

impl From<Literal> for Term {
    fn from(l: Literal) -> Self {
        Term::Literal(l)
    }
}

/// The subject position of a quad: an IRI or a blank node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    /// An IRI subject.
    Iri(Iri),
    /// A blank node subject.
    BlankNode(BlankNode),
}

impl Subject {
    /// Returns the IRI if the subject is one.
    #[must_use]
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Subject::Iri(iri) => Some(iri),
            Subject::BlankNode(_) => None,
        }
    }
}

impl TryFrom<Term> for Subject {
    type Error = TermError;

    fn try_from(term: Term) -> Result<Self, Self::Error> {
        match term {
            Term::Iri(iri) => Ok(Subject::Iri(iri)),
            Term::BlankNode(b) => Ok(Subject::BlankNode(b)),
            Term::Literal(l) => Err(TermError::LiteralSubject(l.value().to_owned())),
        }
    }
}

impl From<Subject> for Term {
    fn from(s: Subject) -> Self {
        match s {
            Subject::Iri(iri) => Term::Iri(iri),
            Subject::BlankNode(b) => Term::BlankNode(b),
        }
    }
}

impl From<Iri> for Subject {
    fn from(iri: Iri) -> Self {
        Subject::Iri(iri)
    }
}

impl From<BlankNode> for Subject {
    fn from(b: BlankNode) -> Self {
        Subject::BlankNode(b)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Iri(iri) => iri.fmt(f),
            Subject::BlankNode(b) => b.fmt(f),
        }
    }
}

/// Name of the graph a quad belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphName(Iri);

impl GraphName {
    /// Creates a graph name from an IRI string.
    ///
    /// # Errors
    ///
    /// Returns [`TermError`] if the input is not an absolute IRI.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TermError> {
        Iri::new(raw).map(Self)
    }

    /// The reserved sentinel for the default graph.
    #[must_use]
    pub fn default_graph() -> Self {
        Self(Iri::from_static(vocab::DEFAULT_GRAPH))
    }

    /// Conventional graph for editable data.
    #[must_use]
    pub fn data() -> Self {
        Self(Iri::from_static(vocab::GRAPH_DATA))
    }

    /// Conventional graph for ontology/schema triples.
    #[must_use]
    pub fn ontologies() -> Self {
        Self(Iri::from_static(vocab::GRAPH_ONTOLOGIES))
    }

    /// Conventional graph for inferred triples.
    #[must_use]
    pub fn inferred() -> Self {
        Self(Iri::from_static(vocab::GRAPH_INFERRED))
    }

    /// Returns true for the default-graph sentinel.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0.as_str() == vocab::DEFAULT_GRAPH
    }

    /// Returns the graph IRI.
    #[must_use]
    pub fn iri(&self) -> &Iri {
        &self.0
    }

    /// Returns the graph IRI string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Iri> for GraphName {
    fn from(iri: Iri) -> Self {
        Self(iri)
    }
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A triple tagged with the graph it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quad {
    subject: Subject,
    predicate: Iri,
    object: Term,
    graph: GraphName,
}

impl Quad {
    /// Creates a quad.
    pub fn new(
        subject: impl Into<Subject>,
        predicate: Iri,
        object: impl Into<Term>,
        graph: GraphName,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
            graph,
        }
    }

    /// Subject.
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Predicate.
    #[must_use]
    pub fn predicate(&self) -> &Iri {
        &self.predicate
    }

    /// Object.
    #[must_use]
    pub fn object(&self) -> &Term {
        &self.object
    }

    /// Graph.
    #[must_use]
    pub fn graph(&self) -> &GraphName {
        &self.graph
    }

    /// Returns the same triple placed in another graph.
    #[must_use]
    pub fn in_graph(&self, graph: GraphName) -> Self {
        Self {
            graph,
            ..self.clone()
        }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if !self.graph.is_default() {
            write!(f, " {}", self.graph)?;
        }
        f.write_str(" .")
    }
}
