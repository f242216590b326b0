//! Export of the store, or a single graph of it.
//!
//! Four serializations are supported:
//! - **Turtle** ([`turtle`]): prefixed, grouped by subject; graph names are dropped
//! - **N-Triples / N-Quads** ([`ntriples`]): one statement per line, absolute IRIs
//! - **JSON-LD** ([`jsonld`]): `@context` from the registry, named graphs as nested `@graph`s
//! - **RDF/XML** ([`rdfxml`]): `rdf:Description` per subject; graph names are dropped
//!
//! Prefixes come from a [`RegistrySnapshot`], normally the one published with
//! the current fat-map.

pub mod jsonld;
pub mod ntriples;
pub mod rdfxml;
pub mod turtle;

use std::fmt;
use std::str::FromStr;

use crate::error::ExportError;
use crate::namespace::RegistrySnapshot;
use crate::store::{QuadPattern, QuadStore};
use crate::term::{GraphName, Quad};

/// Output format of [`export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Turtle.
    Turtle,
    /// N-Triples.
    NTriples,
    /// N-Quads.
    NQuads,
    /// JSON-LD.
    JsonLd,
    /// RDF/XML.
    RdfXml,
}

impl ExportFormat {
    /// Every format, in display order.
    pub const ALL: [Self; 5] = [
        Self::Turtle,
        Self::NTriples,
        Self::NQuads,
        Self::JsonLd,
        Self::RdfXml,
    ];

    /// Media type of the output.
    #[must_use]
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Turtle => "text/turtle",
            Self::NTriples => "application/n-triples",
            Self::NQuads => "application/n-quads",
            Self::JsonLd => "application/ld+json",
            Self::RdfXml => "application/rdf+xml",
        }
    }

    /// Conventional file extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Turtle => "ttl",
            Self::NTriples => "nt",
            Self::NQuads => "nq",
            Self::JsonLd => "jsonld",
            Self::RdfXml => "rdf",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Turtle => "turtle",
            Self::NTriples => "ntriples",
            Self::NQuads => "nquads",
            Self::JsonLd => "jsonld",
            Self::RdfXml => "rdfxml",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "turtle" | "ttl" => Ok(Self::Turtle),
            "ntriples" | "nt" => Ok(Self::NTriples),
            "nquads" | "nq" => Ok(Self::NQuads),
            "jsonld" | "json" => Ok(Self::JsonLd),
            "rdfxml" | "rdf" | "xml" | "owl" => Ok(Self::RdfXml),
            _ => Err(ExportError::UnknownFormat(s.to_owned())),
        }
    }
}

/// Serializes the quads of `graph` (or the whole store) in `format`.
///
/// Quads are written in store insertion order.
///
/// # Errors
///
/// Returns [`ExportError`] if JSON rendering fails or a predicate cannot be
/// expressed in RDF/XML.
pub fn export(
    store: &QuadStore,
    registry: &RegistrySnapshot,
    graph: Option<&GraphName>,
    format: ExportFormat,
) -> Result<String, ExportError> {
    let pattern = match graph {
        Some(g) => QuadPattern::any().graph(g),
        None => QuadPattern::any(),
    };
    let quads: Vec<&Quad> = store.matching(pattern).collect();
    match format {
        ExportFormat::Turtle => Ok(turtle::to_turtle(&quads, registry)),
        ExportFormat::NTriples => Ok(ntriples::to_ntriples(&quads)),
        ExportFormat::NQuads => Ok(ntriples::to_nquads(&quads)),
        ExportFormat::JsonLd => Ok(serde_json::to_string_pretty(&jsonld::to_json_ld(
            &quads, registry,
        ))?),
        ExportFormat::RdfXml => rdfxml::to_rdf_xml(&quads, registry),
    }
}
