//! Error taxonomy for the store, the parsing pipeline, the loader and export.
//!
//! Loader failures are reported as values, never as panics, so callers can
//! show a per-source status. `LoadError` is `Clone` because one in-flight
//! load hands the same result to every caller waiting on it.

use serde::{Deserialize, Serialize};

/// A term or quad could not be constructed.
///
/// Terms are validated when they are built; the store itself never rejects
/// a well-typed quad.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermError {
    /// The IRI string was empty.
    #[error("empty IRI")]
    EmptyIri,
    /// The IRI string is not an absolute IRI.
    #[error("invalid IRI <{iri}>: {reason}")]
    InvalidIri {
        /// The offending input.
        iri: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// The blank node label is empty or contains whitespace.
    #[error("invalid blank node label {0:?}")]
    InvalidBlankNode(String),
    /// The language tag is not a BCP 47 shaped tag.
    #[error("invalid language tag {0:?}")]
    InvalidLanguageTag(String),
    /// A literal was used where a subject is required.
    #[error("literal {0:?} cannot be a subject")]
    LiteralSubject(String),
    /// A non-IRI term was used where a predicate or graph name is required.
    #[error("{0:?} is not an IRI")]
    NotAnIri(String),
    /// The plain-string term syntax could not be read.
    #[error("malformed term {0:?}")]
    Malformed(String),
}

/// Category of a parse failure reported by the parsing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParseFailureKind {
    /// The document is not valid in its serialization.
    Syntax,
    /// The media type is not an RDF serialization and sniffing failed.
    UnsupportedFormat,
    /// The parser produced a term this store cannot represent.
    Term,
}

/// Structured parse error carried across the pipeline boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ParseFailure {
    /// Failure category.
    pub kind: ParseFailureKind,
    /// Human-readable description, usually the underlying parser message.
    pub message: String,
}

impl ParseFailure {
    /// Creates a syntax failure.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            kind: ParseFailureKind::Syntax,
            message: message.into(),
        }
    }

    /// Creates an unsupported-format failure.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: ParseFailureKind::UnsupportedFormat,
            message: message.into(),
        }
    }

    /// Creates a term failure.
    pub fn term(message: impl Into<String>) -> Self {
        Self {
            kind: ParseFailureKind::Term,
            message: message.into(),
        }
    }
}

/// Why a load did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Fetching the source failed.
    #[error("network error fetching {url}: {message}")]
    Network {
        /// The URL that was fetched.
        url: String,
        /// Transport or HTTP status description.
        message: String,
    },
    /// Fetching the source exceeded the request timeout.
    #[error("timed out after {timeout_ms} ms fetching {url}")]
    Timeout {
        /// The URL that was fetched.
        url: String,
        /// The timeout that elapsed.
        timeout_ms: u64,
    },
    /// The document could not be parsed.
    #[error("parse error in {source_name}: {message}")]
    Parse {
        /// Name of the source being parsed.
        source_name: String,
        /// Parser message.
        message: String,
    },
    /// The declared media type is not an RDF serialization.
    #[error("unsupported format for {source_name}: {message}")]
    UnsupportedFormat {
        /// Name of the source being parsed.
        source_name: String,
        /// What was declared or sniffed.
        message: String,
    },
    /// The load was cancelled before the parser finished.
    #[error("load of {0} was cancelled")]
    Cancelled(String),
    /// An internal invariant was broken. Indicates a bug.
    #[error("store invariant violated: {0}")]
    StoreInvariant(String),
    /// The parse worker thread is gone.
    #[error("parse worker unavailable")]
    WorkerUnavailable,
}

impl LoadError {
    /// Stable short name of the error category, used in reports and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Network { .. } => "network",
            LoadError::Timeout { .. } => "timeout",
            LoadError::Parse { .. } => "parse",
            LoadError::UnsupportedFormat { .. } => "unsupported-format",
            LoadError::Cancelled(_) => "cancelled",
            LoadError::StoreInvariant(_) => "store-invariant",
            LoadError::WorkerUnavailable => "worker-unavailable",
        }
    }

    /// Converts a pipeline failure for the named source.
    pub fn from_parse_failure(source_name: &str, failure: ParseFailure) -> Self {
        match failure.kind {
            ParseFailureKind::UnsupportedFormat => LoadError::UnsupportedFormat {
                source_name: source_name.to_owned(),
                message: failure.message,
            },
            ParseFailureKind::Syntax | ParseFailureKind::Term => LoadError::Parse {
                source_name: source_name.to_owned(),
                message: failure.message,
            },
        }
    }

    /// Returns true for failures caused by the network rather than the content.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, LoadError::Network { .. } | LoadError::Timeout { .. })
    }
}

/// A derived index could not be published.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// An entry references a namespace missing from the registry snapshot.
    #[error("fat-map entry <{iri}> references namespace <{namespace}> missing from the registry")]
    UnregisteredNamespace {
        /// Entry IRI.
        iri: String,
        /// The unresolved namespace.
        namespace: String,
    },
}

/// The configuration could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Export failed.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The requested export format name is unknown.
    #[error("unknown export format {0:?}")]
    UnknownFormat(String),
    /// JSON rendering failed.
    #[error("JSON-LD rendering failed: {0}")]
    Json(#[from] serde_json::Error),
    /// RDF/XML needs every predicate split into namespace and XML name.
    #[error("predicate <{0}> cannot be written as an RDF/XML element name")]
    UnsplittablePredicate(String),
}
