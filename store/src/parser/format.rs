//! RDF serialization formats: media types, file extensions and sniffing.

use serde::{Deserialize, Serialize};

use crate::error::ParseFailure;

/// A supported input serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RdfFormat {
    /// Turtle.
    Turtle,
    /// N-Triples.
    NTriples,
    /// N-Quads.
    NQuads,
    /// TriG.
    TriG,
    /// RDF/XML.
    RdfXml,
    /// JSON-LD.
    JsonLd,
}

impl RdfFormat {
    /// Maps a media type (parameters ignored) to a format.
    #[must_use]
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/turtle" | "application/x-turtle" | "application/turtle" => Some(Self::Turtle),
            "application/n-triples" | "text/plain+ntriples" => Some(Self::NTriples),
            "application/n-quads" | "text/x-nquads" | "text/nquads" => Some(Self::NQuads),
            "application/trig" | "application/x-trig" => Some(Self::TriG),
            "application/rdf+xml" | "application/xml" | "text/xml" => Some(Self::RdfXml),
            "application/ld+json" | "application/json" => Some(Self::JsonLd),
            _ => None,
        }
    }

    /// Maps a file extension (without the dot) to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ttl" | "turtle" => Some(Self::Turtle),
            "nt" | "ntriples" => Some(Self::NTriples),
            "nq" | "nquads" => Some(Self::NQuads),
            "trig" => Some(Self::TriG),
            "rdf" | "owl" | "xml" | "rdfxml" => Some(Self::RdfXml),
            "jsonld" | "json-ld" | "json" => Some(Self::JsonLd),
            _ => None,
        }
    }

    /// Guesses the format of a URL or path from its extension.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let file = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Canonical media type.
    #[must_use]
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Turtle => "text/turtle",
            Self::NTriples => "application/n-triples",
            Self::NQuads => "application/n-quads",
            Self::TriG => "application/trig",
            Self::RdfXml => "application/rdf+xml",
            Self::JsonLd => "application/ld+json",
        }
    }

    /// Returns true if the format can carry named graphs.
    #[must_use]
    pub fn supports_quads(self) -> bool {
        matches!(self, Self::NQuads | Self::TriG | Self::JsonLd)
    }

    /// Guesses the format from the document text.
    #[must_use]
    pub fn sniff(content: &str) -> Option<Self> {
        let content = content.trim_start_matches('\u{feff}').trim();
        if content.is_empty() {
            return None;
        }
        if content.starts_with("<?xml") || content.starts_with("<rdf:RDF") || content.starts_with("<RDF") {
            return Some(Self::RdfXml);
        }
        if content.starts_with('{') || content.starts_with('[') {
            return Some(Self::JsonLd);
        }
        let lower = content.to_ascii_lowercase();
        let has_directives = lower.contains("@prefix") || lower.contains("@base") || lower.contains("prefix ");
        if has_directives {
            if content.contains('{') && content.contains('}') {
                return Some(Self::TriG);
            }
            return Some(Self::Turtle);
        }
        let statements: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        let all_absolute = statements.iter().all(|l| l.starts_with('<') || l.starts_with("_:"));
        if all_absolute && statements.iter().all(|l| l.ends_with('.')) {
            let quads = statements.iter().any(|l| ends_with_graph_term(l));
            return Some(if quads { Self::NQuads } else { Self::NTriples });
        }
        if content.contains(';') || content.contains(" a ") || content.contains(':') {
            return Some(Self::Turtle);
        }
        None
    }

    /// Resolves the format of a document.
    ///
    /// A recognized declared media type wins. Otherwise the content is
    /// sniffed; if that fails, undeclared input falls back to Turtle while a
    /// declared, unrecognized media type is reported as unsupported.
    ///
    /// # Errors
    ///
    /// Returns an unsupported-format [`ParseFailure`] when the declared media
    /// type is not RDF and the content does not look like RDF either.
    pub fn resolve(declared: Option<&str>, content: &str) -> Result<Self, ParseFailure> {
        if let Some(format) = declared.and_then(Self::from_media_type) {
            return Ok(format);
        }
        if let Some(format) = Self::sniff(content) {
            return Ok(format);
        }
        match declared {
            Some(mt) if !mt.trim().is_empty() && !is_generic_media_type(mt) => Err(
                ParseFailure::unsupported(format!("media type {mt:?} is not an RDF serialization")),
            ),
            _ => Ok(Self::Turtle),
        }
    }
}

fn is_generic_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    matches!(essence, "text/plain" | "application/octet-stream")
}

/// N-Quads lines carry a fourth IRI or blank node before the final dot.
fn ends_with_graph_term(line: &str) -> bool {
    let body = line.trim_end_matches('.').trim_end();
    if !body.ends_with('>') {
        return false;
    }
    // Four terms means three separating runs of whitespace outside quotes.
    let mut in_quotes = false;
    let mut escaped = false;
    let mut terms = 0;
    let mut in_term = false;
    for c in body.chars() {
        if in_quotes {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_quotes = false,
                _ => {}
            }
            continue;
        }
        if c.is_whitespace() {
            in_term = false;
            continue;
        }
        if !in_term {
            terms += 1;
            in_term = true;
        }
        if c == '"' {
            in_quotes = true;
        }
    }
    terms >= 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_types_ignore_parameters() {
        assert_eq!(
            RdfFormat::from_media_type("text/turtle; charset=utf-8"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(RdfFormat::from_media_type("application/ld+json"), Some(RdfFormat::JsonLd));
        assert_eq!(RdfFormat::from_media_type("text/html"), None);
    }

    #[test]
    fn paths_map_to_formats() {
        assert_eq!(RdfFormat::from_path("https://x/onto.owl?v=2"), Some(RdfFormat::RdfXml));
        assert_eq!(RdfFormat::from_path("/tmp/data.nq"), Some(RdfFormat::NQuads));
        assert_eq!(RdfFormat::from_path("https://x/onto"), None);
    }

    #[test]
    fn sniffing() {
        assert_eq!(RdfFormat::sniff("<?xml version=\"1.0\"?><rdf:RDF/>"), Some(RdfFormat::RdfXml));
        assert_eq!(RdfFormat::sniff("{\"@context\": {}}"), Some(RdfFormat::JsonLd));
        assert_eq!(
            RdfFormat::sniff("@prefix ex: <http://ex/> .\nex:a ex:b ex:c ."),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(
            RdfFormat::sniff("<http://ex/a> <http://ex/b> \"x y\" ."),
            Some(RdfFormat::NTriples)
        );
        assert_eq!(
            RdfFormat::sniff("<http://ex/a> <http://ex/b> <http://ex/c> <http://ex/g> ."),
            Some(RdfFormat::NQuads)
        );
        assert_eq!(RdfFormat::sniff("   "), None);
    }

    #[test]
    fn resolution_falls_back() {
        assert_eq!(RdfFormat::resolve(None, "nothing rdf-like"), Ok(RdfFormat::Turtle));
        assert_eq!(
            RdfFormat::resolve(Some("text/plain"), "@prefix ex: <http://ex/> ."),
            Ok(RdfFormat::Turtle)
        );
        assert!(RdfFormat::resolve(Some("image/png"), "\u{1}\u{2}").is_err());
        assert_eq!(
            RdfFormat::resolve(Some("text/html"), "<?xml version=\"1.0\"?><rdf:RDF/>"),
            Ok(RdfFormat::RdfXml)
        );
    }
}
