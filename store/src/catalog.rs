//! Catalog of well-known ontologies.
//!
//! A source is "recognized" when its URL matches a catalog entry's namespace
//! or document URL (scheme-agnostic). Recognized sources get an immediate
//! `pending` record when a load starts, and their prefixes seed the
//! namespace registry.

use crate::iri;

/// A well-known ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnownOntology {
    /// Conventional prefix.
    pub prefix: &'static str,
    /// Namespace IRI.
    pub namespace: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// URL the ontology document is fetched from.
    pub document_url: &'static str,
    /// Core vocabularies are never loaded by discovery.
    pub core: bool,
}

/// Every catalog entry.
pub const WELL_KNOWN: &[WellKnownOntology] = &[
    WellKnownOntology {
        prefix: "rdf",
        namespace: "http://www.w3.org/1999/02/22-rdf-syntax-ns#",
        name: "RDF",
        document_url: "http://www.w3.org/1999/02/22-rdf-syntax-ns",
        core: true,
    },
    WellKnownOntology {
        prefix: "rdfs",
        namespace: "http://www.w3.org/2000/01/rdf-schema#",
        name: "RDF Schema",
        document_url: "http://www.w3.org/2000/01/rdf-schema",
        core: true,
    },
    WellKnownOntology {
        prefix: "owl",
        namespace: "http://www.w3.org/2002/07/owl#",
        name: "OWL",
        document_url: "http://www.w3.org/2002/07/owl",
        core: true,
    },
    WellKnownOntology {
        prefix: "xsd",
        namespace: "http://www.w3.org/2001/XMLSchema#",
        name: "XML Schema Datatypes",
        document_url: "http://www.w3.org/2001/XMLSchema",
        core: true,
    },
    WellKnownOntology {
        prefix: "foaf",
        namespace: "http://xmlns.com/foaf/0.1/",
        name: "FOAF",
        document_url: "http://xmlns.com/foaf/spec/index.rdf",
        core: false,
    },
    WellKnownOntology {
        prefix: "skos",
        namespace: "http://www.w3.org/2004/02/skos/core#",
        name: "SKOS",
        document_url: "http://www.w3.org/2004/02/skos/core",
        core: false,
    },
    WellKnownOntology {
        prefix: "dcterms",
        namespace: "http://purl.org/dc/terms/",
        name: "Dublin Core Terms",
        document_url: "http://purl.org/dc/terms/",
        core: false,
    },
    WellKnownOntology {
        prefix: "prov",
        namespace: "http://www.w3.org/ns/prov#",
        name: "PROV-O",
        document_url: "http://www.w3.org/ns/prov-o",
        core: false,
    },
    WellKnownOntology {
        prefix: "schema",
        namespace: "https://schema.org/",
        name: "schema.org",
        document_url: "https://schema.org/version/latest/schemaorg-current-https.ttl",
        core: false,
    },
    WellKnownOntology {
        prefix: "oa",
        namespace: "http://www.w3.org/ns/oa#",
        name: "Web Annotation",
        document_url: "http://www.w3.org/ns/oa.ttl",
        core: false,
    },
    WellKnownOntology {
        prefix: "qudt",
        namespace: "http://qudt.org/schema/qudt/",
        name: "QUDT",
        document_url: "http://qudt.org/schema/qudt/",
        core: false,
    },
    WellKnownOntology {
        prefix: "dcat",
        namespace: "http://www.w3.org/ns/dcat#",
        name: "DCAT",
        document_url: "http://www.w3.org/ns/dcat.ttl",
        core: false,
    },
    WellKnownOntology {
        prefix: "sh",
        namespace: "http://www.w3.org/ns/shacl#",
        name: "SHACL",
        document_url: "http://www.w3.org/ns/shacl.ttl",
        core: false,
    },
];

/// Looks up the catalog entry a URL refers to, by namespace or document URL.
#[must_use]
pub fn lookup(url: &str) -> Option<&'static WellKnownOntology> {
    let key = iri::equivalence_key(url);
    WELL_KNOWN.iter().find(|entry| {
        iri::equivalence_key(entry.namespace) == key
            || iri::equivalence_key(entry.document_url) == key
    })
}

/// Returns true if the URL is a recognized ontology.
#[must_use]
pub fn is_recognized(url: &str) -> bool {
    lookup(url).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_scheme_agnostic() {
        let entry = lookup("https://xmlns.com/foaf/0.1/").map(|e| e.prefix);
        assert_eq!(entry, Some("foaf"));
        assert_eq!(lookup("http://www.w3.org/ns/prov").map(|e| e.prefix), Some("prov"));
    }

    #[test]
    fn unknown_urls_are_not_recognized() {
        assert!(!is_recognized("https://example.org/my-ontology"));
    }

    #[test]
    fn prefixes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for entry in WELL_KNOWN {
            assert!(seen.insert(entry.prefix), "duplicate prefix {}", entry.prefix);
        }
    }
}
