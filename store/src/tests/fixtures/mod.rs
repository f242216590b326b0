//! RDF documents for parser, loader, index and discovery tests.
//!
//! Single-format documents live here; the small ontology network used by
//! discovery tests lives in [`ontologies`].

pub mod ontologies;

pub use ontologies::{ONTOLOGY_WITH_IMPORTS, SHAPES_ONTOLOGY, UNITS_ONTOLOGY};

use std::fmt::Write as _;

/// One class with an untagged label in the `http://example.org/test#`
/// namespace, declared through the default prefix.
pub const MY_CLASS_TURTLE: &str = r#"
@prefix :     <http://example.org/test#> .
@prefix owl:  <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

:MyClass a owl:Class ;
    rdfs:label "MyClass Label" .
"#;

/// Prefixes in both Turtle syntaxes (`@prefix` and SPARQL-style `PREFIX`),
/// including the empty prefix.
pub const PREFIXED_TURTLE: &str = r#"
@prefix ex: <http://example.org/test#> .
@prefix :   <http://example.org/default/> .
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>

ex:Thing a skos:Concept ;
    skos:prefLabel "Thing"@en .

:local skos:broader ex:Thing .
"#;

/// A class in RDF/XML.
pub const SMALL_RDFXML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rdf:RDF
    xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
    xmlns:owl="http://www.w3.org/2002/07/owl#"
    xmlns:ex="http://example.org/xml#">
  <owl:Class rdf:about="http://example.org/xml#Gadget">
    <rdfs:label xml:lang="en">Gadget</rdfs:label>
  </owl:Class>
  <owl:DatatypeProperty rdf:about="http://example.org/xml#weight">
    <rdfs:domain rdf:resource="http://example.org/xml#Gadget"/>
  </owl:DatatypeProperty>
</rdf:RDF>
"#;

/// A class in JSON-LD. The `label` context member is a term definition,
/// not a prefix.
pub const SMALL_JSONLD: &str = r#"{
  "@context": {
    "ex": "http://example.org/json#",
    "owl": "http://www.w3.org/2002/07/owl#",
    "rdfs": "http://www.w3.org/2000/01/rdf-schema#",
    "label": "rdfs:label"
  },
  "@id": "ex:Gizmo",
  "@type": "owl:Class",
  "label": "Gizmo"
}"#;

/// Turtle with an unterminated string literal.
pub const BROKEN_TURTLE: &str = r#"
@prefix ex: <http://example.org/broken#> .

ex:a ex:b "unterminated .
"#;

/// `n` distinct N-Triples statements.
#[must_use]
pub fn many_triples(n: usize) -> String {
    let mut out = String::with_capacity(n * 72);
    for i in 0..n {
        let _ = writeln!(
            out,
            "<http://example.org/bulk/s{i}> <http://example.org/bulk/value> \"{i}\" ."
        );
    }
    out
}
