//! IRI constants for the core vocabularies and the reserved graph names.
//!
//! The reserved graphs are a convention shared with callers, not a
//! protocol: the store treats every graph name as an opaque IRI.

/// RDF namespace.
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// RDFS namespace.
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
/// OWL namespace.
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
/// XSD namespace.
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
/// XML namespace.
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
/// `rdf:langString`.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
/// `rdf:Property`.
pub const RDF_PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
/// `rdfs:label`.
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
/// `rdfs:domain`.
pub const RDFS_DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
/// `rdfs:range`.
pub const RDFS_RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";
/// `owl:Class`.
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
/// `owl:ObjectProperty`.
pub const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
/// `owl:DatatypeProperty`.
pub const OWL_DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";
/// `owl:Ontology`.
pub const OWL_ONTOLOGY: &str = "http://www.w3.org/2002/07/owl#Ontology";
/// `owl:imports`.
pub const OWL_IMPORTS: &str = "http://www.w3.org/2002/07/owl#imports";
/// `xsd:string`.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Sentinel IRI standing in for the RDF default graph.
pub const DEFAULT_GRAPH: &str = "urn:x-onto-store:default-graph";

/// Conventional graph for editable user data.
pub const GRAPH_DATA: &str = "urn:vg:data";
/// Conventional graph for ontology/schema triples.
pub const GRAPH_ONTOLOGIES: &str = "urn:vg:ontologies";
/// Conventional graph for inferred triples.
pub const GRAPH_INFERRED: &str = "urn:vg:inferred";

/// Namespaces that are never loaded as discovered ontologies.
pub const CORE_NAMESPACES: &[&str] = &[RDF, RDFS, OWL, XSD, XML];
