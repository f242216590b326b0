//! A small ontology network: a main ontology importing two others plus OWL.

/// Main ontology, declared as `http://example.org/onto/main`. Imports
/// [`SHAPES_ONTOLOGY`], [`UNITS_ONTOLOGY`] (with a trailing slash) and OWL.
pub const ONTOLOGY_WITH_IMPORTS: &str = r#"
@prefix owl:  <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix main: <http://example.org/onto/main#> .

<http://example.org/onto/main> a owl:Ontology ;
    rdfs:label "Main" ;
    owl:imports <http://example.org/onto/shapes> ,
                <http://example.org/onto/units/> ,
                <http://www.w3.org/2002/07/owl> .

main:Widget a owl:Class ;
    rdfs:label "Widget"@en .

main:hasPart a owl:ObjectProperty ;
    rdfs:domain main:Widget ;
    rdfs:range main:Widget .
"#;

/// Imported by the main ontology; imports nothing.
pub const SHAPES_ONTOLOGY: &str = r#"
@prefix owl:    <http://www.w3.org/2002/07/owl#> .
@prefix rdfs:   <http://www.w3.org/2000/01/rdf-schema#> .
@prefix shapes: <http://example.org/onto/shapes#> .

<http://example.org/onto/shapes> a owl:Ontology .

shapes:Shape a owl:Class ;
    rdfs:label "Shape"@en , "Forme"@fr .
"#;

/// Imported by the main ontology; imports the shapes ontology again.
pub const UNITS_ONTOLOGY: &str = r#"
@prefix owl:   <http://www.w3.org/2002/07/owl#> .
@prefix rdfs:  <http://www.w3.org/2000/01/rdf-schema#> .
@prefix units: <http://example.org/onto/units#> .

<http://example.org/onto/units> a owl:Ontology ;
    owl:imports <http://example.org/onto/shapes> .

units:unitOf a owl:DatatypeProperty ;
    rdfs:label "unit of" .
"#;
