//! RDF/XML serializer.
//!
//! One `rdf:Description` per subject, in first-seen order. Predicates need an
//! XML qualified name: the registry prefix is used when one matches, otherwise
//! a `nsN` prefix is declared on the root element. Graph names are dropped.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use crate::error::ExportError;
use crate::iri;
use crate::namespace::RegistrySnapshot;
use crate::term::{Iri, Quad, Subject, Term};
use crate::vocab;

/// Serializes quads to an RDF/XML document.
///
/// # Errors
///
/// Returns [`ExportError::UnsplittablePredicate`] if a predicate IRI has no
/// suffix usable as an XML element name.
pub fn to_rdf_xml(quads: &[&Quad], registry: &RegistrySnapshot) -> Result<String, ExportError> {
    let mut names = QNames::new(registry);

    let mut order: Vec<&Subject> = Vec::new();
    let mut by_subject: HashMap<&Subject, Vec<(&Iri, &Term)>> = HashMap::new();
    for quad in quads {
        let statements = by_subject.entry(quad.subject()).or_insert_with(|| {
            order.push(quad.subject());
            Vec::new()
        });
        if !statements.contains(&(quad.predicate(), quad.object())) {
            statements.push((quad.predicate(), quad.object()));
        }
    }

    let mut body = String::with_capacity(quads.len() * 96);
    for subject in &order {
        match subject {
            Subject::Iri(iri) => {
                let _ = writeln!(body, "  <rdf:Description rdf:about=\"{}\">", escape(iri.as_str()));
            }
            Subject::BlankNode(b) => {
                let _ = writeln!(body, "  <rdf:Description rdf:nodeID=\"{}\">", escape(b.label()));
            }
        }
        for (predicate, object) in by_subject.get(subject).map(Vec::as_slice).unwrap_or_default() {
            let qname = names.qname(predicate)?;
            match object {
                Term::Iri(target) => {
                    let _ = writeln!(body, "    <{qname} rdf:resource=\"{}\"/>", escape(target.as_str()));
                }
                Term::BlankNode(b) => {
                    let _ = writeln!(body, "    <{qname} rdf:nodeID=\"{}\"/>", escape(b.label()));
                }
                Term::Literal(literal) => {
                    let attr = if let Some(lang) = literal.language() {
                        format!(" xml:lang=\"{}\"", escape(lang))
                    } else if let Some(datatype) = literal.datatype() {
                        format!(" rdf:datatype=\"{}\"", escape(datatype.as_str()))
                    } else {
                        String::new()
                    };
                    let _ = writeln!(body, "    <{qname}{attr}>{}</{qname}>", escape(literal.value()));
                }
            }
        }
        body.push_str("  </rdf:Description>\n");
    }

    let mut out = String::with_capacity(body.len() + 512);
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<rdf:RDF");
    for (prefix, namespace) in &names.declared {
        let _ = write!(out, "\n    xmlns:{prefix}=\"{}\"", escape(namespace));
    }
    out.push_str(">\n");
    out.push_str(&body);
    out.push_str("</rdf:RDF>\n");
    Ok(out)
}

struct QNames<'r> {
    registry: &'r RegistrySnapshot,
    declared: BTreeMap<String, String>,
    synthesized: usize,
}

impl<'r> QNames<'r> {
    fn new(registry: &'r RegistrySnapshot) -> Self {
        let mut declared = BTreeMap::new();
        declared.insert("rdf".to_owned(), vocab::RDF.to_owned());
        Self {
            registry,
            declared,
            synthesized: 0,
        }
    }

    fn qname(&mut self, predicate: &Iri) -> Result<String, ExportError> {
        let (namespace, local) = split_for_xml(predicate.as_str())
            .ok_or_else(|| ExportError::UnsplittablePredicate(predicate.as_str().to_owned()))?;

        if let Some((prefix, _)) = self.declared.iter().find(|(_, ns)| ns.as_str() == namespace) {
            return Ok(format!("{prefix}:{local}"));
        }
        let prefix = match self.registry.entry_for_namespace(namespace) {
            Some(entry) if is_nc_name(&entry.prefix) && !self.declared.contains_key(&entry.prefix) => {
                entry.prefix.clone()
            }
            _ => loop {
                self.synthesized += 1;
                let candidate = format!("ns{}", self.synthesized);
                if !self.declared.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        self.declared.insert(prefix.clone(), namespace.to_owned());
        Ok(format!("{prefix}:{local}"))
    }
}

/// Splits an IRI into a namespace and the longest suffix that is an XML
/// name.
fn split_for_xml(iri_str: &str) -> Option<(&str, &str)> {
    let namespace = iri::namespace_of(iri_str);
    let local = &iri_str[namespace.len()..];
    if is_nc_name(local) {
        return Some((namespace, local));
    }
    let start = iri_str
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_name_char(*c))
        .last()
        .map(|(i, _)| i)?;
    let start = iri_str[start..]
        .char_indices()
        .find(|(_, c)| is_name_start(*c))
        .map(|(i, _)| start + i)?;
    Some((&iri_str[..start], &iri_str[start..]))
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn is_nc_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{ConflictPolicy, NamespaceRegistry};
    use crate::term::{BlankNode, GraphName, Literal};

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    fn registry() -> RegistrySnapshot {
        NamespaceRegistry::with_well_known(ConflictPolicy::FirstWins).snapshot(std::iter::empty())
    }

    #[test]
    fn writes_descriptions_with_registry_prefixes() {
        let g = GraphName::data();
        let quads = vec![
            Quad::new(iri("http://ex.org/A"), iri(vocab::RDF_TYPE), iri(vocab::OWL_CLASS), g.clone()),
            Quad::new(iri("http://ex.org/A"), iri(vocab::RDFS_LABEL), Literal::lang("A & B", "en").unwrap(), g.clone()),
            Quad::new(iri("http://ex.org/A"), iri("http://ex.org/vocab/size"), BlankNode::new("b0").unwrap(), g),
        ];
        let refs: Vec<&Quad> = quads.iter().collect();
        let xml = to_rdf_xml(&refs, &registry()).unwrap();

        assert!(xml.contains("xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\""));
        assert!(xml.contains("xmlns:rdfs=\"http://www.w3.org/2000/01/rdf-schema#\""));
        assert!(xml.contains("xmlns:ns1=\"http://ex.org/vocab/\""));
        assert!(xml.contains("<rdf:Description rdf:about=\"http://ex.org/A\">"));
        assert!(xml.contains("<rdf:type rdf:resource=\"http://www.w3.org/2002/07/owl#Class\"/>"));
        assert!(xml.contains("<rdfs:label xml:lang=\"en\">A &amp; B</rdfs:label>"));
        assert!(xml.contains("<ns1:size rdf:nodeID=\"b0\"/>"));
    }

    #[test]
    fn predicates_without_an_xml_name_are_rejected() {
        let quads = vec![Quad::new(
            iri("http://ex.org/A"),
            iri("http://ex.org/123"),
            Literal::simple("x"),
            GraphName::data(),
        )];
        let refs: Vec<&Quad> = quads.iter().collect();
        assert!(matches!(
            to_rdf_xml(&refs, &registry()),
            Err(ExportError::UnsplittablePredicate(p)) if p == "http://ex.org/123"
        ));
    }
}
