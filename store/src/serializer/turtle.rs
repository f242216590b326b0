//! Turtle serializer.
//!
//! Statements are grouped by subject (in first-seen order), then by
//! predicate. IRIs are compacted with the registry snapshot when the local
//! part is a valid prefixed-name local; only the prefixes actually used are
//! declared. Graph names are not representable and are dropped.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use crate::namespace::RegistrySnapshot;
use crate::term::{escape_literal, Iri, Literal, Quad, Subject, Term};
use crate::vocab;

/// Serializes quads to a Turtle document.
#[must_use]
pub fn to_turtle(quads: &[&Quad], registry: &RegistrySnapshot) -> String {
    let mut writer = Writer {
        registry,
        used: BTreeMap::new(),
    };

    // subject -> predicate -> objects, each level in first-seen order
    let mut subjects: Vec<(&Subject, Vec<(&Iri, Vec<&Term>)>)> = Vec::new();
    let mut positions: HashMap<&Subject, usize> = HashMap::new();
    for quad in quads {
        let s = *positions.entry(quad.subject()).or_insert_with(|| {
            subjects.push((quad.subject(), Vec::new()));
            subjects.len() - 1
        });
        let predicates = &mut subjects[s].1;
        let p = match predicates.iter().position(|(p, _)| *p == quad.predicate()) {
            Some(i) => i,
            None => {
                predicates.push((quad.predicate(), Vec::new()));
                predicates.len() - 1
            }
        };
        let objects = &mut predicates[p].1;
        if !objects.contains(&quad.object()) {
            objects.push(quad.object());
        }
    }

    let mut body = String::with_capacity(quads.len() * 64);
    for (subject, predicates) in &subjects {
        body.push_str(&writer.subject(subject));
        for (i, (predicate, objects)) in predicates.iter().enumerate() {
            let sep = if i == 0 { "\n    " } else { " ;\n    " };
            body.push_str(sep);
            body.push_str(&writer.predicate(predicate));
            body.push(' ');
            let rendered: Vec<String> = objects.iter().map(|o| writer.object(o)).collect();
            body.push_str(&rendered.join(" , "));
        }
        body.push_str(" .\n\n");
    }

    let mut out = String::with_capacity(body.len() + writer.used.len() * 48);
    for (prefix, namespace) in &writer.used {
        let _ = writeln!(out, "@prefix {prefix}: <{namespace}> .");
    }
    if !writer.used.is_empty() {
        out.push('\n');
    }
    out.push_str(&body);
    out
}

struct Writer<'r> {
    registry: &'r RegistrySnapshot,
    used: BTreeMap<String, String>,
}

impl Writer<'_> {
    fn iri(&mut self, iri: &Iri) -> String {
        match self.registry.compact(iri.as_str()) {
            Some(curie) => {
                let prefix = curie.split(':').next().unwrap_or_default();
                if let Some(namespace) = self.registry.namespace(prefix) {
                    self.used.insert(prefix.to_owned(), namespace.to_owned());
                }
                curie
            }
            None => iri.to_string(),
        }
    }

    fn subject(&mut self, subject: &Subject) -> String {
        match subject {
            Subject::Iri(iri) => self.iri(iri),
            Subject::BlankNode(b) => b.to_string(),
        }
    }

    fn predicate(&mut self, predicate: &Iri) -> String {
        if predicate.as_str() == vocab::RDF_TYPE {
            "a".to_owned()
        } else {
            self.iri(predicate)
        }
    }

    fn object(&mut self, object: &Term) -> String {
        match object {
            Term::Iri(iri) => self.iri(iri),
            Term::BlankNode(b) => b.to_string(),
            Term::Literal(literal) => self.literal(literal),
        }
    }

    fn literal(&mut self, literal: &Literal) -> String {
        let value = format!("\"{}\"", escape_literal(literal.value()));
        if let Some(lang) = literal.language() {
            format!("{value}@{lang}")
        } else if let Some(datatype) = literal.datatype() {
            format!("{value}^^{}", self.iri(datatype))
        } else {
            value
        }
    }
}
