//! JSON-LD serializer.
//!
//! Produces a single document with an `@context` built from the prefixes the
//! output uses and a `@graph` array. Default-graph nodes sit directly in the
//! top-level `@graph`; each named graph becomes a node with its own nested
//! `@graph`.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};

use crate::namespace::RegistrySnapshot;
use crate::term::{GraphName, Iri, Literal, Quad, Subject, Term};
use crate::vocab;

/// Serializes quads to a JSON-LD `Value`.
///
/// The returned value can be pretty-printed with [`serde_json::to_string_pretty`].
#[must_use]
pub fn to_json_ld(quads: &[&Quad], registry: &RegistrySnapshot) -> Value {
    let mut compactor = Compactor {
        registry,
        used: BTreeMap::new(),
    };

    let mut graphs: Vec<(&GraphName, NodeList<'_>)> = Vec::new();
    let mut graph_positions: HashMap<&GraphName, usize> = HashMap::new();
    for quad in quads {
        let g = *graph_positions.entry(quad.graph()).or_insert_with(|| {
            graphs.push((quad.graph(), NodeList::default()));
            graphs.len() - 1
        });
        graphs[g].1.add(quad);
    }

    let mut top: Vec<Value> = Vec::new();
    for (graph, nodes) in &graphs {
        let rendered = nodes.render(&mut compactor);
        if graph.is_default() {
            top.extend(rendered);
        } else {
            top.push(json!({
                "@id": compactor.iri(graph.iri()),
                "@graph": rendered,
            }));
        }
    }

    let mut context = Map::new();
    for (prefix, namespace) in &compactor.used {
        context.insert(prefix.clone(), json!(namespace));
    }
    json!({
        "@context": Value::Object(context),
        "@graph": top,
    })
}

#[derive(Default)]
struct NodeList<'q> {
    order: Vec<&'q Subject>,
    nodes: HashMap<&'q Subject, Vec<(&'q Iri, &'q Term)>>,
}

impl<'q> NodeList<'q> {
    fn add(&mut self, quad: &'q Quad) {
        let statements = self.nodes.entry(quad.subject()).or_insert_with(|| {
            self.order.push(quad.subject());
            Vec::new()
        });
        statements.push((quad.predicate(), quad.object()));
    }

    fn render(&self, compactor: &mut Compactor<'_>) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|subject| {
                let statements = self.nodes.get(subject)?;
                Some(render_node(subject, statements, compactor))
            })
            .collect()
    }
}

fn render_node(subject: &Subject, statements: &[(&Iri, &Term)], compactor: &mut Compactor<'_>) -> Value {
    let mut node = Map::new();
    let id = match subject {
        Subject::Iri(iri) => compactor.iri(iri),
        Subject::BlankNode(b) => b.to_string(),
    };
    node.insert("@id".to_owned(), Value::String(id));

    let mut types: Vec<Value> = Vec::new();
    for (predicate, object) in statements {
        if predicate.as_str() == vocab::RDF_TYPE {
            if let Term::Iri(class) = object {
                types.push(Value::String(compactor.iri(class)));
                continue;
            }
        }
        let key = compactor.iri(predicate);
        let value = compactor.value(object);
        match node.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            _ => {
                node.insert(key, Value::Array(vec![value]));
            }
        }
    }
    if !types.is_empty() {
        node.insert("@type".to_owned(), Value::Array(types));
    }
    Value::Object(node)
}

struct Compactor<'r> {
    registry: &'r RegistrySnapshot,
    used: BTreeMap<String, String>,
}

impl Compactor<'_> {
    fn iri(&mut self, iri: &Iri) -> String {
        let Some(curie) = self.registry.compact(iri.as_str()) else {
            return iri.as_str().to_owned();
        };
        let prefix = curie.split(':').next().unwrap_or_default();
        match self.registry.namespace(prefix) {
            // An empty prefix is not a JSON-LD term.
            Some(namespace) if !prefix.is_empty() => {
                self.used.insert(prefix.to_owned(), namespace.to_owned());
                curie
            }
            _ => iri.as_str().to_owned(),
        }
    }

    fn value(&mut self, term: &Term) -> Value {
        match term {
            Term::Iri(iri) => json!({ "@id": self.iri(iri) }),
            Term::BlankNode(b) => json!({ "@id": b.to_string() }),
            Term::Literal(literal) => self.literal(literal),
        }
    }

    fn literal(&mut self, literal: &Literal) -> Value {
        if let Some(lang) = literal.language() {
            json!({ "@value": literal.value(), "@language": lang })
        } else if let Some(datatype) = literal.datatype() {
            json!({ "@value": literal.value(), "@type": self.iri(datatype) })
        } else {
            json!(literal.value())
        }
    }
}
