//! N-Triples and N-Quads serializers.
//!
//! One statement per line with absolute IRIs, suitable for streaming and
//! diff-friendly storage. N-Triples output drops graph names and repeated
//! triples; N-Quads keeps the graph unless it is the default graph.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::term::Quad;

/// Serializes quads as N-Triples. A triple present in several graphs is
/// written once.
#[must_use]
pub fn to_ntriples(quads: &[&Quad]) -> String {
    let mut out = String::with_capacity(quads.len() * 96);
    let mut seen = HashSet::new();
    for quad in quads {
        if !seen.insert((quad.subject(), quad.predicate(), quad.object())) {
            continue;
        }
        let _ = writeln!(out, "{} {} {} .", quad.subject(), quad.predicate(), quad.object());
    }
    out
}

/// Serializes quads as N-Quads.
#[must_use]
pub fn to_nquads(quads: &[&Quad]) -> String {
    let mut out = String::with_capacity(quads.len() * 128);
    for quad in quads {
        let _ = writeln!(out, "{quad}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{GraphName, Iri, Literal};

    fn quads() -> Vec<Quad> {
        let s = Iri::new("http://ex.org/s").unwrap();
        let p = Iri::new("http://ex.org/p").unwrap();
        let o = Literal::lang("line\n\"two\"", "en").unwrap();
        vec![
            Quad::new(s.clone(), p.clone(), o.clone(), GraphName::new("urn:g1").unwrap()),
            Quad::new(s.clone(), p.clone(), o.clone(), GraphName::new("urn:g2").unwrap()),
            Quad::new(s, p, o, GraphName::default_graph()),
        ]
    }

    #[test]
    fn ntriples_collapses_graphs() {
        let quads = quads();
        let refs: Vec<&Quad> = quads.iter().collect();
        let nt = to_ntriples(&refs);
        assert_eq!(
            nt,
            "<http://ex.org/s> <http://ex.org/p> \"line\\n\\\"two\\\"\"@en .\n"
        );
    }

    #[test]
    fn nquads_keeps_named_graphs() {
        let quads = quads();
        let refs: Vec<&Quad> = quads.iter().collect();
        let nq = to_nquads(&refs);
        let lines: Vec<&str> = nq.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("<urn:g1> ."));
        assert!(lines[1].ends_with("<urn:g2> ."));
        assert!(lines[2].ends_with("@en ."));
    }
}
