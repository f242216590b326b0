//! Multi-graph quad store.
//!
//! Quads are interned under a monotonically increasing id and indexed by
//! subject, predicate, object and graph. A pattern match starts from the
//! smallest index bucket among its bound components, so lookups cost
//! O(bucket) rather than O(store). Ids also give results a stable
//! insertion order.
//!
//! [`SharedStore`] is the handle passed to every component: a reader/writer
//! lock over one [`QuadStore`] plus one async mutex per graph, so writes into
//! the same graph from different loads never interleave.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::term::{GraphName, Iri, Quad, Subject, Term};

type QuadId = u64;
type Bucket = BTreeSet<QuadId>;

/// A quad pattern; `None` components are wildcards.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadPattern<'a> {
    /// Subject to match.
    pub subject: Option<&'a Subject>,
    /// Predicate to match.
    pub predicate: Option<&'a Iri>,
    /// Object to match.
    pub object: Option<&'a Term>,
    /// Graph to match.
    pub graph: Option<&'a GraphName>,
}

impl<'a> QuadPattern<'a> {
    /// A pattern matching every quad.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Binds the subject.
    #[must_use]
    pub fn subject(mut self, subject: &'a Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Binds the predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: &'a Iri) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Binds the object.
    #[must_use]
    pub fn object(mut self, object: &'a Term) -> Self {
        self.object = Some(object);
        self
    }

    /// Binds the graph.
    #[must_use]
    pub fn graph(mut self, graph: &'a GraphName) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Returns true if `quad` satisfies every bound component.
    #[must_use]
    pub fn matches(&self, quad: &Quad) -> bool {
        self.subject.is_none_or(|s| quad.subject() == s)
            && self.predicate.is_none_or(|p| quad.predicate() == p)
            && self.object.is_none_or(|o| quad.object() == o)
            && self.graph.is_none_or(|g| quad.graph() == g)
    }
}

/// In-memory quad storage with four single-component indexes.
#[derive(Debug, Default)]
pub struct QuadStore {
    next_id: QuadId,
    quads: BTreeMap<QuadId, Quad>,
    ids: HashMap<Quad, QuadId>,
    by_subject: HashMap<Subject, Bucket>,
    by_predicate: HashMap<Iri, Bucket>,
    by_object: HashMap<Term, Bucket>,
    by_graph: HashMap<GraphName, Bucket>,
}

fn index_add<K: Eq + Hash>(index: &mut HashMap<K, Bucket>, key: K, id: QuadId) {
    index.entry(key).or_default().insert(id);
}

fn index_remove<K: Eq + Hash>(index: &mut HashMap<K, Bucket>, key: &K, id: QuadId) {
    if let Some(bucket) = index.get_mut(key) {
        bucket.remove(&id);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}

impl QuadStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a quad. Returns false if it was already present.
    pub fn insert(&mut self, quad: Quad) -> bool {
        if self.ids.contains_key(&quad) {
            return false;
        }
        let id = self.next_id;
        self.next_id += 1;
        index_add(&mut self.by_subject, quad.subject().clone(), id);
        index_add(&mut self.by_predicate, quad.predicate().clone(), id);
        index_add(&mut self.by_object, quad.object().clone(), id);
        index_add(&mut self.by_graph, quad.graph().clone(), id);
        self.ids.insert(quad.clone(), id);
        self.quads.insert(id, quad);
        true
    }

    /// Inserts every quad and returns the ones that were new, in order.
    pub fn insert_all<I>(&mut self, quads: I) -> Vec<Quad>
    where
        I: IntoIterator<Item = Quad>,
    {
        quads
            .into_iter()
            .filter_map(|q| self.insert(q.clone()).then_some(q))
            .collect()
    }

    /// Removes one quad. Returns false if it was absent.
    pub fn remove_quad(&mut self, quad: &Quad) -> bool {
        let Some(id) = self.ids.remove(quad) else {
            return false;
        };
        self.quads.remove(&id);
        index_remove(&mut self.by_subject, quad.subject(), id);
        index_remove(&mut self.by_predicate, quad.predicate(), id);
        index_remove(&mut self.by_object, quad.object(), id);
        index_remove(&mut self.by_graph, quad.graph(), id);
        true
    }

    /// Removes every quad matching `pattern`. Returns how many were removed.
    pub fn remove(&mut self, pattern: QuadPattern<'_>) -> usize {
        let doomed: Vec<Quad> = self.matching(pattern).cloned().collect();
        for quad in &doomed {
            self.remove_quad(quad);
        }
        doomed.len()
    }

    /// Removes a whole graph. Returns how many quads were removed.
    pub fn remove_graph(&mut self, graph: &GraphName) -> usize {
        self.remove(QuadPattern::any().graph(graph))
    }

    /// Iterates quads matching `pattern`, in insertion order.
    pub fn matching<'s>(&'s self, pattern: QuadPattern<'_>) -> impl Iterator<Item = &'s Quad> + 's {
        let candidates: Option<&Bucket> = self.smallest_bucket(&pattern);
        let ids: Box<dyn Iterator<Item = &'s Quad> + 's> = match candidates {
            Some(bucket) => Box::new(bucket.iter().filter_map(|id| self.quads.get(id))),
            None if Self::is_bound(&pattern) => Box::new(std::iter::empty()),
            None => Box::new(self.quads.values()),
        };
        let pattern = OwnedPattern::from(pattern);
        ids.filter(move |q| pattern.as_pattern().matches(q))
    }

    /// Collects quads matching the optional components.
    #[must_use]
    pub fn match_quads(
        &self,
        subject: Option<&Subject>,
        predicate: Option<&Iri>,
        object: Option<&Term>,
        graph: Option<&GraphName>,
    ) -> Vec<Quad> {
        let pattern = QuadPattern {
            subject,
            predicate,
            object,
            graph,
        };
        self.matching(pattern).cloned().collect()
    }

    fn is_bound(pattern: &QuadPattern<'_>) -> bool {
        pattern.subject.is_some()
            || pattern.predicate.is_some()
            || pattern.object.is_some()
            || pattern.graph.is_some()
    }

    /// Picks the smallest bucket among the bound components. Returns `None`
    /// when nothing is bound or a bound component has no bucket at all.
    fn smallest_bucket(&self, pattern: &QuadPattern<'_>) -> Option<&Bucket> {
        let buckets = [
            pattern.subject.map(|s| self.by_subject.get(s)),
            pattern.predicate.map(|p| self.by_predicate.get(p)),
            pattern.object.map(|o| self.by_object.get(o)),
            pattern.graph.map(|g| self.by_graph.get(g)),
        ];
        let mut best: Option<&Bucket> = None;
        for bucket in buckets.into_iter().flatten() {
            let bucket = bucket?;
            if best.is_none_or(|b| bucket.len() < b.len()) {
                best = Some(bucket);
            }
        }
        best
    }

    /// Returns true if the quad is present.
    #[must_use]
    pub fn contains(&self, quad: &Quad) -> bool {
        self.ids.contains_key(quad)
    }

    /// Total number of quads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Returns true if the store holds no quads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Number of quads in one graph.
    #[must_use]
    pub fn graph_len(&self, graph: &GraphName) -> usize {
        self.by_graph.get(graph).map_or(0, BTreeSet::len)
    }

    /// Names of all non-empty graphs, sorted.
    #[must_use]
    pub fn graph_names(&self) -> Vec<GraphName> {
        let mut names: Vec<GraphName> = self.by_graph.keys().cloned().collect();
        names.sort();
        names
    }

    /// Iterates all quads in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.values()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        *self = Self {
            next_id: self.next_id,
            ..Self::default()
        };
    }
}

/// Owned copy of a pattern so the filter closure outlives the borrowed one.
struct OwnedPattern {
    subject: Option<Subject>,
    predicate: Option<Iri>,
    object: Option<Term>,
    graph: Option<GraphName>,
}

impl From<QuadPattern<'_>> for OwnedPattern {
    fn from(p: QuadPattern<'_>) -> Self {
        Self {
            subject: p.subject.cloned(),
            predicate: p.predicate.cloned(),
            object: p.object.cloned(),
            graph: p.graph.cloned(),
        }
    }
}

impl OwnedPattern {
    fn as_pattern(&self) -> QuadPattern<'_> {
        QuadPattern {
            subject: self.subject.as_ref(),
            predicate: self.predicate.as_ref(),
            object: self.object.as_ref(),
            graph: self.graph.as_ref(),
        }
    }
}

/// Shared handle to one store.
///
/// Cloning the handle shares the store. All mutations go through the write
/// lock, so there is never more than one writer.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<QuadStore>>,
    graph_locks: Arc<DashMap<GraphName, Arc<tokio::sync::Mutex<()>>>>,
}

impl SharedStore {
    /// Creates a handle to a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access.
    pub fn read(&self) -> RwLockReadGuard<'_, QuadStore> {
        self.inner.read()
    }

    /// Write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, QuadStore> {
        self.inner.write()
    }

    /// Serializes multi-step writers of one graph. Hold the guard for the
    /// whole sequence of batch inserts belonging to one load.
    pub async fn lock_graph(&self, graph: &GraphName) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = self
            .graph_locks
            .entry(graph.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .value()
            .clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Literal;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    fn quad(s: &str, p: &str, o: &str, g: &str) -> Quad {
        Quad::new(iri(s), iri(p), iri(o), GraphName::new(g).unwrap())
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut store = QuadStore::new();
        let q = quad("http://ex/s", "http://ex/p", "http://ex/o", "urn:g");
        assert!(store.insert(q.clone()));
        assert!(!store.insert(q));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn pattern_match_uses_bound_components() {
        let mut store = QuadStore::new();
        store.insert(quad("http://ex/a", "http://ex/p", "http://ex/x", "urn:g1"));
        store.insert(quad("http://ex/a", "http://ex/q", "http://ex/y", "urn:g1"));
        store.insert(quad("http://ex/b", "http://ex/p", "http://ex/x", "urn:g2"));

        let a = Subject::Iri(iri("http://ex/a"));
        let p = iri("http://ex/p");
        let g2 = GraphName::new("urn:g2").unwrap();

        assert_eq!(store.match_quads(Some(&a), None, None, None).len(), 2);
        assert_eq!(store.match_quads(None, Some(&p), None, None).len(), 2);
        assert_eq!(store.match_quads(Some(&a), Some(&p), None, None).len(), 1);
        assert_eq!(store.match_quads(None, Some(&p), None, Some(&g2)).len(), 1);
        assert_eq!(store.match_quads(None, None, None, None).len(), 3);

        let missing = Subject::Iri(iri("http://ex/none"));
        assert!(store.match_quads(Some(&missing), None, None, None).is_empty());
    }

    #[test]
    fn results_follow_insertion_order() {
        let mut store = QuadStore::new();
        for i in 0..5 {
            store.insert(quad(&format!("http://ex/s{i}"), "http://ex/p", "http://ex/o", "urn:g"));
        }
        let subjects: Vec<String> = store
            .iter()
            .map(|q| q.subject().to_string())
            .collect();
        assert_eq!(subjects[0], "<http://ex/s0>");
        assert_eq!(subjects[4], "<http://ex/s4>");
    }

    #[test]
    fn remove_graph_only_touches_that_graph() {
        let mut store = QuadStore::new();
        store.insert(quad("http://ex/a", "http://ex/p", "http://ex/x", "urn:g1"));
        store.insert(quad("http://ex/a", "http://ex/p", "http://ex/x", "urn:g2"));
        let g1 = GraphName::new("urn:g1").unwrap();
        assert_eq!(store.remove_graph(&g1), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.graph_len(&g1), 0);
        assert_eq!(store.graph_names(), vec![GraphName::new("urn:g2").unwrap()]);
    }

    #[test]
    fn remove_by_pattern_cleans_indexes() {
        let mut store = QuadStore::new();
        let label = Quad::new(
            iri("http://ex/a"),
            iri("http://www.w3.org/2000/01/rdf-schema#label"),
            Literal::simple("A"),
            GraphName::default_graph(),
        );
        store.insert(label.clone());
        store.insert(quad("http://ex/a", "http://ex/p", "http://ex/x", "urn:g1"));
        let removed = store.remove(QuadPattern::any().predicate(label.predicate()));
        assert_eq!(removed, 1);
        assert!(!store.contains(&label));
        assert!(store
            .match_quads(None, None, Some(label.object()), None)
            .is_empty());
    }

    #[tokio::test]
    async fn graph_locks_serialize_writers() {
        let store = SharedStore::new();
        let g = GraphName::data();
        let guard = store.lock_graph(&g).await;
        let other = store.clone();
        let g2 = g.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.lock_graph(&g2).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }
}
