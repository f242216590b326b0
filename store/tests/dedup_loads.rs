//! Concurrent loads of the same source share one fetch, parse and insert.

use std::sync::Arc;
use std::time::Duration;

use onto_store::loader::{Fetcher, StaticFetcher};
use onto_store::tests::fixtures;
use onto_store::{GraphLoader, GraphName, KnowledgeBase, LoadReport, LoadRequest, StoreConfig};

const URL: &str = "http://example.org/files/my-class.ttl";

fn setup(fetcher: &Arc<StaticFetcher>) -> (Arc<KnowledgeBase>, GraphLoader) {
    let kb = Arc::new(KnowledgeBase::new(StoreConfig::default()));
    let shared: Arc<dyn Fetcher> = fetcher.clone();
    let loader = GraphLoader::new(Arc::clone(&kb), shared).unwrap();
    (kb, loader)
}

fn graph() -> GraphName {
    GraphName::new("urn:test:dedup").unwrap()
}

#[tokio::test]
async fn equivalent_urls_share_one_load() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_document(URL, fixtures::MY_CLASS_TURTLE, Some("text/turtle"))
            .with_latency(Duration::from_millis(100)),
    );
    let (kb, loader) = setup(&fetcher);

    let (a, b) = tokio::join!(
        loader.load(LoadRequest::from_identifier(URL, graph())),
        loader.load(LoadRequest::from_identifier("https://EXAMPLE.org/files/my-class.ttl#top", graph())),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(fetcher.fetches_of(URL), 1);
    assert!(!a.deduplicated);
    assert!(b.deduplicated);
    assert_eq!(a.quads_inserted, b.quads_inserted);
    assert_eq!(a.url, b.url);
    assert_eq!(kb.store().read().graph_len(&graph()), a.quads_inserted);
    assert_eq!(loader.in_flight(), 0);
}

#[tokio::test]
async fn sequential_reloads_fetch_again_but_insert_nothing() {
    let fetcher = Arc::new(StaticFetcher::new().with_document(URL, fixtures::MY_CLASS_TURTLE, None));
    let (kb, loader) = setup(&fetcher);

    let first = loader.load(LoadRequest::from_identifier(URL, graph())).await.unwrap();
    let generation = kb.index().generation();
    let second = loader.load(LoadRequest::from_identifier(URL, graph())).await.unwrap();

    assert_eq!(fetcher.fetches_of(URL), 2);
    assert!(first.quads_inserted > 0);
    assert_eq!(second.quads_inserted, 0);
    assert_eq!(second.quads_parsed, first.quads_parsed);
    assert_eq!(kb.store().read().len(), first.quads_inserted);
    assert!(kb.index().generation() > generation);
    assert_eq!(kb.index().fat_map().len(), 1);
}

#[tokio::test]
async fn waiters_receive_the_leaders_failure() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_failure(URL, "connection reset")
            .with_latency(Duration::from_millis(50)),
    );
    let (kb, loader) = setup(&fetcher);

    let (a, b) = tokio::join!(
        loader.load(LoadRequest::from_identifier(URL, graph())),
        loader.load(LoadRequest::from_identifier(URL, graph())),
    );
    let (a, b) = (a.unwrap_err(), b.unwrap_err());
    assert_eq!(a, b);
    assert!(a.is_network());
    assert_eq!(fetcher.fetch_count(), 1);
    assert!(kb.store().read().is_empty());

    let report = LoadReport::new(URL, &Err(a));
    assert!(!report.success);
    assert!(report.error.unwrap().contains("connection reset"));
}

#[tokio::test]
async fn loads_of_different_sources_run_independently() {
    let other = "https://example.org/files/prefixed.ttl";
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_document(URL, fixtures::MY_CLASS_TURTLE, Some("text/turtle"))
            .with_document(other, fixtures::PREFIXED_TURTLE, Some("text/turtle")),
    );
    let (kb, loader) = setup(&fetcher);

    let (a, b) = tokio::join!(
        loader.load(LoadRequest::from_identifier(URL, graph())),
        loader.load(LoadRequest::from_identifier(other, graph())),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(!a.deduplicated && !b.deduplicated);
    assert_eq!(fetcher.fetch_count(), 2);
    assert_eq!(kb.store().read().graph_len(&graph()), a.quads_inserted + b.quads_inserted);
    assert_eq!(kb.sources().len(), 2);
}
