//! Load, discover, index and export across a small ontology network.

use std::sync::Arc;

use onto_store::discovery::{CandidateStatus, DiscoverOptions, LoadMode, Reconciler};
use onto_store::loader::{LoadStatus, SourceKind, StaticFetcher};
use onto_store::tests::fixtures;
use onto_store::{
    ExportFormat, GraphLoader, GraphName, KnowledgeBase, LoadRequest, LoadSource, StoreConfig,
};

fn network() -> StaticFetcher {
    StaticFetcher::new()
        .with_document(
            "http://example.org/onto/main",
            fixtures::ONTOLOGY_WITH_IMPORTS,
            Some("text/turtle"),
        )
        .with_document(
            "http://example.org/onto/shapes",
            fixtures::SHAPES_ONTOLOGY,
            Some("text/turtle"),
        )
        .with_document(
            "http://example.org/onto/units",
            fixtures::UNITS_ONTOLOGY,
            Some("text/turtle; charset=utf-8"),
        )
}

fn setup(fetcher: StaticFetcher) -> (Arc<KnowledgeBase>, Reconciler) {
    let kb = Arc::new(KnowledgeBase::new(StoreConfig::default()));
    let loader = Arc::new(GraphLoader::new(Arc::clone(&kb), Arc::new(fetcher)).unwrap());
    (kb, Reconciler::new(loader))
}

fn sync_options(graph: &GraphName, kb: &KnowledgeBase) -> DiscoverOptions {
    DiscoverOptions::from_config(graph.clone(), kb.config()).with_load_mode(LoadMode::Sync)
}

#[tokio::test]
async fn imports_are_discovered_loaded_and_indexed() {
    let (kb, reconciler) = setup(network());
    let graph = GraphName::ontologies();

    let outcome = reconciler
        .loader()
        .load(LoadRequest::from_identifier("http://example.org/onto/main", graph.clone()))
        .await
        .unwrap();
    assert_eq!(outcome.url, "https://example.org/onto/main");
    assert!(outcome.canonical_url.is_none());

    let report = reconciler.discover(&sync_options(&graph, &kb)).await;
    assert_eq!(
        report.candidates,
        vec![
            "https://example.org/onto/shapes".to_owned(),
            "https://example.org/onto/units".to_owned(),
        ]
    );
    let results = report.results.as_ref().unwrap();
    assert!(results.iter().all(|r| r.status == CandidateStatus::Loaded));
    assert!(report.all_loaded());

    let index = kb.index();
    let fat_map = index.fat_map();
    assert_eq!(fat_map.class("http://example.org/onto/main#Widget").unwrap().label, "Widget");
    let shape = fat_map.class("http://example.org/onto/shapes#Shape").unwrap();
    assert_eq!(shape.label, "Shape");
    assert_eq!(shape.label_language.as_deref(), Some("en"));
    let has_part = fat_map.property("http://example.org/onto/main#hasPart").unwrap();
    assert!(has_part.domain.contains("http://example.org/onto/main#Widget"));
    assert!(has_part.range.contains("http://example.org/onto/main#Widget"));
    assert_eq!(
        fat_map.property("http://example.org/onto/units#unitOf").unwrap().label,
        "unit of"
    );
    for (_, _, _, namespace) in fat_map.identities() {
        assert!(index.registry().contains_namespace(&namespace));
    }

    let records = kb.sources().list();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.load_status == LoadStatus::Ok));
    let shapes = kb.sources().get("http://example.org/onto/shapes").unwrap();
    assert_eq!(shapes.source, SourceKind::Discovered);
    assert_eq!(shapes.graph_name, graph.as_str());
}

#[tokio::test]
async fn second_discovery_finds_nothing_new() {
    let (kb, reconciler) = setup(network());
    let graph = GraphName::ontologies();
    reconciler
        .loader()
        .load(LoadRequest::from_identifier("https://example.org/onto/main", graph.clone()))
        .await
        .unwrap();

    let first = reconciler.discover(&sync_options(&graph, &kb)).await;
    assert_eq!(first.candidates.len(), 2);

    let second = reconciler.discover(&sync_options(&graph, &kb)).await;
    assert!(second.candidates.is_empty(), "{:?}", second.candidates);
    assert_eq!(second.results.as_deref(), Some(&[][..]));
}

#[tokio::test]
async fn async_discovery_runs_in_the_background() {
    let (kb, reconciler) = setup(network());
    let graph = GraphName::ontologies();
    reconciler
        .loader()
        .load(LoadRequest::from_identifier("http://example.org/onto/main", graph.clone()))
        .await
        .unwrap();

    let options = DiscoverOptions::from_config(graph.clone(), kb.config()).with_load_mode(LoadMode::Async);
    let report = reconciler.discover(&options).await;
    assert!(report.results.is_none());
    let background = report.background.unwrap();
    assert_eq!(background.len(), 2);

    let results = background.join().await;
    assert!(results.iter().all(|r| !r.is_failure()));
    assert!(kb.index().fat_map().class("http://example.org/onto/shapes#Shape").is_some());
}

#[tokio::test]
async fn exports_reflect_loaded_prefixes() {
    let (kb, reconciler) = setup(StaticFetcher::new());
    let graph = GraphName::data();
    reconciler
        .loader()
        .load(LoadRequest::new(
            LoadSource::content(fixtures::ONTOLOGY_WITH_IMPORTS, Some("text/turtle")),
            graph.clone(),
        ))
        .await
        .unwrap();

    let turtle = kb.export(Some(&graph), ExportFormat::Turtle).unwrap();
    assert!(turtle.contains("@prefix main: <http://example.org/onto/main#> ."));
    assert!(turtle.contains("main:Widget\n    a owl:Class"));

    let jsonld: serde_json::Value =
        serde_json::from_str(&kb.export(Some(&graph), ExportFormat::JsonLd).unwrap()).unwrap();
    assert_eq!(jsonld["@context"]["main"], "http://example.org/onto/main#");
    assert_eq!(jsonld["@graph"][0]["@id"], graph.as_str());

    let nquads = kb.export(None, ExportFormat::NQuads).unwrap();
    assert_eq!(nquads.lines().count(), kb.store().read().len());

    let xml = kb.export(Some(&graph), ExportFormat::RdfXml).unwrap();
    assert!(xml.contains("<rdf:Description rdf:about=\"http://example.org/onto/main#Widget\">"));
}

#[tokio::test]
async fn loaded_class_survives_a_full_rebuild_unchanged() {
    let (kb, reconciler) = setup(StaticFetcher::new());
    let graph = GraphName::new("urn:data").unwrap();
    reconciler
        .loader()
        .load(LoadRequest::new(
            LoadSource::content(fixtures::MY_CLASS_TURTLE, Some("text/turtle")),
            graph,
        ))
        .await
        .unwrap();

    let loaded = kb.index().fat_map().class("http://example.org/test#MyClass").cloned().unwrap();
    assert_eq!(
        loaded.identity(),
        ("http://example.org/test#MyClass", "MyClass Label", "http://example.org/test#")
    );
    assert!(kb.index().fat_map().property("http://example.org/test#MyClass").is_none());

    let rebuilt = kb.rebuild_index().unwrap();
    let entry = rebuilt.fat_map().class("http://example.org/test#MyClass").unwrap();
    assert_eq!(entry.identity(), loaded.identity());
}

#[tokio::test]
async fn removing_a_graph_drops_its_index_entries() {
    let (kb, reconciler) = setup(StaticFetcher::new());
    let graph = GraphName::data();
    reconciler
        .loader()
        .load(LoadRequest::new(
            LoadSource::content(fixtures::MY_CLASS_TURTLE, Some("text/turtle")),
            graph.clone(),
        ))
        .await
        .unwrap();
    assert!(kb.index().fat_map().class("http://example.org/test#MyClass").is_some());

    let removed = kb.remove_graph(&graph);
    assert!(removed >= 2);
    assert_eq!(kb.store().read().graph_len(&graph), 0);
    assert!(kb.index().fat_map().is_empty());

    kb.clear();
    assert!(kb.sources().is_empty());
    assert!(kb.store().read().is_empty());
}
