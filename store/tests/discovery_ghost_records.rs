//! Failed discovery loads must not leave records that look loaded.

use std::sync::Arc;

use onto_store::discovery::{CandidateStatus, DiscoverOptions, LoadMode, Reconciler};
use onto_store::loader::{LoadStatus, StaticFetcher};
use onto_store::tests::fixtures;
use onto_store::{GraphLoader, GraphName, KnowledgeBase, LoadRequest, LoadSource, StoreConfig};

const IMPORTS_FOAF_AND_MISSING: &str = r#"
@prefix owl: <http://www.w3.org/2002/07/owl#> .

<http://example.org/onto/root> a owl:Ontology ;
    owl:imports <http://xmlns.com/foaf/0.1/> ,
                <http://example.org/onto/missing> ,
                <http://example.org/onto/shapes> .
"#;

fn setup(config: StoreConfig, fetcher: StaticFetcher) -> (Arc<KnowledgeBase>, Reconciler) {
    let kb = Arc::new(KnowledgeBase::new(config));
    let loader = Arc::new(GraphLoader::new(Arc::clone(&kb), Arc::new(fetcher)).unwrap());
    (kb, Reconciler::new(loader))
}

async fn seed(reconciler: &Reconciler, graph: &GraphName) {
    reconciler
        .loader()
        .load(LoadRequest::new(
            LoadSource::content(IMPORTS_FOAF_AND_MISSING, Some("text/turtle")),
            graph.clone(),
        ))
        .await
        .unwrap();
}

fn fetcher() -> StaticFetcher {
    StaticFetcher::new()
        .with_failure("http://xmlns.com/foaf/0.1/", "connection refused")
        .with_document("http://example.org/onto/shapes", fixtures::SHAPES_ONTOLOGY, Some("text/turtle"))
}

#[tokio::test]
async fn failures_are_reported_without_aborting_siblings() {
    let (kb, reconciler) = setup(StoreConfig::default(), fetcher());
    let graph = GraphName::data();
    seed(&reconciler, &graph).await;

    let options = DiscoverOptions::from_config(graph.clone(), kb.config()).with_load_mode(LoadMode::Sync);
    let report = reconciler.discover(&options).await;
    // The root ontology is already loaded through the inline document that declared it.
    assert_eq!(
        report.candidates,
        vec![
            "https://xmlns.com/foaf/0.1".to_owned(),
            "https://example.org/onto/missing".to_owned(),
            "https://example.org/onto/shapes".to_owned(),
        ]
    );
    let results = report.results.as_ref().unwrap();
    let status: Vec<CandidateStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        status,
        vec![CandidateStatus::Failed, CandidateStatus::Failed, CandidateStatus::Loaded]
    );
    assert_eq!(report.failure_count(), 2);
    assert_eq!(results[0].error_kind, Some("network"));
    assert!(results[0].error.as_deref().unwrap().contains("connection refused"));
    assert!(results[1].error.as_deref().unwrap().contains("404"));
}

#[tokio::test]
async fn failed_candidates_are_retried_by_the_next_discovery() {
    let (kb, reconciler) = setup(StoreConfig::default(), fetcher());
    let graph = GraphName::data();
    seed(&reconciler, &graph).await;
    let options = DiscoverOptions::from_config(graph.clone(), kb.config()).with_load_mode(LoadMode::Sync);
    reconciler.discover(&options).await;

    // Recognized ontologies keep a failure record; others keep none.
    let foaf = kb.sources().get("https://xmlns.com/foaf/0.1/").unwrap();
    assert_eq!(foaf.load_status, LoadStatus::Fail);
    assert!(kb.sources().get("https://example.org/onto/missing").is_none());
    assert!(!kb.sources().is_loaded("http://xmlns.com/foaf/0.1/"));

    let again = reconciler.candidates(&graph, false);
    assert_eq!(
        again,
        vec![
            "https://xmlns.com/foaf/0.1".to_owned(),
            "https://example.org/onto/missing".to_owned(),
        ]
    );
}

#[tokio::test]
async fn disabled_and_blacklisted_ontologies_are_skipped() {
    let config = StoreConfig::from_toml_str(
        r#"
        [discovery]
        disabled = ["https://example.org/onto/missing/"]
        blacklist = ["http://xmlns.com/foaf/0.1/"]
        "#,
    )
    .unwrap();
    let (kb, reconciler) = setup(config, fetcher());
    let graph = GraphName::data();
    seed(&reconciler, &graph).await;
    assert!(reconciler.is_disabled("http://example.org/onto/missing"));

    reconciler.disable("http://example.org/onto/shapes#");
    assert!(reconciler.candidates(&graph, false).is_empty());

    assert!(reconciler.enable("https://example.org/onto/shapes"));
    let options = DiscoverOptions::from_config(graph.clone(), kb.config()).with_load_mode(LoadMode::Sync);
    let report = reconciler.discover(&options).await;
    assert_eq!(report.candidates, vec!["https://example.org/onto/shapes".to_owned()]);
    assert!(report.all_loaded());
}

#[tokio::test]
async fn none_mode_reports_without_loading() {
    let (kb, reconciler) = setup(StoreConfig::default(), fetcher());
    let graph = GraphName::data();
    seed(&reconciler, &graph).await;
    let records_before = kb.sources().len();

    let options = DiscoverOptions::from_config(graph, kb.config()).with_load_mode(LoadMode::None);
    let report = reconciler.discover(&options).await;
    assert_eq!(report.candidates.len(), 3);
    assert!(report.results.is_none());
    assert!(report.background.is_none());
    assert_eq!(kb.sources().len(), records_before);
}
