//! `onto-load`: Loads RDF documents into an in-memory store and exports the result.
//!
//! Inputs may be files, directories (walked recursively for files with a
//! known RDF extension) or `http`/`https`/`file` URLs. Every input becomes one
//! load; a JSON [`LoadReport`](onto_store::LoadReport) line is printed per input.
//!
//! **Usage:**
//! ```
//! onto-load [--graph <iri>] [--config <path>] [--discover <none|async|sync>]
//!           [--export <format>] [--out <path>] [--verbose] <input>...
//! ```
//!
//! Exits non-zero if any load or discovered import fails.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use onto_store::discovery::{CandidateResult, DiscoverOptions, LoadMode, Reconciler};
use onto_store::{
    ExportFormat, GraphLoader, GraphName, KnowledgeBase, LoadReport, LoadRequest, LoadSource,
    RdfFormat, StoreConfig,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Load RDF documents and optionally export the merged graph.
#[derive(Parser)]
#[command(
    name = "onto-load",
    about = "Load RDF documents into an in-memory quad store"
)]
struct Args {
    /// Files, directories or URLs to load.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Target graph IRI (default: the configured data graph).
    #[arg(long)]
    graph: Option<String>,

    /// TOML configuration file (default: $ONTO_STORE_CONFIG, else built-in defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Discover and load `owl:imports` after loading.
    #[arg(long, value_enum, default_value = "none")]
    discover: Mode,

    /// Export the target graph in this format (turtle, ntriples, nquads, jsonld, rdfxml).
    #[arg(long)]
    export: Option<ExportFormat>,

    /// Write the export here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Honour RUST_LOG instead of logging warnings only.
    #[arg(long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    None,
    Async,
    Sync,
}

impl From<Mode> for LoadMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::None => LoadMode::None,
            Mode::Async => LoadMode::Async,
            Mode::Sync => LoadMode::Sync,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Expands directories into the RDF files beneath them, sorted by path.
fn expand_inputs(inputs: &[String]) -> Result<Vec<String>> {
    let mut expanded = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if !path.is_dir() {
            expanded.push(input.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(path).follow_links(true) {
            let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
            let file = entry.path().to_string_lossy().into_owned();
            if entry.file_type().is_file() && RdfFormat::from_path(&file).is_some() {
                found.push(file);
            }
        }
        found.sort();
        expanded.extend(found);
    }
    Ok(expanded)
}

/// Builds the load for one input: URLs are fetched, anything else is read
/// from disk with the media type implied by its extension.
fn request_for(input: &str, graph: &GraphName) -> Result<LoadRequest> {
    if let LoadSource::Url(url) = LoadSource::from_identifier(input) {
        return Ok(LoadRequest::new(LoadSource::Url(url), graph.clone()));
    }
    let text = std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))?;
    let source = LoadSource::Content {
        text,
        media_type: RdfFormat::from_path(input).map(|f| f.media_type().to_owned()),
        name: Some(input.to_owned()),
    };
    Ok(LoadRequest::new(source, graph.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => StoreConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StoreConfig::from_env().context("Failed to load config from environment")?,
    };
    let graph = match &args.graph {
        Some(iri) => GraphName::new(iri).with_context(|| format!("Invalid graph IRI {iri}"))?,
        None => config.graphs.data_graph().context("Invalid configured data graph")?,
    };

    let kb = Arc::new(KnowledgeBase::new(config));
    let loader = Arc::new(GraphLoader::with_http(Arc::clone(&kb)).context("Failed to start the loader")?);

    let mut failures = 0usize;
    for input in expand_inputs(&args.inputs)? {
        let result = match request_for(&input, &graph) {
            Ok(request) => loader.load(request).await,
            Err(e) => {
                let message = format!("{e:#}");
                error!(%input, error = %message, "input skipped");
                failures += 1;
                continue;
            }
        };
        let report = LoadReport::new(&input, &result);
        if let Err(e) = &result {
            error!(%input, kind = e.kind(), error = %e, "load failed");
            failures += 1;
        }
        println!("{}", serde_json::to_string(&report)?);
    }

    let mode = LoadMode::from(args.discover);
    if mode != LoadMode::None {
        let reconciler = Reconciler::new(Arc::clone(&loader));
        let options = DiscoverOptions::from_config(graph.clone(), kb.config()).with_load_mode(mode);
        let mut report = reconciler.discover(&options).await;
        let mut results: Vec<CandidateResult> = report.results.take().unwrap_or_default();
        if let Some(background) = report.background.take() {
            results.extend(background.join().await);
        }
        for result in &results {
            if result.is_failure() {
                error!(url = %result.url, error = ?result.error, "import failed");
                failures += 1;
            }
            println!("{}", serde_json::to_string(result)?);
        }
    }

    if let Some(format) = args.export {
        let text = kb
            .export(Some(&graph), format)
            .with_context(|| format!("Failed to export {graph} as {format}"))?;
        match &args.out {
            Some(path) => std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => print!("{text}"),
        }
    }

    let store = kb.store().read();
    info!(
        graph = %graph,
        graph_quads = store.graph_len(&graph),
        store_quads = store.len(),
        sources = kb.sources().len(),
        "load finished"
    );
    drop(store);

    if failures > 0 {
        error!(failures, "some loads failed");
        eprintln!("FAILED: {failures} load(s) failed");
        process::exit(1);
    }
    Ok(())
}
