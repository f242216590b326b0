//! `onto-discover`: Lists, and optionally loads, the ontologies a document imports.
//!
//! Loads one document into the ontology graph, scans it for declared
//! ontologies and `owl:imports`, then prints the discovery report as JSON.
//! In `async` mode the background loads are awaited before printing so the
//! report carries their results.
//!
//! **Usage:**
//! ```
//! onto-discover [--mode <none|async|sync>] [--config <path>] [--concurrency <n>]
//!               [--all-graphs] [--verbose] <input>
//! ```
//!
//! Exits non-zero if the document fails to load or any import fails.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use onto_store::discovery::{DiscoverOptions, LoadMode, Reconciler};
use onto_store::{GraphLoader, KnowledgeBase, LoadRequest, LoadSource, RdfFormat, StoreConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Discover the ontologies a document imports.
#[derive(Parser)]
#[command(
    name = "onto-discover",
    about = "Discover and load the ontologies an RDF document imports"
)]
struct Args {
    /// File or URL of the document to scan.
    input: String,

    /// What to do with the candidates.
    #[arg(long, value_enum, default_value = "sync")]
    mode: Mode,

    /// TOML configuration file (default: $ONTO_STORE_CONFIG, else built-in defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum parallel loads (default: from config).
    #[arg(long)]
    concurrency: Option<usize>,

    /// Also follow `owl:imports` found outside the ontology graph.
    #[arg(long)]
    all_graphs: bool,

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

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => StoreConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StoreConfig::from_env().context("Failed to load config from environment")?,
    };
    let graph = config
        .graphs
        .ontology_graph()
        .context("Invalid configured ontology graph")?;

    let kb = Arc::new(KnowledgeBase::new(config));
    let loader = Arc::new(GraphLoader::with_http(Arc::clone(&kb)).context("Failed to start the loader")?);

    let source = match LoadSource::from_identifier(&args.input) {
        url @ LoadSource::Url(_) => url,
        LoadSource::Content { .. } => LoadSource::Content {
            text: std::fs::read_to_string(&args.input)
                .with_context(|| format!("Failed to read {}", args.input))?,
            media_type: RdfFormat::from_path(&args.input).map(|f| f.media_type().to_owned()),
            name: Some(args.input.clone()),
        },
    };
    let outcome = loader
        .load(LoadRequest::new(source, graph.clone()))
        .await
        .with_context(|| format!("Failed to load {}", args.input))?;
    info!(
        source = outcome.canonical_url.as_deref().unwrap_or(&outcome.url),
        parsed = outcome.quads_parsed,
        inserted = outcome.quads_inserted,
        "document loaded"
    );

    let mut options = DiscoverOptions::from_config(graph, kb.config()).with_load_mode(args.mode.into());
    if let Some(limit) = args.concurrency {
        options = options.with_concurrency_limit(limit);
    }
    if args.all_graphs {
        options.imports_from_all_graphs = true;
    }

    let reconciler = Reconciler::new(loader);
    let mut report = reconciler.discover(&options).await;
    if let Some(background) = report.background.take() {
        report.results = Some(background.join().await);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    let failures = report.failure_count();
    for result in report.results.iter().flatten().filter(|r| r.is_failure()) {
        warn!(url = %result.url, error = ?result.error, "import failed");
    }
    if failures > 0 {
        eprintln!("FAILED: {failures} of {} import(s) failed", report.candidates.len());
        process::exit(1);
    }
    Ok(())
}
