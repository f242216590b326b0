//! Runtime configuration.
//!
//! Every field has a default, so an empty document is a valid configuration.
//! Unknown keys are rejected.
//!
//! ```toml
//! [pipeline]
//! batch_size = 1000
//!
//! [loader]
//! timeout_ms = 30000
//!
//! [discovery]
//! load_mode = "sync"
//! concurrency_limit = 2
//! disabled = ["https://example.org/slow-ontology"]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, TermError};
use crate::namespace::ConflictPolicy;
use crate::parser::DEFAULT_BATCH_SIZE;
use crate::term::GraphName;
use crate::vocab;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "ONTO_STORE_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Parsing pipeline.
    pub pipeline: PipelineConfig,
    /// Graph loader.
    pub loader: LoaderConfig,
    /// Conventional graph names.
    pub graphs: GraphsConfig,
    /// Fat-map maintenance.
    pub index: IndexConfig,
    /// Ontology discovery.
    pub discovery: DiscoveryConfig,
    /// Namespace registry.
    pub namespaces: NamespacesConfig,
}

/// `[pipeline]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum quads per batch.
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// `[loader]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Fetch timeout in milliseconds.
    pub timeout_ms: u64,
    /// `User-Agent` for HTTP requests.
    pub user_agent: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            user_agent: concat!("onto-store/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl LoaderConfig {
    /// Fetch timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// `[graphs]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphsConfig {
    /// Graph for editable data.
    pub data: String,
    /// Graph for ontology triples.
    pub ontologies: String,
    /// Graph for inferred triples.
    pub inferred: String,
}

impl Default for GraphsConfig {
    fn default() -> Self {
        Self {
            data: vocab::GRAPH_DATA.to_owned(),
            ontologies: vocab::GRAPH_ONTOLOGIES.to_owned(),
            inferred: vocab::GRAPH_INFERRED.to_owned(),
        }
    }
}

impl GraphsConfig {
    /// The data graph.
    ///
    /// # Errors
    ///
    /// Returns [`TermError`] if the configured name is not an absolute IRI.
    pub fn data_graph(&self) -> Result<GraphName, TermError> {
        GraphName::new(&self.data)
    }

    /// The ontology graph.
    ///
    /// # Errors
    ///
    /// Returns [`TermError`] if the configured name is not an absolute IRI.
    pub fn ontology_graph(&self) -> Result<GraphName, TermError> {
        GraphName::new(&self.ontologies)
    }

    /// The inferred graph.
    ///
    /// # Errors
    ///
    /// Returns [`TermError`] if the configured name is not an absolute IRI.
    pub fn inferred_graph(&self) -> Result<GraphName, TermError> {
        GraphName::new(&self.inferred)
    }
}

/// How the fat-map follows loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// Upsert the delta of each load.
    #[default]
    Incremental,
    /// Rebuild from the whole store after each load.
    Full,
}

/// `[index]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Maintenance mode.
    pub mode: IndexMode,
}

/// How discovery loads the candidates it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Report candidates only.
    None,
    /// Load in the background; do not wait.
    #[default]
    Async,
    /// Load and wait for every result.
    Sync,
}

/// `[discovery]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Default load mode.
    pub load_mode: LoadMode,
    /// Maximum parallel loads.
    pub concurrency_limit: usize,
    /// Delay between background load starts, in milliseconds.
    pub stagger_ms: u64,
    /// Also collect `owl:imports` from graphs other than the scanned one.
    pub imports_from_all_graphs: bool,
    /// Ontology URLs the user disabled.
    pub disabled: Vec<String>,
    /// Namespaces excluded in addition to the core vocabularies.
    pub blacklist: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            load_mode: LoadMode::Async,
            concurrency_limit: 4,
            stagger_ms: 150,
            imports_from_all_graphs: false,
            disabled: Vec::new(),
            blacklist: Vec::new(),
        }
    }
}

/// `[namespaces]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamespacesConfig {
    /// Prefix conflict policy.
    pub conflict_policy: ConflictPolicy,
}

impl StoreConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reads the file named by `ONTO_STORE_CONFIG`, or returns the defaults
    /// when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the named file cannot be read or parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }
}
