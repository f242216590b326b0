//! Fetching source documents over HTTP(S) or from `file://` URLs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::normalize::fetch_url;
use crate::error::LoadError;
use crate::iri;
use crate::parser::RdfFormat;

/// `Accept` header sent with HTTP requests.
pub const ACCEPT_RDF: &str = "text/turtle, application/rdf+xml;q=0.9, application/ld+json;q=0.9, \
application/n-triples;q=0.8, application/n-quads;q=0.8, application/trig;q=0.8, */*;q=0.1";

/// A fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// Body text.
    pub body: String,
    /// Media type reported by the server or guessed from the file extension.
    pub media_type: Option<String>,
    /// URL after redirects.
    pub final_url: String,
}

/// Something that can retrieve a document by URL.
#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    /// Fetches `url`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Network`] or [`LoadError::Timeout`] when the
    /// document cannot be retrieved.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedDocument, LoadError>;
}

/// Fetcher backed by `reqwest` for HTTP(S) and `tokio::fs` for `file://`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher that identifies itself with `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Network`] if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| LoadError::Network {
                url: String::new(),
                message: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    async fn fetch_file(&self, url: &str) -> Result<FetchedDocument, LoadError> {
        let path = file_path(url)?;
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LoadError::Network {
                url: url.to_owned(),
                message: e.to_string(),
            })?;
        Ok(FetchedDocument {
            body,
            media_type: RdfFormat::from_path(&path.to_string_lossy()).map(|f| f.media_type().to_owned()),
            final_url: url.to_owned(),
        })
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedDocument, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT_RDF)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok(FetchedDocument {
            body,
            media_type,
            final_url,
        })
    }
}

/// Local path named by a `file:` URL, percent-decoded.
fn file_path(url: &str) -> Result<PathBuf, LoadError> {
    let not_local = |message: String| LoadError::Network {
        url: url.to_owned(),
        message,
    };
    let parsed = reqwest::Url::parse(url).map_err(|e| not_local(e.to_string()))?;
    parsed
        .to_file_path()
        .map_err(|()| not_local("not a local file path".to_owned()))
}

/// The plain `http` form of an `https` URL. Sources are requested over
/// `https` first; hosts that refuse TLS connections are retried with this.
fn plain_http(url: &str) -> Option<String> {
    url.strip_prefix("https://").map(|rest| format!("http://{rest}"))
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedDocument, LoadError> {
        if url.starts_with("file://") {
            return self.fetch_file(url).await;
        }
        let network = |e: reqwest::Error| {
            if e.is_timeout() {
                LoadError::Timeout {
                    url: url.to_owned(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
            } else {
                LoadError::Network {
                    url: url.to_owned(),
                    message: e.to_string(),
                }
            }
        };
        match self.get(url, timeout).await {
            Ok(doc) => Ok(doc),
            Err(e) if e.is_connect() => match plain_http(url) {
                Some(fallback) => {
                    debug!(%url, error = %e, "https connection failed; retrying over http");
                    self.get(&fallback, timeout).await.map_err(network)
                }
                None => Err(network(e)),
            },
            Err(e) => Err(network(e)),
        }
    }
}

/// In-memory fetcher serving canned documents. Used by tests and by callers
/// that preload documents.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    documents: HashMap<String, (String, Option<String>)>,
    failures: HashMap<String, String>,
    latency: Duration,
    fetches: AtomicUsize,
    per_url: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    /// Creates an empty fetcher; every URL fails until documents are added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `url`.
    #[must_use]
    pub fn with_document(mut self, url: &str, body: &str, media_type: Option<&str>) -> Self {
        self.documents
            .insert(fetch_url(url), (body.to_owned(), media_type.map(str::to_owned)));
        self
    }

    /// Fails requests for `url` with a network error carrying `message`.
    #[must_use]
    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.failures.insert(fetch_url(url), message.to_owned());
        self
    }

    /// Delays every response.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Total number of fetches.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of fetches of `url`.
    #[must_use]
    pub fn fetches_of(&self, url: &str) -> usize {
        self.per_url.lock().get(&fetch_url(url)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedDocument, LoadError> {
        let key = fetch_url(url);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.per_url.lock().entry(key.clone()).or_default() += 1;
        if !self.latency.is_zero() {
            if self.latency > timeout {
                tokio::time::sleep(timeout).await;
                return Err(LoadError::Timeout {
                    url: url.to_owned(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(self.latency).await;
        }
        if let Some(message) = served(&self.failures, &key) {
            return Err(LoadError::Network {
                url: url.to_owned(),
                message: message.clone(),
            });
        }
        match served(&self.documents, &key) {
            Some((body, media_type)) => Ok(FetchedDocument {
                body: body.clone(),
                media_type: media_type.clone(),
                final_url: key,
            }),
            None => Err(LoadError::Network {
                url: url.to_owned(),
                message: "404 Not Found".to_owned(),
            }),
        }
    }
}

/// Exact match on the fetch URL, else any entry naming the same source
/// (trailing `/` or `#` and scheme differences ignored).
fn served<'a, V>(entries: &'a HashMap<String, V>, key: &str) -> Option<&'a V> {
    entries.get(key).or_else(|| {
        entries
            .iter()
            .find(|(url, _)| iri::same_source(url, key))
            .map(|(_, value)| value)
    })
}
