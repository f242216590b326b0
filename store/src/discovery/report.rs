//! Discovery report types: per-candidate results and the aggregate report.

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::LoadError;
use crate::loader::LoadOutcome;

/// Outcome of loading one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateStatus {
    /// The candidate was loaded (or another caller's load of it succeeded).
    Loaded,
    /// The load failed.
    Failed,
}

/// Result of loading a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    /// Normalized candidate URL.
    pub url: String,
    /// Outcome.
    pub status: CandidateStatus,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category, see [`LoadError::kind`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl CandidateResult {
    /// Creates a loaded result.
    pub fn loaded(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: CandidateStatus::Loaded,
            error: None,
            error_kind: None,
        }
    }

    /// Creates a failed result.
    pub fn failed(url: impl Into<String>, error: &LoadError) -> Self {
        Self {
            url: url.into(),
            status: CandidateStatus::Failed,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    /// Summarizes a load result.
    pub fn from_load(url: impl Into<String>, result: &Result<LoadOutcome, LoadError>) -> Self {
        match result {
            Ok(_) => Self::loaded(url),
            Err(e) => Self::failed(url, e),
        }
    }

    /// Returns true if the candidate failed to load.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == CandidateStatus::Failed
    }
}

/// Handles of background candidate loads started in `async` mode.
///
/// Dropping this value does not stop the loads.
#[derive(Debug, Default)]
pub struct BackgroundLoads {
    pub(crate) tasks: Vec<(String, JoinHandle<CandidateResult>)>,
}

impl BackgroundLoads {
    /// Number of loads started.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if nothing was started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every background load, in candidate order.
    pub async fn join(self) -> Vec<CandidateResult> {
        let mut results = Vec::with_capacity(self.tasks.len());
        for (url, task) in self.tasks {
            results.push(task.await.unwrap_or_else(|e| CandidateResult {
                url,
                status: CandidateStatus::Failed,
                error: Some(format!("background load aborted: {e}")),
                error_kind: Some("cancelled"),
            }));
        }
        results
    }
}

/// Aggregated discovery report.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    /// Candidate ontology URLs, in first-seen order.
    pub candidates: Vec<String>,
    /// Per-candidate results; present only in `sync` mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<CandidateResult>>,
    /// Loads still running; present only in `async` mode.
    #[serde(skip)]
    pub background: Option<BackgroundLoads>,
}

impl DiscoveryReport {
    /// Returns the count of failed candidates.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.results
            .iter()
            .flatten()
            .filter(|r| r.is_failure())
            .count()
    }

    /// Returns true if no candidate failed.
    #[must_use]
    pub fn all_loaded(&self) -> bool {
        self.failure_count() == 0
    }
}
