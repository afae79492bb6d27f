//! SearchClient trait: the external web-search collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::SearchOptions;
use crate::error::ProviderError;

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Host the hit came from
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

/// What a search call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn ok(results: Vec<SearchHit>) -> Self {
        Self {
            success: true,
            results,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The search aggregation collaborator. Only called with validated queries.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchOutcome, ProviderError>;
}

/// One-line human summary of a result list.
pub fn summarize(query: &str, results: &[SearchHit]) -> String {
    if results.is_empty() {
        return format!("No search results found for \"{query}\".");
    }

    let mut sources: Vec<&str> = Vec::new();
    for hit in results.iter().take(3) {
        if !hit.source.is_empty() && !sources.contains(&hit.source.as_str()) {
            sources.push(&hit.source);
        }
    }

    let noun = if results.len() == 1 { "result" } else { "results" };
    if sources.is_empty() {
        format!("Found {} {noun} for \"{query}\".", results.len())
    } else {
        format!(
            "Found {} {noun} for \"{query}\". Top sources: {}",
            results.len(),
            sources.join(", ")
        )
    }
}
