//! Web search collaborator.
//!
//! The search endpoint treats its backend as an opaque function
//! `search(query) -> results | error`. Each backend implements
//! [`SearchProvider`] to normalize its API response into a common result
//! shape; provider failures propagate so the transport layer can answer
//! with a structured error instead of a fabricated result set.

mod tavily;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::SearchConfig;

pub use tavily::TavilyProvider;

/// A single search result, normalized across all providers.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Abstraction over different web search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync + std::fmt::Debug {
    /// Perform a web search and return normalized results.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResult>>;

    /// The provider name (e.g. `"tavily"`).
    fn provider_name(&self) -> &str;
}

/// Builds the configured provider. Unknown provider names fail here, at
/// startup, so misconfiguration is caught before the server binds.
pub fn from_config(config: &SearchConfig) -> anyhow::Result<Arc<dyn SearchProvider>> {
    match config.provider.as_str() {
        "tavily" => Ok(Arc::new(TavilyProvider::new(
            &config.api_key,
            config.max_results,
        ))),
        other => anyhow::bail!(
            "Unsupported search provider: '{other}'. Supported: 'tavily'."
        ),
    }
}
