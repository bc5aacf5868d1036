//! Tavily Search API provider.
//!
//! Calls `POST https://api.tavily.com/search` with the API key in the
//! request body and maps the structured results into the normalized shape
//! the search endpoint serves.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{SearchProvider, SearchResult};

const SEARCH_URL: &str = "https://api.tavily.com/search";

/// Tavily Search API request body.
#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u8,
}

/// Tavily Search API response.
#[derive(Deserialize)]
struct TavilyApiResponse {
    results: Vec<TavilyApiResult>,
}

/// A single result from the Tavily API.
#[derive(Deserialize)]
struct TavilyApiResult {
    title: String,
    url: String,
    content: String,
}

impl TavilyApiResponse {
    fn into_results(self) -> Vec<SearchResult> {
        self.results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct TavilyProvider {
    client: Client,
    api_key: String,
    max_results: u8,
}

impl TavilyProvider {
    pub fn new(api_key: &str, max_results: u8) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            max_results,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResult>> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
        };

        let response = self.client.post(SEARCH_URL).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Tavily API returned {status}: {body}");
        }

        let parsed: TavilyApiResponse = response.json().await?;
        Ok(parsed.into_results())
    }

    fn provider_name(&self) -> &str {
        "tavily"
    }
}
