//! Passage retrieval contract and the HTTP client for the retrieval service.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    #[serde(default)]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub score: f32,
}

/// Turns a query into ranked passages.
#[async_trait]
pub trait PassageRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Passage>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    passages: Vec<Passage>,
}

#[derive(Debug, Clone)]
pub struct HttpPassageRetriever {
    http: reqwest::Client,
    search_url: String,
}

impl HttpPassageRetriever {
    pub fn new(api_base: &str, request_timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create retrieval client")?;
        Ok(Self {
            http,
            search_url: format!("{}/v1/passages/search", api_base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl PassageRetriever for HttpPassageRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Passage>> {
        let response = self
            .http
            .post(&self.search_url)
            .json(&json!({ "query": query, "limit": limit }))
            .send()
            .await
            .context("passage search request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "passage search failed with status {}: {}",
                status.as_u16(),
                body.chars().take(320).collect::<String>()
            );
        }
        let parsed = response
            .json::<SearchResponse>()
            .await
            .context("failed to decode passage search response")?;
        Ok(parsed
            .passages
            .into_iter()
            .filter(|passage| !passage.content.trim().is_empty())
            .take(limit.max(1))
            .collect())
    }
}
