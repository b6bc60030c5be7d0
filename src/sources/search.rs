use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::CompanySource;
use crate::company::Company;

const SEARCH_URL: &str = "https://serpapi.com/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Company discovery through Google results served by SerpApi.
pub struct SearchSource {
    client: reqwest::Client,
    api_key: String,
}

impl SearchSource {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build search HTTP client")?;
        Ok(SearchSource {
            client,
            api_key: api_key.to_string(),
        })
    }
}

impl CompanySource for SearchSource {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn fetch(&self, industry: &str, limit: usize) -> Result<Vec<Company>> {
        let query = search_query(industry);
        let num = limit.to_string();
        debug!("Searching for: {}", query);

        let response: SearchResponse = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("q", query.as_str()),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .context("Search request failed")?
            .error_for_status()
            .context("Search API returned an error status")?
            .json()
            .await
            .context("Failed to decode search response")?;

        companies_from_response(response, industry)
    }
}

fn search_query(industry: &str) -> String {
    format!("top companies in {} industry", industry)
}

fn companies_from_response(response: SearchResponse, industry: &str) -> Result<Vec<Company>> {
    if let Some(err) = response.error {
        bail!("Search API error: {}", err);
    }

    Ok(response
        .organic_results
        .into_iter()
        .map(|r| Company {
            name: non_empty(r.title.split('|').next().unwrap_or_default().trim()),
            website: non_empty(r.link.trim()),
            description: non_empty(r.snippet.trim()),
            industry: Some(industry.to_string()),
            ..Default::default()
        })
        .collect())
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
